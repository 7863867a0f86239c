use serde::{Deserialize, Serialize};

/// Parsed output of `operator-sdk scorecard --output json`.
///
/// Only the fields the checks reduce over are modelled; `apiVersion`, `kind`
/// and each item's `spec` are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScorecardReport {
    #[serde(default)]
    pub items: Vec<ScorecardItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScorecardItem {
    #[serde(default)]
    pub status: ScorecardStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScorecardStatus {
    #[serde(default)]
    pub results: Vec<ScorecardResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScorecardResult {
    pub name: String,
    pub state: ScorecardState,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScorecardState {
    Pass,
    Fail,
    Error,
}

impl std::fmt::Display for ScorecardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ScorecardState::Pass => "pass",
            ScorecardState::Fail => "fail",
            ScorecardState::Error => "error",
        })
    }
}

impl ScorecardResult {
    pub fn new(name: impl Into<String>, state: ScorecardState, log: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state,
            log: log.into(),
            errors: vec![],
            suggestions: vec![],
        }
    }
}

impl ScorecardReport {
    /// One item per test result, which is how single-test selectors come back.
    pub fn from_results(results: impl IntoIterator<Item = ScorecardResult>) -> Self {
        Self {
            items: results
                .into_iter()
                .map(|r| ScorecardItem {
                    status: ScorecardStatus { results: vec![r] },
                })
                .collect(),
        }
    }

    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// All test results across all items, in report order.
    pub fn results(&self) -> impl Iterator<Item = &ScorecardResult> {
        self.items.iter().flat_map(|item| item.status.results.iter())
    }
}
