use serde::{Deserialize, Serialize};

/// Result of validating an operator bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleValidateReport {
    pub passed: bool,
    #[serde(default)]
    pub outputs: Vec<ManifestResult>,
}

/// Findings for one validated object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestResult {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    pub detail: String,
}

impl ValidationIssue {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            field: None,
            value: None,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.field, &self.value) {
            (Some(field), Some(value)) => write!(f, "Field {field}, Value {value}: {}", self.detail),
            (Some(field), None) => write!(f, "Field {field}: {}", self.detail),
            _ => f.write_str(&self.detail),
        }
    }
}

/// Raw `operator-sdk bundle validate --output json-alpha1` document.
///
/// The tool reports a flat list of typed messages; `outputs` is `null` when
/// there is nothing to say.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonAlpha1Output {
    pub passed: bool,
    #[serde(default)]
    pub outputs: Option<Vec<JsonAlpha1Entry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonAlpha1Entry {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl JsonAlpha1Output {
    /// Group the flat messages into a single bundle-level result.
    pub(crate) fn into_report(self, bundle_name: &str) -> BundleValidateReport {
        let entries = self.outputs.unwrap_or_default();
        if entries.is_empty() {
            return BundleValidateReport {
                passed: self.passed,
                outputs: vec![],
            };
        }

        let mut result = ManifestResult {
            name: bundle_name.to_string(),
            ..Default::default()
        };
        for entry in entries {
            let issue = ValidationIssue::new(entry.message);
            if entry.kind.eq_ignore_ascii_case("warning") {
                result.warnings.push(issue);
            } else {
                result.errors.push(issue);
            }
        }

        BundleValidateReport {
            passed: self.passed,
            outputs: vec![result],
        }
    }
}
