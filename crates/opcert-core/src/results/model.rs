use serde::{Deserialize, Serialize};

use crate::RESULTS_SCHEMA_VERSION;
use crate::check::{HelpText, Metadata};
use crate::image::ImageReference;

/// Top-level results of one certification run.
///
/// This is what gets written to `results.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Results {
    pub schema_version: String,
    pub test_library: TestLibrary,
    pub image: String,
    pub passed: bool,
    pub results: CheckResults,
}

impl Results {
    pub fn new(test_library: TestLibrary, image: &ImageReference, results: CheckResults) -> Self {
        Self {
            schema_version: RESULTS_SCHEMA_VERSION.to_string(),
            test_library,
            image: image.image_uri.clone(),
            passed: results.all_passed(),
            results,
        }
    }

    /// CI-compatible exit code.
    ///
    /// - all passed     → 0
    /// - any failed     → 1
    /// - any errored    → 2 (takes precedence over failures)
    pub fn exit_code(&self) -> i32 {
        if !self.results.errors.is_empty() {
            2
        } else if !self.results.failed.is_empty() {
            1
        } else {
            0
        }
    }
}

/// Tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestLibrary {
    pub name: String,
    pub version: String,
    pub commit: Option<String>,
}

/// Per-check results, bucketed by outcome. Order within a bucket follows
/// check registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckResults {
    pub passed: Vec<CheckResult>,
    pub failed: Vec<CheckResult>,
    pub errors: Vec<CheckResult>,
}

impl CheckResults {
    pub fn all_passed(&self) -> bool {
        self.failed.is_empty() && self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passed.len() + self.failed.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Verdict of one check. `help` is present only for failed or errored checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub elapsed_ms: u64,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<HelpText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Level;

    fn result(name: &str, help: bool) -> CheckResult {
        CheckResult {
            name: name.into(),
            elapsed_ms: 3,
            metadata: Metadata {
                description: "d".into(),
                level: Level::Best,
                knowledge_base_url: "kb".into(),
                check_url: "url".into(),
            },
            help: help.then(|| HelpText {
                message: "m".into(),
                suggestion: "s".into(),
            }),
            error: None,
        }
    }

    fn library() -> TestLibrary {
        TestLibrary {
            name: "opcert".into(),
            version: "1.0.0".into(),
            commit: None,
        }
    }

    fn image() -> ImageReference {
        ImageReference::new("quay.io/ex/bundle:v1", "/tmp/b")
    }

    #[test]
    fn exit_codes_follow_worst_bucket() {
        let mut checks = CheckResults {
            passed: vec![result("a", false)],
            ..Default::default()
        };
        assert_eq!(Results::new(library(), &image(), checks.clone()).exit_code(), 0);

        checks.failed.push(result("b", true));
        assert_eq!(Results::new(library(), &image(), checks.clone()).exit_code(), 1);

        checks.errors.push(result("c", true));
        let results = Results::new(library(), &image(), checks);
        assert_eq!(results.exit_code(), 2);
        assert!(!results.passed);
        assert_eq!(results.results.len(), 3);
    }

    #[test]
    fn passing_result_serializes_without_help() {
        let value = serde_json::to_value(result("a", false)).unwrap();
        assert!(value.get("help").is_none());
        assert!(value.get("error").is_none());
        assert_eq!(value["metadata"]["level"], "best");
    }

    #[test]
    fn empty_results_pass() {
        let results = Results::new(library(), &image(), CheckResults::default());
        assert!(results.passed);
        assert!(results.results.is_empty());
        assert_eq!(results.schema_version, RESULTS_SCHEMA_VERSION);
        assert_eq!(results.image, "quay.io/ex/bundle:v1");
    }
}
