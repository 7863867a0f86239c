//! The check contract.
//!
//! A check turns an [`ImageReference`] into a verdict. Two channels are kept
//! apart:
//!
//!   - `Ok(false)`  → the image legitimately fails the check
//!   - `Err(_)`     → the check could not run (tool crash, timeout, bad report)
//!
//! Callers branch on the error first. Help text is a pure function of the
//! [`Outcome`], so a check never carries state between runs.

pub mod bundle;
pub mod certified_images;
pub mod scorecard;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image::ImageReference;
use crate::operator_sdk::OperatorSdkError;
use crate::pyxis::PyxisError;

pub use bundle::ValidateOperatorBundleCheck;
pub use certified_images::CertifiedImagesCheck;
pub use scorecard::{ScorecardCheck, ScorecardSuite};

#[async_trait]
pub trait Check: Send + Sync {
    /// Stable identifier used to index results.
    fn name(&self) -> &'static str;

    fn metadata(&self) -> Metadata;

    fn help(&self, outcome: &Outcome) -> HelpText;

    async fn validate(&self, image: &ImageReference) -> Result<bool, CheckError>;
}

/// Certification level a check contributes to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Good,
    Best,
    Optional,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    pub description: String,
    pub level: Level,
    pub knowledge_base_url: String,
    pub check_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HelpText {
    pub message: String,
    pub suggestion: String,
}

/// Infrastructure failures. A check that legitimately fails returns
/// `Ok(false)` instead.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("operator-sdk scorecard failed: {0}")]
    Scorecard(#[source] OperatorSdkError),

    #[error("error while executing operator-sdk bundle validate: {0}")]
    BundleValidate(#[source] OperatorSdkError),

    #[error("certified image lookup failed: {0}")]
    Pyxis(#[from] PyxisError),

    #[error("failed to read bundle manifests at {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("check did not finish within {0:?}")]
    Timeout(Duration),

    #[error("check task aborted: {0}")]
    Panicked(String),
}

/// What running a check produced.
#[derive(Debug)]
pub enum Outcome {
    Verdict(bool),
    Infra(CheckError),
}

impl Outcome {
    pub fn passed(&self) -> bool {
        matches!(self, Outcome::Verdict(true))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::Infra(_))
    }

    pub fn error(&self) -> Option<&CheckError> {
        match self {
            Outcome::Infra(err) => Some(err),
            Outcome::Verdict(_) => None,
        }
    }
}

impl From<Result<bool, CheckError>> for Outcome {
    fn from(result: Result<bool, CheckError>) -> Self {
        match result {
            Ok(passed) => Outcome::Verdict(passed),
            Err(err) => Outcome::Infra(err),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory `OperatorSdk` for check tests.

    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::operator_sdk::bundle::BundleValidateReport;
    use crate::operator_sdk::scorecard::ScorecardReport;
    use crate::operator_sdk::{
        BundleValidateOptions, OperatorSdk, OperatorSdkError, ScorecardOptions,
    };

    pub enum Canned<T> {
        Report(T),
        Fail,
    }

    pub struct StubSdk {
        pub scorecard: Canned<ScorecardReport>,
        pub bundle: Canned<BundleValidateReport>,
        pub calls: Mutex<Vec<(PathBuf, ScorecardOptions)>>,
    }

    impl StubSdk {
        pub fn scorecard(report: ScorecardReport) -> Self {
            Self {
                scorecard: Canned::Report(report),
                bundle: Canned::Fail,
                calls: Mutex::new(vec![]),
            }
        }

        pub fn bundle(report: BundleValidateReport) -> Self {
            Self {
                scorecard: Canned::Fail,
                bundle: Canned::Report(report),
                calls: Mutex::new(vec![]),
            }
        }

        pub fn failing() -> Self {
            Self {
                scorecard: Canned::Fail,
                bundle: Canned::Fail,
                calls: Mutex::new(vec![]),
            }
        }
    }

    fn broken(command: &str) -> OperatorSdkError {
        OperatorSdkError::Io {
            command: command.to_string(),
            source: std::io::Error::other("stub failure"),
        }
    }

    #[async_trait]
    impl OperatorSdk for StubSdk {
        async fn scorecard(
            &self,
            image_path: &Path,
            options: &ScorecardOptions,
        ) -> Result<ScorecardReport, OperatorSdkError> {
            self.calls
                .lock()
                .unwrap()
                .push((image_path.to_path_buf(), options.clone()));
            match &self.scorecard {
                Canned::Report(report) => Ok(report.clone()),
                Canned::Fail => Err(broken("operator-sdk scorecard")),
            }
        }

        async fn bundle_validate(
            &self,
            _image_path: &Path,
            _options: &BundleValidateOptions,
        ) -> Result<BundleValidateReport, OperatorSdkError> {
            match &self.bundle {
                Canned::Report(report) => Ok(report.clone()),
                Canned::Fail => Err(broken("operator-sdk bundle validate")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_result_keeps_channels_apart() {
        let failed: Outcome = Ok(false).into();
        assert!(!failed.passed());
        assert!(!failed.is_fatal());

        let fatal: Outcome = Err(CheckError::Timeout(Duration::from_secs(1))).into();
        assert!(!fatal.passed());
        assert!(fatal.is_fatal());
        assert!(matches!(fatal.error(), Some(CheckError::Timeout(_))));
    }

    #[test]
    fn level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Best).unwrap(), "\"best\"");
    }
}
