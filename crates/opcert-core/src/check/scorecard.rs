//! Scorecard-backed checks.
//!
//! Both variants run `operator-sdk scorecard` against the bundle and differ
//! only in the selector, the artifact the raw report is written to, and the
//! text they show. The reduction is all-or-nothing:
//!
//!   - every result `pass`          → pass
//!   - any result `fail` or `error` → fail
//!
//! There is no partial credit.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Check, CheckError, HelpText, Level, Metadata, Outcome};
use crate::config::ScorecardConfig;
use crate::image::ImageReference;
use crate::operator_sdk::scorecard::{ScorecardReport, ScorecardState};
use crate::operator_sdk::{OperatorSdk, ScorecardOptions};

const KNOWLEDGE_BASE_URL: &str = "https://sdk.operatorframework.io/docs/testing-operators/scorecard/#overview";

const FATAL_MESSAGE: &str = "There was a fatal error while running operator-sdk scorecard tests. \
     Please see the preflight log for details. If necessary, set logging to be more verbose.";
const FATAL_SUGGESTION: &str =
    "If the logs are showing a context timeout, try setting wait time to a higher value.";

/// What distinguishes one scorecard check from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorecardSuite {
    pub name: &'static str,
    pub selector: &'static str,
    pub result_file: String,
    pub description: &'static str,
    pub check_url: &'static str,
    pub suggestion: String,
}

impl ScorecardSuite {
    pub fn basic_spec(result_file: impl Into<String>) -> Self {
        Self {
            name: "ScorecardBasicSpecCheck",
            selector: "test=basic-check-spec-test",
            result_file: result_file.into(),
            description: "Check to make sure that all CRs have a spec block.",
            check_url: "https://sdk.operatorframework.io/docs/testing-operators/scorecard/#basic-test-suite",
            suggestion: "Make sure that all CRs have a spec block".to_string(),
        }
    }

    pub fn olm_suite(result_file: impl Into<String>) -> Self {
        let result_file = result_file.into();
        Self {
            name: "ScorecardOlmSuiteCheck",
            selector: "suite=olm",
            suggestion: format!("See scorecard output for details, artifacts/{result_file}"),
            result_file,
            description: "Operator-sdk scorecard OLM Test Suite Check",
            check_url: "https://sdk.operatorframework.io/docs/testing-operators/scorecard/#olm-test-suite",
        }
    }
}

pub struct ScorecardCheck {
    suite: ScorecardSuite,
    sdk: Arc<dyn OperatorSdk>,
    config: ScorecardConfig,
}

impl ScorecardCheck {
    pub fn new(suite: ScorecardSuite, sdk: Arc<dyn OperatorSdk>, config: ScorecardConfig) -> Self {
        Self { suite, sdk, config }
    }

    /// `ScorecardBasicSpecCheck`: every CR must have a spec block.
    pub fn basic_spec(sdk: Arc<dyn OperatorSdk>, config: &ScorecardConfig) -> Self {
        let suite = ScorecardSuite::basic_spec(config.basic_spec_artifact.clone());
        Self::new(suite, sdk, config.clone())
    }

    /// `ScorecardOlmSuiteCheck`: the full OLM scorecard suite.
    pub fn olm_suite(sdk: Arc<dyn OperatorSdk>, config: &ScorecardConfig) -> Self {
        let suite = ScorecardSuite::olm_suite(config.olm_suite_artifact.clone());
        Self::new(suite, sdk, config.clone())
    }

    pub fn suite(&self) -> &ScorecardSuite {
        &self.suite
    }

    fn options(&self) -> ScorecardOptions {
        ScorecardOptions {
            selector: vec![self.suite.selector.to_string()],
            wait_time: self.config.wait_time(),
            namespace: self.config.namespace.clone(),
            service_account: self.config.service_account.clone(),
            kubeconfig: self.config.kubeconfig.clone(),
            output_file: Some(self.suite.result_file.clone()),
        }
    }
}

/// True iff every result in the report passed. Logs each result.
pub fn all_tests_passed(report: &ScorecardReport) -> bool {
    let mut passed = true;
    for result in report.results() {
        debug!(test = %result.name, state = %result.state, log = %result.log, "scorecard result");
        if result.state != ScorecardState::Pass {
            warn!(test = %result.name, state = %result.state, "scorecard test did not pass");
            for suggestion in &result.suggestions {
                info!(test = %result.name, "suggestion: {suggestion}");
            }
            passed = false;
        }
    }
    passed
}

#[async_trait]
impl Check for ScorecardCheck {
    fn name(&self) -> &'static str {
        self.suite.name
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            description: self.suite.description.to_string(),
            level: Level::Best,
            knowledge_base_url: KNOWLEDGE_BASE_URL.to_string(),
            check_url: self.suite.check_url.to_string(),
        }
    }

    fn help(&self, outcome: &Outcome) -> HelpText {
        if outcome.is_fatal() {
            return HelpText {
                message: FATAL_MESSAGE.to_string(),
                suggestion: FATAL_SUGGESTION.to_string(),
            };
        }
        HelpText {
            message: format!(
                "Check {} encountered an error. Please review the {} file in your execution artifacts for more information.",
                self.suite.name, self.suite.result_file
            ),
            suggestion: self.suite.suggestion.clone(),
        }
    }

    async fn validate(&self, image: &ImageReference) -> Result<bool, CheckError> {
        debug!(check = self.suite.name, image = %image.image_uri, "running operator-sdk scorecard check");

        let report = self
            .sdk
            .scorecard(image.fs_path(), &self.options())
            .await
            .map_err(CheckError::Scorecard)?;

        Ok(all_tests_passed(&report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::testing::StubSdk;
    use crate::operator_sdk::scorecard::ScorecardResult;
    use std::path::PathBuf;

    fn report(states: &[ScorecardState]) -> ScorecardReport {
        ScorecardReport::from_results(
            states
                .iter()
                .enumerate()
                .map(|(i, s)| ScorecardResult::new(format!("test-{i}"), *s, "log")),
        )
    }

    fn image() -> ImageReference {
        ImageReference::new("quay.io/example/bundle:v1", "/tmp/bundle")
    }

    #[test]
    fn all_pass_is_pass() {
        assert!(all_tests_passed(&report(&[ScorecardState::Pass; 5])));
    }

    #[test]
    fn empty_report_is_pass() {
        assert!(all_tests_passed(&ScorecardReport::default()));
    }

    #[test]
    fn single_fail_or_error_fails_everything() {
        let mut states = vec![ScorecardState::Pass; 9];
        states.push(ScorecardState::Fail);
        assert!(!all_tests_passed(&report(&states)));

        assert!(!all_tests_passed(&report(&[
            ScorecardState::Error,
            ScorecardState::Pass
        ])));
    }

    #[tokio::test]
    async fn basic_spec_single_passing_result() {
        let sdk = Arc::new(StubSdk::scorecard(ScorecardReport::from_results([
            ScorecardResult::new("x", ScorecardState::Pass, ""),
        ])));
        let check = ScorecardCheck::basic_spec(sdk.clone(), &ScorecardConfig::default());

        assert!(check.validate(&image()).await.unwrap());

        let calls = sdk.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("/tmp/bundle"));
        assert_eq!(calls[0].1.selector, vec!["test=basic-check-spec-test"]);
        assert_eq!(
            calls[0].1.output_file.as_deref(),
            Some("operator_bundle_scorecard_BasicSpecCheck.json")
        );
    }

    #[tokio::test]
    async fn olm_suite_uses_suite_selector_and_config() {
        let sdk = Arc::new(StubSdk::scorecard(report(&[ScorecardState::Fail])));
        let config = ScorecardConfig {
            namespace: "certify".into(),
            wait_time_secs: 90,
            ..Default::default()
        };
        let check = ScorecardCheck::olm_suite(sdk.clone(), &config);

        assert!(!check.validate(&image()).await.unwrap());

        let calls = sdk.calls.lock().unwrap();
        assert_eq!(calls[0].1.selector, vec!["suite=olm"]);
        assert_eq!(calls[0].1.namespace, "certify");
        assert_eq!(calls[0].1.wait_time.as_secs(), 90);
        assert_eq!(
            calls[0].1.output_file.as_deref(),
            Some("operator_bundle_scorecard_OlmSuiteCheck.json")
        );
    }

    #[tokio::test]
    async fn runner_failure_is_an_error_not_a_verdict() {
        let check = ScorecardCheck::basic_spec(Arc::new(StubSdk::failing()), &ScorecardConfig::default());
        let err = check.validate(&image()).await.unwrap_err();
        assert!(matches!(err, CheckError::Scorecard(_)));
    }

    #[tokio::test]
    async fn fatal_outcome_always_yields_fatal_help() {
        let check = ScorecardCheck::olm_suite(Arc::new(StubSdk::failing()), &ScorecardConfig::default());
        let outcome: Outcome = check.validate(&image()).await.into();

        for _ in 0..3 {
            let help = check.help(&outcome);
            assert_eq!(help.message, FATAL_MESSAGE);
            assert_eq!(help.suggestion, FATAL_SUGGESTION);
        }
    }

    #[test]
    fn failed_verdict_help_points_at_artifact() {
        let check = ScorecardCheck::basic_spec(Arc::new(StubSdk::failing()), &ScorecardConfig::default());
        let help = check.help(&Outcome::Verdict(false));
        assert_eq!(
            help.message,
            "Check ScorecardBasicSpecCheck encountered an error. Please review the \
             operator_bundle_scorecard_BasicSpecCheck.json file in your execution artifacts for more information."
        );
        assert_eq!(help.suggestion, "Make sure that all CRs have a spec block");

        let olm = ScorecardCheck::olm_suite(Arc::new(StubSdk::failing()), &ScorecardConfig::default());
        assert_eq!(
            olm.help(&Outcome::Verdict(false)).suggestion,
            "See scorecard output for details, artifacts/operator_bundle_scorecard_OlmSuiteCheck.json"
        );
    }

    #[test]
    fn metadata_is_static() {
        let check = ScorecardCheck::olm_suite(Arc::new(StubSdk::failing()), &ScorecardConfig::default());
        let meta = check.metadata();
        assert_eq!(check.name(), "ScorecardOlmSuiteCheck");
        assert_eq!(meta.level, Level::Best);
        assert_eq!(meta.description, "Operator-sdk scorecard OLM Test Suite Check");
        assert!(meta.check_url.ends_with("#olm-test-suite"));
        assert_eq!(meta, check.metadata());
    }
}
