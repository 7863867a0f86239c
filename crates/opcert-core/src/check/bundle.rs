use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{Check, CheckError, HelpText, Level, Metadata, Outcome};
use crate::image::ImageReference;
use crate::operator_sdk::bundle::BundleValidateReport;
use crate::operator_sdk::{BundleValidateOptions, OperatorSdk};

const BUNDLE_DOCS_URL: &str = "https://sdk.operatorframework.io/docs/olm-integration/tutorial-bundle/";

/// Ensures the bundle passes `operator-sdk bundle validate`.
pub struct ValidateOperatorBundleCheck {
    sdk: Arc<dyn OperatorSdk>,
    options: BundleValidateOptions,
}

impl ValidateOperatorBundleCheck {
    pub fn new(sdk: Arc<dyn OperatorSdk>) -> Self {
        Self::with_options(sdk, BundleValidateOptions::default())
    }

    pub fn with_options(sdk: Arc<dyn OperatorSdk>, options: BundleValidateOptions) -> Self {
        Self { sdk, options }
    }
}

/// The verdict is the report's `passed` flag. Findings are logged whenever
/// the report failed or carried any output, but warnings on a passing report
/// do not fail it.
pub fn bundle_passed(report: &BundleValidateReport) -> bool {
    if !report.passed || !report.outputs.is_empty() {
        for output in &report.outputs {
            for issue in &output.errors {
                error!(bundle = %output.name, "validate operator bundle error: {issue}");
            }
            for issue in &output.warnings {
                info!(bundle = %output.name, "warning: {issue}");
            }
        }
    }
    report.passed
}

#[async_trait]
impl Check for ValidateOperatorBundleCheck {
    fn name(&self) -> &'static str {
        "ValidateOperatorBundle"
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            description: "Validating Bundle image that checks if it can validate the content and format of the operator bundle".to_string(),
            level: Level::Best,
            knowledge_base_url: BUNDLE_DOCS_URL.to_string(),
            check_url: BUNDLE_DOCS_URL.to_string(),
        }
    }

    fn help(&self, _outcome: &Outcome) -> HelpText {
        HelpText {
            message: "Check ValidateOperatorBundle encountered an error. Please review the preflight.log file for more information.".to_string(),
            suggestion: "Valid bundles are defined by bundle spec, so make sure that this bundle conforms to that spec. More Information: https://github.com/operator-framework/operator-registry/blob/master/docs/design/operator-bundle.md".to_string(),
        }
    }

    async fn validate(&self, image: &ImageReference) -> Result<bool, CheckError> {
        let report = self
            .sdk
            .bundle_validate(image.fs_path(), &self.options)
            .await
            .map_err(CheckError::BundleValidate)?;

        Ok(bundle_passed(&report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::testing::StubSdk;
    use crate::operator_sdk::bundle::{ManifestResult, ValidationIssue};

    fn image() -> ImageReference {
        ImageReference::new("quay.io/example/bundle:v1", "./testdata/all_namespaces")
    }

    fn with_findings(passed: bool) -> BundleValidateReport {
        BundleValidateReport {
            passed,
            outputs: vec![ManifestResult {
                name: "etcdoperator.v0.9.4".into(),
                errors: vec![ValidationIssue::new("owned CRD not found")],
                warnings: vec![ValidationIssue::new("minKubeVersion is not informed")],
            }],
        }
    }

    #[tokio::test]
    async fn passing_report_without_outputs_passes() {
        let check = ValidateOperatorBundleCheck::new(Arc::new(StubSdk::bundle(BundleValidateReport {
            passed: true,
            outputs: vec![],
        })));
        assert!(check.validate(&image()).await.unwrap());
    }

    #[tokio::test]
    async fn failing_report_fails_regardless_of_outputs() {
        let empty = ValidateOperatorBundleCheck::new(Arc::new(StubSdk::bundle(BundleValidateReport {
            passed: false,
            outputs: vec![],
        })));
        assert!(!empty.validate(&image()).await.unwrap());

        let noisy = ValidateOperatorBundleCheck::new(Arc::new(StubSdk::bundle(with_findings(false))));
        assert!(!noisy.validate(&image()).await.unwrap());
    }

    #[test]
    fn outputs_on_passing_report_are_logged_only() {
        assert!(bundle_passed(&with_findings(true)));
    }

    #[tokio::test]
    async fn invocation_failure_is_wrapped() {
        let check = ValidateOperatorBundleCheck::new(Arc::new(StubSdk::failing()));
        let err = check.validate(&image()).await.unwrap_err();
        assert!(matches!(err, CheckError::BundleValidate(_)));
        assert!(
            err.to_string()
                .starts_with("error while executing operator-sdk bundle validate")
        );
    }

    #[test]
    fn help_and_metadata() {
        let check = ValidateOperatorBundleCheck::new(Arc::new(StubSdk::failing()));
        assert_eq!(check.name(), "ValidateOperatorBundle");
        assert_eq!(check.metadata().check_url, BUNDLE_DOCS_URL);
        assert_eq!(
            check.help(&Outcome::Verdict(false)),
            check.help(&Outcome::Infra(CheckError::Panicked("x".into())))
        );
    }
}
