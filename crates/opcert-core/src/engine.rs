//! Runs a set of checks against one image and buckets their verdicts.
//!
//! Checks run concurrently on the tokio runtime. Each is bounded by the
//! optional per-check timeout; when it expires the check's future is dropped,
//! which kills any child process it spawned, and the check is reported as
//! errored rather than failed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::check::{
    CertifiedImagesCheck, Check, CheckError, Outcome, ScorecardCheck, ValidateOperatorBundleCheck,
};
use crate::config::Config;
use crate::image::ImageReference;
use crate::operator_sdk::OperatorSdk;
use crate::pyxis::PyxisClient;
use crate::results::{CheckResult, CheckResults};

pub struct Engine {
    checks: Vec<Arc<dyn Check>>,
    check_timeout: Option<Duration>,
}

impl Engine {
    pub fn new(checks: Vec<Arc<dyn Check>>, check_timeout: Option<Duration>) -> Self {
        Self {
            checks,
            check_timeout,
        }
    }

    /// The standard operator battery.
    pub fn operator_checks(
        config: &Config,
        sdk: Arc<dyn OperatorSdk>,
        pyxis: Arc<PyxisClient>,
    ) -> Self {
        let checks: Vec<Arc<dyn Check>> = vec![
            Arc::new(ValidateOperatorBundleCheck::new(sdk.clone())),
            Arc::new(ScorecardCheck::basic_spec(sdk.clone(), &config.scorecard)),
            Arc::new(ScorecardCheck::olm_suite(sdk, &config.scorecard)),
            Arc::new(CertifiedImagesCheck::new(pyxis)),
        ];
        Self::new(checks, config.check_timeout())
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    pub async fn run(&self, image: &ImageReference) -> CheckResults {
        let image = Arc::new(image.clone());
        info!(image = %image.image_uri, checks = self.checks.len(), "executing checks");

        let handles: Vec<_> = self
            .checks
            .iter()
            .map(|check| {
                let check = Arc::clone(check);
                let image = Arc::clone(&image);
                let limit = self.check_timeout;
                tokio::spawn(async move {
                    let started = Instant::now();
                    let result = match limit {
                        Some(limit) => tokio::time::timeout(limit, check.validate(&image))
                            .await
                            .unwrap_or(Err(CheckError::Timeout(limit))),
                        None => check.validate(&image).await,
                    };
                    (result, started.elapsed())
                })
            })
            .collect();

        let mut results = CheckResults::default();
        for (check, handle) in self.checks.iter().zip(handles) {
            let (outcome, elapsed) = match handle.await {
                Ok((result, elapsed)) => (Outcome::from(result), elapsed),
                Err(join) => (
                    Outcome::Infra(CheckError::Panicked(join.to_string())),
                    Duration::ZERO,
                ),
            };
            record(&mut results, check.as_ref(), outcome, elapsed);
        }
        results
    }
}

fn record(results: &mut CheckResults, check: &dyn Check, outcome: Outcome, elapsed: Duration) {
    let mut result = CheckResult {
        name: check.name().to_string(),
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        metadata: check.metadata(),
        help: None,
        error: None,
    };

    match &outcome {
        Outcome::Verdict(true) => {
            info!(check = check.name(), "check passed");
            results.passed.push(result);
        }
        Outcome::Verdict(false) => {
            warn!(check = check.name(), "check failed");
            result.help = Some(check.help(&outcome));
            results.failed.push(result);
        }
        Outcome::Infra(err) => {
            error!(check = check.name(), error = %err, "check could not run");
            result.help = Some(check.help(&outcome));
            result.error = Some(err.to_string());
            results.errors.push(result);
        }
    }
}
