//! Run configuration.
//!
//! Every host name, artifact filename and wait time a check needs lives here
//! and is handed to constructors, so tests can inject their own values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PYXIS_HOST: &str = "catalog.redhat.com/api/containers";
pub const DEFAULT_RESULTS_FILENAME: &str = "results.json";
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
pub const DEFAULT_OPERATOR_SDK_BIN: &str = "operator-sdk";
pub const SCORECARD_BASIC_SPEC_RESULT: &str = "operator_bundle_scorecard_BasicSpecCheck.json";
pub const SCORECARD_OLM_SUITE_RESULT: &str = "operator_bundle_scorecard_OlmSuiteCheck.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub pyxis: PyxisConfig,
    pub scorecard: ScorecardConfig,
    pub artifacts_dir: PathBuf,
    pub results_filename: String,
    pub operator_sdk_bin: PathBuf,
    /// Upper bound for a single check. `None` leaves each check to its own limits.
    pub check_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pyxis: PyxisConfig::default(),
            scorecard: ScorecardConfig::default(),
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            results_filename: DEFAULT_RESULTS_FILENAME.to_string(),
            operator_sdk_bin: PathBuf::from(DEFAULT_OPERATOR_SDK_BIN),
            check_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn check_timeout(&self) -> Option<Duration> {
        self.check_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PyxisConfig {
    pub host: String,
    pub scheme: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PyxisConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PYXIS_HOST.to_string(),
            scheme: "https".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl PyxisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScorecardConfig {
    pub namespace: String,
    pub service_account: String,
    pub kubeconfig: Option<PathBuf>,
    pub wait_time_secs: u64,
    pub basic_spec_artifact: String,
    pub olm_suite_artifact: String,
}

impl Default for ScorecardConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            service_account: "default".to_string(),
            kubeconfig: None,
            wait_time_secs: 240,
            basic_spec_artifact: SCORECARD_BASIC_SPEC_RESULT.to_string(),
            olm_suite_artifact: SCORECARD_OLM_SUITE_RESULT.to_string(),
        }
    }
}

impl ScorecardConfig {
    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_secs)
    }
}
