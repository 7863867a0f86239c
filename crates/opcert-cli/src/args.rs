use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use opcert_core::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "opcert",
    version,
    about = "Certification checks for Kubernetes operator bundles"
)]
pub struct Args {
    /// Operator bundle image under test
    pub image: String,

    /// Directory holding the unpacked bundle contents
    #[arg(long)]
    pub bundle_path: PathBuf,

    /// JSON config file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to kubeconfig file
    #[arg(long, env = "PFLT_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace the scorecard tests run in
    #[arg(long, env = "PFLT_NAMESPACE")]
    pub namespace: Option<String>,

    /// Service account the scorecard tests run as
    #[arg(long, env = "PFLT_SERVICEACCOUNT")]
    pub service_account: Option<String>,

    /// Seconds to wait for scorecard tests to finish
    #[arg(long, env = "PFLT_SCORECARD_WAIT_TIME")]
    pub scorecard_wait_time: Option<u64>,

    /// Directory that receives report artifacts
    #[arg(long, env = "PFLT_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// Certification catalog host
    #[arg(long, env = "PFLT_PYXIS_HOST")]
    pub pyxis_host: Option<String>,

    /// API token for the certification catalog
    #[arg(long, env = "PFLT_PYXIS_API_TOKEN", hide_env_values = true)]
    pub pyxis_api_token: Option<String>,

    /// Path to the operator-sdk binary
    #[arg(long)]
    pub operator_sdk: Option<PathBuf>,

    /// Seconds after which a single check is abandoned
    #[arg(long)]
    pub check_timeout: Option<u64>,

    /// Output format
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Optional git commit hash for tool metadata
    #[arg(long)]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(kubeconfig) = &self.kubeconfig {
            config.scorecard.kubeconfig = Some(kubeconfig.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.scorecard.namespace = namespace.clone();
        }
        if let Some(sa) = &self.service_account {
            config.scorecard.service_account = sa.clone();
        }
        if let Some(secs) = self.scorecard_wait_time {
            config.scorecard.wait_time_secs = secs;
        }
        if let Some(dir) = &self.artifacts {
            config.artifacts_dir = dir.clone();
        }
        if let Some(host) = &self.pyxis_host {
            config.pyxis.host = host.clone();
        }
        if let Some(token) = &self.pyxis_api_token {
            config.pyxis.api_key = Some(token.clone());
        }
        if let Some(bin) = &self.operator_sdk {
            config.operator_sdk_bin = bin.clone();
        }
        if let Some(secs) = self.check_timeout {
            config.check_timeout_secs = Some(secs);
        }

        Ok(config)
    }
}
