//! Boundary to the `operator-sdk` binary.
//!
//! Checks depend on the [`OperatorSdk`] trait only. [`OperatorSdkCli`] is the
//! production implementation: it shells out, bounds every invocation with a
//! timeout, and kills the child when the waiting future is dropped.

pub mod bundle;
pub mod scorecard;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::artifacts;
use bundle::{BundleValidateReport, JsonAlpha1Output};
use scorecard::ScorecardReport;

/// Extra time on top of the scorecard wait time before the process is killed.
const SCORECARD_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScorecardOptions {
    pub selector: Vec<String>,
    pub wait_time: Duration,
    pub namespace: String,
    pub service_account: String,
    pub kubeconfig: Option<PathBuf>,
    /// Filename under the artifacts directory that receives the raw report.
    pub output_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleValidateOptions {
    /// Passed as `--select-optional`, e.g. `suite=operatorframework`.
    pub select_optional: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum OperatorSdkError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{command} did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("i/o error while running {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {command} output: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait OperatorSdk: Send + Sync {
    async fn scorecard(
        &self,
        image_path: &Path,
        options: &ScorecardOptions,
    ) -> Result<ScorecardReport, OperatorSdkError>;

    async fn bundle_validate(
        &self,
        image_path: &Path,
        options: &BundleValidateOptions,
    ) -> Result<BundleValidateReport, OperatorSdkError>;
}

/// Runs the `operator-sdk` binary found at `binary`.
#[derive(Debug, Clone)]
pub struct OperatorSdkCli {
    binary: PathBuf,
    artifacts_dir: PathBuf,
}

impl OperatorSdkCli {
    pub fn new(binary: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Run the binary and return its stdout.
    ///
    /// Exit code 1 is accepted: both subcommands use it to mean "ran, but the
    /// subject failed", and still print a report.
    async fn run(
        &self,
        command: &str,
        args: Vec<OsString>,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, OperatorSdkError> {
        debug!(binary = %self.binary.display(), ?args, "running operator-sdk");

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OperatorSdkError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        let waited = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| OperatorSdkError::Timeout {
                    command: command.to_string(),
                    timeout: limit,
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| OperatorSdkError::Io {
            command: command.to_string(),
            source,
        })?;

        let accepted = output.status.success() || output.status.code() == Some(1);
        if !accepted || output.stdout.is_empty() {
            return Err(OperatorSdkError::Exit {
                command: command.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

fn scorecard_args(image_path: &Path, options: &ScorecardOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "scorecard".into(),
        "--output".into(),
        "json".into(),
        "--wait-time".into(),
        format!("{}s", options.wait_time.as_secs()).into(),
    ];
    for selector in &options.selector {
        args.push("--selector".into());
        args.push(selector.into());
    }
    if !options.namespace.is_empty() {
        args.push("--namespace".into());
        args.push(options.namespace.clone().into());
    }
    if !options.service_account.is_empty() {
        args.push("--service-account".into());
        args.push(options.service_account.clone().into());
    }
    if let Some(kubeconfig) = &options.kubeconfig {
        args.push("--kubeconfig".into());
        args.push(kubeconfig.into());
    }
    args.push(image_path.into());
    args
}

fn bundle_validate_args(image_path: &Path, options: &BundleValidateOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "bundle".into(),
        "validate".into(),
        image_path.into(),
        "--output".into(),
        "json-alpha1".into(),
    ];
    if let Some(selector) = &options.select_optional {
        args.push("--select-optional".into());
        args.push(selector.into());
    }
    args
}

#[async_trait]
impl OperatorSdk for OperatorSdkCli {
    async fn scorecard(
        &self,
        image_path: &Path,
        options: &ScorecardOptions,
    ) -> Result<ScorecardReport, OperatorSdkError> {
        let command = "operator-sdk scorecard";
        let limit = options.wait_time + SCORECARD_GRACE;
        let stdout = self
            .run(command, scorecard_args(image_path, options), Some(limit))
            .await?;

        if let Some(filename) = &options.output_file {
            let written = artifacts::write_artifact(&self.artifacts_dir, filename, &stdout)
                .map_err(|source| OperatorSdkError::Artifact {
                    path: self.artifacts_dir.join(filename),
                    source,
                })?;
            info!(path = %written.path.display(), sha256 = %written.hash.value, "wrote scorecard artifact");
        }

        ScorecardReport::parse(&stdout).map_err(|source| OperatorSdkError::Parse {
            command: command.to_string(),
            source,
        })
    }

    async fn bundle_validate(
        &self,
        image_path: &Path,
        options: &BundleValidateOptions,
    ) -> Result<BundleValidateReport, OperatorSdkError> {
        let command = "operator-sdk bundle validate";
        let stdout = self
            .run(command, bundle_validate_args(image_path, options), options.timeout)
            .await?;

        let raw: JsonAlpha1Output =
            serde_json::from_slice(&stdout).map_err(|source| OperatorSdkError::Parse {
                command: command.to_string(),
                source,
            })?;

        let bundle_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_path.display().to_string());
        Ok(raw.into_report(&bundle_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn scorecard_args_carry_selector_and_wait_time() {
        let options = ScorecardOptions {
            selector: vec!["suite=olm".into()],
            wait_time: Duration::from_secs(240),
            namespace: "certify".into(),
            service_account: "scorecard".into(),
            kubeconfig: Some(PathBuf::from("/home/u/.kube/config")),
            output_file: None,
        };
        let args = strings(scorecard_args(Path::new("/bundle"), &options));
        assert_eq!(
            args,
            vec![
                "scorecard",
                "--output",
                "json",
                "--wait-time",
                "240s",
                "--selector",
                "suite=olm",
                "--namespace",
                "certify",
                "--service-account",
                "scorecard",
                "--kubeconfig",
                "/home/u/.kube/config",
                "/bundle",
            ]
        );
    }

    #[test]
    fn empty_namespace_is_omitted() {
        let options = ScorecardOptions {
            selector: vec!["test=basic-check-spec-test".into()],
            wait_time: Duration::from_secs(5),
            ..Default::default()
        };
        let args = strings(scorecard_args(Path::new("b"), &options));
        assert!(!args.contains(&"--namespace".to_string()));
        assert!(!args.contains(&"--kubeconfig".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("b"));
    }

    #[test]
    fn bundle_validate_args_request_json_output() {
        let options = BundleValidateOptions {
            select_optional: Some("suite=operatorframework".into()),
            timeout: None,
        };
        let args = strings(bundle_validate_args(Path::new("/bundle"), &options));
        assert_eq!(
            args,
            vec![
                "bundle",
                "validate",
                "/bundle",
                "--output",
                "json-alpha1",
                "--select-optional",
                "suite=operatorframework",
            ]
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let sdk = OperatorSdkCli::new("/nonexistent/operator-sdk", "artifacts");
        let err = sdk
            .bundle_validate(Path::new("."), &BundleValidateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OperatorSdkError::Spawn { .. }), "got {err}");
    }
}
