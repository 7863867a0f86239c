use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opcert_core::artifacts;
use opcert_core::engine::Engine;
use opcert_core::image::ImageReference;
use opcert_core::operator_sdk::OperatorSdkCli;
use opcert_core::pyxis::PyxisClient;
use opcert_core::results::{Results, TestLibrary, render};

mod args;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = args::Args::parse();
    let config = args.config()?;

    let test_library = TestLibrary {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: args.commit.clone(),
    };
    let image = ImageReference::new(&args.image, &args.bundle_path);

    let sdk = Arc::new(OperatorSdkCli::new(
        &config.operator_sdk_bin,
        &config.artifacts_dir,
    ));
    let http = reqwest::Client::builder()
        .timeout(config.pyxis.timeout())
        .build()
        .context("failed to build HTTP client")?;
    let pyxis = Arc::new(PyxisClient::new(&config.pyxis, Arc::new(http)));

    let engine = Engine::operator_checks(&config, sdk, pyxis);
    let checks = engine.run(&image).await;
    let results = Results::new(test_library, &image, checks);

    let json = serde_json::to_string_pretty(&results)?;
    let written = artifacts::write_artifact(
        &config.artifacts_dir,
        &config.results_filename,
        json.as_bytes(),
    )
    .context("failed to write results artifact")?;
    info!(path = %written.path.display(), sha256 = %written.hash.value, "wrote results");

    let output = match args.format {
        args::OutputFormat::Json => json,
        args::OutputFormat::Text => render::render_text(&results),
    };

    match args.out {
        Some(path) => std::fs::write(path, &output)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }

    std::process::exit(results.exit_code());
}
