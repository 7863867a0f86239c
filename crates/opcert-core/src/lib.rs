pub mod artifacts;
pub mod check;
pub mod config;
pub mod engine;
pub mod image;
pub mod operator_sdk;
pub mod pyxis;
pub mod results;

pub const TOOL_NAME: &str = "opcert";

/// Version of the `results.json` layout.
/// This must be bumped only when the serialized shape of `Results` changes.
pub const RESULTS_SCHEMA_VERSION: &str = "0.1.0";
