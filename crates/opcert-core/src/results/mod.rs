pub mod model;
pub mod render;

pub use model::{CheckResult, CheckResults, Results, TestLibrary};
