//! Storage module for run results.

mod format;
mod run;

pub use format::{RunFormat, RunHeader};
pub use run::RunRecord;
