pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{fit_ctf, fit_ctf_reported};
pub use types::{FitOutcome, FitStage, ProfileCurves, ProgressReporter};
