//! Display formatting for terminal output
//!
//! Provides the artifact listing and the progress bars drawn during long
//! running phases.

pub mod artifact;
pub mod progress;

pub use artifact::{format_age, format_artifact_list, format_size};
pub use progress::{PhaseProgress, ProgressReporter};
