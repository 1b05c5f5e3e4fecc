//! External process execution.
//!
//! This module provides the [`Launcher`] used by pipeline stages and target
//! providers, along with the [`Cancellation`] token that can abort a launch.

pub mod cancel;
pub mod launcher;
pub mod types;

pub use cancel::Cancellation;
pub use launcher::Launcher;
pub use types::{LaunchError, LaunchOutput, OutputSink, OutputStream};
