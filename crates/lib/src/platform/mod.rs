//! Host platform integration: per-user paths and runtimes.

pub mod paths;
pub mod runtime;

pub use runtime::{HostRuntime, Runtime};
