//! buildline-lib: phase-ordered build pipelines driven by external build tools.
//!
//! - `Pipeline`: ordered (phase, priority) stages, each wrapping a process
//! - `PipelineAddin`: per build-system contributor of stages
//! - `TargetProvider`: asynchronous discovery of runnable targets
//! - `BuildSession`: resolves a project and wires the above together

pub mod addin;
pub mod build_system;
pub mod consts;
pub mod execute;
pub mod pipeline;
pub mod platform;
pub mod session;
pub mod swift;
pub mod targets;
pub mod util;
