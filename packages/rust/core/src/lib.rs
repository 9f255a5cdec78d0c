//! Core pipeline orchestration and domain logic for reportgen.
//!
//! This crate ties together outline planning, section writing, polishing,
//! chart selection, and export into a single run driven by
//! [`ReportCoordinator`].

pub mod context;
pub mod pipeline;
pub mod prompts;
pub mod stages;
pub mod workflow;

pub use context::{ContextEntry, ContextWindow};
pub use pipeline::{CHARTS_DIR, ProgressReporter, ReportCoordinator, RunRequest, SilentProgress};
pub use workflow::{LogEntry, RunResult, RunStatus, Stage, StageFlags, SystemStatus, WorkflowState};
