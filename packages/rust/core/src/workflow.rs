//! Per-run workflow state and run results.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use reportgen_shared::{
    ChartRequest, ExportFormat, ExportedFile, Outline, RenderedChart, ReportKind, RunId,
    SectionOutput,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Log entries returned by [`SystemStatus`].
pub const RECENT_LOG_ENTRIES: usize = 10;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Outline,
    Content,
    Polish,
    Charts,
    Export,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Outline,
        Stage::Content,
        Stage::Polish,
        Stage::Charts,
        Stage::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outline => "outline",
            Self::Content => "content",
            Self::Polish => "polish",
            Self::Charts => "charts",
            Self::Export => "export",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completion flag per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    pub outline: bool,
    pub content: bool,
    pub polish: bool,
    pub charts: bool,
    pub export: bool,
}

impl StageFlags {
    pub fn get(&self, stage: Stage) -> bool {
        match stage {
            Stage::Outline => self.outline,
            Stage::Content => self.content,
            Stage::Polish => self.polish,
            Stage::Charts => self.charts,
            Stage::Export => self.export,
        }
    }

    fn set(&mut self, stage: Stage) {
        match stage {
            Stage::Outline => self.outline = true,
            Stage::Content => self.content = true,
            Stage::Polish => self.polish = true,
            Stage::Charts => self.charts = true,
            Stage::Export => self.export = true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// Which stages finished plus an append-only event log.
///
/// Flags only move from `false` to `true`; only [`WorkflowState::reset`]
/// clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    flags: StageFlags,
    log: Vec<LogEntry>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(&mut self, stage: Stage) {
        self.flags.set(stage);
        self.record(format!("{stage} stage complete"));
    }

    pub fn is_complete(&self, stage: Stage) -> bool {
        self.flags.get(stage)
    }

    pub fn flags(&self) -> StageFlags {
        self.flags
    }

    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "workflow event");
        self.log.push(LogEntry {
            at: Utc::now(),
            message,
        });
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// The last `n` log entries, oldest first.
    pub fn recent(&self, n: usize) -> &[LogEntry] {
        &self.log[self.log.len().saturating_sub(n)..]
    }

    pub fn reset(&mut self) {
        self.flags = StageFlags::default();
        self.log.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// Everything a run produced. Returned by value, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub topic: String,
    pub kind: ReportKind,
    pub outline: Outline,
    pub sections: SectionOutput,
    pub charts: Vec<ChartRequest>,
    pub chart_files: Vec<RenderedChart>,
    /// Format → written file.
    pub exported: BTreeMap<ExportFormat, PathBuf>,
    /// Checksummed records for `exported`.
    pub export_files: Vec<ExportedFile>,
    pub workflow: WorkflowState,
    pub elapsed_ms: u64,
}

impl RunResult {
    pub(crate) fn started(run_id: RunId, topic: &str, kind: ReportKind) -> Self {
        Self {
            run_id,
            status: RunStatus::Success,
            error: None,
            topic: topic.to_string(),
            kind,
            outline: Outline::default(),
            sections: SectionOutput::new(),
            charts: Vec::new(),
            chart_files: Vec::new(),
            exported: BTreeMap::new(),
            export_files: Vec::new(),
            workflow: WorkflowState::new(),
            elapsed_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Snapshot of the coordinator for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub flags: StageFlags,
    pub recent_log: Vec<LogEntry>,
    pub stages: Vec<&'static str>,
    pub service: String,
    pub output_dir: PathBuf,
}
