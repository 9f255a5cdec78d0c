//! Document export for finished reports.
//!
//! Each output format is an [`Exporter`]. The [`ExporterRegistry`] maps
//! requested format identifiers onto exporters and writes one file per
//! format, isolating failures so one broken format never blocks the others.

mod json;
mod markdown;
mod registry;
mod rtf;

use std::path::Path;

use reportgen_shared::{ExportFormat, ExportedFile, ReportError, ReportPayload, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

pub use json::JsonExporter;
pub use markdown::MarkdownExporter;
pub use registry::{ExportReport, ExporterRegistry, SkippedFormat, report_file_name};
pub use rtf::RichTextExporter;

/// Generator name recorded in exported metadata.
pub const GENERATOR: &str = "reportgen";

/// Serializes a report payload into one document format.
pub trait Exporter: Send + Sync {
    fn format(&self) -> ExportFormat;

    /// File extension without the dot.
    fn extension(&self) -> &'static str {
        self.format().extension()
    }

    /// Produce the document body. `out_dir` is where the file will live, so
    /// chart links can be made relative to it.
    fn render(&self, payload: &ReportPayload, out_dir: &Path) -> Result<String>;

    /// Render and write the document to `path` atomically.
    fn write(&self, payload: &ReportPayload, path: &Path) -> Result<ExportedFile> {
        let out_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let content = self.render(payload, out_dir)?;
        write_atomic(path, &content)?;

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let sha256 = format!("{:x}", hasher.finalize());

        debug!(path = %path.display(), size = content.len(), format = %self.format(), "wrote export");

        Ok(ExportedFile {
            format: self.format(),
            path: path.to_path_buf(),
            sha256,
            size_bytes: content.len(),
        })
    }
}

/// Write through a hidden temp file in the same directory, then rename.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ReportError::validation(format!("invalid export path {}", path.display())))?;
    let temp = parent.join(format!(".{filename}.tmp"));

    std::fs::write(&temp, content).map_err(|e| ReportError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| ReportError::io(path, e))?;
    Ok(())
}

/// Chart path as seen from `out_dir`, with forward slashes.
pub(crate) fn relative_link(path: &Path, out_dir: &Path) -> String {
    path.strip_prefix(out_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
