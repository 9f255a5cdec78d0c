//! Format lookup and per-format export isolation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reportgen_shared::{ErrorKind, ExportFormat, ExportedFile, ReportError, ReportPayload};
use tracing::{debug, instrument, warn};

use crate::{Exporter, JsonExporter, MarkdownExporter, RichTextExporter};

/// A requested format that produced no file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFormat {
    /// The identifier as requested.
    pub id: String,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Outcome of exporting one payload to several formats.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub files: Vec<ExportedFile>,
    pub skipped: Vec<SkippedFormat>,
}

impl ExportReport {
    /// True when formats were requested and none produced a file.
    pub fn all_failed(&self) -> bool {
        self.files.is_empty() && !self.skipped.is_empty()
    }

    fn skip(&mut self, id: &str, err: &ReportError) {
        warn!(format = %id, kind = %err.kind(), error = %err, "export format skipped");
        self.skipped.push(SkippedFormat {
            id: id.to_string(),
            kind: err.kind(),
            reason: err.to_string(),
        });
    }
}

/// `report_<YYYYmmdd_HHMMSS>.<ext>`
pub fn report_file_name(at: &DateTime<Utc>, extension: &str) -> String {
    format!("report_{}.{extension}", at.format("%Y%m%d_%H%M%S"))
}

/// First free path for a report file: the plain name, then `_1`, `_2`, ...
/// suffixes so runs finishing in the same second never overwrite each other.
fn unused_report_path(out_dir: &Path, at: &DateTime<Utc>, extension: &str) -> PathBuf {
    let path = out_dir.join(report_file_name(at, extension));
    if !path.exists() {
        return path;
    }

    let stamp = at.format("%Y%m%d_%H%M%S");
    (1..)
        .map(|n| out_dir.join(format!("report_{stamp}_{n}.{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(path)
}

/// Exporters keyed by format.
pub struct ExporterRegistry {
    exporters: BTreeMap<ExportFormat, Box<dyn Exporter>>,
}

impl ExporterRegistry {
    /// A registry with no exporters.
    pub fn empty() -> Self {
        Self {
            exporters: BTreeMap::new(),
        }
    }

    /// Markdown, JSON, and rich text.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(MarkdownExporter));
        registry.register(Box::new(JsonExporter));
        registry.register(Box::new(RichTextExporter));
        registry
    }

    /// Add an exporter, replacing any existing one for the same format.
    pub fn register(&mut self, exporter: Box<dyn Exporter>) {
        self.exporters.insert(exporter.format(), exporter);
    }

    pub fn remove(&mut self, format: ExportFormat) -> Option<Box<dyn Exporter>> {
        self.exporters.remove(&format)
    }

    pub fn get(&self, format: ExportFormat) -> Option<&dyn Exporter> {
        self.exporters.get(&format).map(|e| e.as_ref())
    }

    pub fn formats(&self) -> Vec<ExportFormat> {
        self.exporters.keys().copied().collect()
    }

    /// Write `payload` once per requested format identifier into `out_dir`.
    ///
    /// Unknown identifiers, formats without an exporter, and write failures
    /// are recorded in [`ExportReport::skipped`]; the remaining formats are
    /// still attempted. Identifiers naming an already exported format are
    /// ignored.
    #[instrument(skip_all, fields(out_dir = %out_dir.display(), requested = ids.len()))]
    pub fn export(&self, payload: &ReportPayload, ids: &[String], out_dir: &Path) -> ExportReport {
        let mut report = ExportReport::default();
        let mut done: Vec<ExportFormat> = Vec::new();

        for id in ids {
            let format = match id.parse::<ExportFormat>() {
                Ok(f) => f,
                Err(e) => {
                    report.skip(id, &e);
                    continue;
                }
            };

            if done.contains(&format) {
                debug!(format = %id, "duplicate export format ignored");
                continue;
            }
            done.push(format);

            let Some(exporter) = self.get(format) else {
                report.skip(id, &ReportError::unavailable(format!("{format} exporter")));
                continue;
            };

            let path = unused_report_path(out_dir, &payload.generated_at, exporter.extension());
            match exporter.write(payload, &path) {
                Ok(file) => report.files.push(file),
                Err(e) => report.skip(id, &e),
            }
        }

        report
    }
}

impl Default for ExporterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{payload, temp_dir};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn file_name_uses_timestamp() {
        let p = payload(Path::new("/x"));
        assert_eq!(report_file_name(&p.generated_at, "md"), "report_20240517_093005.md");
    }

    #[test]
    fn exports_every_registered_format() {
        let dir = temp_dir();
        let registry = ExporterRegistry::with_defaults();
        let report = registry.export(&payload(&dir), &ids(&["markdown", "json", "docx"]), &dir);

        assert_eq!(report.files.len(), 3);
        assert!(report.skipped.is_empty());
        assert!(dir.join("report_20240517_093005.md").exists());
        assert!(dir.join("report_20240517_093005.json").exists());
        assert!(dir.join("report_20240517_093005.rtf").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_exporter_is_skipped_others_succeed() {
        let dir = temp_dir();
        let mut registry = ExporterRegistry::with_defaults();
        registry.remove(ExportFormat::RichText);

        let report = registry.export(&payload(&dir), &ids(&["richtext", "markdown"]), &dir);

        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].format, ExportFormat::Markdown);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].kind, ErrorKind::CapabilityUnavailable);
        assert!(!report.all_failed());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_identifier_is_configuration_invalid() {
        let dir = temp_dir();
        let registry = ExporterRegistry::with_defaults();
        let report = registry.export(&payload(&dir), &ids(&["pdf"]), &dir);

        assert!(report.files.is_empty());
        assert_eq!(report.skipped[0].id, "pdf");
        assert_eq!(report.skipped[0].kind, ErrorKind::ConfigurationInvalid);
        assert!(report.all_failed());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn aliases_of_same_format_write_once() {
        let dir = temp_dir();
        let registry = ExporterRegistry::with_defaults();
        let report = registry.export(&payload(&dir), &ids(&["md", "markdown"]), &dir);
        assert_eq!(report.files.len(), 1);
        assert!(report.skipped.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn write_failure_is_isolated() {
        let dir = temp_dir();
        let missing = dir.join("does-not-exist");
        let registry = ExporterRegistry::with_defaults();
        let report = registry.export(&payload(&dir), &ids(&["json"]), &missing);

        assert!(report.files.is_empty());
        assert_eq!(report.skipped[0].kind, ErrorKind::Io);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn same_second_exports_do_not_overwrite() {
        let dir = temp_dir();
        let registry = ExporterRegistry::with_defaults();
        let first = registry.export(&payload(&dir), &ids(&["markdown"]), &dir);
        let second = registry.export(&payload(&dir), &ids(&["markdown"]), &dir);

        assert_eq!(first.files[0].path, dir.join("report_20240517_093005.md"));
        assert_eq!(second.files[0].path, dir.join("report_20240517_093005_1.md"));
        assert!(first.files[0].path.exists() && second.files[0].path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn no_formats_requested_is_not_a_failure() {
        let dir = temp_dir();
        let report = ExporterRegistry::empty().export(&payload(&dir), &[], &dir);
        assert!(!report.all_failed());
        std::fs::remove_dir_all(&dir).ok();
    }
}
