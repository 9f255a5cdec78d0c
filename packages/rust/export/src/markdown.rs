//! Markdown report writer.

use std::fmt::Write as _;
use std::path::Path;

use reportgen_shared::{ExportFormat, ReportPayload, Result};

use crate::{Exporter, GENERATOR, relative_link};

/// Writes `# title`, metadata, a numbered table of contents, one `##` heading
/// per section, and a chart appendix.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn render(&self, payload: &ReportPayload, out_dir: &Path) -> Result<String> {
        let mut md = String::new();

        let _ = writeln!(md, "# {}\n", payload.title);
        let _ = writeln!(
            md,
            "**Generated**: {}  ",
            payload.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(md, "**Report type**: {}  ", payload.kind);
        let _ = writeln!(md, "**Generator**: {GENERATOR} {}\n", env!("CARGO_PKG_VERSION"));

        if !payload.outline.is_empty() {
            md.push_str("## Table of Contents\n\n");
            for (i, title) in payload.outline.iter().enumerate() {
                let _ = writeln!(md, "{}. {title}", i + 1);
            }
            md.push('\n');
        }

        for section in &payload.sections {
            let _ = writeln!(md, "## {}\n", section.title);
            let body = section.content.trim();
            if !body.is_empty() {
                let _ = writeln!(md, "{body}\n");
            }
        }

        if !payload.charts.is_empty() {
            md.push_str("## Appendix: Charts\n\n");
            for chart in &payload.charts {
                let _ = writeln!(md, "### {}\n", chart.title);
                let _ = writeln!(
                    md,
                    "![{}]({})\n",
                    chart.title,
                    relative_link(&chart.path, out_dir)
                );
            }
        }

        let trimmed = md.trim_end().len();
        md.truncate(trimmed);
        md.push('\n');
        Ok(md)
    }
}
