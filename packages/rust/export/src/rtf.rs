//! Rich text (RTF) report writer.
//!
//! Word processors open RTF directly, so this covers the "word document"
//! export without pulling in an OOXML writer.

use std::fmt::Write as _;
use std::path::Path;

use reportgen_shared::{ExportFormat, ReportPayload, Result};
use reportgen_text::paragraphs;

use crate::Exporter;

/// Writes a title, table of contents, and one heading plus paragraphs per
/// section.
#[derive(Debug, Clone, Copy, Default)]
pub struct RichTextExporter;

/// Escape RTF control characters and encode non-ASCII as `\uN?`.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\line "),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    // RTF takes signed 16-bit code units.
                    let _ = write!(out, "\\u{}?", *unit as i16);
                }
            }
        }
    }
    out
}

impl Exporter for RichTextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::RichText
    }

    fn render(&self, payload: &ReportPayload, _out_dir: &Path) -> Result<String> {
        let mut rtf = String::new();
        rtf.push_str("{\\rtf1\\ansi\\deff0\n{\\fonttbl{\\f0\\fswiss Helvetica;}}\n");

        let _ = writeln!(rtf, "{{\\pard\\qc\\b\\fs40 {}\\b0\\par}}", escape(&payload.title));
        let _ = writeln!(
            rtf,
            "{{\\pard\\qc\\fs20 Generated: {}\\par}}",
            payload.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        if !payload.outline.is_empty() {
            rtf.push_str("{\\pard\\sb240\\b\\fs28 Table of Contents\\b0\\par}\n");
            for (i, title) in payload.outline.iter().enumerate() {
                let _ = writeln!(rtf, "{{\\pard\\fs22 {}. {}\\par}}", i + 1, escape(title));
            }
        }

        for section in &payload.sections {
            let _ = writeln!(
                rtf,
                "{{\\pard\\sb360\\b\\fs28 {}\\b0\\par}}",
                escape(&section.title)
            );
            for paragraph in paragraphs(&section.content) {
                let _ = writeln!(rtf, "{{\\pard\\sa120\\fs22 {}\\par}}", escape(paragraph));
            }
        }

        rtf.push_str("}\n");
        Ok(rtf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::payload;

    #[test]
    fn escapes_control_and_unicode() {
        assert_eq!(escape("a{b}\\c"), "a\\{b\\}\\\\c");
        assert_eq!(escape("é"), "\\u233?");
        assert_eq!(escape("能"), format!("\\u{}?", '能' as u32 as u16 as i16));
    }

    #[test]
    fn renders_sections_as_headings_and_paragraphs() {
        let out = Path::new("/reports");
        let rtf = RichTextExporter.render(&payload(out), out).unwrap();

        assert!(rtf.starts_with("{\\rtf1"));
        assert!(rtf.trim_end().ends_with('}'));
        assert!(rtf.contains("Grid Storage"));
        assert!(rtf.contains("Table of Contents"));
        assert!(rtf.contains("1. Overview"));
        assert!(rtf.contains("{\\pard\\sa120\\fs22 First paragraph.\\par}"));
        assert!(rtf.contains("{\\pard\\sa120\\fs22 Second paragraph.\\par}"));
    }
}
