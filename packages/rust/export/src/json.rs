//! JSON report writer.

use std::path::Path;

use chrono::Utc;
use reportgen_shared::{ExportFormat, ReportError, ReportPayload, Result};
use serde::Serialize;

use crate::{Exporter, GENERATOR};

#[derive(Serialize)]
struct Document<'a> {
    metadata: Metadata<'a>,
    content: &'a ReportPayload,
}

#[derive(Serialize)]
struct Metadata<'a> {
    title: &'a str,
    kind: &'static str,
    created_at: String,
    generator: &'static str,
    version: &'static str,
}

/// Writes `{metadata, content}` with the full payload as content.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn render(&self, payload: &ReportPayload, _out_dir: &Path) -> Result<String> {
        let doc = Document {
            metadata: Metadata {
                title: &payload.title,
                kind: payload.kind.as_str(),
                created_at: Utc::now().to_rfc3339(),
                generator: GENERATOR,
                version: env!("CARGO_PKG_VERSION"),
            },
            content: payload,
        };

        let mut json = serde_json::to_string_pretty(&doc)
            .map_err(|e| ReportError::validation(format!("failed to serialize report: {e}")))?;
        json.push('\n');
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::payload;

    #[test]
    fn wraps_payload_with_metadata() {
        let out = Path::new("/reports");
        let json = JsonExporter.render(&payload(out), out).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metadata"]["title"], "Grid Storage");
        assert_eq!(value["metadata"]["kind"], "technical");
        assert_eq!(value["metadata"]["generator"], "reportgen");
        assert!(value["metadata"]["created_at"].is_string());
        assert!(value["metadata"]["version"].is_string());
        assert_eq!(value["content"]["sections"][1]["title"], "Conclusions");
        assert_eq!(value["content"]["charts"][0]["kind"], "bar");
    }
}
