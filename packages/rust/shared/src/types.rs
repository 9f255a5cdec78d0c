//! Core domain types for reportgen runs.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReportError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// The subject of a report. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Build a topic, rejecting empty or whitespace-only input.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ReportError::config("topic must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ReportKind
// ---------------------------------------------------------------------------

/// Report flavour. Selects prompt templates only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    Research,
    Business,
    Technical,
    Academic,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Research,
        ReportKind::Business,
        ReportKind::Technical,
        ReportKind::Academic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Business => "business",
            Self::Technical => "technical",
            Self::Academic => "academic",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| {
                ReportError::config(format!(
                    "unsupported report kind '{s}': expected research, business, technical, or academic"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// Ordered section titles. Unique by position, not necessarily by text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outline(Vec<String>);

impl Outline {
    pub fn new(titles: Vec<String>) -> Self {
        Self(titles)
    }

    pub fn titles(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Outline {
    fn from(titles: Vec<String>) -> Self {
        Self(titles)
    }
}

impl<'a> IntoIterator for &'a Outline {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// SectionOutput
// ---------------------------------------------------------------------------

/// A generated section: outline title plus body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
}

/// Generated text per outline position, in outline order.
///
/// Entries are appended by the content stage and may be overwritten in place
/// by the polish stage. Nothing removes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionOutput(Vec<Section>);

impl SectionOutput {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.0.push(Section {
            title: title.into(),
            content: content.into(),
        });
    }

    /// Content of the first section with this title.
    pub fn get(&self, title: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.content.as_str())
    }

    pub fn get_at(&self, index: usize) -> Option<&Section> {
        self.0.get(index)
    }

    /// Replace the content at `index`, keeping the title. Returns `false` if
    /// the index is out of range.
    pub fn set_content(&mut self, index: usize, content: impl Into<String>) -> bool {
        match self.0.get_mut(index) {
            Some(section) => {
                section.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.title.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the titles are exactly the outline entries, position by position.
    pub fn matches_outline(&self, outline: &Outline) -> bool {
        self.len() == outline.len() && self.titles().zip(outline.iter()).all(|(a, b)| a == b)
    }
}

impl<'a> IntoIterator for &'a SectionOutput {
    type Item = &'a Section;
    type IntoIter = std::slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Chart kinds understood by the renderer capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
    Histogram,
    Box,
    Heatmap,
    Table,
}

impl ChartKind {
    pub const ALL: [ChartKind; 8] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Scatter,
        ChartKind::Histogram,
        ChartKind::Box,
        ChartKind::Heatmap,
        ChartKind::Table,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
            Self::Scatter => "scatter",
            Self::Histogram => "histogram",
            Self::Box => "box",
            Self::Heatmap => "heatmap",
            Self::Table => "table",
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| ReportError::validation(format!("unsupported chart kind '{s}'")))
    }
}

/// A request to visualize something found in a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub title: String,
    pub description: String,
    /// Free-text description of the data the chart would show.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_concept: Option<String>,
    /// Title of the section the request came from.
    pub source_section: String,
    /// 1 (lowest) to 5 (highest).
    pub priority: u8,
}

/// A chart request that the renderer turned into a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedChart {
    pub title: String,
    pub kind: ChartKind,
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Output formats the export stage understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Json,
    RichText,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::RichText => "richtext",
        }
    }

    /// File extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::RichText => "rtf",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "richtext" | "rtf" | "docx" => Ok(Self::RichText),
            other => Err(ReportError::config(format!(
                "unsupported export format '{other}': expected markdown, json, or richtext"
            ))),
        }
    }
}

/// Metadata for a single exported file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub format: ExportFormat,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Everything an exporter needs to serialize a finished report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub title: String,
    pub kind: ReportKind,
    pub outline: Outline,
    pub sections: SectionOutput,
    #[serde(default)]
    pub charts: Vec<RenderedChart>,
    pub generated_at: DateTime<Utc>,
    pub processing_time_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_rejects_blank() {
        assert!(Topic::new("   ").is_err());
        assert_eq!(Topic::new("  Solar  ").unwrap().as_str(), "Solar");
    }

    #[test]
    fn topic_deserialization_validates() {
        let ok: Topic = serde_json::from_str(r#""Grid Storage""#).unwrap();
        assert_eq!(ok.as_str(), "Grid Storage");
        assert!(serde_json::from_str::<Topic>(r#""""#).is_err());
    }

    #[test]
    fn report_kind_parses_case_insensitively() {
        assert_eq!("Business".parse::<ReportKind>().unwrap(), ReportKind::Business);
        assert!("memo".parse::<ReportKind>().is_err());
        assert_eq!(ReportKind::default(), ReportKind::Research);
    }

    #[test]
    fn section_output_tracks_outline_order() {
        let outline = Outline::from(vec!["Intro".to_string(), "Body".to_string()]);
        let mut sections = SectionOutput::new();
        sections.push("Intro", "a");
        assert!(!sections.matches_outline(&outline));
        sections.push("Body", "b");
        assert!(sections.matches_outline(&outline));

        assert!(sections.set_content(1, "b2"));
        assert_eq!(sections.get("Body"), Some("b2"));
        assert!(!sections.set_content(5, "nope"));
    }

    #[test]
    fn duplicate_titles_keep_separate_positions() {
        let outline = Outline::from(vec!["Notes".to_string(), "Notes".to_string()]);
        let mut sections = SectionOutput::new();
        sections.push("Notes", "first");
        sections.push("Notes", "second");
        assert!(sections.matches_outline(&outline));
        assert_eq!(sections.get("Notes"), Some("first"));
        assert_eq!(sections.get_at(1).unwrap().content, "second");
    }

    #[test]
    fn chart_kind_parses_supported_set_only() {
        assert_eq!(" Pie ".parse::<ChartKind>().unwrap(), ChartKind::Pie);
        assert_eq!("heatmap".parse::<ChartKind>().unwrap(), ChartKind::Heatmap);
        assert!("flow".parse::<ChartKind>().is_err());
    }

    #[test]
    fn export_format_aliases() {
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("docx".parse::<ExportFormat>().unwrap(), ExportFormat::RichText);
        assert_eq!(ExportFormat::RichText.extension(), "rtf");
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn payload_serializes_sections_as_list() {
        let mut sections = SectionOutput::new();
        sections.push("Intro", "Hello.");
        let payload = ReportPayload {
            title: "Topic".into(),
            kind: ReportKind::Technical,
            outline: Outline::from(vec!["Intro".to_string()]),
            sections,
            charts: vec![],
            generated_at: Utc::now(),
            processing_time_secs: 1.5,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "technical");
        assert_eq!(json["sections"][0]["title"], "Intro");
        assert_eq!(json["outline"][0], "Intro");
    }
}
