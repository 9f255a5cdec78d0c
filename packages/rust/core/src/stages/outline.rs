//! Outline stage: topic → ordered section titles.

use std::sync::Arc;

use reportgen_llm::GenerationService;
use reportgen_shared::{Outline, ReportError, ReportKind, Result, Topic};
use tracing::{debug, info, instrument, warn};

use crate::prompts;

/// Upper bound on outline entries.
pub const MAX_SECTIONS: usize = 10;

/// Fewer parsed titles than this triggers the default outline.
pub const MIN_SECTIONS: usize = 3;

/// Lines this short (in characters) are noise, not titles.
const MIN_TITLE_CHARS: usize = 4;

const INTRO_MARKERS: [&str; 6] = ["introduction", "overview", "intro", "引言", "概述", "导论"];
const CONCLUSION_MARKERS: [&str; 6] = ["conclusion", "summary", "outlook", "结论", "总结", "展望"];

const CLOSING_TITLE: &str = "Conclusions and Outlook";

pub struct OutlineStage {
    service: Arc<dyn GenerationService>,
    max_output: u32,
}

impl OutlineStage {
    pub const NAME: &'static str = "outline";

    pub fn new(service: Arc<dyn GenerationService>, max_output: u32) -> Self {
        Self {
            service,
            max_output,
        }
    }

    /// Generate, parse, and repair an outline for `topic`.
    ///
    /// Generation failures and unusable replies fall back to
    /// [`default_outline`].
    #[instrument(skip_all, fields(topic = %topic, kind = %kind))]
    pub async fn build_outline(&self, topic: &Topic, kind: ReportKind) -> Result<Outline> {
        let prompt = prompts::outline_prompt(topic, kind);
        let generation = self.service.generate(&prompt, self.max_output).await;

        let titles = match generation.into_result() {
            Ok(text) => {
                let parsed = parse_outline(&text);
                if parsed.len() < MIN_SECTIONS {
                    warn!(parsed = parsed.len(), "too few outline entries, using default outline");
                    default_outline(topic)
                } else {
                    parsed
                }
            }
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "outline generation failed, using default outline");
                default_outline(topic)
            }
        };

        let outline = repair_outline(titles, topic);
        check_bounds(&outline)?;

        info!(sections = outline.len(), "outline ready");
        Ok(outline)
    }

    /// Revise `outline` using free-text feedback.
    ///
    /// Returns the original outline unchanged when generation fails or the
    /// reply has too few usable titles.
    #[instrument(skip_all, fields(topic = %topic, sections = outline.len()))]
    pub async fn refine_outline(&self, topic: &Topic, outline: &Outline, feedback: &str) -> Outline {
        let prompt = prompts::refine_outline_prompt(topic, outline, feedback);
        let text = match self.service.generate(&prompt, self.max_output).await.into_result() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "outline refinement failed, keeping original");
                return outline.clone();
            }
        };

        let parsed = parse_outline(&text);
        if parsed.len() < MIN_SECTIONS {
            warn!(parsed = parsed.len(), "refined outline unusable, keeping original");
            return outline.clone();
        }

        let refined = repair_outline(parsed, topic);
        info!(sections = refined.len(), "outline refined");
        refined
    }
}

/// Split a reply into titles: strip numbering and bullets, drop short lines,
/// keep at most [`MAX_SECTIONS`].
pub fn parse_outline(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim_start_matches(|c: char| {
                c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | '-' | ')' | '*' | '#' | '•')
            })
            .trim()
        })
        .filter(|title| title.chars().count() >= MIN_TITLE_CHARS)
        .take(MAX_SECTIONS)
        .map(str::to_string)
        .collect()
}

/// Fixed eight-section outline used when generation gives nothing usable.
pub fn default_outline(topic: &Topic) -> Vec<String> {
    vec![
        format!("{topic} Overview"),
        format!("Background and Significance of {topic}"),
        format!("Current State of {topic}"),
        format!("Key Technologies and Methods of {topic}"),
        format!("Applications and Case Studies of {topic}"),
        format!("Challenges Facing {topic}"),
        format!("Future Trends in {topic}"),
        "Conclusions and Recommendations".to_string(),
    ]
}

fn contains_marker(title: &str, markers: &[&str]) -> bool {
    let lower = title.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Ensure an opening and a closing section exist and the length stays within
/// [`MAX_SECTIONS`]. Idempotent on an outline that already satisfies both.
pub fn repair_outline(mut titles: Vec<String>, topic: &Topic) -> Outline {
    if !titles.iter().any(|t| contains_marker(t, &INTRO_MARKERS)) {
        debug!("outline has no introduction, prepending overview");
        titles.insert(0, format!("{topic} Overview"));
    }
    if !titles.iter().any(|t| contains_marker(t, &CONCLUSION_MARKERS)) {
        debug!("outline has no conclusion, appending closing section");
        titles.push(CLOSING_TITLE.to_string());
    }

    while titles.len() > MAX_SECTIONS {
        // Drop from the end of the interior so the first and last survive.
        titles.remove(titles.len() - 2);
    }

    Outline::from(titles)
}

fn check_bounds(outline: &Outline) -> Result<()> {
    if !(MIN_SECTIONS..=MAX_SECTIONS).contains(&outline.len()) {
        return Err(ReportError::validation(format!(
            "outline has {} sections, expected {MIN_SECTIONS}..={MAX_SECTIONS}",
            outline.len()
        )));
    }
    Ok(())
}
