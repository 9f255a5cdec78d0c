//! Content stage: one body text per outline entry.

use std::sync::Arc;

use reportgen_llm::GenerationService;
use reportgen_shared::{Outline, ReportError, ReportKind, Result, SectionOutput, Topic};
use reportgen_text::normalize_section_text;
use tracing::{debug, info, instrument, warn};

use crate::context::ContextWindow;
use crate::pipeline::ProgressReporter;
use crate::prompts;
use crate::workflow::Stage;

pub struct ContentStage {
    service: Arc<dyn GenerationService>,
    max_output: u32,
    target_length: usize,
}

impl ContentStage {
    pub const NAME: &'static str = "content";

    pub fn new(service: Arc<dyn GenerationService>, max_output: u32, target_length: usize) -> Self {
        Self {
            service,
            max_output,
            target_length,
        }
    }

    /// Write every section in outline order.
    ///
    /// Section *i* is prompted with summaries of sections `0..i` only. A
    /// failed or empty generation is replaced by [`fallback_section`].
    #[instrument(skip_all, fields(topic = %topic, sections = outline.len()))]
    pub async fn build_sections(
        &self,
        outline: &Outline,
        topic: &Topic,
        kind: ReportKind,
        progress: &dyn ProgressReporter,
    ) -> Result<SectionOutput> {
        if outline.is_empty() {
            return Err(ReportError::validation("cannot write sections for an empty outline"));
        }

        let total = outline.len();
        let mut sections = SectionOutput::with_capacity(total);
        let mut context = ContextWindow::for_sections();
        let mut fallbacks = 0usize;

        for (index, title) in outline.iter().enumerate() {
            let prompt =
                prompts::section_prompt(topic, kind, outline, index, &context, self.target_length);

            let text = match self.service.generate(&prompt, self.max_output).await.into_result() {
                Ok(raw) => {
                    let normalized = normalize_section_text(&raw);
                    if normalized.is_empty() {
                        warn!(section = %title, "section generation returned no text, using fallback");
                        fallbacks += 1;
                        fallback_section(title, topic)
                    } else {
                        self.check_length(title, &normalized);
                        normalized
                    }
                }
                Err(e) => {
                    warn!(section = %title, kind = %e.kind(), error = %e, "section generation failed, using fallback");
                    fallbacks += 1;
                    fallback_section(title, topic)
                }
            };

            context.push(title.clone(), &text);
            sections.push(title.clone(), text);
            progress.section_done(Stage::Content, title, index + 1, total);
        }

        if !sections.matches_outline(outline) {
            return Err(ReportError::validation("section titles diverged from the outline"));
        }

        info!(sections = sections.len(), fallbacks, "content ready");
        Ok(sections)
    }

    /// Log sections far from the target length.
    fn check_length(&self, title: &str, text: &str) {
        let len = text.chars().count();
        let target = self.target_length;
        if len * 2 < target {
            warn!(section = %title, len, target, "section is short");
        } else if len > target * 2 {
            warn!(section = %title, len, target, "section is long");
        } else {
            debug!(section = %title, len, "section length ok");
        }
    }
}

/// Single-paragraph stand-in for a section that could not be generated.
pub fn fallback_section(title: &str, topic: &Topic) -> String {
    format!(
        "The section \"{title}\" of the report on {topic} could not be generated \
         automatically and should be completed in a later revision."
    )
}
