//! Polish stage: rewrite each section for flow and consistency.

use std::sync::Arc;

use reportgen_llm::GenerationService;
use reportgen_shared::{ReportError, Result, SectionOutput};
use reportgen_text::{TextQuality, normalize_section_text, rewrap_long_paragraphs};
use tracing::{debug, info, instrument, warn};

use crate::context::ContextWindow;
use crate::pipeline::ProgressReporter;
use crate::prompts;
use crate::workflow::Stage;

/// Paragraphs longer than this are split after polishing.
pub const MAX_PARAGRAPH_CHARS: usize = 500;

/// Target size of the pieces a long paragraph is split into.
pub const REWRAP_TARGET_CHARS: usize = 300;

pub struct PolishStage {
    service: Arc<dyn GenerationService>,
    max_output: u32,
}

impl PolishStage {
    pub const NAME: &'static str = "polish";

    pub fn new(service: Arc<dyn GenerationService>, max_output: u32) -> Self {
        Self {
            service,
            max_output,
        }
    }

    /// Rewrite every non-empty section, keeping titles and order.
    ///
    /// A section whose rewrite fails keeps its current text. If every
    /// non-empty section fails the stage returns a service-unreachable error.
    #[instrument(skip_all, fields(sections = sections.len()))]
    pub async fn polish(
        &self,
        sections: &SectionOutput,
        progress: &dyn ProgressReporter,
    ) -> Result<SectionOutput> {
        let mut polished = sections.clone();
        let mut style = ContextWindow::style_reference();
        let total = sections.len();
        let mut attempted = 0usize;
        let mut failed = 0usize;

        for (index, section) in sections.iter().enumerate() {
            if section.content.trim().is_empty() {
                debug!(section = %section.title, "empty section passed through");
                progress.section_done(Stage::Polish, &section.title, index + 1, total);
                continue;
            }
            attempted += 1;

            let prompt = prompts::polish_prompt(&section.title, &section.content, &style);
            let rewritten = match self.service.generate(&prompt, self.max_output).await.into_result()
            {
                Ok(raw) => {
                    let text = rewrap_long_paragraphs(
                        &normalize_section_text(&raw),
                        MAX_PARAGRAPH_CHARS,
                        REWRAP_TARGET_CHARS,
                    );
                    (!text.is_empty()).then_some(text)
                }
                Err(e) => {
                    warn!(section = %section.title, kind = %e.kind(), error = %e, "polish failed, keeping text");
                    None
                }
            };

            match rewritten {
                Some(text) => {
                    let quality = TextQuality::assess(&text);
                    debug!(
                        section = %section.title,
                        length = quality.length,
                        paragraphs = quality.paragraph_count,
                        sentences = quality.sentence_count,
                        avg_paragraph = quality.avg_paragraph_length,
                        "polished section"
                    );
                    if !quality.is_clean() {
                        let issues: Vec<String> =
                            quality.issues.iter().map(ToString::to_string).collect();
                        warn!(section = %section.title, issues = %issues.join(", "), "quality issues after polish");
                    }
                    style.push(section.title.clone(), &text);
                    polished.set_content(index, text);
                }
                None => {
                    failed += 1;
                    style.push(section.title.clone(), &section.content);
                }
            }

            progress.section_done(Stage::Polish, &section.title, index + 1, total);
        }

        if attempted > 0 && failed == attempted {
            return Err(ReportError::ServiceUnreachable(format!(
                "polish failed for all {attempted} sections"
            )));
        }

        info!(polished = attempted - failed, failed, "polish complete");
        Ok(polished)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::pipeline::SilentProgress;
    use reportgen_llm::Generation;
    use reportgen_shared::ErrorKind;

    /// Replays scripted replies in order and records prompts.
    struct Scripted {
        replies: Mutex<Vec<Generation>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Generation>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl GenerationService for Scripted {
        async fn generate(&self, prompt: &str, _max_output: u32) -> Generation {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Generation::placeholder(ErrorKind::ServiceUnreachable, "empty script"))
        }
    }

    fn sections() -> SectionOutput {
        let mut s = SectionOutput::new();
        s.push("Overview", "Draft one.");
        s.push("Details", "Draft two.");
        s.push("Wrap-up", "Draft three.");
        s
    }

    fn down() -> Generation {
        Generation::placeholder(ErrorKind::ServiceUnreachable, "down")
    }

    #[tokio::test]
    async fn failed_section_keeps_its_text() {
        let service = Arc::new(Scripted::new(vec![
            Generation::model("Polished one."),
            down(),
            Generation::model("Polished three."),
        ]));
        let stage = PolishStage::new(service, 1500);
        let out = stage.polish(&sections(), &SilentProgress).await.unwrap();

        assert_eq!(out.get("Overview"), Some("Polished one."));
        assert_eq!(out.get("Details"), Some("Draft two."));
        assert_eq!(out.get("Wrap-up"), Some("Polished three."));
        assert_eq!(out.titles().collect::<Vec<_>>(), sections().titles().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn all_failures_report_service_unreachable() {
        let service = Arc::new(Scripted::new(vec![down(), down(), down()]));
        let err = PolishStage::new(service, 1500)
            .polish(&sections(), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceUnreachable);
    }

    #[tokio::test]
    async fn empty_sections_pass_through_untouched() {
        let mut input = SectionOutput::new();
        input.push("Blank", "");
        input.push("Body", "Draft.");
        let service = Arc::new(Scripted::new(vec![Generation::model("Better.")]));
        let out = PolishStage::new(service.clone(), 1500)
            .polish(&input, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(out.get("Blank"), Some(""));
        assert_eq!(out.get("Body"), Some("Better."));
        assert_eq!(service.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn style_reference_uses_previous_polished_text() {
        let service = Arc::new(Scripted::new(vec![
            Generation::model("Alpha polished."),
            Generation::model("Beta polished."),
            Generation::model("Gamma polished."),
        ]));
        PolishStage::new(service.clone(), 1500)
            .polish(&sections(), &SilentProgress)
            .await
            .unwrap();

        let prompts = service.prompts.lock().unwrap();
        assert!(!prompts[0].contains("Match the style"));
        assert!(prompts[2].contains("Alpha polished. Beta polished."));
    }

    #[tokio::test]
    async fn cjk_reply_gets_one_paragraph_per_sentence() {
        let long = "这是一个用于测试的中文句子内容。".repeat(40);
        let service = Arc::new(Scripted::new(vec![Generation::model(long)]));
        let mut input = SectionOutput::new();
        input.push("Body", "Draft.");
        let out = PolishStage::new(service, 1500)
            .polish(&input, &SilentProgress)
            .await
            .unwrap();

        let text = out.get("Body").unwrap();
        let parts: Vec<&str> = reportgen_text::paragraphs(text).collect();
        assert_eq!(parts.len(), 40);
        assert!(parts.iter().all(|p| *p == "这是一个用于测试的中文句子内容。"));
    }
}
