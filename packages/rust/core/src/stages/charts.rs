//! Chart-selection stage: find visualizable concepts and render them.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use reportgen_charts::ChartRenderer;
use reportgen_llm::GenerationService;
use reportgen_shared::{
    ChartKind, ChartRequest, RenderedChart, ReportError, Result, Section, SectionOutput,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::pipeline::ProgressReporter;
use crate::prompts;
use crate::workflow::Stage;

/// Priority used when a descriptor omits it.
pub const DEFAULT_PRIORITY: u8 = 3;

/// Fallback requests allowed per section.
pub const MAX_FALLBACK_PER_SECTION: usize = 3;

/// English phrases matched on word boundaries, case-insensitively.
const LATIN_KEYWORDS: [(&str, ChartKind); 9] = [
    ("bar chart", ChartKind::Bar),
    ("bar graph", ChartKind::Bar),
    ("line chart", ChartKind::Line),
    ("trend", ChartKind::Line),
    ("pie chart", ChartKind::Pie),
    ("proportion", ChartKind::Pie),
    ("scatter", ChartKind::Scatter),
    ("correlation", ChartKind::Scatter),
    ("table", ChartKind::Table),
];

/// CJK phrases matched as plain substrings.
const CJK_KEYWORDS: [(&str, ChartKind); 9] = [
    ("柱状图", ChartKind::Bar),
    ("条形图", ChartKind::Bar),
    ("折线图", ChartKind::Line),
    ("趋势", ChartKind::Line),
    ("饼图", ChartKind::Pie),
    ("占比", ChartKind::Pie),
    ("散点图", ChartKind::Scatter),
    ("相关性", ChartKind::Scatter),
    ("表格", ChartKind::Table),
];

pub struct ChartStage {
    service: Arc<dyn GenerationService>,
    renderer: Arc<dyn ChartRenderer>,
    max_output: u32,
    max_charts: usize,
}

impl ChartStage {
    pub const NAME: &'static str = "charts";

    pub fn new(
        service: Arc<dyn GenerationService>,
        renderer: Arc<dyn ChartRenderer>,
        max_output: u32,
        max_charts: usize,
    ) -> Self {
        Self {
            service,
            renderer,
            max_output,
            max_charts,
        }
    }

    /// Ask for chart descriptors per section and keep the highest-priority
    /// `max_charts`. Never fails: unusable replies contribute nothing or fall
    /// back to a keyword scan.
    #[instrument(skip_all, fields(sections = sections.len()))]
    pub async fn select_charts(
        &self,
        sections: &SectionOutput,
        progress: &dyn ProgressReporter,
    ) -> Vec<ChartRequest> {
        let total = sections.len();
        let mut requests = Vec::new();

        for (index, section) in sections.iter().enumerate() {
            let found = self.requests_for(section).await;
            debug!(section = %section.title, found = found.len(), "chart candidates");
            requests.extend(found);
            progress.section_done(Stage::Charts, &section.title, index + 1, total);
        }

        // Stable: equal priorities keep section order.
        requests.sort_by(|a, b| b.priority.cmp(&a.priority));
        requests.truncate(self.max_charts);

        info!(selected = requests.len(), "chart selection complete");
        requests
    }

    async fn requests_for(&self, section: &Section) -> Vec<ChartRequest> {
        if section.content.trim().is_empty() {
            return Vec::new();
        }

        let prompt = prompts::chart_prompt(&section.title, &section.content);
        let reply = match self.service.generate(&prompt, self.max_output).await.into_result() {
            Ok(text) => text,
            Err(e) => {
                warn!(section = %section.title, error = %e, "chart analysis failed, skipping section");
                return Vec::new();
            }
        };

        match parse_descriptors(&reply) {
            Some(items) => items
                .iter()
                .filter_map(|item| validate_descriptor(item, &section.title))
                .collect(),
            None => {
                warn!(section = %section.title, "chart reply was not JSON, scanning section text");
                keyword_fallback(section)
            }
        }
    }

    /// Render each request into `dir`. One failed render does not affect the
    /// others; if requests existed and none rendered, the stage fails.
    #[instrument(skip_all, fields(requests = requests.len(), dir = %dir.display()))]
    pub fn render_charts(&self, requests: &[ChartRequest], dir: &Path) -> Result<Vec<RenderedChart>> {
        let mut rendered = Vec::new();

        for request in requests {
            match self.renderer.render(request, dir) {
                Ok(Some(path)) => rendered.push(RenderedChart {
                    title: request.title.clone(),
                    kind: request.kind,
                    path,
                }),
                Ok(None) => {
                    debug!(kind = %request.kind, title = %request.title, "renderer produced nothing");
                }
                Err(e) => {
                    warn!(title = %request.title, error = %e, "chart render failed");
                }
            }
        }

        if !requests.is_empty() && rendered.is_empty() {
            return Err(ReportError::unavailable(format!(
                "none of {} chart requests could be rendered",
                requests.len()
            )));
        }

        info!(rendered = rendered.len(), "charts rendered");
        Ok(rendered)
    }
}

/// Locate and parse a JSON array in a reply that may wrap it in a code fence
/// or prose. A lone object counts as a one-element array.
pub fn parse_descriptors(reply: &str) -> Option<Vec<Value>> {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex")
    });

    let trimmed = reply.trim();
    let mut candidates: Vec<&str> = vec![trimmed];
    if let Some(caps) = FENCE_RE.captures(trimmed) {
        if let Some(inner) = caps.get(1) {
            candidates.push(inner.as_str());
        }
    }
    if let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    candidates.into_iter().find_map(|c| match serde_json::from_str::<Value>(c) {
        Ok(Value::Array(items)) => Some(items),
        Ok(obj @ Value::Object(_)) => Some(vec![obj]),
        _ => None,
    })
}

fn non_empty_str<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Turn one descriptor into a request, or `None` if it lacks a supported
/// kind, a title, or a description.
pub fn validate_descriptor(item: &Value, source_section: &str) -> Option<ChartRequest> {
    let kind = non_empty_str(item, "chart_type")
        .or_else(|| non_empty_str(item, "type"))
        .and_then(|k| k.parse::<ChartKind>().ok())?;
    let title = non_empty_str(item, "title")?;
    let description = non_empty_str(item, "description")?;

    let priority = match item.get("priority") {
        Some(Value::Number(n)) => n.as_f64().map(|p| p.round() as i64),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .map_or(DEFAULT_PRIORITY, |p| p.clamp(1, 5) as u8);

    Some(ChartRequest {
        kind,
        title: title.to_string(),
        description: description.to_string(),
        data_concept: non_empty_str(item, "data_concept").map(str::to_string),
        source_section: source_section.to_string(),
        priority,
    })
}

/// Requests inferred from chart vocabulary in the section text, one per
/// kind, at most [`MAX_FALLBACK_PER_SECTION`].
pub fn keyword_fallback(section: &Section) -> Vec<ChartRequest> {
    static LATIN_RES: LazyLock<Vec<(Regex, &'static str, ChartKind)>> = LazyLock::new(|| {
        LATIN_KEYWORDS
            .iter()
            .map(|(kw, kind)| {
                let re = Regex::new(&format!(r"(?i)\b{}s?\b", regex::escape(kw))).expect("valid regex");
                (re, *kw, *kind)
            })
            .collect()
    });

    let text = &section.content;
    let hits = LATIN_RES
        .iter()
        .filter(|(re, _, _)| re.is_match(text))
        .map(|(_, kw, kind)| (*kw, *kind))
        .chain(
            CJK_KEYWORDS
                .iter()
                .filter(|(kw, _)| text.contains(kw))
                .copied(),
        );

    let mut requests: Vec<ChartRequest> = Vec::new();
    for (keyword, kind) in hits {
        if requests.len() == MAX_FALLBACK_PER_SECTION {
            break;
        }
        if requests.iter().any(|r| r.kind == kind) {
            continue;
        }
        requests.push(ChartRequest {
            kind,
            title: format!("{}: {kind} chart", section.title),
            description: format!("Suggested by the mention of \"{keyword}\" in this section"),
            data_concept: None,
            source_section: section.title.clone(),
            priority: DEFAULT_PRIORITY,
        });
    }
    requests
}
