//! Prompt templates for every generation call.
//!
//! Prompts always carry labelled `Topic:` / `Section:` lines so replies can be
//! traced back to their request in logs.

use std::fmt::Write as _;

use reportgen_shared::{Outline, ReportKind, Topic};

use crate::context::ContextWindow;

/// Structural guidance per report kind.
fn outline_guidance(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Research => {
            "This is a research report. Include an introduction, a review of prior work, \
             methodology, analysis, and a conclusion. Each title should be specific and the \
             structure should read like a rigorous research report."
        }
        ReportKind::Business => {
            "This is a business report for decision makers. Include an executive summary, \
             market analysis, competitive landscape, feasibility, and strategic \
             recommendations. Keep the structure easy to skim."
        }
        ReportKind::Technical => {
            "This is a technical report for engineers. Include technical background, \
             architecture, implementation approach, testing and validation, and best \
             practices. Each section should have technical depth."
        }
        ReportKind::Academic => {
            "This is an academic paper. Follow the standard structure: abstract, \
             introduction, related work, method, experiments, and conclusion, suitable for \
             a journal or conference."
        }
    }
}

fn writing_style(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Research => "analytical and evidence-based",
        ReportKind::Business => "concise and decision-oriented",
        ReportKind::Technical => "precise and implementation-focused",
        ReportKind::Academic => "formal and well-referenced",
    }
}

fn numbered(outline: &Outline, current: Option<usize>) -> String {
    let mut out = String::new();
    for (i, title) in outline.iter().enumerate() {
        let marker = if Some(i) == current { "  <- current section" } else { "" };
        let _ = writeln!(out, "{}. {title}{marker}", i + 1);
    }
    out
}

pub fn outline_prompt(topic: &Topic, kind: ReportKind) -> String {
    format!(
        "Create a detailed outline for a {kind} report.\n\
         Topic: {topic}\n\n\
         {}\n\n\
         Output the outline as a numbered list with one section title per line and \
         nothing else.",
        outline_guidance(kind)
    )
}

pub fn refine_outline_prompt(topic: &Topic, outline: &Outline, feedback: &str) -> String {
    format!(
        "Revise the report outline below based on the feedback.\n\
         Topic: {topic}\n\n\
         Current outline:\n{}\n\
         Feedback:\n{}\n\n\
         Output the revised outline as a numbered list with one section title per line.",
        numbered(outline, None),
        feedback.trim()
    )
}

/// Prompt for one section. `context` holds summaries of the sections written
/// before it, and nothing after it.
pub fn section_prompt(
    topic: &Topic,
    kind: ReportKind,
    outline: &Outline,
    index: usize,
    context: &ContextWindow,
    target_length: usize,
) -> String {
    let title = outline.titles().get(index).map(String::as_str).unwrap_or_default();
    let mut prompt = format!(
        "Write the body of one section of a {kind} report.\n\
         Topic: {topic}\n\
         Section: {title}\n\n\
         Requirements:\n\
         - Professional, accurate, and in depth\n\
         - Roughly {target_length} characters\n\
         - Clear structure and logical flow\n\
         - Concrete analysis and insight in a {} style\n\n\
         Report structure:\n{}",
        writing_style(kind),
        numbered(outline, Some(index))
    );

    if !context.is_empty() {
        let _ = write!(
            prompt,
            "\nSections already written:\n{}\n",
            context.summary_lines()
        );
    }

    prompt.push_str(
        "\nStay consistent with the rest of the report and avoid repeating earlier \
         sections. When citing data, say why its source matters. Reply with the section \
         text only, without the heading.",
    );
    prompt
}

pub fn polish_prompt(title: &str, text: &str, style: &ContextWindow) -> String {
    let mut prompt = format!(
        "Polish the section below so it reads fluently and professionally.\n\
         Section: {title}\n"
    );

    let reference = style.combined_text();
    if !reference.is_empty() {
        let _ = write!(
            prompt,
            "\nMatch the style of the preceding sections:\n{reference}\n"
        );
    }

    let _ = write!(
        prompt,
        "\nKeep every fact and the main points unchanged; improve flow, precision of \
         terminology, sentence variety, and transitions. Reply with the revised text only.\n\n\
         \"\"\"\n{}\n\"\"\"",
        text.trim()
    );
    prompt
}

pub fn chart_prompt(title: &str, text: &str) -> String {
    format!(
        "Identify data or concepts in this report section that would be clearer as a \
         chart.\n\
         Section: {title}\n\n\
         Section text:\n{}\n\n\
         Reply with a JSON array only. Each element has the fields \"chart_type\" (one of \
         bar, line, pie, scatter, histogram, box, heatmap, table), \"title\", \
         \"description\", \"data_concept\", and \"priority\" (1 to 5, 5 highest). Reply \
         with [] if nothing is worth visualizing.",
        text.trim()
    )
}
