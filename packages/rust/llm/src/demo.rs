//! Offline backend returning canned replies.
//!
//! Lets the whole pipeline run without network access. Replies are picked by
//! looking at the shape of the prompt, so they stay plausible for every stage.

use async_trait::async_trait;

use crate::backend::{ChatBackend, CompletionRequest};
use crate::error::BackendError;

/// Deterministic stand-in for a real model.
#[derive(Debug, Clone, Default)]
pub struct DemoBackend;

impl DemoBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Value of the first `Label: value` line in the prompt.
fn labelled<'a>(prompt: &'a str, label: &str) -> Option<&'a str> {
    prompt.lines().find_map(|line| {
        line.trim()
            .strip_prefix(label)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}

/// Text between the last pair of `"""` fences.
fn quoted_block(prompt: &str) -> Option<&str> {
    let end = prompt.rfind("\"\"\"")?;
    let start = prompt[..end].rfind("\"\"\"")?;
    Some(prompt[start + 3..end].trim())
}

fn outline_reply(topic: &str) -> String {
    [
        format!("1. Introduction to {topic}"),
        format!("2. Background of {topic}"),
        format!("3. Current Landscape of {topic}"),
        format!("4. Core Methods Behind {topic}"),
        format!("5. Applications of {topic}"),
        format!("6. Open Challenges for {topic}"),
        "7. Conclusion".to_string(),
    ]
    .join("\n")
}

fn section_reply(topic: &str, section: &str) -> String {
    format!(
        "{section} is a central part of understanding {topic}. Practitioners have spent \
         the last decade refining how it is measured and applied. Adoption has grown \
         steadily, with a clear upward trend in investment across regions.\n\n\
         Several factors shape this area. Cost, maturity of tooling, and regulatory \
         clarity all influence how quickly organizations move. Comparing the leading \
         approaches shows trade-offs between speed of delivery and long-term \
         maintainability.\n\n\
         Looking ahead, {section} will keep evolving as {topic} matures. Teams that \
         invest early in shared standards are likely to benefit most."
    )
}

fn chart_reply(section: &str) -> String {
    serde_json::json!([
        {
            "chart_type": "bar",
            "title": format!("{section}: adoption by region"),
            "description": format!("Relative adoption levels discussed in {section}"),
            "data_concept": "adoption share per region",
            "priority": 3
        }
    ])
    .to_string()
}

#[async_trait]
impl ChatBackend for DemoBackend {
    fn name(&self) -> &str {
        "demo"
    }

    fn model(&self) -> &str {
        "demo"
    }

    async fn complete(&self, req: &CompletionRequest<'_>) -> Result<String, BackendError> {
        let prompt = req.prompt;
        let lower = prompt.to_lowercase();
        let topic = labelled(prompt, "Topic").unwrap_or("the subject");
        let section = labelled(prompt, "Section").unwrap_or("This section");

        let reply = if let Some(text) = quoted_block(prompt).filter(|_| lower.contains("polish")) {
            text.to_string()
        } else if lower.contains("json array") {
            chart_reply(section)
        } else if lower.contains("outline") && lower.contains("numbered") {
            outline_reply(topic)
        } else {
            section_reply(topic, section)
        };

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ask(prompt: &str) -> String {
        DemoBackend::new()
            .complete(&CompletionRequest {
                system: "",
                prompt,
                max_tokens: 100,
                temperature: 0.0,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn outline_prompt_gets_numbered_list() {
        let reply = ask("Topic: Battery Recycling\nProduce a numbered outline.").await;
        assert!(reply.starts_with("1. Introduction to Battery Recycling"));
        assert_eq!(reply.lines().count(), 7);
    }

    #[tokio::test]
    async fn polish_prompt_echoes_quoted_text() {
        let reply = ask("Polish the text below.\n\"\"\"\nRaw draft.\n\"\"\"").await;
        assert_eq!(reply, "Raw draft.");
    }

    #[tokio::test]
    async fn chart_prompt_returns_json_array() {
        let reply = ask("Section: Market Size\nReply with a JSON array of charts.").await;
        let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(parsed[0]["chart_type"], "bar");
        assert!(parsed[0]["title"].as_str().unwrap().contains("Market Size"));
    }

    #[tokio::test]
    async fn content_prompt_mentions_topic_and_section() {
        let reply = ask("Topic: Solar Power\nSection: Costs\nWrite this section.").await;
        assert!(reply.contains("Solar Power"));
        assert!(reply.starts_with("Costs"));
    }
}
