//! Simple readability metrics for polished sections.

use serde::Serialize;

use crate::normalize::paragraphs;

const MIN_LENGTH: usize = 200;
const MAX_AVG_PARAGRAPH: f64 = 400.0;
const MIN_SENTENCES: usize = 5;

/// A problem flagged by [`TextQuality::assess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssue {
    TooShort,
    LongParagraphs,
    FewSentences,
}

impl std::fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::TooShort => "too short",
            Self::LongParagraphs => "paragraphs too long",
            Self::FewSentences => "too few sentences",
        })
    }
}

/// Character-based metrics for one block of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextQuality {
    pub length: usize,
    pub paragraph_count: usize,
    pub avg_paragraph_length: f64,
    pub sentence_count: usize,
    pub issues: Vec<QualityIssue>,
}

impl TextQuality {
    pub fn assess(text: &str) -> Self {
        let length = text.chars().count();
        let lens: Vec<usize> = paragraphs(text).map(|p| p.chars().count()).collect();
        let avg_paragraph_length = if lens.is_empty() {
            0.0
        } else {
            lens.iter().sum::<usize>() as f64 / lens.len() as f64
        };
        let sentence_count = text
            .chars()
            .filter(|c| matches!(c, '.' | '!' | '?' | '。' | '！' | '？'))
            .count();

        let mut issues = Vec::new();
        if length < MIN_LENGTH {
            issues.push(QualityIssue::TooShort);
        }
        if avg_paragraph_length > MAX_AVG_PARAGRAPH {
            issues.push(QualityIssue::LongParagraphs);
        }
        if sentence_count < MIN_SENTENCES {
            issues.push(QualityIssue::FewSentences);
        }

        Self {
            length,
            paragraph_count: lens.len(),
            avg_paragraph_length,
            sentence_count,
            issues,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_flagged() {
        let q = TextQuality::assess("Just one line.");
        assert_eq!(q.paragraph_count, 1);
        assert_eq!(q.sentence_count, 1);
        assert!(q.issues.contains(&QualityIssue::TooShort));
        assert!(q.issues.contains(&QualityIssue::FewSentences));
        assert!(!q.is_clean());
    }

    #[test]
    fn healthy_text_is_clean() {
        let text = vec!["Adoption keeps growing across every region we looked at."; 6].join("\n\n");
        let q = TextQuality::assess(&text);
        assert_eq!(q.paragraph_count, 6);
        assert_eq!(q.sentence_count, 6);
        assert!(q.is_clean(), "unexpected issues: {:?}", q.issues);
    }

    #[test]
    fn long_paragraphs_are_flagged() {
        let para = "word ".repeat(100);
        let q = TextQuality::assess(&para);
        assert!(q.avg_paragraph_length > 400.0);
        assert!(q.issues.contains(&QualityIssue::LongParagraphs));
    }

    #[test]
    fn empty_text_has_zero_average() {
        let q = TextQuality::assess("");
        assert_eq!(q.paragraph_count, 0);
        assert_eq!(q.avg_paragraph_length, 0.0);
    }
}
