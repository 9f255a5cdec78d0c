//! Normalization passes and paragraph helpers.

use std::sync::LazyLock;

use regex::Regex;

/// Characters that end a sentence, in both Latin and CJK punctuation.
const SENTENCE_TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

const ELLIPSIS: &str = "...";

/// Run the full normalization pipeline on a generated section.
pub fn normalize_section_text(text: &str) -> String {
    let mut result = text.to_string();

    result = collapse_whitespace(&result);
    result = break_after_sentences(&result);
    result = drop_empty_paragraphs(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Collapse whitespace
// ---------------------------------------------------------------------------

/// Replace every whitespace run (newlines included) with a single space.
fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text.trim(), " ").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Sentence breaks
// ---------------------------------------------------------------------------

/// Turn sentence-ending punctuation into a paragraph break.
///
/// Latin `.!?` only count when followed by whitespace, which keeps decimals
/// such as `3.5` intact. Full-width `。！？` always end a sentence.
fn break_after_sentences(text: &str) -> String {
    static END_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"([.!?])\s+|([。！？])\s*").expect("valid regex")
    });

    END_RE.replace_all(text, "${1}${2}\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Drop empty paragraphs
// ---------------------------------------------------------------------------

fn drop_empty_paragraphs(text: &str) -> String {
    paragraphs(text).collect::<Vec<_>>().join("\n\n")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Non-empty, trimmed paragraphs separated by blank lines.
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n").map(str::trim).filter(|p| !p.is_empty())
}

/// Split into sentences, keeping each terminator with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        if SENTENCE_TERMINATORS.contains(&ch) {
            let end = idx + ch.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Split paragraphs longer than `max_chars` into chunks of roughly
/// `target_chars`, cutting only at sentence boundaries.
///
/// A single sentence longer than `max_chars` is left as its own paragraph.
pub fn rewrap_long_paragraphs(text: &str, max_chars: usize, target_chars: usize) -> String {
    let mut out: Vec<String> = Vec::new();

    for paragraph in paragraphs(text) {
        if paragraph.chars().count() <= max_chars {
            out.push(paragraph.to_string());
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0;
        for sentence in split_sentences(paragraph) {
            let len = sentence.chars().count();
            if current_len > 0 && current_len + len > target_chars {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            // CJK sentences run together without a separating space.
            if current_len > 0 && !current.ends_with(['。', '！', '？']) {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(sentence);
            current_len += len;
        }
        if !current.is_empty() {
            out.push(current);
        }
    }

    out.join("\n\n")
}

/// Truncate to at most `max_chars` characters, ending with `...` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }

    let mut out: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    out.truncate(out.trim_end().len());
    out.push_str(ELLIPSIS);
    out
}
