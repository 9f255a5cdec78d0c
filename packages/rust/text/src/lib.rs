//! Text post-processing for generated report sections.
//!
//! Generated prose is run through a small pipeline of `&str -> String` passes
//! before it is stored: whitespace is collapsed, sentences become paragraphs,
//! and empty paragraphs are dropped. Polished text is additionally re-wrapped
//! so no paragraph runs on for too long.

mod normalize;
mod quality;

pub use normalize::{
    normalize_section_text, paragraphs, rewrap_long_paragraphs, split_sentences, truncate_chars,
};
pub use quality::{QualityIssue, TextQuality};
