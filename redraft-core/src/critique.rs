//! # Critique parsing
//!
//! Reflection models are asked for a JSON object on the first line, but what
//! comes back is free-form text: prose before the JSON, markdown fences
//! around it, pretty-printed objects spanning lines. Parsing degrades through
//! three tiers instead of failing:
//!
//! 1. strict JSON parse of the first non-empty line
//! 2. JSON parse of the first `{...}` window anywhere in the text
//! 3. diagnostic fallback - feedback carries the parse error, the refined
//!    artifact falls back to the prior version
//!
//! Every tier terminates in a valid [`Critique`]; this module never returns
//! an error to its caller.

use crate::artifact::Artifact;
use crate::extract::TagPair;
use serde::{Deserialize, Serialize};

/// Which parse tier produced a critique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CritiqueSource {
    /// Strict first-line parse succeeded
    Parsed,
    /// Recovered from a brace-delimited window inside surrounding prose
    Recovered,
    /// Nothing parseable; feedback is a diagnostic, artifact fell back
    Fallback,
}

/// Structured feedback plus the refined artifact it proposes.
///
/// `refined` is always valid and non-empty: when the response carries no
/// usable replacement, the prior artifact's text is carried forward at the
/// next version instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub feedback: String,
    pub refined: Artifact,
    pub source: CritiqueSource,
}

impl Critique {
    /// Whether this critique came from the diagnostic fallback tier
    pub fn is_degraded(&self) -> bool {
        self.source == CritiqueSource::Fallback
    }
}

/// Where the refined artifact lives inside the reflection response.
#[derive(Debug, Clone, Copy)]
pub enum RefinedSource<'a> {
    /// A string field of the critique JSON object (SQL: `refined_sql`)
    InlineField(&'a str),
    /// A separate tag-delimited code block after the JSON line (chart)
    TaggedBlock(&'a TagPair),
}

/// Parse a reflection response into a critique.
///
/// `prior` is the artifact being critiqued; it is the fallback whenever the
/// response yields no usable refined text. The returned artifact always sits
/// at `prior`'s next version.
pub fn parse_critique(raw: &str, refined: RefinedSource<'_>, prior: &Artifact) -> Critique {
    let cleaned = strip_fences(raw);

    // Tier 1: the first non-empty line should be the critique object.
    let first_error = match first_non_empty_line(&cleaned) {
        Some(line) => match parse_object(line) {
            Ok(object) => return build(&object, refined, raw, prior, CritiqueSource::Parsed),
            Err(e) => e,
        },
        None => "critique response was empty".to_string(),
    };

    // Tier 2: hunt for the first {...} window anywhere in the text. Critique
    // objects are flat, so the window from the first '{' to the next '}' is
    // the whole object even when it spans lines.
    match brace_window(&cleaned) {
        Some(window) => match parse_object(window) {
            Ok(object) => build(&object, refined, raw, prior, CritiqueSource::Recovered),
            Err(e) => fallback(format!("failed to parse critique JSON: {}", e), prior),
        },
        None => fallback(format!("no JSON object found in critique: {}", first_error), prior),
    }
}

/// Drop markdown fence markers so fenced JSON parses like bare JSON
fn strip_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "")
}

fn first_non_empty_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

/// The substring from the first '{' through the next '}' after it
fn brace_window(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = start + text[start..].find('}')? + 1;
    Some(&text[start..end])
}

fn parse_object(text: &str) -> std::result::Result<serde_json::Value, String> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn build(
    object: &serde_json::Value,
    refined: RefinedSource<'_>,
    raw: &str,
    prior: &Artifact,
    source: CritiqueSource,
) -> Critique {
    let feedback = object
        .get("feedback")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    let refined_text = match refined {
        RefinedSource::InlineField(field) => object
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        // the code block is located in the raw response, independent of the
        // JSON line, via the same gate generation goes through
        RefinedSource::TaggedBlock(tag) => tag.extract(raw).map(str::to_string),
    };

    let refined = match refined_text {
        Some(text) => prior.refine(text),
        None => prior.carry_forward(),
    };

    Critique { feedback, refined, source }
}

fn fallback(diagnostic: String, prior: &Artifact) -> Critique {
    Critique {
        feedback: diagnostic,
        refined: prior.carry_forward(),
        source: CritiqueSource::Fallback,
    }
}
