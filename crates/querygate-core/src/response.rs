//! Turning raw reasoning text into a verified JSON value.
//!
//! Models wrap their answers in all sorts of packaging: `<think>` traces,
//! Markdown fences, a sentence of preamble. `extract_json` peels those off;
//! `parse_verified` then checks the value against the stage's schema so
//! every stage sees either a structurally sound object or an error.

use serde_json::Value;

use querygate_contracts::{
    error::{QueryGateError, QueryGateResult},
    reasoning::Stage,
    verify::ResponseSchema,
};

use crate::traits::ResponseVerifier;

const TRACE_TAGS: [(&str, &str); 2] = [("<think>", "</think>"), ("<thinking>", "</thinking>")];

/// Remove reasoning-trace blocks (`<think>…</think>`, `<thinking>…</thinking>`).
///
/// An unterminated opening tag drops everything after it.
pub fn strip_reasoning_trace(text: &str) -> String {
    let mut out = text.to_string();
    for (open, close) in TRACE_TAGS {
        while let Some(start) = out.find(open) {
            match out[start..].find(close) {
                Some(rel_end) => {
                    let end = start + rel_end + close.len();
                    out.replace_range(start..end, "");
                }
                None => out.truncate(start),
            }
        }
    }
    out.trim().to_string()
}

/// Extract the first JSON object from a reasoning response.
///
/// Tries, in order: the whole stripped text, the body of a Markdown code
/// fence, and the span from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> QueryGateResult<Value> {
    let cleaned = strip_reasoning_trace(text);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    if let Some(body) = fenced_body(&cleaned) {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(QueryGateError::MalformedResponse {
        reason: format!("no JSON object found in response: {}", preview(&cleaned)),
    })
}

/// Extract JSON from `text` and verify it against the schema for `stage`.
pub fn parse_verified(
    text: &str,
    stage: Stage,
    verifier: &dyn ResponseVerifier,
) -> QueryGateResult<Value> {
    let value = extract_json(text)?;
    let report = verifier.verify(&value, &ResponseSchema::for_stage(stage))?;
    if !report.passed {
        return Err(QueryGateError::MalformedResponse { reason: report.failure_summary() });
    }
    Ok(value)
}

fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip an optional language tag on the opening fence line.
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn preview(text: &str) -> String {
    const MAX: usize = 120;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_json, strip_reasoning_trace};

    #[test]
    fn strips_think_blocks() {
        let raw = "<think>the user wants counts</think>\n{\"action\": \"finish\"}";
        assert_eq!(strip_reasoning_trace(raw), "{\"action\": \"finish\"}");
    }

    #[test]
    fn strips_multiple_and_unterminated_traces() {
        let raw = "<thinking>a</thinking>{\"x\":1}<think>never closed";
        assert_eq!(strip_reasoning_trace(raw), "{\"x\":1}");
    }

    #[test]
    fn extracts_from_code_fence() {
        let raw = "Here you go:\n```json\n{\"action\": \"get_schema\"}\n```";
        assert_eq!(extract_json(raw).unwrap(), json!({ "action": "get_schema" }));
    }

    #[test]
    fn extracts_from_surrounding_prose() {
        let raw = "Sure! {\"confidence\": 0.9} Hope that helps.";
        assert_eq!(extract_json(raw).unwrap(), json!({ "confidence": 0.9 }));
    }

    #[test]
    fn rejects_text_without_json() {
        let err = extract_json("I cannot help with that.").unwrap_err();
        assert!(err.to_string().contains("no JSON object found"));
    }
}
