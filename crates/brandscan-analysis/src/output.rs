//! Recovers the JSON report from the assistant's free-text reply.

use serde_json::Value;

use crate::error::AnalysisError;

const SNIPPET_CHARS: usize = 200;

/// Parses assistant text into a JSON object.
///
/// Accepts a bare object, an object inside a fenced code block, or an object
/// surrounded by prose (the outermost `{ ... }` span is tried).
///
/// # Errors
///
/// Returns [`AnalysisError::UnparseableOutput`] when no JSON object can be
/// recovered.
pub fn parse_output(text: &str) -> Result<Value, AnalysisError> {
    let trimmed = strip_fence(text.trim());

    let parsed = serde_json::from_str::<Value>(trimmed).ok().or_else(|| {
        let start = trimmed.find('{')?;
        let end = trimmed.rfind('}')?;
        (start < end)
            .then(|| serde_json::from_str::<Value>(&trimmed[start..=end]).ok())
            .flatten()
    });

    match parsed {
        Some(value) if value.is_object() => Ok(value),
        _ => Err(AnalysisError::UnparseableOutput(
            trimmed.chars().take(SNIPPET_CHARS).collect(),
        )),
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line, e.g. "json".
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_object_parses() {
        let value = parse_output(r#"{"summary": "fine"}"#).unwrap();
        assert_eq!(value["summary"], "fine");
    }

    #[test]
    fn fenced_block_is_unwrapped() {
        let text = "```json\n{\"search_visibility_score\": 72}\n```";
        assert_eq!(parse_output(text).unwrap()["search_visibility_score"], 72);
    }

    #[test]
    fn object_inside_prose_is_recovered() {
        let text = "Here is the report:\n{\"summary\": \"ok\", \"recommendations\": {}}\nThanks!";
        assert_eq!(parse_output(text).unwrap()["summary"], "ok");
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(matches!(
            parse_output("[1, 2, 3]"),
            Err(AnalysisError::UnparseableOutput(_))
        ));
    }

    #[test]
    fn prose_without_json_is_rejected() {
        assert!(matches!(
            parse_output("I could not analyze this brand."),
            Err(AnalysisError::UnparseableOutput(_))
        ));
    }
}
