//! Best-effort decoder for model responses.
//!
//! Models wrap JSON in markdown fences and prose, emit trailing commas, and
//! occasionally leave raw newlines inside string literals. The policy here:
//! strip fences, slice the outermost `{`..`}` span, parse strictly, run one
//! repair pass on failure, and surface a typed error with a truncated snippet
//! if the payload still will not decode.

use regex::Regex;
use serde_json::Value;

use crate::error::ParseError;

const SNIPPET_LEN: usize = 200;

/// Structured fields extracted from a model response.
#[derive(Clone, Debug, Default)]
pub struct ParsedBrief {
    pub summary_text: String,
    pub key_insights: Vec<String>,
    pub market_context: Option<Value>,
    pub report_markdown: Option<String>,
    pub core_tickers_in_depth_markdown: Option<String>,
    pub ticker_reports: Vec<Value>,
    pub audio_report: Option<String>,
}

pub fn parse_brief(raw: &str) -> Result<ParsedBrief, ParseError> {
    let object = extract_json_object(raw)?;

    let summary_text = object
        .get("summary_text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ParseError::MissingField {
            field: "summary_text".to_string(),
        })?
        .to_string();

    let key_insights = match object.get("key_insights") {
        None => {
            return Err(ParseError::MissingField {
                field: "key_insights".to_string(),
            })
        }
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        // Model returned a scalar or object where a list was expected
        Some(_) => Vec::new(),
    };

    Ok(ParsedBrief {
        summary_text,
        key_insights,
        market_context: object.get("market_context").cloned(),
        report_markdown: string_field(&object, "report_markdown"),
        core_tickers_in_depth_markdown: string_field(&object, "core_tickers_in_depth_markdown"),
        ticker_reports: object
            .get("ticker_reports")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default(),
        audio_report: string_field(&object, "audio_report"),
    })
}

/// Locate and decode the JSON object embedded in a raw model response.
pub fn extract_json_object(raw: &str) -> Result<Value, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let unfenced = strip_code_fences(trimmed);

    let start = unfenced.find('{');
    let end = unfenced.rfind('}');
    let span = match (start, end) {
        (Some(s), Some(e)) if s < e => &unfenced[s..=e],
        _ => {
            return Err(ParseError::NoJsonObject {
                snippet: snippet(trimmed),
            })
        }
    };

    match serde_json::from_str::<Value>(span) {
        Ok(value) => Ok(value),
        Err(_) => {
            let repaired = repair_json(span);
            serde_json::from_str::<Value>(&repaired).map_err(|e| ParseError::Invalid {
                message: e.to_string(),
                snippet: snippet(span),
            })
        }
    }
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Drop leading/trailing ``` fence lines (with or without a language tag).
fn strip_code_fences(text: &str) -> String {
    let mut s = text.trim();
    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(idx) => s[idx + 1..].trim_end(),
            None => "",
        };
    }
    if let Some(stripped) = s.strip_suffix("```") {
        s = stripped.trim_end();
    }
    s.to_string()
}

/// One repair pass: drop trailing commas, escape bare newlines inside string
/// literals. Deliberately small; anything this does not fix is a hard error.
fn repair_json(span: &str) -> String {
    let no_trailing_commas = Regex::new(r",\s*([}\]])")
        .expect("static regex")
        .replace_all(span, "$1")
        .into_owned();
    escape_bare_newlines(&no_trailing_commas)
}

fn escape_bare_newlines(span: &str) -> String {
    let mut out = String::with_capacity(span.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in span.chars() {
        match c {
            '"' if !escaped => {
                in_string = !in_string;
                out.push(c);
            }
            '\\' if in_string && !escaped => {
                escaped = true;
                out.push(c);
                continue;
            }
            '\n' if in_string => out.push_str("\\n"),
            '\r' if in_string => out.push_str("\\r"),
            _ => out.push(c),
        }
        escaped = false;
    }
    out
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLAIN: &str = r#"{"summary_text": "Markets rallied.", "key_insights": ["Chips led", "Rates steady"]}"#;

    #[test]
    fn parses_well_formed_object_unchanged() {
        let brief = parse_brief(PLAIN).unwrap();
        assert_eq!(brief.summary_text, "Markets rallied.");
        assert_eq!(brief.key_insights, vec!["Chips led", "Rates steady"]);
        assert!(brief.market_context.is_none());
    }

    #[test]
    fn fenced_response_round_trips_to_same_object() {
        let fenced = format!("```json\n{}\n```", PLAIN);
        let a = parse_brief(PLAIN).unwrap();
        let b = parse_brief(&fenced).unwrap();
        assert_eq!(a.summary_text, b.summary_text);
        assert_eq!(a.key_insights, b.key_insights);
    }

    #[test]
    fn tolerates_leading_and_trailing_prose() {
        let chatty = format!("Here is your report:\n{}\nLet me know if you need more.", PLAIN);
        let brief = parse_brief(&chatty).unwrap();
        assert_eq!(brief.summary_text, "Markets rallied.");
    }

    #[test]
    fn non_list_key_insights_degrades_to_empty() {
        let raw = r#"{"summary_text": "Quiet day.", "key_insights": "nothing to report"}"#;
        let brief = parse_brief(raw).unwrap();
        assert!(brief.key_insights.is_empty());
        assert_eq!(brief.summary_text, "Quiet day.");
    }

    #[test]
    fn empty_response_fails() {
        assert!(matches!(parse_brief("   \n"), Err(ParseError::Empty)));
    }

    #[test]
    fn prose_without_object_fails() {
        let err = parse_brief("I could not produce a report today.").unwrap_err();
        assert!(matches!(err, ParseError::NoJsonObject { .. }));
    }

    #[test]
    fn missing_summary_text_fails() {
        let err = parse_brief(r#"{"key_insights": []}"#).unwrap_err();
        match err {
            ParseError::MissingField { field } => assert_eq!(field, "summary_text"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_key_insights_fails() {
        let err = parse_brief(r#"{"summary_text": "x"}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { field } if field == "key_insights"));
    }

    #[test]
    fn repairs_trailing_commas() {
        let raw = r#"{"summary_text": "ok", "key_insights": ["a", "b",],}"#;
        let brief = parse_brief(raw).unwrap();
        assert_eq!(brief.key_insights, vec!["a", "b"]);
    }

    #[test]
    fn repairs_bare_newlines_in_strings() {
        let raw = "{\"summary_text\": \"line one\nline two\", \"key_insights\": []}";
        let brief = parse_brief(raw).unwrap();
        assert_eq!(brief.summary_text, "line one\nline two");
    }

    #[test]
    fn garbage_after_repair_reports_snippet() {
        let raw = r#"{"summary_text": "ok", "key_insights": [}"#;
        let err = parse_brief(raw).unwrap_err();
        match err {
            ParseError::Invalid { snippet, .. } => assert!(snippet.starts_with('{')),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rich_variant_fields_are_optional_but_read() {
        let raw = json!({
            "summary_text": "Full brief.",
            "key_insights": ["one"],
            "market_context": {"regime": "risk-on"},
            "report_markdown": "# Daily",
            "core_tickers_in_depth_markdown": "## SMCI",
            "ticker_reports": [{"ticker": "SMCI", "view": "constructive"}],
            "audio_report": "Good morning."
        })
        .to_string();

        let brief = parse_brief(&raw).unwrap();
        assert_eq!(brief.report_markdown.as_deref(), Some("# Daily"));
        assert_eq!(brief.ticker_reports.len(), 1);
        assert_eq!(brief.audio_report.as_deref(), Some("Good morning."));
        assert_eq!(brief.market_context, Some(json!({"regime": "risk-on"})));
    }
}
