//! Reply parsing: turn the model's free-text answer into a raw field map.
//!
//! The model is *instructed* to return a bare JSON object but is not
//! guaranteed to comply. Observed failure modes, in rough order of
//! frequency: a ```` ```json ```` fence wrapper, a sentence of prose before
//! or after the object, and outright refusal text.
//!
//! Everything here is a strict structured-data decode. The reply is never
//! evaluated, interpolated, or otherwise executed — `serde_json` either
//! accepts it or the document fails with [`DocumentError::MalformedResponse`]
//! carrying the reply verbatim for operator inspection. A record is never
//! silently dropped.

use crate::config::ReplyFormat;
use crate::error::DocumentError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// The unvalidated field map as the model returned it, before any alias
/// mapping or domain rules. Consumed by [`crate::pipeline::normalize`].
pub type RawFields = serde_json::Map<String, Value>;

/// Parse a model reply in the configured shape.
pub fn parse_reply(reply: &str, format: ReplyFormat) -> Result<RawFields, DocumentError> {
    match format {
        ReplyFormat::Json => parse_json_reply(reply),
        ReplyFormat::KeyValueLines => parse_key_value_lines(reply),
    }
}

// ── JSON shape ───────────────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:[jJ][sS][oO][nN])?\s*\n?(.*?)\n?```\s*$").unwrap());

/// Strip one optional outer fenced-code-block wrapper.
fn strip_code_fence(reply: &str) -> &str {
    match RE_OUTER_FENCE.captures(reply.trim()) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => reply.trim(),
    }
}

/// Decode the reply as a single JSON object, tolerating a fence wrapper and
/// stray prose around the object.
///
/// Order of attempts:
/// 1. strict decode of the fence-stripped body;
/// 2. strict decode of the outermost `{…}` slice, for replies like
///    `"Here is the JSON you asked for: {...}"`.
///
/// Both attempts are full strict decodes; there is no lenient mode.
fn parse_json_reply(reply: &str) -> Result<RawFields, DocumentError> {
    let body = strip_code_fence(reply);

    let attempt = serde_json::from_str::<Value>(body).or_else(|first_err| {
        match outer_object_slice(body) {
            Some(slice) => serde_json::from_str::<Value>(slice),
            None => Err(first_err),
        }
    });

    match attempt {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DocumentError::MalformedResponse {
            detail: format!("expected a JSON object, got {}", json_kind(&other)),
            raw_reply: reply.to_string(),
        }),
        Err(e) => Err(DocumentError::MalformedResponse {
            detail: e.to_string(),
            raw_reply: reply.to_string(),
        }),
    }
}

/// The slice from the first `{` to the last `}`, if both exist in order.
fn outer_object_slice(body: &str) -> Option<&str> {
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Line shape ───────────────────────────────────────────────────────────

/// Parse the one-`Key: value`-pair-per-line reply shape.
///
/// Each non-empty line is split at the **first** colon; both halves are
/// trimmed, and lines without a colon are discarded. Known limitations of
/// the shape itself (not of this parser): no escaping, so multi-line values
/// and values containing a colon cannot be represented. A reply yielding no
/// pairs at all is malformed, not an empty record.
fn parse_key_value_lines(reply: &str) -> Result<RawFields, DocumentError> {
    let mut fields = RawFields::new();

    for line in reply.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = if value.is_empty() || value.eq_ignore_ascii_case("null") {
            Value::Null
        } else {
            Value::String(value.to_string())
        };
        fields.insert(key.to_string(), value);
    }

    if fields.is_empty() {
        return Err(DocumentError::MalformedResponse {
            detail: "no 'Key: value' pairs found in reply".into(),
            raw_reply: reply.to_string(),
        });
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{"policy_number":"P1","insurance_type":"Motor"}"#;

    #[test]
    fn plain_json_object_parses() {
        let fields = parse_reply(PLAIN, ReplyFormat::Json).unwrap();
        assert_eq!(fields["policy_number"], "P1");
    }

    #[test]
    fn fenced_json_parses_same_as_unwrapped() {
        let fenced = format!("```json\n{PLAIN}\n```");
        let bare_fence = format!("```\n{PLAIN}\n```");
        let unwrapped = parse_reply(PLAIN, ReplyFormat::Json).unwrap();
        assert_eq!(parse_reply(&fenced, ReplyFormat::Json).unwrap(), unwrapped);
        assert_eq!(
            parse_reply(&bare_fence, ReplyFormat::Json).unwrap(),
            unwrapped
        );
    }

    #[test]
    fn prose_around_object_is_tolerated() {
        let reply = format!("Here is the extracted data:\n{PLAIN}\nLet me know if you need more.");
        let fields = parse_reply(&reply, ReplyFormat::Json).unwrap();
        assert_eq!(fields["insurance_type"], "Motor");
    }

    #[test]
    fn malformed_reply_preserves_raw_text_verbatim() {
        let reply = "I'm sorry, I can't find a policy in this document.";
        let err = parse_reply(reply, ReplyFormat::Json).unwrap_err();
        assert_eq!(err.raw_reply(), Some(reply));
    }

    #[test]
    fn truncated_json_is_malformed() {
        let reply = r#"{"policy_number": "P1", "insurance_type""#;
        let err = parse_reply(reply, ReplyFormat::Json).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedResponse { .. }));
        assert_eq!(err.raw_reply(), Some(reply));
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = parse_reply(r#"["P1","P2"]"#, ReplyFormat::Json).unwrap_err();
        match err {
            DocumentError::MalformedResponse { detail, .. } => {
                assert!(detail.contains("array"), "got: {detail}")
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn key_value_lines_split_on_first_colon() {
        let reply = "Policy Number: 12:34:56\nCustomer Name: A. Sharma\n\nno colon here\nSP Code: null";
        let fields = parse_reply(reply, ReplyFormat::KeyValueLines).unwrap();
        assert_eq!(fields["Policy Number"], "12:34:56");
        assert_eq!(fields["Customer Name"], "A. Sharma");
        assert_eq!(fields["SP Code"], Value::Null);
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn key_value_reply_with_no_pairs_is_malformed() {
        let err = parse_reply("nothing structured here", ReplyFormat::KeyValueLines).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedResponse { .. }));
    }

    #[test]
    fn fence_with_trailing_whitespace_still_strips() {
        let fenced = format!("```json\n{PLAIN}\n```   \n");
        assert!(parse_reply(&fenced, ReplyFormat::Json).is_ok());
    }
}
