//! Prompt templates for policy-field extraction.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the prompt is the only control surface for
//!    what the model is asked to infer. Changing the field list or the output
//!    shape means editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without a
//!    live model, so a dropped field or a broken placeholder is caught cheap.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::prompt_template`]; the constants here
//! are used only when no override is provided.

use crate::config::{ExtractionConfig, ReplyFormat};

/// Placeholder replaced with the extracted document text.
pub const POLICY_TEXT_PLACEHOLDER: &str = "{policy_text}";

/// Default prompt requesting a strict JSON object reply.
///
/// The key set listed here is the canonical schema; the normalizer tolerates
/// other spellings, but keeping the prompt on-vocabulary minimises how often
/// the alias table has to save the day.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Extract the following fields from the insurance policy text:

- Insurance Company Name
- Type of Insurance (Health, Life, Motor, Property, etc.)
- Policy Number
- Policy Start Date
- Policy End Date
- SP Code
- Customer Name
- Sum Insured
- Gross Amount
- Net Amount
- OD Amount (Only if Motor policy, else null)
- TP Amount (Only if Motor policy, else null)

Return the result strictly as a valid JSON object with these keys:
insurance_company, insurance_type, policy_number, start_date, end_date,
sp_code, customer_name, sum_insured, gross_amount, net_amount, od_amount, tp_amount

Do not wrap the JSON in code fences and do not add commentary.

Policy Text:
{policy_text}"#;

/// Prompt for the line-based reply shape: one `Key: value` pair per line.
///
/// Used when [`ReplyFormat::KeyValueLines`] is selected. The shape has no
/// escaping, so values containing colons or newlines will not survive the
/// parse — prefer the JSON shape unless the model in use cannot produce it.
pub const KEY_VALUE_PROMPT_TEMPLATE: &str = r#"Extract these fields from the insurance policy text and reply with exactly one "Key: value" pair per line, nothing else:

Insurance Company: ...
Insurance Type: ...
Policy Number: ...
Start Date: ...
End Date: ...
SP Code: ...
Customer Name: ...
Sum Insured: ...
Gross Amount: ...
Net Amount: ...
OD Amount: ...
TP Amount: ...

Use "null" for fields not present in the text. OD Amount and TP Amount apply
to Motor policies only.

Policy Text:
{policy_text}"#;

/// Build the completion prompt for one document's extracted text.
///
/// Deterministic: the same text and config always produce the same prompt.
pub fn build_prompt(text: &str, config: &ExtractionConfig) -> String {
    let template = config.prompt_template.as_deref().unwrap_or(match config.reply_format {
        ReplyFormat::Json => DEFAULT_PROMPT_TEMPLATE,
        ReplyFormat::KeyValueLines => KEY_VALUE_PROMPT_TEMPLATE,
    });
    template.replace(POLICY_TEXT_PLACEHOLDER, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CANONICAL_FIELDS;

    #[test]
    fn default_prompt_names_every_canonical_key() {
        for field in CANONICAL_FIELDS {
            assert!(
                DEFAULT_PROMPT_TEMPLATE.contains(field),
                "prompt is missing key {field}"
            );
        }
    }

    #[test]
    fn build_prompt_embeds_the_document_text() {
        let config = ExtractionConfig::default();
        let prompt = build_prompt("POLICY NO 12/345", &config);
        assert!(prompt.contains("POLICY NO 12/345"));
        assert!(!prompt.contains(POLICY_TEXT_PLACEHOLDER));
    }

    #[test]
    fn build_prompt_is_deterministic() {
        let config = ExtractionConfig::default();
        assert_eq!(build_prompt("abc", &config), build_prompt("abc", &config));
    }

    #[test]
    fn custom_template_wins_over_format_default() {
        let config = ExtractionConfig::builder()
            .prompt_template("fields from: {policy_text}")
            .build()
            .unwrap();
        assert_eq!(build_prompt("T", &config), "fields from: T");
    }
}
