//! Record normalization: reconcile a raw field map onto the canonical schema.
//!
//! Different prompt variants ask for different key spellings ("Policy Holder
//! Name" vs `customer_name`), and models drift further on their own. All of
//! that vocabulary lives in one alias table here — adding a synonym is a
//! data change, not new code. Matching is case-, space-, and
//! separator-insensitive, so `"Policy_Number"`, `"policy number"` and
//! `"POLICY-NUMBER"` all land on the same canonical field.
//!
//! This stage also owns the one domain rule the model cannot be trusted
//! with: own-damage and third-party amounts exist only on motor policies,
//! so they are forced to null for every other `insurance_type` no matter
//! what the reply said. Normalization is idempotent — feeding a normalized
//! record's JSON back through produces the same record.

use crate::pipeline::parse::RawFields;
use crate::record::{FieldValue, PolicyRecord};
use serde_json::Value;

/// External-name → canonical-name alias table, in folded form (lowercase,
/// single spaces). Canonical names map to themselves via folding, so they
/// need no entries here.
const FIELD_ALIASES: &[(&str, &str)] = &[
    // customer_name
    ("policy holder name", "customer_name"),
    ("policyholder name", "customer_name"),
    ("insured name", "customer_name"),
    ("name of insured", "customer_name"),
    ("client name", "customer_name"),
    // policy_number
    ("policy no", "policy_number"),
    ("policy num", "policy_number"),
    // insurance_company
    ("insurance company name", "insurance_company"),
    ("insurer", "insurance_company"),
    ("insurer name", "insurance_company"),
    ("company name", "insurance_company"),
    // insurance_type
    ("type of insurance", "insurance_type"),
    ("policy type", "insurance_type"),
    // start_date
    ("policy start date", "start_date"),
    ("risk start date", "start_date"),
    ("from date", "start_date"),
    // end_date
    ("policy end date", "end_date"),
    ("expiry date", "end_date"),
    ("policy expiry date", "end_date"),
    ("to date", "end_date"),
    // sp_code
    ("service provider code", "sp_code"),
    // sum_insured
    ("sum assured", "sum_insured"),
    ("idv", "sum_insured"),
    // gross_amount
    ("gross premium", "gross_amount"),
    ("total premium", "gross_amount"),
    // net_amount
    ("net premium", "net_amount"),
    // od_amount
    ("od premium", "od_amount"),
    ("own damage amount", "od_amount"),
    ("own damage premium", "od_amount"),
    // tp_amount
    ("tp premium", "tp_amount"),
    ("third party amount", "tp_amount"),
    ("third party premium", "tp_amount"),
];

/// Sentinels models use for "field not present". Folded comparison.
const NULL_SENTINELS: &[&str] = &["null", "none", "n/a", "na", "not found", "-", ""];

/// Map a raw reply key onto a canonical field name, if it is one we know.
pub fn canonical_field_name(key: &str) -> Option<&'static str> {
    let folded = fold_key(key);
    // A canonical name in any spelling maps to itself.
    for canonical in crate::record::CANONICAL_FIELDS {
        if folded == fold_key(canonical) {
            return Some(canonical);
        }
    }
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == folded)
        .map(|(_, canonical)| *canonical)
}

/// Lowercase, treat `_`/`-` as spaces, collapse runs of whitespace.
fn fold_key(key: &str) -> String {
    key.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reconcile a raw field map onto [`PolicyRecord`].
///
/// Unrecognised keys are preserved in `record.extra` (snake-cased) so export
/// never loses a field. When the reply repeats a field under two spellings,
/// the later key wins.
pub fn normalize(raw: &RawFields) -> PolicyRecord {
    let mut record = PolicyRecord::default();

    for (key, value) in raw {
        match canonical_field_name(key) {
            Some("customer_name") => record.customer_name = coerce_text(value),
            Some("policy_number") => record.policy_number = coerce_text(value),
            Some("insurance_company") => record.insurance_company = coerce_text(value),
            Some("insurance_type") => {
                record.insurance_type = coerce_text(value).map(|t| t.to_lowercase())
            }
            Some("start_date") => record.start_date = coerce_text(value),
            Some("end_date") => record.end_date = coerce_text(value),
            Some("sp_code") => record.sp_code = coerce_text(value),
            Some("sum_insured") => record.sum_insured = coerce_value(value),
            Some("gross_amount") => record.gross_amount = coerce_value(value),
            Some("net_amount") => record.net_amount = coerce_value(value),
            Some("od_amount") => record.od_amount = coerce_value(value),
            Some("tp_amount") => record.tp_amount = coerce_value(value),
            Some(_) | None => {
                record
                    .extra
                    .insert(fold_key(key).replace(' ', "_"), coerce_value(value));
            }
        }
    }

    // Motor-only rule: the model's OD/TP values are not trusted outside
    // motor policies.
    if !record.is_motor() {
        record.od_amount = FieldValue::Null;
        record.tp_amount = FieldValue::Null;
    }

    record
}

/// Coerce a raw value to an optional string field.
fn coerce_text(value: &Value) -> Option<String> {
    match coerce_value(value) {
        FieldValue::Null => None,
        FieldValue::Number(n) => Some(format!("{n}")),
        FieldValue::Text(s) => Some(s),
    }
}

/// Coerce a raw value to a [`FieldValue`], folding null-sentinels to null.
fn coerce_value(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Number(n) => match n.as_f64() {
            Some(f) => FieldValue::Number(f),
            None => FieldValue::Text(n.to_string()),
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if NULL_SENTINELS.contains(&trimmed.to_lowercase().as_str()) {
                FieldValue::Null
            } else {
                FieldValue::Text(trimmed.to_string())
            }
        }
        Value::Bool(b) => FieldValue::Text(b.to_string()),
        // Arrays/objects are off-schema; keep them visible rather than drop them.
        other => FieldValue::Text(other.to_string()),
    }
}
