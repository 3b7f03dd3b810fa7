//! The canonical policy record schema.
//!
//! Every reply the model produces — whatever key spellings and value types it
//! chose — is reconciled onto [`PolicyRecord`] by
//! [`crate::pipeline::normalize`]. Downstream code (display, CSV/JSON export)
//! only ever sees this one shape, so a prompt-wording change never ripples
//! past the normalizer.
//!
//! Records are created once by the normalizer and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Preferred CSV column order for the canonical fields.
///
/// Columns for keys outside this list (model extras) are appended after it,
/// sorted, so heterogeneous batches still share one stable header.
pub const CANONICAL_FIELDS: [&str; 12] = [
    "customer_name",
    "policy_number",
    "start_date",
    "end_date",
    "sp_code",
    "gross_amount",
    "net_amount",
    "sum_insured",
    "od_amount",
    "tp_amount",
    "insurance_company",
    "insurance_type",
];

/// A field value as the model returned it: text, a bare number, or nothing.
///
/// Models are inconsistent about amounts — `"sum_insured": "5,00,000"` and
/// `"sum_insured": 500000` both occur in practice. Keeping the distinction
/// lets the JSON export mirror the reply while the CSV export renders both
/// the same way.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Field absent, null, or empty.
    #[default]
    Null,
    /// A bare JSON number.
    Number(f64),
    /// A string value.
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Render for a CSV cell. Null becomes an empty cell.
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Number(n) => format!("{n}"),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("N/A"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

/// The canonical structured result extracted from one policy document.
///
/// Name/date fields are free-form strings exactly as the model returned them
/// (dates are not validated — see the prompt contract). Amount fields keep
/// the model's text-or-number ambiguity via [`FieldValue`].
///
/// `od_amount` and `tp_amount` are only meaningful for motor policies; the
/// normalizer forces them to null for every other `insurance_type`, and
/// [`PolicyRecord::is_motor`] is the single gate display layers should use.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub customer_name: Option<String>,
    pub policy_number: Option<String>,
    pub insurance_company: Option<String>,
    /// Lowercased free-form category, e.g. "motor", "health".
    pub insurance_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sp_code: Option<String>,
    #[serde(default)]
    pub sum_insured: FieldValue,
    #[serde(default)]
    pub gross_amount: FieldValue,
    #[serde(default)]
    pub net_amount: FieldValue,
    /// Own-damage premium. Null unless the policy is motor.
    #[serde(default)]
    pub od_amount: FieldValue,
    /// Third-party premium. Null unless the policy is motor.
    #[serde(default)]
    pub tp_amount: FieldValue,
    /// Keys the model returned that are not part of the canonical schema.
    /// Preserved so export never loses a field.
    #[serde(flatten)]
    pub extra: BTreeMap<String, FieldValue>,
}

impl PolicyRecord {
    /// Whether this record describes a motor policy.
    ///
    /// Case-insensitive so the check is safe on records built by hand as
    /// well as normalizer output (which lowercases `insurance_type`).
    pub fn is_motor(&self) -> bool {
        self.insurance_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("motor"))
    }

    /// Look up a canonical field by name, as a [`FieldValue`].
    ///
    /// Used by the CSV exporter to walk [`CANONICAL_FIELDS`] uniformly.
    /// Returns `None` for names outside the canonical set.
    pub fn canonical_value(&self, field: &str) -> Option<FieldValue> {
        let text = |o: &Option<String>| match o {
            Some(s) => FieldValue::Text(s.clone()),
            None => FieldValue::Null,
        };
        let v = match field {
            "customer_name" => text(&self.customer_name),
            "policy_number" => text(&self.policy_number),
            "insurance_company" => text(&self.insurance_company),
            "insurance_type" => text(&self.insurance_type),
            "start_date" => text(&self.start_date),
            "end_date" => text(&self.end_date),
            "sp_code" => text(&self.sp_code),
            "sum_insured" => self.sum_insured.clone(),
            "gross_amount" => self.gross_amount.clone(),
            "net_amount" => self.net_amount.clone(),
            "od_amount" => self.od_amount.clone(),
            "tp_amount" => self.tp_amount.clone(),
            _ => return None,
        };
        Some(v)
    }
}
