//! Export: serialise a finished batch to CSV or JSON.
//!
//! Both exports contain only the **successful** records. Failed documents
//! stay in [`crate::output::BatchOutput::results`] (and in the operator
//! display) but never produce a data row — a half-empty row with an error
//! message in a name column would poison any spreadsheet the CSV lands in.
//! This mirrors the batch contract: errors are per-document metadata, not
//! records.
//!
//! ## Column stability
//!
//! Models occasionally return keys outside the canonical schema, and the
//! normalizer preserves them. The CSV header is therefore the fixed
//! preferred order from [`CANONICAL_FIELDS`] followed by the sorted union of
//! every extra key across the batch, so heterogeneous batches share one
//! stable header and no field is ever dropped. Every row has a value
//! (possibly empty) for every column.

use crate::error::ExtractError;
use crate::output::DocumentResult;
use crate::record::{PolicyRecord, CANONICAL_FIELDS};
use std::collections::BTreeSet;
use std::path::Path;

/// Default filename the CLI suggests for CSV downloads.
pub const DEFAULT_CSV_FILENAME: &str = "extracted_policies.csv";

/// Serialise the batch's successful records to CSV.
pub fn to_csv(results: &[DocumentResult]) -> Result<Vec<u8>, ExtractError> {
    let records: Vec<&PolicyRecord> = results.iter().filter_map(|r| r.record.as_ref()).collect();
    let columns = csv_columns(&records);

    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(&columns)
        .map_err(|e| ExtractError::CsvExport(e.to_string()))?;

    for record in &records {
        let row: Vec<String> = columns.iter().map(|col| cell(record, col)).collect();
        writer
            .write_record(&row)
            .map_err(|e| ExtractError::CsvExport(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExtractError::CsvExport(e.to_string()))
}

/// Serialise the batch's successful records as a pretty-printed JSON array.
///
/// Always an array, even for a single record, so consumers never need to
/// sniff the shape.
pub fn to_json(results: &[DocumentResult]) -> Result<Vec<u8>, ExtractError> {
    let records: Vec<&PolicyRecord> = results.iter().filter_map(|r| r.record.as_ref()).collect();
    serde_json::to_vec_pretty(&records).map_err(|e| ExtractError::Internal(e.to_string()))
}

/// Write CSV output to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_csv(
    results: &[DocumentResult],
    path: impl AsRef<Path>,
) -> Result<(), ExtractError> {
    let bytes = to_csv(results)?;
    write_atomic(&bytes, path.as_ref()).await
}

/// Write JSON output to a file, atomically like [`write_csv`].
pub async fn write_json(
    results: &[DocumentResult],
    path: impl AsRef<Path>,
) -> Result<(), ExtractError> {
    let bytes = to_json(results)?;
    write_atomic(&bytes, path.as_ref()).await
}

async fn write_atomic(bytes: &[u8], path: &Path) -> Result<(), ExtractError> {
    let write_err = |source: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

/// Fixed preferred columns, then the sorted union of extra keys.
fn csv_columns(records: &[&PolicyRecord]) -> Vec<String> {
    let mut columns: Vec<String> = CANONICAL_FIELDS.iter().map(|f| f.to_string()).collect();

    let extras: BTreeSet<&String> = records.iter().flat_map(|r| r.extra.keys()).collect();
    columns.extend(
        extras
            .into_iter()
            .filter(|k| !CANONICAL_FIELDS.contains(&k.as_str()))
            .cloned(),
    );
    columns
}

fn cell(record: &PolicyRecord, column: &str) -> String {
    match record.canonical_value(column) {
        Some(v) => v.to_cell(),
        None => record.extra.get(column).map(|v| v.to_cell()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;
    use crate::record::FieldValue;

    fn result_with(record: Option<PolicyRecord>, error: Option<DocumentError>) -> DocumentResult {
        DocumentResult {
            index: 0,
            filename: "doc.pdf".into(),
            record,
            error,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            retries: 0,
        }
    }

    fn motor_record() -> PolicyRecord {
        PolicyRecord {
            customer_name: Some("A. Sharma".into()),
            policy_number: Some("P1".into()),
            insurance_type: Some("motor".into()),
            od_amount: FieldValue::Text("500".into()),
            ..Default::default()
        }
    }

    fn parse_csv(bytes: &[u8]) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes);
        reader
            .records()
            .map(|r| r.unwrap().iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_starts_with_preferred_order() {
        let csv = to_csv(&[result_with(Some(motor_record()), None)]).unwrap();
        let rows = parse_csv(&csv);
        assert_eq!(
            &rows[0][..CANONICAL_FIELDS.len()],
            &CANONICAL_FIELDS.map(String::from)[..]
        );
    }

    #[test]
    fn heterogeneous_extras_union_into_one_header() {
        let mut a = motor_record();
        a.extra.insert("vehicle_no".into(), "KA01".into());
        let mut b = PolicyRecord::default();
        b.extra.insert("agent_code".into(), "AG9".into());

        let csv = to_csv(&[
            result_with(Some(a), None),
            result_with(Some(b), None),
        ])
        .unwrap();
        let rows = parse_csv(&csv);

        // Extras sorted after the canonical set.
        let tail = &rows[0][CANONICAL_FIELDS.len()..];
        assert_eq!(tail, ["agent_code".to_string(), "vehicle_no".to_string()]);

        // Every row has a value slot for every column.
        for row in &rows[1..] {
            assert_eq!(row.len(), rows[0].len());
        }
        // Record `a` has no agent_code; its cell is empty, not missing.
        assert_eq!(rows[1][rows[0].len() - 2], "");
        assert_eq!(rows[1][rows[0].len() - 1], "KA01");
    }

    #[test]
    fn failed_documents_are_omitted_from_exports() {
        let results = vec![
            result_with(Some(motor_record()), None),
            result_with(
                None,
                Some(DocumentError::UnreadablePdf {
                    detail: "bad".into(),
                }),
            ),
        ];

        let rows = parse_csv(&to_csv(&results).unwrap());
        assert_eq!(rows.len(), 2, "header + one data row");

        let json: serde_json::Value = serde_json::from_slice(&to_json(&results).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_batch_exports_header_only() {
        let rows = parse_csv(&to_csv(&[]).unwrap());
        assert_eq!(rows.len(), 1);
        let json: serde_json::Value = serde_json::from_slice(&to_json(&[]).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!([]));
    }

    #[test]
    fn json_is_always_an_array() {
        let json: serde_json::Value =
            serde_json::from_slice(&to_json(&[result_with(Some(motor_record()), None)]).unwrap())
                .unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["policy_number"], "P1");
    }

    #[tokio::test]
    async fn write_csv_is_atomic_and_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/extracted.csv");
        write_csv(&[result_with(Some(motor_record()), None)], &path)
            .await
            .unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, to_csv(&[result_with(Some(motor_record()), None)]).unwrap());
        assert!(!path.with_extension("tmp").exists());
    }
}
