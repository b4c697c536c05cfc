use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::decode::{event_from_value, parse_reader, parse_slice, Document, RECORDS_FIELD};
use crate::error::{json_type, DecodeError};
use crate::model::Event;

/// What to do when one record in an envelope fails to decode.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    #[default]
    FailFast,
    SkipAndReport,
}

#[derive(Debug)]
pub struct RecordFailure {
    pub index: usize,
    pub error: DecodeError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successfully decoded records, in envelope order.
    pub events: Vec<Event>,
    pub failures: Vec<RecordFailure>,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn decode_records_with(bytes: &[u8], policy: BatchPolicy) -> Result<BatchOutcome, DecodeError> {
    let raw = parse_slice(bytes)?;
    records_from_value(&raw, policy)
}

pub fn decode_records_reader_with<R: Read>(
    reader: R,
    policy: BatchPolicy,
) -> Result<BatchOutcome, DecodeError> {
    let raw = parse_reader(reader)?;
    records_from_value(&raw, policy)
}

/// Accepts either input form. Only envelope records are subject to `policy`;
/// a bare event that fails to decode is always fatal.
pub fn decode_document_with(
    bytes: &[u8],
    policy: BatchPolicy,
) -> Result<(Document, Vec<RecordFailure>), DecodeError> {
    let raw = parse_slice(bytes)?;
    if raw.get(RECORDS_FIELD).is_some() {
        let outcome = records_from_value(&raw, policy)?;
        Ok((Document::Envelope(outcome.events), outcome.failures))
    } else {
        event_from_value(&raw).map(|event| (Document::Single(event), Vec::new()))
    }
}

/// Decodes each record of an already-parsed envelope independently. The
/// envelope itself being malformed is fatal under either policy.
pub fn records_from_value(raw: &Value, policy: BatchPolicy) -> Result<BatchOutcome, DecodeError> {
    let entries = envelope_entries(raw)?;
    let mut outcome = BatchOutcome::default();

    for (index, entry) in entries.iter().enumerate() {
        match event_from_value(entry) {
            Ok(event) => outcome.events.push(event),
            Err(err) => {
                let error = err.within(&format!("{RECORDS_FIELD}[{index}]"));
                if policy == BatchPolicy::FailFast {
                    return Err(error);
                }
                warn!(
                    index,
                    kind = error.kind().as_str(),
                    error = %error,
                    "skipping undecodable record"
                );
                outcome.failures.push(RecordFailure { index, error });
            }
        }
    }

    debug!(
        decoded = outcome.events.len(),
        skipped = outcome.failures.len(),
        "decoded records envelope"
    );
    Ok(outcome)
}

fn envelope_entries(raw: &Value) -> Result<&[Value], DecodeError> {
    let Some(object) = raw.as_object() else {
        return Err(DecodeError::TypeMismatch {
            path: ".".to_string(),
            message: format!(
                "invalid type: {}, expected a {RECORDS_FIELD} envelope object",
                json_type(raw)
            ),
        });
    };
    match object.get(RECORDS_FIELD) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(entries)) => Ok(entries),
        Some(other) => Err(DecodeError::TypeMismatch {
            path: RECORDS_FIELD.to_string(),
            message: format!("invalid type: {}, expected a sequence", json_type(other)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;

    const MIXED: &[u8] = br#"{"Records": [
        {"eventID": "a", "requestParameters": {"tagSpecificationSet": "HIDDEN_DUE_TO_SECURITY_REASONS"}},
        {"eventID": "b", "requestParameters": {"tagSpecificationSet": "REDACTED"}},
        {"eventID": "c", "readOnly": "no"},
        {"eventID": "d"}
    ]}"#;

    #[test]
    fn fail_fast_stops_at_first_bad_record() {
        let err = decode_records_with(MIXED, BatchPolicy::FailFast).expect_err("reject");

        assert_eq!(err.kind(), DecodeErrorKind::UnexpectedSentinel);
        assert_eq!(
            err.path(),
            Some("Records[1].requestParameters.tagSpecificationSet")
        );
    }

    #[test]
    fn skip_and_report_keeps_good_records_in_order() {
        let outcome = decode_records_with(MIXED, BatchPolicy::SkipAndReport).expect("outcome");

        let ids: Vec<&str> = outcome.events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        assert!(!outcome.is_clean());

        let failed: Vec<(usize, DecodeErrorKind)> = outcome
            .failures
            .iter()
            .map(|f| (f.index, f.error.kind()))
            .collect();
        assert_eq!(
            failed,
            vec![
                (1, DecodeErrorKind::UnexpectedSentinel),
                (2, DecodeErrorKind::TypeMismatch)
            ]
        );
        assert_eq!(outcome.failures[1].error.path(), Some("Records[2].readOnly"));
    }

    #[test]
    fn missing_records_key_is_an_empty_envelope() {
        let outcome = decode_records_with(b"{}", BatchPolicy::FailFast).expect("outcome");

        assert!(outcome.events.is_empty());
        assert!(outcome.is_clean());
    }

    #[test]
    fn non_array_records_is_fatal_under_either_policy() {
        for policy in [BatchPolicy::FailFast, BatchPolicy::SkipAndReport] {
            let err = decode_records_with(br#"{"Records": {"eventID": "a"}}"#, policy)
                .expect_err("reject");

            assert_eq!(err.kind(), DecodeErrorKind::TypeMismatch);
            assert_eq!(err.path(), Some("Records"));
        }
    }

    #[test]
    fn non_object_record_reports_its_index() {
        let outcome = decode_records_with(br#"{"Records": [{}, 42]}"#, BatchPolicy::SkipAndReport)
            .expect("outcome");

        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert_eq!(outcome.failures[0].error.path(), Some("Records[1]"));
    }

    #[test]
    fn document_with_policy_skips_inside_envelope_only() {
        let (document, failures) =
            decode_document_with(MIXED, BatchPolicy::SkipAndReport).expect("outcome");
        assert!(document.is_envelope());
        assert_eq!(document.events().len(), 2);
        assert_eq!(failures.len(), 2);

        let err = decode_document_with(br#"{"readOnly": 1}"#, BatchPolicy::SkipAndReport)
            .expect_err("bare event failure is fatal");
        assert_eq!(err.kind(), DecodeErrorKind::TypeMismatch);
        assert_eq!(err.path(), Some("readOnly"));
    }

    #[test]
    fn policy_reads_from_snake_case() {
        let policy: BatchPolicy = serde_json::from_str("\"skip_and_report\"").expect("decode");

        assert_eq!(policy, BatchPolicy::SkipAndReport);
    }
}
