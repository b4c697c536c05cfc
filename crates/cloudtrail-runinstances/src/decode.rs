use std::io::Read;

use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_path_to_error::{Path, Segment};
use tracing::debug;

use crate::batch::{records_from_value, BatchPolicy};
use crate::error::{json_type, DecodeError};
use crate::model::Event;
use crate::tags::TagSpecificationSet;

pub const TAG_SPECIFICATION_FIELD: &str = "tagSpecificationSet";
pub const RECORDS_FIELD: &str = "Records";

/// A decoded input, which is either one bare event or a `Records` envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Single(Event),
    Envelope(Vec<Event>),
}

impl Document {
    pub fn events(&self) -> &[Event] {
        match self {
            Document::Single(event) => std::slice::from_ref(event),
            Document::Envelope(events) => events,
        }
    }

    pub fn into_events(self) -> Vec<Event> {
        match self {
            Document::Single(event) => vec![event],
            Document::Envelope(events) => events,
        }
    }

    pub fn is_envelope(&self) -> bool {
        matches!(self, Document::Envelope(_))
    }
}

pub fn decode_event(bytes: &[u8]) -> Result<Event, DecodeError> {
    let raw = parse_slice(bytes)?;
    event_from_value(&raw)
}

pub fn decode_event_reader<R: Read>(reader: R) -> Result<Event, DecodeError> {
    let raw = parse_reader(reader)?;
    event_from_value(&raw)
}

/// Decodes a `Records` envelope, failing on the first bad record.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<Event>, DecodeError> {
    let raw = parse_slice(bytes)?;
    records_from_value(&raw, BatchPolicy::FailFast).map(|outcome| outcome.events)
}

pub fn decode_records_reader<R: Read>(reader: R) -> Result<Vec<Event>, DecodeError> {
    let raw = parse_reader(reader)?;
    records_from_value(&raw, BatchPolicy::FailFast).map(|outcome| outcome.events)
}

/// Decodes either input form. An object carrying a top-level `Records` key is
/// read as an envelope; anything else must be a single event.
pub fn decode_document(bytes: &[u8]) -> Result<Document, DecodeError> {
    let raw = parse_slice(bytes)?;
    document_from_value(&raw)
}

pub fn decode_document_reader<R: Read>(reader: R) -> Result<Document, DecodeError> {
    let raw = parse_reader(reader)?;
    document_from_value(&raw)
}

pub fn document_from_value(raw: &Value) -> Result<Document, DecodeError> {
    if raw.get(RECORDS_FIELD).is_some() {
        records_from_value(raw, BatchPolicy::FailFast)
            .map(|outcome| Document::Envelope(outcome.events))
    } else {
        event_from_value(raw).map(Document::Single)
    }
}

pub fn event_from_value(raw: &Value) -> Result<Event, DecodeError> {
    // Serde would also build a struct from a JSON array.
    if !raw.is_object() {
        return Err(DecodeError::TypeMismatch {
            path: ".".to_string(),
            message: format!("invalid type: {}, expected an event object", json_type(raw)),
        });
    }
    let event: Event = typed_from_value(raw)?;
    debug!(
        event_id = %event.event_id,
        event_name = %event.event_name,
        instances = event.request_parameters.instances_set.len(),
        "decoded event"
    );
    Ok(event)
}

pub(crate) fn parse_slice(bytes: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(bytes).map_err(DecodeError::from_parse)
}

pub(crate) fn parse_reader<R: Read>(reader: R) -> Result<Value, DecodeError> {
    serde_json::from_reader(reader).map_err(DecodeError::from_parse)
}

fn typed_from_value<T: DeserializeOwned>(raw: &Value) -> Result<T, DecodeError> {
    serde_path_to_error::deserialize(raw).map_err(|err| classify_failure(raw, err))
}

// Serde only carries a message out of the tag decoder, so a failure located
// at the tag field is decoded again from the raw value to recover its kind.
fn classify_failure(raw: &Value, err: serde_path_to_error::Error<serde_json::Error>) -> DecodeError {
    let path = err.path().to_string();
    if let Some(field) = tag_field_value(raw, err.path()) {
        if let Err(tag_err) = TagSpecificationSet::classify(field) {
            return DecodeError::from_tag_spec(path, tag_err);
        }
    }
    DecodeError::TypeMismatch {
        path,
        message: err.into_inner().to_string(),
    }
}

fn tag_field_value<'a>(raw: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = raw;
    let mut last_key = None;
    for segment in path.iter() {
        current = match segment {
            Segment::Map { key } => {
                last_key = Some(key.as_str());
                current.get(key.as_str())?
            }
            Segment::Seq { index } => {
                last_key = None;
                current.get(*index)?
            }
            _ => return None,
        };
    }
    (last_key == Some(TAG_SPECIFICATION_FIELD)).then_some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;

    #[test]
    fn type_mismatch_names_the_field_path() {
        let err = decode_event(
            br#"{"requestParameters": {"instancesSet": {"items": [{"minCount": "one"}]}}}"#,
        )
        .expect_err("reject");

        assert_eq!(err.kind(), DecodeErrorKind::TypeMismatch);
        assert_eq!(
            err.path(),
            Some("requestParameters.instancesSet.items[0].minCount")
        );
    }

    #[test]
    fn tag_failures_keep_their_kind_and_path() {
        let err = decode_event(br#"{"requestParameters": {"tagSpecificationSet": "HIDDEN"}}"#)
            .expect_err("reject");

        match err {
            DecodeError::UnexpectedSentinel { path, value } => {
                assert_eq!(path, "requestParameters.tagSpecificationSet");
                assert_eq!(value, "HIDDEN");
            }
            other => panic!("expected unexpected sentinel, got {other:?}"),
        }
    }

    #[test]
    fn type_mismatch_inside_tag_items_is_a_shape_error() {
        let err = decode_event(
            br#"{"requestParameters": {"tagSpecificationSet": {"items": [{"tags": [{"key": 7}]}]}}}"#,
        )
        .expect_err("reject");

        assert_eq!(err.kind(), DecodeErrorKind::Shape);
        assert_eq!(err.path(), Some("requestParameters.tagSpecificationSet"));
    }

    #[test]
    fn top_level_array_is_not_an_event() {
        for raw in [&b"[]"[..], &b"[\"1.08\"]"[..], &b"\"RunInstances\""[..]] {
            let err = decode_event(raw).expect_err("reject");

            assert_eq!(err.kind(), DecodeErrorKind::TypeMismatch);
            assert_eq!(err.path(), Some("."));
        }
    }

    #[test]
    fn document_detects_envelope() {
        let single = decode_document(br#"{"eventName": "RunInstances"}"#).expect("single");
        let envelope =
            decode_document(br#"{"Records": [{"eventName": "RunInstances"}]}"#).expect("envelope");

        assert!(!single.is_envelope());
        assert_eq!(single.events().len(), 1);
        assert!(envelope.is_envelope());
        assert_eq!(envelope.into_events()[0].event_name, "RunInstances");
    }
}
