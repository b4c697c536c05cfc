//! `tagSpecificationSet` decoding.
//!
//! CloudTrail writes this field either as a normal `{"items": [...]}` set or,
//! when it redacts the request, as the bare string
//! `"HIDDEN_DUE_TO_SECURITY_REASONS"`. Nothing on the wire says which one is
//! coming, so the decoder looks at the value's shape: a string must be the
//! sentinel, an object must parse as the structured set, and anything else is
//! rejected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{excerpt, json_type, TagSpecError, RAW_EXCERPT_LIMIT};
use crate::model::objects_or_empty;

pub const HIDDEN_SENTINEL: &str = "HIDDEN_DUE_TO_SECURITY_REASONS";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagSpecificationSet {
    /// Redacted upstream; the real tags are unknown.
    Hidden,
    Tags(Vec<TagSpecificationItem>),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TagSpecificationItem {
    pub resource_type: String,
    #[serde(deserialize_with = "objects_or_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct StructuredSet {
    #[serde(deserialize_with = "objects_or_empty")]
    items: Vec<TagSpecificationItem>,
}

#[derive(Serialize)]
struct StructuredSetRef<'a> {
    items: &'a [TagSpecificationItem],
}

impl TagSpecificationSet {
    /// Decodes an already-parsed field value.
    pub fn decode(raw: &Value) -> Result<Self, TagSpecError> {
        let decoded = Self::classify(raw);
        log_outcome(&decoded);
        decoded
    }

    /// Decodes the field from its raw JSON text. Text that is not JSON at all
    /// matches neither variant.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TagSpecError> {
        let decoded = serde_json::from_slice::<Value>(bytes)
            .map_err(|err| TagSpecError::shape(&String::from_utf8_lossy(bytes), err))
            .and_then(|raw| Self::classify(&raw));
        log_outcome(&decoded);
        decoded
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, TagSpecificationSet::Hidden)
    }

    /// Tag groups in wire order; `None` when redacted.
    pub fn tags(&self) -> Option<&[TagSpecificationItem]> {
        match self {
            TagSpecificationSet::Hidden => None,
            TagSpecificationSet::Tags(items) => Some(items.as_slice()),
        }
    }

    /// Bare string first, structured set second. Serde would happily read a
    /// struct out of a JSON array, so only objects reach the second attempt.
    pub(crate) fn classify(raw: &Value) -> Result<Self, TagSpecError> {
        match raw {
            Value::String(text) => Self::from_sentinel(text.clone()),
            Value::Object(_) => StructuredSet::deserialize(raw)
                .map(|set| TagSpecificationSet::Tags(set.items))
                .map_err(|err| TagSpecError::shape(&raw.to_string(), err)),
            other => Err(TagSpecError::shape(
                &other.to_string(),
                format!(
                    "invalid type: {}, expected a string or an object",
                    json_type(other)
                ),
            )),
        }
    }

    fn from_sentinel(text: String) -> Result<Self, TagSpecError> {
        if text == HIDDEN_SENTINEL {
            Ok(TagSpecificationSet::Hidden)
        } else {
            Err(TagSpecError::UnexpectedSentinel(text))
        }
    }
}

fn log_outcome(decoded: &Result<TagSpecificationSet, TagSpecError>) {
    match decoded {
        Ok(TagSpecificationSet::Hidden) => debug!("tag specification set is hidden"),
        Ok(TagSpecificationSet::Tags(items)) => {
            debug!(groups = items.len(), "tag specification set decoded")
        }
        Err(TagSpecError::UnexpectedSentinel(value)) => warn!(
            value = %excerpt(value, RAW_EXCERPT_LIMIT),
            "tag specification set holds an unrecognized sentinel string"
        ),
        Err(err @ TagSpecError::Shape { .. }) => {
            debug!(error = %err, "tag specification set rejected")
        }
    }
}

impl<'de> Deserialize<'de> for TagSpecificationSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Self::decode(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for TagSpecificationSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            TagSpecificationSet::Hidden => serializer.serialize_str(HIDDEN_SENTINEL),
            TagSpecificationSet::Tags(items) => StructuredSetRef {
                items: items.as_slice(),
            }
            .serialize(serializer),
        }
    }
}
