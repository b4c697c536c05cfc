//! Schema model for the `RunInstances` CloudTrail record.
//!
//! Field names follow the wire contract exactly; absent fields take their
//! zero value and absent sets decode to empty item lists.

use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::tags::{TagSpecificationItem, TagSpecificationSet};

/// Top-level envelope as written by CloudTrail log delivery.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Records {
    #[serde(rename = "Records", default, deserialize_with = "objects_or_empty")]
    pub records: Vec<Event>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Event {
    pub event_version: String,
    #[serde(deserialize_with = "object_or_default")]
    pub user_identity: UserIdentity,
    pub event_time: String,
    pub event_source: String,
    pub event_name: String,
    pub aws_region: String,
    #[serde(rename = "sourceIPAddress")]
    pub source_ip_address: String,
    pub user_agent: String,
    #[serde(deserialize_with = "object_or_default")]
    pub request_parameters: RequestParameters,
    #[serde(deserialize_with = "object_or_default")]
    pub response_elements: ResponseElements,
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub read_only: bool,
    pub event_type: String,
    pub management_event: bool,
    pub recipient_account_id: String,
    pub event_category: String,
    #[serde(deserialize_with = "object_or_default")]
    pub tls_details: TlsDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Event {
    /// True when the provider recorded a failed call.
    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserIdentity {
    #[serde(rename = "type")]
    pub identity_type: String,
    pub principal_id: String,
    pub arn: String,
    pub account_id: String,
    pub access_key_id: String,
    #[serde(deserialize_with = "object_or_default")]
    pub session_context: SessionContext,
}

/// Present when the caller acted through an assumed role.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionContext {
    #[serde(deserialize_with = "object_or_default")]
    pub session_issuer: SessionIssuer,
    /// Not standardized upstream; kept as an insertion-ordered JSON bag.
    #[serde(deserialize_with = "object_or_default")]
    pub web_id_federation_data: Map<String, Value>,
    #[serde(deserialize_with = "object_or_default")]
    pub attributes: SessionAttributes,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionIssuer {
    #[serde(rename = "type")]
    pub issuer_type: String,
    pub principal_id: String,
    pub arn: String,
    pub account_id: String,
    pub user_name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionAttributes {
    pub creation_date: String,
    pub mfa_authenticated: String,
}

/// What the caller asked for.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestParameters {
    #[serde(deserialize_with = "object_or_default")]
    pub instances_set: ItemSet<InstanceItem>,
    pub user_data: String,
    pub instance_type: String,
    #[serde(deserialize_with = "object_or_default")]
    pub block_device_mapping: ItemSet<BlockDeviceItem>,
    pub availability_zone: String,
    pub tenancy: String,
    #[serde(deserialize_with = "object_or_default")]
    pub monitoring: Monitoring,
    pub disable_api_termination: bool,
    pub disable_api_stop: bool,
    pub client_token: String,
    #[serde(deserialize_with = "object_or_default")]
    pub network_interface_set: ItemSet<NetworkInterfaceItem>,
    #[serde(deserialize_with = "object_or_default")]
    pub iam_instance_profile: IamInstanceProfile,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_tag_set"
    )]
    pub tag_specification_set: Option<TagSpecificationSet>,
    #[serde(deserialize_with = "object_or_default")]
    pub instance_market_options: InstanceMarketOptions,
}

impl RequestParameters {
    pub fn tags_hidden(&self) -> bool {
        self.tag_specification_set
            .as_ref()
            .is_some_and(TagSpecificationSet::is_hidden)
    }

    /// Tag groups as requested; empty when the field is absent or redacted.
    pub fn tag_groups(&self) -> &[TagSpecificationItem] {
        self.tag_specification_set
            .as_ref()
            .and_then(TagSpecificationSet::tags)
            .unwrap_or_default()
    }
}

/// A CloudTrail "set": an object wrapping an ordered `items` array.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, bound(deserialize = "T: Deserialize<'de>"))]
pub struct ItemSet<T> {
    #[serde(deserialize_with = "objects_or_empty")]
    pub items: Vec<T>,
}

impl<T> Default for ItemSet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> ItemSet<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

/// One requested launch in `instancesSet`. The counts describe a fulfillment
/// range, not an exact number.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceItem {
    pub image_id: String,
    pub min_count: i64,
    pub max_count: i64,
    pub key_name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockDeviceItem {
    pub device_name: String,
    #[serde(deserialize_with = "object_or_default")]
    pub ebs: Ebs,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Ebs {
    pub volume_size: i64,
    pub delete_on_termination: bool,
    pub volume_type: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Monitoring {
    pub enabled: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkInterfaceItem {
    pub device_index: i64,
    pub subnet_id: String,
    pub delete_on_termination: bool,
    pub associate_public_ip_address: bool,
    #[serde(deserialize_with = "object_or_default")]
    pub group_set: ItemSet<GroupItem>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupItem {
    pub group_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IamInstanceProfile {
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceMarketOptions {
    pub market_type: String,
    #[serde(deserialize_with = "object_or_default")]
    pub spot_options: SpotOptions,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SpotOptions {
    pub max_price: String,
    pub spot_instance_type: String,
}

/// What the provider actually allocated. Shares item shapes with
/// [`RequestParameters`] but is never merged with it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseElements {
    pub request_id: String,
    pub reservation_id: String,
    pub owner_id: String,
    #[serde(deserialize_with = "object_or_default")]
    pub group_set: ItemSet<GroupItem>,
    #[serde(deserialize_with = "object_or_default")]
    pub instances_set: ItemSet<InstanceItem>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TlsDetails {
    pub tls_version: String,
    pub cipher_suite: String,
    pub client_provided_host_header: String,
}

// CloudTrail writes `null` for whole objects (notably `responseElements` on
// failed calls); those read as the zero value, same as an absent key. A JSON
// array is refused, although derived struct visitors accept one by position.
pub(crate) fn object_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<ObjectOnly<T>>::deserialize(deserializer)?
        .map(|object| object.0)
        .unwrap_or_default())
}

/// `items` arrays of objects; `null` reads as an empty list.
pub(crate) fn objects_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<ObjectOnly<T>>>::deserialize(deserializer)?;
    Ok(items
        .unwrap_or_default()
        .into_iter()
        .map(|object| object.0)
        .collect())
}

// A missing key stays `None` through the container default. A present value,
// `null` included, has to be one of the two tag shapes.
fn present_tag_set<'de, D>(deserializer: D) -> Result<Option<TagSpecificationSet>, D::Error>
where
    D: Deserializer<'de>,
{
    TagSpecificationSet::deserialize(deserializer).map(Some)
}

struct ObjectOnly<T>(T);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ObjectOnly<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(StructAsMap(deserializer)).map(ObjectOnly)
    }
}

/// Serves struct requests through `deserialize_map`, which has no sequence form.
struct StructAsMap<D>(D);

impl<'de, D: Deserializer<'de>> Deserializer<'de> for StructAsMap<D> {
    type Error = D::Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.0.deserialize_any(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.0.deserialize_map(visitor)
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.0.deserialize_map(visitor)
    }

    fn is_human_readable(&self) -> bool {
        self.0.is_human_readable()
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct enum identifier ignored_any
    }
}
