//! Typed decoding of CloudTrail `RunInstances` audit records.

pub mod batch;
pub mod decode;
pub mod error;
pub mod model;
pub mod tags;

pub use batch::{
    decode_document_with, decode_records_reader_with, decode_records_with, records_from_value,
    BatchOutcome, BatchPolicy, RecordFailure,
};
pub use decode::{
    decode_document, decode_document_reader, decode_event, decode_event_reader, decode_records,
    decode_records_reader, document_from_value, event_from_value, Document,
};
pub use error::{DecodeError, DecodeErrorKind, TagSpecError, RAW_EXCERPT_LIMIT};
pub use model::{
    BlockDeviceItem, Ebs, Event, GroupItem, IamInstanceProfile, InstanceItem,
    InstanceMarketOptions, ItemSet, Monitoring, NetworkInterfaceItem, Records, RequestParameters,
    ResponseElements, SessionAttributes, SessionContext, SessionIssuer, SpotOptions, TlsDetails,
    UserIdentity,
};
pub use tags::{Tag, TagSpecificationItem, TagSpecificationSet, HIDDEN_SENTINEL};
