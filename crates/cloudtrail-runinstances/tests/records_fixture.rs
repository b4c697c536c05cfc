use std::fs::File;
use std::path::PathBuf;

use cloudtrail_runinstances::{
    decode_document_reader, decode_records, decode_records_reader, decode_records_reader_with,
    BatchPolicy, DecodeErrorKind, Records, TagSpecificationSet,
};
use serde_json::json;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("runinstances.json")
}

fn open_fixture() -> File {
    File::open(fixture_path()).expect("open fixture")
}

#[test]
fn records_fixture_decodes_every_record() {
    let events = decode_records_reader(open_fixture()).expect("decode");

    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|event| event.event_name == "RunInstances"));
}

#[test]
fn records_fixture_first_record_carries_request_and_response_detail() {
    let events = decode_records_reader(open_fixture()).expect("decode");
    let event = &events[0];

    let identity = &event.user_identity;
    assert_eq!(identity.identity_type, "AssumedRole");
    assert_eq!(identity.session_context.session_issuer.user_name, "deploy");
    assert_eq!(
        identity.session_context.web_id_federation_data["attributes"],
        json!({"sub": "repo:example/infra:ref:refs/heads/main"})
    );

    let params = &event.request_parameters;
    let launch = &params.instances_set.items[0];
    assert_eq!((launch.min_count, launch.max_count), (2, 4));
    assert_eq!(params.block_device_mapping.items[0].ebs.volume_size, 40);
    assert_eq!(params.block_device_mapping.items[0].ebs.volume_type, "gp3");
    let groups: Vec<&str> = params.network_interface_set.items[0]
        .group_set
        .iter()
        .map(|group| group.group_id.as_str())
        .collect();
    assert_eq!(groups, vec!["sg-0aa11", "sg-0bb22"]);
    assert_eq!(params.instance_market_options.market_type, "spot");
    assert_eq!(params.instance_market_options.spot_options.max_price, "0.05");
    assert_eq!(params.tag_groups().len(), 2);
    assert_eq!(params.tag_groups()[1].resource_type, "volume");

    let response = &event.response_elements;
    assert_eq!(response.reservation_id, "r-0f1e2d3c4b5a69788");
    assert!(response.group_set.is_empty());
    assert_eq!(response.instances_set.len(), 2);
    assert_eq!(event.tls_details.tls_version, "TLSv1.3");
}

#[test]
fn records_fixture_second_record_is_hidden() {
    let events = decode_records_reader(open_fixture()).expect("decode");

    assert_eq!(
        events[1].request_parameters.tag_specification_set,
        Some(TagSpecificationSet::Hidden)
    );
    assert_eq!(events[1].tls_details.tls_version, "");
}

#[test]
fn records_fixture_third_record_is_a_failed_call() {
    let events = decode_records_reader(open_fixture()).expect("decode");
    let failed = &events[2];

    assert!(failed.is_error());
    assert_eq!(
        failed.error_code.as_deref(),
        Some("Client.UnauthorizedOperation")
    );
    assert!(failed.response_elements.instances_set.is_empty());
    assert_eq!(failed.request_parameters.tag_specification_set, None);
}

#[test]
fn records_fixture_document_reader_sees_envelope() {
    let document = decode_document_reader(open_fixture()).expect("decode");

    assert!(document.is_envelope());
    assert_eq!(document.events().len(), 3);
}

#[test]
fn records_fixture_matches_plain_serde_envelope() {
    let raw = std::fs::read(fixture_path()).expect("read fixture");

    let via_decoder = decode_records(&raw).expect("decode");
    let via_serde: Records = serde_json::from_slice(&raw).expect("serde decode");

    assert_eq!(via_decoder, via_serde.records);
}

#[test]
fn records_truncated_envelope_is_syntax_error_under_either_policy() {
    let raw = std::fs::read(fixture_path()).expect("read fixture");
    let truncated = &raw[..raw.len() - 10];

    for policy in [BatchPolicy::FailFast, BatchPolicy::SkipAndReport] {
        let err = decode_records_reader_with(truncated, policy).expect_err("reject");

        assert_eq!(err.kind(), DecodeErrorKind::Syntax);
    }
}
