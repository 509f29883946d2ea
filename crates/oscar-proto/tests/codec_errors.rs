//! Codec configuration errors surface at marshal/unmarshal time.
//!
//! The derive turns unsupported field shapes into generated bodies that fail
//! fast through `WireError`, mirroring what a runtime reflection walk would
//! report. These records are deliberately malformed.

use bytes::BytesMut;
use oscar_proto::wire::{Marshal, WireError, from_bytes, to_bytes};
use oscar_proto::{OscarMarshal, OscarUnmarshal};

#[derive(Debug, Default, OscarMarshal, OscarUnmarshal)]
struct SignedField {
    delta: i16,
}

#[test]
fn marshal_rejects_signed_integer_kind() {
    let err = to_bytes(&SignedField::default()).unwrap_err();
    assert_eq!(err, WireError::UnsupportedKind { kind: "i16", field: "delta" });
}

#[test]
fn unmarshal_rejects_signed_integer_kind() {
    let err = from_bytes::<SignedField>(&[0x00, 0x01]).unwrap_err();
    assert_eq!(err, WireError::UnsupportedKind { kind: "i16", field: "delta" });
}

#[derive(Debug, Default, OscarMarshal, OscarUnmarshal)]
struct BothPrefixes {
    #[oscar(len_prefix = "uint16", count_prefix = "uint16")]
    entries: Vec<u16>,
}

#[test]
fn marshal_rejects_conflicting_prefixes() {
    let record = BothPrefixes { entries: vec![1, 2, 3] };
    let err = to_bytes(&record).unwrap_err();
    assert_eq!(err, WireError::ConflictingPrefix { field: "entries" });
}

#[derive(Debug, Default, OscarMarshal, OscarUnmarshal)]
struct WidePrefix {
    #[oscar(len_prefix = "uint128")]
    body: String,
}

#[test]
fn marshal_rejects_unknown_prefix_width() {
    let record = WidePrefix { body: "hello".to_string() };
    let err = to_bytes(&record).unwrap_err();
    assert_eq!(err, WireError::UnknownPrefix { width: "uint128", field: "body" });
}

#[test]
fn unmarshal_rejects_unknown_prefix_width() {
    let err = from_bytes::<WidePrefix>(b"anything").unwrap_err();
    assert_eq!(err, WireError::UnknownPrefix { width: "uint128", field: "body" });
}

#[test]
fn nothing_is_written_before_the_failure_is_reported() {
    let mut dst = BytesMut::new();
    let record = BothPrefixes { entries: vec![1] };
    assert!(record.marshal(&mut dst).is_err());
    assert!(dst.is_empty());
}

#[derive(Debug, Default, OscarMarshal, OscarUnmarshal)]
struct OversizedName {
    #[oscar(len_prefix = "uint8")]
    name: String,
}

#[test]
fn region_larger_than_prefix_overflows() {
    let record = OversizedName { name: "x".repeat(300) };
    let err = to_bytes(&record).unwrap_err();
    assert_eq!(err, WireError::PrefixOverflow { len: 300, max: 255 });
}
