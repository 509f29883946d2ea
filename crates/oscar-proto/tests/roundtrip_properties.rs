//! Property-based round-trip tests for the wire codec.
//!
//! For every record type R and value v, `unmarshal(marshal(v)) == v`. The
//! strategies generate arbitrary values within wire limits; shrinking finds
//! minimal counterexamples on failure.

use bytes::Bytes;
use oscar_proto::snacs::TlvUserInfo;
use oscar_proto::snacs::feedbag::FeedbagItem;
use oscar_proto::snacs::oservice::{RateClass, RateGroup, RateParamsReply, SnacPair};
use oscar_proto::tlv::{Tlv, TlvBlock, TlvLBlock, TlvRestBlock};
use oscar_proto::wire::{from_bytes, to_bytes};
use oscar_proto::{OscarMarshal, OscarUnmarshal};
use proptest::prelude::{Strategy, any, prop, prop_assert_eq, proptest};

/// Strategy for one TLV with a bounded opaque value.
fn arbitrary_tlv() -> impl Strategy<Value = Tlv> {
    (any::<u16>(), prop::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(tag, value)| Tlv::new(tag, value))
}

fn arbitrary_tlv_vec() -> impl Strategy<Value = Vec<Tlv>> {
    prop::collection::vec(arbitrary_tlv(), 0..8)
}

/// Printable screen names up to the u8-prefix limit.
fn arbitrary_screen_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,16}"
}

fn arbitrary_user_info() -> impl Strategy<Value = TlvUserInfo> {
    (arbitrary_screen_name(), any::<u16>(), arbitrary_tlv_vec()).prop_map(
        |(screen_name, warning_level, tlvs)| TlvUserInfo {
            screen_name,
            warning_level,
            tlv_block: TlvBlock::from(tlvs),
        },
    )
}

fn arbitrary_feedbag_item() -> impl Strategy<Value = FeedbagItem> {
    (arbitrary_screen_name(), any::<u16>(), any::<u16>(), 0u16..4, arbitrary_tlv_vec()).prop_map(
        |(name, group_id, item_id, class_id, tlvs)| FeedbagItem {
            name,
            group_id,
            item_id,
            class_id,
            attributes: TlvLBlock::from(tlvs),
        },
    )
}

#[test]
fn prop_tlv_scalars_roundtrip() {
    proptest!(|(tag in any::<u16>(), v16 in any::<u16>(), v32 in any::<u32>())| {
        let tlv = Tlv::new_u16(tag, v16);
        let parsed: Tlv = from_bytes(&to_bytes(&tlv).unwrap()).unwrap();
        prop_assert_eq!(parsed.value_u16(), Some(v16));

        let tlv = Tlv::new_u32(tag, v32);
        let parsed: Tlv = from_bytes(&to_bytes(&tlv).unwrap()).unwrap();
        prop_assert_eq!(parsed.value_u32(), Some(v32));
    });
}

/// Test-local record exercising both string prefix widths.
#[derive(Debug, Clone, PartialEq, OscarMarshal, OscarUnmarshal)]
struct PrefixedStrings {
    #[oscar(len_prefix = "uint8")]
    short: String,
    #[oscar(len_prefix = "uint16")]
    long: String,
}

#[test]
fn prop_prefixed_strings_roundtrip() {
    proptest!(|(short in "[ -~]{0,32}", long in "[ -~]{0,512}")| {
        let record = PrefixedStrings { short, long };
        let parsed: PrefixedStrings = from_bytes(&to_bytes(&record).unwrap()).unwrap();
        prop_assert_eq!(parsed, record);
    });
}

#[test]
fn prop_tlv_containers_roundtrip() {
    proptest!(|(tlvs in arbitrary_tlv_vec())| {
        let rest = TlvRestBlock::from(tlvs.clone());
        prop_assert_eq!(from_bytes::<TlvRestBlock>(&to_bytes(&rest).unwrap()).unwrap(), rest);

        let counted = TlvBlock::from(tlvs.clone());
        prop_assert_eq!(from_bytes::<TlvBlock>(&to_bytes(&counted).unwrap()).unwrap(), counted);

        let measured = TlvLBlock::from(tlvs);
        prop_assert_eq!(from_bytes::<TlvLBlock>(&to_bytes(&measured).unwrap()).unwrap(), measured);
    });
}

/// Test-local record: struct slice under a u16 total-byte-length prefix.
#[derive(Debug, Clone, PartialEq, OscarMarshal, OscarUnmarshal)]
struct MeasuredItems {
    #[oscar(len_prefix = "uint16")]
    items: Vec<FeedbagItem>,
    trailer: u32,
}

#[test]
fn prop_len_prefixed_struct_slice_roundtrip() {
    proptest!(|(
        items in prop::collection::vec(arbitrary_feedbag_item(), 0..5),
        trailer in any::<u32>(),
    )| {
        let record = MeasuredItems { items, trailer };
        let parsed: MeasuredItems = from_bytes(&to_bytes(&record).unwrap()).unwrap();
        prop_assert_eq!(parsed, record);
    });
}

#[test]
fn prop_count_prefixed_struct_slice_roundtrip() {
    proptest!(|(
        items in prop::collection::vec(arbitrary_feedbag_item(), 0..5),
        last_update in any::<u32>(),
    )| {
        let reply = oscar_proto::snacs::feedbag::Reply { version: 0, items, last_update };
        let parsed: oscar_proto::snacs::feedbag::Reply =
            from_bytes(&to_bytes(&reply).unwrap()).unwrap();
        prop_assert_eq!(parsed, reply);
    });
}

#[test]
fn prop_user_info_roundtrip() {
    proptest!(|(info in arbitrary_user_info())| {
        let parsed: TlvUserInfo = from_bytes(&to_bytes(&info).unwrap()).unwrap();
        prop_assert_eq!(parsed, info);
    });
}

/// Test-local record: fixed 8-byte cookie array.
#[derive(Debug, Clone, PartialEq, OscarMarshal, OscarUnmarshal)]
struct CookieRecord {
    cookie: [u8; 8],
    channel_id: u16,
}

#[test]
fn prop_fixed_cookie_roundtrip() {
    proptest!(|(cookie in any::<[u8; 8]>(), channel_id in any::<u16>())| {
        let record = CookieRecord { cookie, channel_id };
        let bytes = to_bytes(&record).unwrap();
        prop_assert_eq!(bytes.len(), 10);
        prop_assert_eq!(from_bytes::<CookieRecord>(&bytes).unwrap(), record);
    });
}

#[test]
fn rate_params_reply_roundtrip() {
    let classes = (1u16..=3)
        .map(|id| RateClass {
            id,
            window_size: 80,
            clear_level: 2510,
            alert_level: 2000,
            limit_level: 1500,
            disconnect_level: 800,
            current_level: 2510,
            max_level: 6000,
            last_time: 0,
            current_state: 0,
        })
        .collect::<Vec<_>>();
    let groups = vec![RateGroup {
        id: 1,
        pairs: vec![SnacPair { food_group: 0x0001, subgroup: 0x0002 }],
    }];
    let reply = RateParamsReply { classes, groups };
    let parsed: RateParamsReply = from_bytes(&to_bytes(&reply).unwrap()).unwrap();
    assert_eq!(parsed, reply);
}

#[test]
fn opaque_bytes_consume_the_rest_of_the_region() {
    let payload = Bytes::copy_from_slice(b"last field takes everything");
    let bytes = to_bytes(&payload).unwrap();
    let parsed: Bytes = from_bytes(&bytes).unwrap();
    assert_eq!(parsed, payload);
}
