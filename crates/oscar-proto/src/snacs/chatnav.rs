//! Chat navigation (food group `0x000D`): room discovery and creation.

use crate::tlv::TlvRestBlock;
use crate::{OscarMarshal, OscarUnmarshal};

/// Client asks for chat limits and exchange metadata.
pub const SUBGROUP_RIGHTS_QUERY: u16 = 0x0002;
/// Client creates (or re-requests) a room.
pub const SUBGROUP_CREATE_ROOM: u16 = 0x0008;
/// Navigation info reply.
pub const SUBGROUP_NAV_INFO: u16 = 0x0009;

/// Nav-info TLV: maximum rooms a user may occupy.
pub const TLV_MAX_ROOMS: u16 = 0x0002;
/// Nav-info TLV: marshaled exchange description.
pub const TLV_EXCHANGE_INFO: u16 = 0x0003;
/// Nav-info TLV: marshaled [`crate::snacs::chat::RoomInfo`] of the created
/// room.
pub const TLV_ROOM_INFO: u16 = 0x0004;

/// Navigation info reply body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct NavInfo {
    /// Limit, exchange, and room TLVs
    pub tlvs: TlvRestBlock,
}
