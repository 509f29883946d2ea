//! Buddy (food group `0x0003`): arrival and departure notifications.

use super::TlvUserInfo;
use crate::tlv::TlvRestBlock;
use crate::{OscarMarshal, OscarUnmarshal};

/// Client asks for buddy-list limits.
pub const SUBGROUP_RIGHTS_QUERY: u16 = 0x0002;
/// Canned permissive limits.
pub const SUBGROUP_RIGHTS_REPLY: u16 = 0x0003;
/// A watched user came online (or refreshed presence).
pub const SUBGROUP_ARRIVED: u16 = 0x000B;
/// A watched user went offline.
pub const SUBGROUP_DEPARTED: u16 = 0x000C;

/// Rights-reply TLV: maximum buddy-list entries.
pub const RIGHTS_TLV_MAX_BUDDIES: u16 = 0x0001;
/// Rights-reply TLV: maximum watchers.
pub const RIGHTS_TLV_MAX_WATCHERS: u16 = 0x0002;

/// Rights query body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct RightsQuery {
    /// Query TLVs
    pub tlvs: TlvRestBlock,
}

/// Rights reply body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct RightsReply {
    /// Limit TLVs
    pub tlvs: TlvRestBlock,
}

/// Arrival notification. Carries the full user-info TLV list.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct Arrived {
    /// Presence record of the user who arrived
    pub user_info: TlvUserInfo,
}

/// Departure notification. Screen name and warning only; the TLV block is
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct Departed {
    /// Minimal presence record of the user who left
    pub user_info: TlvUserInfo,
}
