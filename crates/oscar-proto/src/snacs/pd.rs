//! Permit/deny (food group `0x0009`).
//!
//! Advertised by host-online; only the rights query is served. Permit/deny
//! state itself lives in feedbag class-2/class-3 items.

use crate::tlv::TlvRestBlock;
use crate::{OscarMarshal, OscarUnmarshal};

/// Client asks for permit/deny limits.
pub const SUBGROUP_RIGHTS_QUERY: u16 = 0x0002;
/// Canned permissive limits.
pub const SUBGROUP_RIGHTS_REPLY: u16 = 0x0003;

/// Rights-reply TLV: maximum permit entries.
pub const RIGHTS_TLV_MAX_PERMITS: u16 = 0x0001;
/// Rights-reply TLV: maximum deny entries.
pub const RIGHTS_TLV_MAX_DENIES: u16 = 0x0002;

/// Rights reply body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct RightsReply {
    /// Limit TLVs
    pub tlvs: TlvRestBlock,
}
