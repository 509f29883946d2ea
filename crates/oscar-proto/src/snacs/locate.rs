//! Locate (food group `0x0002`): profiles, away messages, capabilities.

use super::TlvUserInfo;
use crate::tlv::TlvRestBlock;
use crate::{OscarMarshal, OscarUnmarshal};

/// Client asks for locate limits.
pub const SUBGROUP_RIGHTS_QUERY: u16 = 0x0002;
/// Canned permissive limits.
pub const SUBGROUP_RIGHTS_REPLY: u16 = 0x0003;
/// Client stores profile/away/capability data.
pub const SUBGROUP_SET_INFO: u16 = 0x0004;
/// Reply to a user-info query.
pub const SUBGROUP_USER_INFO_REPLY: u16 = 0x0006;
/// Bit-flagged user-info query.
pub const SUBGROUP_USER_INFO_QUERY2: u16 = 0x0015;

/// Rights-reply TLV: maximum profile length.
pub const RIGHTS_TLV_MAX_SIG_LEN: u16 = 0x0001;

/// Set-info TLV: profile MIME type.
pub const TLV_SIG_MIME: u16 = 0x0001;
/// Set-info TLV: profile body.
pub const TLV_SIG_DATA: u16 = 0x0002;
/// Set-info TLV: away-message MIME type.
pub const TLV_UNAVAILABLE_MIME: u16 = 0x0003;
/// Set-info TLV: away-message body. Empty clears away state.
pub const TLV_UNAVAILABLE_DATA: u16 = 0x0004;
/// Set-info TLV: concatenated 16-byte capability UUIDs.
pub const TLV_CAPABILITIES: u16 = 0x0005;

/// Query bit: return the profile.
pub const QUERY_SIG: u32 = 0x0001;
/// Query bit: return the away message.
pub const QUERY_UNAVAILABLE: u32 = 0x0002;

/// Rights reply body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct RightsReply {
    /// Limit TLVs
    pub tlvs: TlvRestBlock,
}

/// Set-info request body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct SetInfo {
    /// Profile/away/capability TLVs
    pub tlvs: TlvRestBlock,
}

/// Type-2 user-info query.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct UserInfoQuery2 {
    /// Bit flags selecting profile vs away message
    pub request_type: u32,
    /// Target screen name
    #[oscar(len_prefix = "uint8")]
    pub screen_name: String,
}

/// User-info reply: the target's presence record plus the requested
/// MIME/body TLV pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct UserInfoReply {
    /// Target presence record
    pub user_info: TlvUserInfo,
    /// `0x01`/`0x02` profile pair or `0x03`/`0x04` away pair
    pub locate_info: TlvRestBlock,
}
