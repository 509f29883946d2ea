//! OService (food group `0x0001`): basic services shared by every endpoint.

use super::TlvUserInfo;
use crate::tlv::TlvRestBlock;
use crate::{OscarMarshal, OscarUnmarshal};

/// Client signals readiness; triggers presence fan-out.
pub const SUBGROUP_CLIENT_ONLINE: u16 = 0x0002;
/// Server announces the food groups it hosts.
pub const SUBGROUP_HOST_ONLINE: u16 = 0x0003;
/// Client requests a hand-off to another service (chat, chat-nav).
pub const SUBGROUP_SERVICE_REQUEST: u16 = 0x0004;
/// Hand-off reply: where to reconnect and with which cookie.
pub const SUBGROUP_SERVICE_RESPONSE: u16 = 0x0005;
/// Client asks for rate limits.
pub const SUBGROUP_RATE_PARAMS_QUERY: u16 = 0x0006;
/// Rate limit classes and member SNAC pairs.
pub const SUBGROUP_RATE_PARAMS_REPLY: u16 = 0x0007;
/// Client subscribes to rate classes; accepted silently.
pub const SUBGROUP_RATE_PARAMS_SUB_ADD: u16 = 0x0008;
/// Client asks for its own user info.
pub const SUBGROUP_USER_INFO_QUERY: u16 = 0x000E;
/// Self-info reply.
pub const SUBGROUP_USER_INFO_UPDATE: u16 = 0x000F;
/// Warning-level change pushed to the warned user.
pub const SUBGROUP_EVIL_NOTIFICATION: u16 = 0x0010;
/// Client reports idle seconds (0 clears idle).
pub const SUBGROUP_IDLE_NOTIFICATION: u16 = 0x0011;
/// Client version advertisement.
pub const SUBGROUP_CLIENT_VERSIONS: u16 = 0x0017;
/// Server version echo.
pub const SUBGROUP_HOST_VERSIONS: u16 = 0x0018;
/// Visibility and status toggles.
pub const SUBGROUP_SET_USER_INFO_FIELDS: u16 = 0x001E;

/// Service-request TLV: marshaled [`super::chat::ChatRoomRef`] selecting the
/// room to hand off to.
pub const SERVICE_TLV_ROOM_INFO: u16 = 0x0001;
/// Service-response TLV: `host:port` to reconnect to.
pub const SERVICE_TLV_RECONNECT_HOST: u16 = 0x0005;
/// Service-response TLV: cookie to present on the new connection.
pub const SERVICE_TLV_COOKIE: u16 = 0x0006;
/// Service-response TLV: food group served at the new endpoint.
pub const SERVICE_TLV_FOOD_GROUP: u16 = 0x000D;

/// Status TLV examined by set-user-info-fields.
pub const USER_INFO_TLV_STATUS: u16 = 0x0006;

/// Body of host-online: the hosted food groups, unframed u16s.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct HostOnline {
    /// Food groups this endpoint serves
    pub food_groups: Vec<u16>,
}

/// One food-group/version pair in a client-versions advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, OscarMarshal, OscarUnmarshal)]
pub struct GroupVersion {
    /// Food group
    pub food_group: u16,
    /// Protocol version the client speaks for it
    pub version: u16,
}

/// Client-versions body; echoed back as host-versions.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ClientVersions {
    /// Advertised pairs
    pub versions: Vec<GroupVersion>,
}

/// Client-online body. The server ignores the detail and uses the SNAC as
/// the sign-on-complete signal.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ClientOnline {
    /// Per-group build information
    pub group_versions: Vec<ClientOnlineGroup>,
}

/// One entry of a client-online body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, OscarMarshal, OscarUnmarshal)]
pub struct ClientOnlineGroup {
    /// Food group
    pub food_group: u16,
    /// Version
    pub version: u16,
    /// Tool id
    pub tool_id: u16,
    /// Tool version
    pub tool_version: u16,
}

/// One rate class in a rate-params reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, OscarMarshal, OscarUnmarshal)]
pub struct RateClass {
    /// Class id
    pub id: u16,
    /// Averaging window size
    pub window_size: u32,
    /// Level at which the client may resume
    pub clear_level: u32,
    /// Level at which the client is alerted
    pub alert_level: u32,
    /// Level at which sends are dropped
    pub limit_level: u32,
    /// Level at which the connection is dropped
    pub disconnect_level: u32,
    /// Current running average
    pub current_level: u32,
    /// Maximum observed level
    pub max_level: u32,
    /// Time of last message, server clock
    pub last_time: u32,
    /// 0 = within limits
    pub current_state: u8,
}

/// Membership of one rate class: the SNAC pairs it governs.
#[derive(Debug, Clone, PartialEq, Eq, OscarMarshal, OscarUnmarshal)]
pub struct RateGroup {
    /// Rate class id
    pub id: u16,
    /// Governed (food group, subgroup) pairs
    #[oscar(count_prefix = "uint16")]
    pub pairs: Vec<SnacPair>,
}

/// A (food group, subgroup) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, OscarMarshal, OscarUnmarshal)]
pub struct SnacPair {
    /// Food group
    pub food_group: u16,
    /// Subgroup
    pub subgroup: u16,
}

/// Rate-params reply: classes, then per-class membership.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct RateParamsReply {
    /// Rate classes, u16 count prefixed
    #[oscar(count_prefix = "uint16")]
    pub classes: Vec<RateClass>,
    /// Class membership lists
    pub groups: Vec<RateGroup>,
}

/// Client acknowledgement of rate classes.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct RateParamsSubAdd {
    /// Subscribed class ids
    pub classes: Vec<u16>,
}

/// Hand-off request for another service.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ServiceRequest {
    /// Food group to hand off to
    pub food_group: u16,
    /// Request TLVs; [`SERVICE_TLV_ROOM_INFO`] for chat
    pub tlvs: TlvRestBlock,
}

/// Hand-off reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ServiceResponse {
    /// Reconnect host, cookie, and food group TLVs
    pub tlvs: TlvRestBlock,
}

/// Self-info reply body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct UserInfoUpdate {
    /// The requesting user's own presence record
    pub user_info: TlvUserInfo,
}

/// Warning notification pushed to the warned user. The anonymous variant
/// omits the snitcher.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct EvilNotification {
    /// New warning level
    pub new_evil: u16,
    /// Who warned, when not anonymous
    pub snitcher: Option<TlvUserInfo>,
}

/// Idle report from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct IdleNotification {
    /// Seconds idle; 0 clears idle state
    pub idle_time: u32,
}

/// Visibility/status toggle request.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct SetUserInfoFields {
    /// Field TLVs; [`USER_INFO_TLV_STATUS`] carries the status bits
    pub tlvs: TlvRestBlock,
}
