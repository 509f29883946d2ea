//! ICBM (food group `0x0004`): point-to-point messages and warnings.

use super::TlvUserInfo;
use crate::tlv::TlvRestBlock;
use crate::{OscarMarshal, OscarUnmarshal};

/// Client overrides ICBM parameters; accepted silently.
pub const SUBGROUP_ADD_PARAMETERS: u16 = 0x0002;
/// Client asks for ICBM parameters.
pub const SUBGROUP_PARAMETER_QUERY: u16 = 0x0004;
/// Canned permissive parameters.
pub const SUBGROUP_PARAMETER_REPLY: u16 = 0x0005;
/// Outgoing instant message.
pub const SUBGROUP_CHANNEL_MSG_TO_HOST: u16 = 0x0006;
/// Incoming instant message.
pub const SUBGROUP_CHANNEL_MSG_TO_CLIENT: u16 = 0x0007;
/// Warning ("evil") request.
pub const SUBGROUP_EVIL_REQUEST: u16 = 0x0008;
/// Warning acknowledgement to the warner.
pub const SUBGROUP_EVIL_REPLY: u16 = 0x0009;
/// Delivery acknowledgement to the sender.
pub const SUBGROUP_HOST_ACK: u16 = 0x000C;

/// Message payload TLV; copied verbatim to the recipient.
pub const TLV_MESSAGE: u16 = 0x0002;
/// "Request host ack" TLV; presence triggers a host-ack reply.
pub const TLV_REQUEST_HOST_ACK: u16 = 0x0003;
/// Auto-response flag TLV; copied verbatim to the recipient.
pub const TLV_AUTO_RESPONSE: u16 = 0x0004;
/// Capability data TLV; copied verbatim to the recipient.
pub const TLV_DATA: u16 = 0x0005;

/// Evil request sent with the sender named.
pub const EVIL_SEND_AS_NAMED: u16 = 0x0000;
/// Evil request sent anonymously.
pub const EVIL_SEND_AS_ANONYMOUS: u16 = 0x0001;

/// ICBM parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ParameterReply {
    /// Maximum concurrent message slots
    pub max_slots: u16,
    /// Channel capability flags
    pub icbm_flags: u32,
    /// Maximum incoming message length
    pub max_incoming_icbm_len: u16,
    /// Maximum sender warning level allowed
    pub max_source_evil: u16,
    /// Maximum recipient warning level allowed
    pub max_destination_evil: u16,
    /// Minimum gap between messages, milliseconds
    pub min_inter_icbm_interval: u32,
}

/// Client parameter override; same shape preceded by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct AddParameters {
    /// Channel the parameters apply to
    pub channel_id: u16,
    /// Channel capability flags
    pub icbm_flags: u32,
    /// Maximum incoming message length
    pub max_incoming_icbm_len: u16,
    /// Maximum sender warning level allowed
    pub max_source_evil: u16,
    /// Maximum recipient warning level allowed
    pub max_destination_evil: u16,
    /// Minimum gap between messages, milliseconds
    pub min_inter_icbm_interval: u32,
}

/// Outgoing instant message.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ChannelMsgToHost {
    /// Sender-chosen message cookie, echoed in acks
    pub cookie: [u8; 8],
    /// Message channel (1 = plain IM)
    pub channel_id: u16,
    /// Recipient screen name
    #[oscar(len_prefix = "uint8")]
    pub screen_name: String,
    /// Message TLVs; `0x02`/`0x04`/`0x05` are relayed verbatim
    pub tlvs: TlvRestBlock,
}

/// Incoming instant message.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct ChannelMsgToClient {
    /// Original sender cookie
    pub cookie: [u8; 8],
    /// Message channel
    pub channel_id: u16,
    /// Sender presence record
    pub user_info: TlvUserInfo,
    /// Relayed message TLVs
    pub tlvs: TlvRestBlock,
}

/// Delivery acknowledgement sent back to the message sender.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct HostAck {
    /// Original sender cookie
    pub cookie: [u8; 8],
    /// Message channel
    pub channel_id: u16,
    /// Recipient screen name
    #[oscar(len_prefix = "uint8")]
    pub screen_name: String,
}

/// Warning request.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct EvilRequest {
    /// [`EVIL_SEND_AS_NAMED`] or [`EVIL_SEND_AS_ANONYMOUS`]
    pub send_as: u16,
    /// Target screen name
    #[oscar(len_prefix = "uint8")]
    pub screen_name: String,
}

/// Warning acknowledgement carrying the applied delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct EvilReply {
    /// Delta applied by this request
    pub evil_delta_applied: u16,
    /// Target's warning level after the delta
    pub updated_evil_value: u16,
}
