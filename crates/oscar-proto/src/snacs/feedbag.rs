//! Feedbag (food group `0x0013`): the server-side buddy list.

use crate::tlv::{TlvLBlock, TlvRestBlock};
use crate::{OscarMarshal, OscarUnmarshal};

/// Client asks for feedbag limits.
pub const SUBGROUP_RIGHTS_QUERY: u16 = 0x0002;
/// Canned permissive limits.
pub const SUBGROUP_RIGHTS_REPLY: u16 = 0x0003;
/// Client asks for the full feedbag.
pub const SUBGROUP_QUERY: u16 = 0x0004;
/// Client asks for the feedbag if it changed since a timestamp.
pub const SUBGROUP_QUERY_IF_MODIFIED: u16 = 0x0005;
/// Full feedbag contents.
pub const SUBGROUP_REPLY: u16 = 0x0006;
/// Client inserts items.
pub const SUBGROUP_INSERT_ITEM: u16 = 0x0008;
/// Client updates items.
pub const SUBGROUP_UPDATE_ITEM: u16 = 0x0009;
/// Client deletes items.
pub const SUBGROUP_DELETE_ITEM: u16 = 0x000A;
/// Per-item result codes for a mutation.
pub const SUBGROUP_STATUS: u16 = 0x000E;
/// Feedbag unchanged since the queried timestamp.
pub const SUBGROUP_REPLY_NOT_MODIFIED: u16 = 0x000F;
/// Client brackets a batch of mutations.
pub const SUBGROUP_START_CLUSTER: u16 = 0x0011;
/// End of a mutation batch.
pub const SUBGROUP_END_CLUSTER: u16 = 0x0012;

/// Class id: a buddy entry.
pub const CLASS_BUDDY: u16 = 0x0000;
/// Class id: a buddy group.
pub const CLASS_GROUP: u16 = 0x0001;
/// Class id: a permit entry.
pub const CLASS_PERMIT: u16 = 0x0002;
/// Class id: a deny (block) entry.
pub const CLASS_DENY: u16 = 0x0003;

/// Mutation result: success.
pub const STATUS_SUCCESS: u16 = 0x0000;

/// Rights-reply TLV: maximum item counts per class, one u16 per class id.
pub const RIGHTS_TLV_MAX_ITEMS_BY_CLASS: u16 = 0x0004;

/// One feedbag row.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct FeedbagItem {
    /// Item name (buddy screen name, group name, ...)
    #[oscar(len_prefix = "uint16")]
    pub name: String,
    /// Group the item belongs to
    pub group_id: u16,
    /// Item id, unique within (owner, group)
    pub item_id: u16,
    /// Class id; see the `CLASS_*` constants
    pub class_id: u16,
    /// Item attributes, length-prefixed TLV block
    pub attributes: TlvLBlock,
}

/// Full feedbag reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct Reply {
    /// Feedbag format version
    pub version: u8,
    /// Stored items
    #[oscar(count_prefix = "uint16")]
    pub items: Vec<FeedbagItem>,
    /// Epoch seconds of the newest modification
    pub last_update: u32,
}

/// Query-if-modified request; the same shape serves as the not-modified
/// reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct QueryIfModified {
    /// Client's cached last-update timestamp
    pub last_update: u32,
    /// Client's cached item count
    pub count: u8,
}

/// Per-item result codes, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct Status {
    /// One code per mutated item
    pub results: Vec<u16>,
}

/// Rights reply body.
#[derive(Debug, Clone, PartialEq, Eq, Default, OscarMarshal, OscarUnmarshal)]
pub struct RightsReply {
    /// Limit TLVs
    pub tlvs: TlvRestBlock,
}
