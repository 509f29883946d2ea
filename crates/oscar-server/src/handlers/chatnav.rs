//! Chat-navigation handlers: limits and room creation.

use bytes::Bytes;

use crate::error::ServerError;
use crate::handlers::ServerContext;
use crate::session::SnacMessage;
use crate::store::FeedbagStore;
use oscar_proto::snac::{SnacHeader, errorcode};
use oscar_proto::snacs::chat::{ROOM_TLV_NAME, RoomInfo};
use oscar_proto::snacs::chatnav::{
    NavInfo, SUBGROUP_CREATE_ROOM, SUBGROUP_NAV_INFO, SUBGROUP_RIGHTS_QUERY, TLV_MAX_ROOMS,
    TLV_ROOM_INFO,
};
use oscar_proto::tlv::{Tlv, TlvRestBlock};
use oscar_proto::wire::Unmarshal;

/// Handles one chat-nav SNAC.
pub fn handle<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.subgroup {
        SUBGROUP_RIGHTS_QUERY => {
            let tlvs = TlvRestBlock::from(vec![Tlv::new(TLV_MAX_ROOMS, vec![10u8])]);
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_NAV_INFO, &NavInfo { tlvs })?])
        }
        SUBGROUP_CREATE_ROOM => {
            let request = RoomInfo::unmarshal(body)?;
            let name = request
                .tlvs
                .string(ROOM_TLV_NAME)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| request.cookie.clone());
            let room = ctx.chat.create_room(&name, request.exchange);
            let tlvs =
                TlvRestBlock::from(vec![Tlv::new_marshal(TLV_ROOM_INFO, &room.room_info())?]);
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_NAV_INFO, &NavInfo { tlvs })?])
        }
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}
