//! Chat-room handlers: message broadcast with optional reflection.

use std::sync::Arc;

use bytes::Bytes;

use crate::chat::ChatRoom;
use crate::error::ServerError;
use crate::session::{Session, SnacMessage};
use oscar_proto::snac::{SnacHeader, errorcode, foodgroup};
use oscar_proto::snacs::chat::{
    ChannelMsgToClient, ChannelMsgToHost, SUBGROUP_CHANNEL_MSG_TO_CLIENT,
    SUBGROUP_CHANNEL_MSG_TO_HOST, TLV_ENABLE_REFLECTION, TLV_SENDER_INFO,
};
use oscar_proto::tlv::Tlv;
use oscar_proto::wire::Unmarshal;

/// Handles one chat SNAC from a room member.
pub async fn handle(
    room: &Arc<ChatRoom>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.subgroup {
        SUBGROUP_CHANNEL_MSG_TO_HOST => {
            let message = ChannelMsgToHost::unmarshal(body)?;

            let mut tlvs = message.tlvs.clone();
            tlvs.push(Tlv::new_marshal(TLV_SENDER_INFO, &session.user_info())?);
            let relay = ChannelMsgToClient {
                cookie: message.cookie,
                channel_id: message.channel_id,
                tlvs,
            };

            let push =
                SnacMessage::new(foodgroup::CHAT, SUBGROUP_CHANNEL_MSG_TO_CLIENT, &relay)?;
            room.sessions.broadcast_except(session, push).await;
            tracing::debug!(room = %room.name, from = %session.screen_name(), "chat message relayed");

            if message.tlvs.has(TLV_ENABLE_REFLECTION) {
                return Ok(vec![SnacMessage::reply(
                    snac,
                    SUBGROUP_CHANNEL_MSG_TO_CLIENT,
                    &relay,
                )?]);
            }
            Ok(Vec::new())
        }
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}
