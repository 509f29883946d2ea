//! ICBM handlers: instant messages and warnings.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::ServerError;
use crate::handlers::ServerContext;
use crate::presence;
use crate::session::{Session, SnacMessage};
use crate::store::{Blocked, FeedbagStore};
use oscar_proto::snac::{SnacHeader, errorcode, foodgroup};
use oscar_proto::snacs::icbm::{
    AddParameters, ChannelMsgToClient, ChannelMsgToHost, EVIL_SEND_AS_ANONYMOUS, EvilReply,
    EvilRequest, HostAck, ParameterReply, SUBGROUP_ADD_PARAMETERS, SUBGROUP_CHANNEL_MSG_TO_CLIENT,
    SUBGROUP_CHANNEL_MSG_TO_HOST, SUBGROUP_EVIL_REPLY, SUBGROUP_EVIL_REQUEST, SUBGROUP_HOST_ACK,
    SUBGROUP_PARAMETER_QUERY, SUBGROUP_PARAMETER_REPLY, TLV_AUTO_RESPONSE, TLV_DATA, TLV_MESSAGE,
    TLV_REQUEST_HOST_ACK,
};
use oscar_proto::snacs::oservice::{EvilNotification, SUBGROUP_EVIL_NOTIFICATION};
use oscar_proto::tlv::TlvRestBlock;
use oscar_proto::wire::Unmarshal;

/// Warning delta applied when the warner is named.
const EVIL_DELTA: u16 = 100;
/// Warning delta applied for anonymous warnings.
const EVIL_DELTA_ANONYMOUS: u16 = 30;

fn canned_parameters() -> ParameterReply {
    ParameterReply {
        max_slots: 100,
        icbm_flags: 3,
        max_incoming_icbm_len: 512,
        max_source_evil: 999,
        max_destination_evil: 999,
        min_inter_icbm_interval: 0,
    }
}

/// Handles one ICBM SNAC.
pub async fn handle<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.subgroup {
        SUBGROUP_ADD_PARAMETERS => {
            let _ = AddParameters::unmarshal(body)?;
            Ok(Vec::new())
        }
        SUBGROUP_PARAMETER_QUERY => {
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_PARAMETER_REPLY, &canned_parameters())?])
        }
        SUBGROUP_CHANNEL_MSG_TO_HOST => channel_msg_to_host(ctx, session, snac, body).await,
        SUBGROUP_EVIL_REQUEST => evil_request(ctx, session, snac, body).await,
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}

async fn channel_msg_to_host<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    let message = ChannelMsgToHost::unmarshal(body)?;
    let sender = session.screen_name();

    match ctx.store.blocked(&sender, &message.screen_name)? {
        Blocked::A => return Ok(vec![SnacMessage::error(snac, errorcode::IN_LOCAL_PERMIT_DENY)?]),
        Blocked::B => return Ok(vec![SnacMessage::error(snac, errorcode::NOT_LOGGED_ON)?]),
        Blocked::No => {}
    }
    let Some(recipient) = ctx.sessions.retrieve_by_screen_name(&message.screen_name) else {
        return Ok(vec![SnacMessage::error(snac, errorcode::NOT_LOGGED_ON)?]);
    };

    // Relay the payload TLVs verbatim; everything else stays behind
    let mut relayed = TlvRestBlock::new();
    for tag in [TLV_MESSAGE, TLV_AUTO_RESPONSE, TLV_DATA] {
        if let Some(tlv) = message.tlvs.first(tag) {
            relayed.push(tlv.clone());
        }
    }
    let delivery = ChannelMsgToClient {
        cookie: message.cookie,
        channel_id: message.channel_id,
        user_info: session.user_info(),
        tlvs: relayed,
    };
    recipient
        .send_message(SnacMessage::new(
            foodgroup::ICBM,
            SUBGROUP_CHANNEL_MSG_TO_CLIENT,
            &delivery,
        )?)
        .await;
    tracing::debug!(from = %sender, to = %message.screen_name, "instant message relayed");

    if message.tlvs.has(TLV_REQUEST_HOST_ACK) {
        let ack = HostAck {
            cookie: message.cookie,
            channel_id: message.channel_id,
            screen_name: message.screen_name,
        };
        return Ok(vec![SnacMessage::reply(snac, SUBGROUP_HOST_ACK, &ack)?]);
    }
    Ok(Vec::new())
}

async fn evil_request<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    let request = EvilRequest::unmarshal(body)?;
    let sender = session.screen_name();

    // Self-warning is not a thing
    if request.screen_name == sender {
        return Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]);
    }
    match ctx.store.blocked(&sender, &request.screen_name)? {
        Blocked::A => return Ok(vec![SnacMessage::error(snac, errorcode::IN_LOCAL_PERMIT_DENY)?]),
        Blocked::B => return Ok(vec![SnacMessage::error(snac, errorcode::NOT_LOGGED_ON)?]),
        Blocked::No => {}
    }
    let Some(target) = ctx.sessions.retrieve_by_screen_name(&request.screen_name) else {
        return Ok(vec![SnacMessage::error(snac, errorcode::NOT_LOGGED_ON)?]);
    };

    let anonymous = request.send_as == EVIL_SEND_AS_ANONYMOUS;
    let delta = if anonymous { EVIL_DELTA_ANONYMOUS } else { EVIL_DELTA };
    let updated = target.incr_warning(delta);
    tracing::debug!(from = %sender, to = %request.screen_name, updated, anonymous, "warning applied");

    let notification = EvilNotification {
        new_evil: updated,
        snitcher: (!anonymous).then(|| session.user_info()),
    };
    target
        .send_message(SnacMessage::new(
            foodgroup::OSERVICE,
            SUBGROUP_EVIL_NOTIFICATION,
            &notification,
        )?)
        .await;

    // Watchers see the raised warning level
    presence::broadcast_arrival(ctx, &target).await?;

    Ok(vec![SnacMessage::reply(
        snac,
        SUBGROUP_EVIL_REPLY,
        &EvilReply { evil_delta_applied: delta, updated_evil_value: updated },
    )?])
}
