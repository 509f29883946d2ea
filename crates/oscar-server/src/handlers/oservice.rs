//! OService handlers: readiness, rates, self info, idle/visibility, and
//! service hand-off.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::ServerError;
use crate::handlers::ServerContext;
use crate::presence;
use crate::session::{Session, SnacMessage};
use crate::store::FeedbagStore;
use oscar_proto::snac::{SnacHeader, errorcode, foodgroup};
use oscar_proto::snacs::buddy::{Arrived, SUBGROUP_ARRIVED};
use oscar_proto::snacs::chat::ChatRoomRef;
use oscar_proto::snacs::oservice::{
    ClientOnline, ClientVersions, IdleNotification, RateClass, RateGroup, RateParamsReply,
    RateParamsSubAdd, SERVICE_TLV_COOKIE, SERVICE_TLV_FOOD_GROUP, SERVICE_TLV_RECONNECT_HOST,
    SERVICE_TLV_ROOM_INFO, SUBGROUP_CLIENT_ONLINE, SUBGROUP_CLIENT_VERSIONS,
    SUBGROUP_HOST_VERSIONS, SUBGROUP_IDLE_NOTIFICATION, SUBGROUP_RATE_PARAMS_QUERY,
    SUBGROUP_RATE_PARAMS_REPLY, SUBGROUP_RATE_PARAMS_SUB_ADD, SUBGROUP_SERVICE_REQUEST,
    SUBGROUP_SERVICE_RESPONSE, SUBGROUP_SET_USER_INFO_FIELDS, SUBGROUP_USER_INFO_QUERY,
    SUBGROUP_USER_INFO_UPDATE, SnacPair, ServiceRequest, ServiceResponse, SetUserInfoFields,
    USER_INFO_TLV_STATUS, UserInfoUpdate,
};
use oscar_proto::snacs::userinfo;
use oscar_proto::tlv::{Tlv, TlvRestBlock};
use oscar_proto::wire::{Unmarshal, WireError, from_bytes};

/// The synthetic rate reply covers every (food group, subgroup) pair up to
/// (24, 32) with one permissive class.
fn rate_params() -> RateParamsReply {
    let class = RateClass {
        id: 1,
        window_size: 80,
        clear_level: 2510,
        alert_level: 2000,
        limit_level: 1500,
        disconnect_level: 800,
        current_level: 2510,
        max_level: 6000,
        last_time: 0,
        current_state: 0,
    };
    let mut pairs = Vec::new();
    for food_group in 0..=24u16 {
        for subgroup in 0..=32u16 {
            pairs.push(SnacPair { food_group, subgroup });
        }
    }
    RateParamsReply { classes: vec![class], groups: vec![RateGroup { id: 1, pairs }] }
}

/// Handles one OService SNAC on a BOS connection.
pub async fn handle<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.subgroup {
        SUBGROUP_CLIENT_ONLINE => client_online(ctx, session, body).await,
        SUBGROUP_CLIENT_VERSIONS => {
            let versions = ClientVersions::unmarshal(body)?;
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_HOST_VERSIONS, &versions)?])
        }
        SUBGROUP_RATE_PARAMS_QUERY => {
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_RATE_PARAMS_REPLY, &rate_params())?])
        }
        SUBGROUP_RATE_PARAMS_SUB_ADD => {
            let _ = RateParamsSubAdd::unmarshal(body)?;
            Ok(Vec::new())
        }
        SUBGROUP_USER_INFO_QUERY => Ok(vec![SnacMessage::reply(
            snac,
            SUBGROUP_USER_INFO_UPDATE,
            &UserInfoUpdate { user_info: session.user_info() },
        )?]),
        SUBGROUP_IDLE_NOTIFICATION => {
            let idle = IdleNotification::unmarshal(body)?;
            if idle.idle_time == 0 {
                session.clear_idle();
            } else {
                session.set_idle(Duration::from_secs(u64::from(idle.idle_time)));
            }
            // Watchers refresh their idle counters from a fresh arrival
            if !session.invisible() {
                presence::broadcast_arrival(ctx, session).await?;
            }
            Ok(Vec::new())
        }
        SUBGROUP_SET_USER_INFO_FIELDS => set_user_info_fields(ctx, session, snac, body).await,
        SUBGROUP_SERVICE_REQUEST => service_request(ctx, session, snac, body),
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}

/// OService subset served on chat and chat-nav connections, where there is
/// no presence to broadcast.
pub fn handle_service_lite(
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.subgroup {
        SUBGROUP_CLIENT_ONLINE => {
            let _ = ClientOnline::unmarshal(body)?;
            Ok(Vec::new())
        }
        SUBGROUP_CLIENT_VERSIONS => {
            let versions = ClientVersions::unmarshal(body)?;
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_HOST_VERSIONS, &versions)?])
        }
        SUBGROUP_RATE_PARAMS_QUERY => {
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_RATE_PARAMS_REPLY, &rate_params())?])
        }
        SUBGROUP_RATE_PARAMS_SUB_ADD => {
            let _ = RateParamsSubAdd::unmarshal(body)?;
            Ok(Vec::new())
        }
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}

async fn client_online<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    let _ = ClientOnline::unmarshal(body)?;
    if !session.invisible() {
        presence::broadcast_arrival(ctx, session).await?;
    }

    // Push the already-online buddies so the fresh client's list lights up
    let mut replies = Vec::new();
    for name in ctx.store.buddies(&session.screen_name())? {
        if let Some(buddy) = ctx.sessions.retrieve_by_screen_name(&name) {
            if buddy.invisible() {
                continue;
            }
            replies.push(SnacMessage::new(
                foodgroup::BUDDY,
                SUBGROUP_ARRIVED,
                &Arrived { user_info: buddy.user_info() },
            )?);
        }
    }
    Ok(replies)
}

async fn set_user_info_fields<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    let request = SetUserInfoFields::unmarshal(body)?;
    if let Some(tlv) = request.tlvs.first(USER_INFO_TLV_STATUS) {
        // Clients send either a u16 or a flags<<16|status u32
        let status = tlv.value_u32().or_else(|| tlv.value_u16().map(u32::from));
        if let Some(status) = status {
            let invisible = status & u32::from(userinfo::STATUS_INVISIBLE) != 0;
            let was_invisible = session.invisible();
            session.set_invisible(invisible);
            if invisible && !was_invisible {
                presence::broadcast_departure(ctx, session).await?;
            } else if !invisible && was_invisible {
                presence::broadcast_arrival(ctx, session).await?;
            }
        }
    }
    Ok(vec![SnacMessage::reply(
        snac,
        SUBGROUP_USER_INFO_UPDATE,
        &UserInfoUpdate { user_info: session.user_info() },
    )?])
}

fn service_response(
    snac: &SnacHeader,
    food_group: u16,
    host: &str,
    cookie: &str,
) -> Result<SnacMessage, WireError> {
    let tlvs = TlvRestBlock::from(vec![
        Tlv::new_u16(SERVICE_TLV_FOOD_GROUP, food_group),
        Tlv::new_string(SERVICE_TLV_RECONNECT_HOST, host),
        Tlv::new_string(SERVICE_TLV_COOKIE, cookie),
    ]);
    SnacMessage::reply(snac, SUBGROUP_SERVICE_RESPONSE, &ServiceResponse { tlvs })
}

fn service_request<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    let request = ServiceRequest::unmarshal(body)?;
    match request.food_group {
        foodgroup::CHAT_NAV => {
            let cookie = ctx.chat.begin_nav_handoff(session.screen_name());
            Ok(vec![service_response(
                snac,
                foodgroup::CHAT_NAV,
                &ctx.config.chat_nav_address(),
                &cookie,
            )?])
        }
        foodgroup::CHAT => {
            let Some(raw) = request.tlvs.bytes(SERVICE_TLV_ROOM_INFO) else {
                return Ok(vec![SnacMessage::error(snac, errorcode::INVALID_SNAC)?]);
            };
            let Ok(room_ref) = from_bytes::<ChatRoomRef>(&raw) else {
                return Ok(vec![SnacMessage::error(snac, errorcode::INVALID_SNAC)?]);
            };
            let Some(room) = ctx.chat.room(&room_ref.cookie) else {
                return Ok(vec![SnacMessage::error(snac, errorcode::INVALID_SNAC)?]);
            };
            let cookie = ctx.chat.begin_room_handoff(session.screen_name(), room.cookie.clone());
            Ok(vec![service_response(snac, foodgroup::CHAT, &ctx.config.chat_address(), &cookie)?])
        }
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}
