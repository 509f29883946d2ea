//! Feedbag handlers: the server-side buddy list.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::ServerError;
use crate::handlers::ServerContext;
use crate::session::{Session, SnacMessage};
use crate::store::{Blocked, FeedbagStore};
use oscar_proto::snac::{SnacHeader, errorcode, foodgroup};
use oscar_proto::snacs::buddy::{Arrived, Departed, SUBGROUP_ARRIVED, SUBGROUP_DEPARTED};
use oscar_proto::snacs::feedbag::{
    CLASS_BUDDY, CLASS_DENY, FeedbagItem, QueryIfModified, RIGHTS_TLV_MAX_ITEMS_BY_CLASS, Reply,
    RightsReply, STATUS_SUCCESS, SUBGROUP_DELETE_ITEM, SUBGROUP_END_CLUSTER, SUBGROUP_INSERT_ITEM,
    SUBGROUP_QUERY, SUBGROUP_QUERY_IF_MODIFIED, SUBGROUP_REPLY, SUBGROUP_REPLY_NOT_MODIFIED,
    SUBGROUP_RIGHTS_QUERY, SUBGROUP_RIGHTS_REPLY, SUBGROUP_START_CLUSTER, SUBGROUP_STATUS,
    SUBGROUP_UPDATE_ITEM, Status,
};
use oscar_proto::tlv::{Tlv, TlvRestBlock};
use oscar_proto::wire::Unmarshal;

/// Handles one Feedbag SNAC.
pub async fn handle<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.subgroup {
        SUBGROUP_RIGHTS_QUERY => {
            // One permissive cap per item class
            let caps = vec![100u16; 21];
            let tlvs =
                TlvRestBlock::from(vec![Tlv::new_marshal(RIGHTS_TLV_MAX_ITEMS_BY_CLASS, &caps)?]);
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_RIGHTS_REPLY, &RightsReply { tlvs })?])
        }
        SUBGROUP_QUERY => full_reply(ctx, session, snac),
        SUBGROUP_QUERY_IF_MODIFIED => {
            let query = QueryIfModified::unmarshal(body)?;
            let newest = ctx.store.last_modified(&session.screen_name())?;
            if newest <= query.last_update {
                let items = ctx.store.retrieve(&session.screen_name())?;
                let cached = QueryIfModified {
                    last_update: newest,
                    count: items.len().min(usize::from(u8::MAX)) as u8,
                };
                return Ok(vec![SnacMessage::reply(
                    snac,
                    SUBGROUP_REPLY_NOT_MODIFIED,
                    &cached,
                )?]);
            }
            full_reply(ctx, session, snac)
        }
        SUBGROUP_INSERT_ITEM | SUBGROUP_UPDATE_ITEM => {
            let items = <Vec<FeedbagItem> as Unmarshal>::unmarshal(body)?;
            ctx.store.upsert(&session.screen_name(), &items)?;
            let mut replies = vec![SnacMessage::reply(
                snac,
                SUBGROUP_STATUS,
                &Status { results: vec![STATUS_SUCCESS; items.len()] },
            )?];
            replies.extend(mutation_presence(ctx, session, &items).await?);
            Ok(replies)
        }
        SUBGROUP_DELETE_ITEM => {
            let items = <Vec<FeedbagItem> as Unmarshal>::unmarshal(body)?;
            ctx.store.delete(&session.screen_name(), &items)?;
            Ok(vec![SnacMessage::reply(
                snac,
                SUBGROUP_STATUS,
                &Status { results: vec![STATUS_SUCCESS; items.len()] },
            )?])
        }
        SUBGROUP_START_CLUSTER | SUBGROUP_END_CLUSTER => {
            let _ = TlvRestBlock::unmarshal(body)?;
            Ok(Vec::new())
        }
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}

fn full_reply<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
) -> Result<Vec<SnacMessage>, ServerError> {
    let screen_name = session.screen_name();
    let items = ctx.store.retrieve(&screen_name)?;
    let last_update = ctx.store.last_modified(&screen_name)?;
    let reply = Reply { version: 0, items, last_update };
    Ok(vec![SnacMessage::reply(snac, SUBGROUP_REPLY, &reply)?])
}

/// Presence effects of a feedbag mutation: a fresh buddy item lights up
/// immediately when its target is online, and a fresh deny hides both sides
/// from each other.
async fn mutation_presence<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    items: &[FeedbagItem],
) -> Result<Vec<SnacMessage>, ServerError> {
    let owner = session.screen_name();
    let mut pushes = Vec::new();
    for item in items {
        match item.class_id {
            CLASS_BUDDY => {
                let Some(target) = ctx.sessions.retrieve_by_screen_name(&item.name) else {
                    continue;
                };
                if target.invisible() || ctx.store.blocked(&owner, &item.name)? != Blocked::No {
                    continue;
                }
                pushes.push(SnacMessage::new(
                    foodgroup::BUDDY,
                    SUBGROUP_ARRIVED,
                    &Arrived { user_info: target.user_info() },
                )?);
            }
            CLASS_DENY => {
                let Some(target) = ctx.sessions.retrieve_by_screen_name(&item.name) else {
                    continue;
                };
                // The owner stops seeing the denied user...
                pushes.push(SnacMessage::new(
                    foodgroup::BUDDY,
                    SUBGROUP_DEPARTED,
                    &Departed { user_info: target.departed_info() },
                )?);
                // ...and the denied user stops seeing the owner
                target
                    .send_message(SnacMessage::new(
                        foodgroup::BUDDY,
                        SUBGROUP_DEPARTED,
                        &Departed { user_info: session.departed_info() },
                    )?)
                    .await;
            }
            _ => {}
        }
    }
    Ok(pushes)
}
