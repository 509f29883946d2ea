//! Locate handlers: profiles and away messages.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::ServerError;
use crate::handlers::ServerContext;
use crate::presence;
use crate::session::{Session, SnacMessage};
use crate::store::{FeedbagStore, StoreError};
use oscar_proto::snac::{SnacHeader, errorcode};
use oscar_proto::snacs::TlvUserInfo;
use oscar_proto::snacs::locate::{
    QUERY_SIG, QUERY_UNAVAILABLE, RIGHTS_TLV_MAX_SIG_LEN, RightsReply, SUBGROUP_RIGHTS_QUERY,
    SUBGROUP_RIGHTS_REPLY, SUBGROUP_SET_INFO, SUBGROUP_USER_INFO_QUERY2, SUBGROUP_USER_INFO_REPLY,
    SetInfo, TLV_CAPABILITIES, TLV_SIG_DATA, TLV_SIG_MIME, TLV_UNAVAILABLE_DATA,
    TLV_UNAVAILABLE_MIME, UserInfoQuery2, UserInfoReply,
};
use oscar_proto::tlv::{Tlv, TlvBlock, TlvRestBlock};
use oscar_proto::wire::Unmarshal;

/// MIME type stamped on profile and away-message replies.
const AIM_TEXT_MIME: &str = "text/aolrtf; charset=\"us-ascii\"";

/// Handles one Locate SNAC.
pub async fn handle<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.subgroup {
        SUBGROUP_RIGHTS_QUERY => {
            let tlvs = TlvRestBlock::from(vec![Tlv::new_u16(RIGHTS_TLV_MAX_SIG_LEN, 4096)]);
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_RIGHTS_REPLY, &RightsReply { tlvs })?])
        }
        SUBGROUP_SET_INFO => set_info(ctx, session, body).await,
        SUBGROUP_USER_INFO_QUERY2 => user_info_query(ctx, snac, body),
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}

async fn set_info<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    let request = SetInfo::unmarshal(body)?;

    if let Some(profile) = request.tlvs.string(TLV_SIG_DATA) {
        ctx.store.upsert_profile(&session.screen_name(), &profile)?;
    }
    if let Some(caps) = request.tlvs.bytes(TLV_CAPABILITIES) {
        let capabilities = caps
            .chunks_exact(16)
            .map(|chunk| {
                let mut uuid = [0u8; 16];
                uuid.copy_from_slice(chunk);
                uuid
            })
            .collect();
        session.set_capabilities(capabilities);
    }
    if let Some(away) = request.tlvs.string(TLV_UNAVAILABLE_DATA) {
        session.set_away_message(away);
        // Watchers learn the away state from the refreshed flags
        if !session.invisible() {
            presence::broadcast_arrival(ctx, session).await?;
        }
    }
    Ok(Vec::new())
}

fn user_info_query<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    let query = UserInfoQuery2::unmarshal(body)?;

    let profile = match ctx.store.retrieve_profile(&query.screen_name) {
        Ok(profile) => profile,
        Err(StoreError::UserNotFound(_)) => {
            return Ok(vec![SnacMessage::error(snac, errorcode::NOT_LOGGED_ON)?]);
        }
        Err(err) => return Err(err.into()),
    };

    let target = ctx.sessions.retrieve_by_screen_name(&query.screen_name);
    let user_info = target.as_ref().map(|t| t.user_info()).unwrap_or_else(|| TlvUserInfo {
        screen_name: query.screen_name.clone(),
        warning_level: 0,
        tlv_block: TlvBlock::new(),
    });

    let mut locate_info = TlvRestBlock::new();
    if query.request_type & QUERY_SIG != 0 {
        locate_info.push(Tlv::new_string(TLV_SIG_MIME, AIM_TEXT_MIME));
        locate_info.push(Tlv::new_string(TLV_SIG_DATA, &profile));
    }
    if query.request_type & QUERY_UNAVAILABLE != 0 {
        let away = target.map(|t| t.away_message()).unwrap_or_default();
        locate_info.push(Tlv::new_string(TLV_UNAVAILABLE_MIME, AIM_TEXT_MIME));
        locate_info.push(Tlv::new_string(TLV_UNAVAILABLE_DATA, &away));
    }

    Ok(vec![SnacMessage::reply(
        snac,
        SUBGROUP_USER_INFO_REPLY,
        &UserInfoReply { user_info, locate_info },
    )?])
}
