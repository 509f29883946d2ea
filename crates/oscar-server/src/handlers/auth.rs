//! BUCP authentication handlers.
//!
//! The challenge step allocates the session and hands its cookie back as
//! the auth key; the login step on the same connection names the session
//! and returns the BOS address plus the cookie for service hand-off. The
//! password hash is not verified, preserving the original behavior.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::ServerError;
use crate::handlers::ServerContext;
use crate::session::{Session, SnacMessage};
use crate::store::FeedbagStore;
use oscar_proto::snac::{SnacHeader, errorcode, foodgroup};
use oscar_proto::snacs::auth::{
    ChallengeRequest, ChallengeResponse, LoginRequest, LoginResponse, SUBGROUP_CHALLENGE_REQUEST,
    SUBGROUP_CHALLENGE_RESPONSE, SUBGROUP_LOGIN_REQUEST, SUBGROUP_LOGIN_RESPONSE, TLV_AUTH_COOKIE,
    TLV_EMAIL, TLV_ERROR_SUBCODE, TLV_ERROR_URL, TLV_PASSWORD_RESET_URL, TLV_RECONNECT_HOST,
    TLV_SCREEN_NAME,
};
use oscar_proto::tlv::{Tlv, TlvRestBlock};
use oscar_proto::wire::Unmarshal;

/// Handles one SNAC on the authentication endpoint. `pending` holds the
/// session allocated by the challenge step until login claims it.
pub fn handle<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    pending: &mut Option<Arc<Session>>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    if snac.food_group != foodgroup::BUCP {
        return Err(ServerError::RouteNotFound(snac.food_group));
    }
    match snac.subgroup {
        SUBGROUP_CHALLENGE_REQUEST => {
            let _ = ChallengeRequest::unmarshal(body)?;
            let session = ctx.sessions.new_session();
            let auth_key = session.cookie().to_string();
            *pending = Some(session);
            Ok(vec![SnacMessage::reply(
                snac,
                SUBGROUP_CHALLENGE_RESPONSE,
                &ChallengeResponse { auth_key },
            )?])
        }
        SUBGROUP_LOGIN_REQUEST => {
            let request = LoginRequest::unmarshal(body)?;
            let Some(screen_name) =
                request.tlvs.string(TLV_SCREEN_NAME).filter(|name| !name.is_empty())
            else {
                return Ok(vec![SnacMessage::error(snac, errorcode::INVALID_SNAC)?]);
            };

            let session = match pending.take() {
                Some(session) => session,
                None => ctx.sessions.new_session(),
            };
            ctx.store.upsert_user(&screen_name)?;
            session.set_screen_name(screen_name.clone());
            tracing::info!(user = %screen_name, cookie = %session.cookie(), "login complete");

            let host = &ctx.config.advertised_host;
            let tlvs = TlvRestBlock::from(vec![
                Tlv::new_string(TLV_SCREEN_NAME, &screen_name),
                Tlv::new_u16(TLV_ERROR_SUBCODE, 0),
                Tlv::new_string(TLV_ERROR_URL, ""),
                Tlv::new_string(TLV_RECONNECT_HOST, &ctx.config.bos_address()),
                Tlv::new_string(TLV_AUTH_COOKIE, session.cookie()),
                Tlv::new_string(TLV_EMAIL, &format!("{screen_name}@{host}")),
                Tlv::new_string(TLV_PASSWORD_RESET_URL, &format!("https://{host}/password-reset")),
            ]);
            Ok(vec![SnacMessage::reply(snac, SUBGROUP_LOGIN_RESPONSE, &LoginResponse { tlvs })?])
        }
        _ => Ok(vec![SnacMessage::error(snac, errorcode::NOT_SUPPORTED_BY_HOST)?]),
    }
}
