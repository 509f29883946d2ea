//! Food-group handlers and the two-level request router.
//!
//! Dispatch is first on food group, then on subgroup inside each handler
//! module. An unknown food group is fatal to the connection; an unknown
//! subgroup within a handled group earns a `NotSupportedByHost` SNAC error
//! and the connection lives on.
//!
//! Handlers are functions from (context, session, SNAC, body) to the list
//! of SNACs to write back on the requesting connection; every cross-session
//! effect goes through session inbound channels instead. Replies mirror the
//! request id, pushes carry id zero.

pub mod auth;
pub mod buddy;
pub mod chat;
pub mod chatnav;
pub mod feedbag;
pub mod icbm;
pub mod locate;
pub mod oservice;
pub mod pd;

use std::sync::Arc;

use bytes::Bytes;

use crate::chat::{ChatRegistry, ChatRoom};
use crate::error::ServerError;
use crate::server::ServerConfig;
use crate::session::{Session, SessionManager, SnacMessage};
use crate::store::FeedbagStore;
use oscar_proto::snac::{SnacHeader, foodgroup};

/// Shared state handed to every handler: the session registry, the feedbag
/// store, the chat registry, and the advertised addresses.
#[derive(Clone)]
pub struct ServerContext<S> {
    /// Process-wide session registry
    pub sessions: Arc<SessionManager>,
    /// Feedbag store handle
    pub store: S,
    /// Chat rooms and hand-off cookies
    pub chat: Arc<ChatRegistry>,
    /// Bind/advertise configuration
    pub config: ServerConfig,
}

/// Routes one SNAC on a BOS connection.
pub async fn route_bos<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.food_group {
        foodgroup::OSERVICE => oservice::handle(ctx, session, snac, body).await,
        foodgroup::LOCATE => locate::handle(ctx, session, snac, body).await,
        foodgroup::BUDDY => buddy::handle(snac, body),
        foodgroup::PD => pd::handle(snac, body),
        foodgroup::ICBM => icbm::handle(ctx, session, snac, body).await,
        foodgroup::FEEDBAG => feedbag::handle(ctx, session, snac, body).await,
        other => Err(ServerError::RouteNotFound(other)),
    }
}

/// Routes one SNAC on a chat-nav connection.
pub async fn route_chat_nav<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.food_group {
        foodgroup::OSERVICE => oservice::handle_service_lite(snac, body),
        foodgroup::CHAT_NAV => chatnav::handle(ctx, snac, body),
        other => Err(ServerError::RouteNotFound(other)),
    }
}

/// Routes one SNAC on a chat-room connection.
pub async fn route_chat<S: FeedbagStore>(
    _ctx: &ServerContext<S>,
    room: &Arc<ChatRoom>,
    session: &Arc<Session>,
    snac: &SnacHeader,
    body: &mut Bytes,
) -> Result<Vec<SnacMessage>, ServerError> {
    match snac.food_group {
        foodgroup::OSERVICE => oservice::handle_service_lite(snac, body),
        foodgroup::CHAT => chat::handle(room, session, snac, body).await,
        other => Err(ServerError::RouteNotFound(other)),
    }
}
