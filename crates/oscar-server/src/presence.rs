//! Presence fan-out: arrival and departure notifications.
//!
//! The audience for a presence change is the interested-users set derived
//! by the feedbag store: everyone holding a buddy item for the subject,
//! minus any pair with a block in either direction. Arrivals carry the full user-info
//! TLV list; departures carry screen name and warning level only.

use std::sync::Arc;

use crate::error::ServerError;
use crate::handlers::ServerContext;
use crate::session::{Session, SnacMessage};
use crate::store::FeedbagStore;
use oscar_proto::snac::foodgroup;
use oscar_proto::snacs::buddy::{Arrived, Departed, SUBGROUP_ARRIVED, SUBGROUP_DEPARTED};

/// Notifies every interested watcher that `session`'s user arrived (or
/// refreshed presence: un-away, idle change, visibility return).
pub async fn broadcast_arrival<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
) -> Result<(), ServerError> {
    let screen_name = session.screen_name();
    if screen_name.is_empty() {
        return Ok(());
    }
    let watchers = ctx.store.interested_users(&screen_name)?;
    if watchers.is_empty() {
        return Ok(());
    }
    let msg = SnacMessage::new(
        foodgroup::BUDDY,
        SUBGROUP_ARRIVED,
        &Arrived { user_info: session.user_info() },
    )?;
    tracing::debug!(user = %screen_name, watchers = watchers.len(), "arrival fan-out");
    ctx.sessions.broadcast_to_screen_names(&watchers, msg).await;
    Ok(())
}

/// Notifies every interested watcher that `session`'s user departed (or
/// went invisible).
pub async fn broadcast_departure<S: FeedbagStore>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
) -> Result<(), ServerError> {
    let screen_name = session.screen_name();
    if screen_name.is_empty() {
        return Ok(());
    }
    let watchers = ctx.store.interested_users(&screen_name)?;
    if watchers.is_empty() {
        return Ok(());
    }
    let msg = SnacMessage::new(
        foodgroup::BUDDY,
        SUBGROUP_DEPARTED,
        &Departed { user_info: session.departed_info() },
    )?;
    tracing::debug!(user = %screen_name, watchers = watchers.len(), "departure fan-out");
    ctx.sessions.broadcast_to_screen_names(&watchers, msg).await;
    Ok(())
}
