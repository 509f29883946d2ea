//! OSCAR instant-messaging server.
//!
//! Accepts authenticated client connections over the legacy FLAP/SNAC wire
//! protocol, maintains per-user presence and buddy-list state, and brokers
//! instant messages, warnings, profiles, away messages, and chat-room
//! traffic between concurrently connected users.
//!
//! # Architecture
//!
//! One TCP listener per service role (auth, BOS, chat-nav, chat); one
//! spawned task per accepted connection. Workers read framed requests and
//! multiplex them against the session's inbound channel, through which all
//! cross-connection traffic flows — handlers never touch a remote
//! connection's socket.
//!
//! - [`frame`]: FLAP socket I/O and the per-connection sequence counter
//! - [`session`]: sessions, the session manager, and message passing
//! - [`store`]: the persistent feedbag (users, buddy items, profiles)
//! - [`handlers`]: the (food group, subgroup) router and per-operation logic
//! - [`presence`]: arrival/departure fan-out to interested watchers
//! - [`chat`]: chat rooms and service hand-off cookies
//! - [`endpoint`]: per-role connection drivers
//! - [`server`]: listener setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chat;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod presence;
pub mod server;
pub mod session;
pub mod store;

pub use error::ServerError;
pub use server::{Server, ServerConfig};
pub use session::{Session, SessionManager, SnacMessage};
