//! Per-connection drivers for the four service roles.
//!
//! Every connection starts with the sign-on handshake: the server greets
//! with a sign-on FLAP carrying the protocol version, the client answers
//! with its own sign-on FLAP. The auth endpoint then speaks BUCP; the
//! BOS-class endpoints (BOS, chat-nav, chat) require a cookie TLV and tear
//! the connection down when it does not resolve.
//!
//! Two concurrent sources feed a BOS or chat worker: frames from the socket
//! and messages delivered to the session's inbound channel. A dedicated
//! writer task owns the socket write half and drains one outbound queue;
//! the read loop and an inbound-channel forwarder both feed that queue, so
//! neither source starves the other and a frame read is never cancelled
//! halfway.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::chat::{ChatRoom, Handoff};
use crate::error::ServerError;
use crate::frame::{FlapReader, FlapWriter};
use crate::handlers::{self, ServerContext};
use crate::presence;
use crate::session::{Session, SnacMessage};
use crate::store::FeedbagStore;
use oscar_proto::flap::SIGNON_TLV_COOKIE;
use oscar_proto::snac::{SnacHeader, foodgroup};
use oscar_proto::snacs::CHAT_CAPABILITY;
use oscar_proto::snacs::chat::{
    SUBGROUP_ROOM_INFO_UPDATE, SUBGROUP_USERS_JOINED, SUBGROUP_USERS_LEFT, UsersJoined, UsersLeft,
};
use oscar_proto::snacs::oservice::{HostOnline, SUBGROUP_HOST_ONLINE};
use oscar_proto::wire::{Unmarshal, from_bytes, to_bytes};
use oscar_proto::{FlapFrame, FlapFrameType, FlapSignonFrame, TlvRestBlock};

/// Connections with no inbound frame for this long are torn down.
/// Keep-alive FLAPs count as liveness evidence.
const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Depth of the per-connection outbound queue drained by the writer task.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

async fn read_frame_deadline<R: AsyncRead + Unpin>(
    reader: &mut FlapReader<R>,
) -> Result<(FlapFrame, Bytes), ServerError> {
    timeout(READ_IDLE_TIMEOUT, reader.read_frame()).await.map_err(|_| ServerError::IdleTimeout)?
}

/// Greets, then reads and parses the client's sign-on frame.
async fn signon_handshake<R, W>(
    reader: &mut FlapReader<R>,
    writer: &mut FlapWriter<W>,
) -> Result<FlapSignonFrame, ServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.send_signon(TlvRestBlock::new()).await?;
    let (flap, payload) = read_frame_deadline(reader).await?;
    if flap.frame_type != FlapFrameType::SignOn {
        return Err(ServerError::SignonRejected("expected sign-on frame"));
    }
    Ok(from_bytes(&payload)?)
}

/// Writer task body: owns the write half, serializes every outbound frame.
async fn drain_outbound<W: AsyncWrite + Unpin>(
    mut writer: FlapWriter<W>,
    mut outbound: mpsc::Receiver<SnacMessage>,
) -> FlapWriter<W> {
    while let Some(msg) = outbound.recv().await {
        if let Err(err) = writer.send_message(&msg).await {
            tracing::debug!(error = %err, "outbound write failed");
            break;
        }
    }
    writer
}

/// Drives an authentication connection: sign-on, then BUCP challenge and
/// login on the same connection.
pub async fn run_auth_connection<S, T>(ctx: ServerContext<S>, stream: T) -> Result<(), ServerError>
where
    S: FeedbagStore,
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FlapReader::new(read_half);
    let mut writer = FlapWriter::new(write_half);

    let _signon = signon_handshake(&mut reader, &mut writer).await?;
    let mut pending: Option<Arc<Session>> = None;

    let result = auth_loop(&ctx, &mut reader, &mut writer, &mut pending).await;

    // A challenge session that never completed login has no owner; drop it
    if let Some(session) = pending {
        if session.screen_name().is_empty() {
            session.close();
            ctx.sessions.remove(&session);
        }
    }
    let _ = writer.send_signoff().await;
    result
}

async fn auth_loop<S, R, W>(
    ctx: &ServerContext<S>,
    reader: &mut FlapReader<R>,
    writer: &mut FlapWriter<W>,
    pending: &mut Option<Arc<Session>>,
) -> Result<(), ServerError>
where
    S: FeedbagStore,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let (flap, payload) = read_frame_deadline(reader).await?;
        match flap.frame_type {
            FlapFrameType::Data => {
                let mut body = payload;
                let snac = SnacHeader::unmarshal(&mut body)?;
                let replies = handlers::auth::handle(ctx, pending, &snac, &mut body)?;
                for reply in replies {
                    writer.send_message(&reply).await?;
                }
            }
            FlapFrameType::KeepAlive => {}
            FlapFrameType::SignOn => {
                return Err(ServerError::SignonRejected("unexpected sign-on frame"));
            }
            FlapFrameType::SignOff | FlapFrameType::Error => return Ok(()),
        }
    }
}

/// Drives a BOS connection: cookie verification, host-online, then the
/// main read loop with a writer task draining the outbound queue. Teardown
/// broadcasts the departure and removes the session from the manager.
pub async fn run_bos_connection<S, T>(ctx: ServerContext<S>, stream: T) -> Result<(), ServerError>
where
    S: FeedbagStore,
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FlapReader::new(read_half);
    let mut writer = FlapWriter::new(write_half);

    let signon = signon_handshake(&mut reader, &mut writer).await?;
    let Some(cookie) = signon.tlvs.string(SIGNON_TLV_COOKIE) else {
        let _ = writer.send_signoff().await;
        return Err(ServerError::SignonRejected("missing login cookie"));
    };
    let Some(session) = ctx.sessions.retrieve(&cookie) else {
        let _ = writer.send_signoff().await;
        return Err(ServerError::SignonRejected("unknown login cookie"));
    };
    let Some(mut inbound) = session.take_receiver() else {
        let _ = writer.send_signoff().await;
        return Err(ServerError::SignonRejected("session already attached"));
    };
    tracing::debug!(user = %session.screen_name(), "BOS connection attached");

    let host_online = HostOnline {
        food_groups: vec![
            foodgroup::OSERVICE,
            foodgroup::LOCATE,
            foodgroup::BUDDY,
            foodgroup::ICBM,
            foodgroup::PD,
            foodgroup::FEEDBAG,
        ],
    };
    writer
        .send_snac(
            &SnacHeader::new(foodgroup::OSERVICE, SUBGROUP_HOST_ONLINE),
            &to_bytes(&host_online)?,
        )
        .await?;

    let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
    let writer_task = tokio::spawn(drain_outbound(writer, out_rx));
    let forward_tx = out_tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(msg) = inbound.recv().await {
            if forward_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let result = bos_read_loop(&ctx, &session, &mut reader, &out_tx).await;

    if let Err(err) = presence::broadcast_departure(&ctx, &session).await {
        tracing::warn!(error = %err, "departure fan-out failed");
    }
    session.close();
    ctx.sessions.remove(&session);

    forwarder.abort();
    drop(out_tx);
    if let Ok(mut writer) = writer_task.await {
        let _ = writer.send_signoff().await;
    }
    result
}

async fn bos_read_loop<S, R>(
    ctx: &ServerContext<S>,
    session: &Arc<Session>,
    reader: &mut FlapReader<R>,
    out_tx: &mpsc::Sender<SnacMessage>,
) -> Result<(), ServerError>
where
    S: FeedbagStore,
    R: AsyncRead + Unpin,
{
    loop {
        let framed = tokio::select! {
            framed = read_frame_deadline(reader) => framed,
            () = session.stopped() => return Ok(()),
        };
        let (flap, payload) = framed?;
        match flap.frame_type {
            FlapFrameType::Data => {
                let mut body = payload;
                let snac = SnacHeader::unmarshal(&mut body)?;
                let replies = handlers::route_bos(ctx, session, &snac, &mut body).await?;
                for reply in replies {
                    if out_tx.send(reply).await.is_err() {
                        return Ok(());
                    }
                }
            }
            FlapFrameType::KeepAlive => {}
            FlapFrameType::SignOn => {
                return Err(ServerError::SignonRejected("unexpected sign-on frame"));
            }
            FlapFrameType::SignOff | FlapFrameType::Error => return Ok(()),
        }
    }
}

/// Drives a chat-nav connection. Request/response only: no session channel
/// is attached.
pub async fn run_chat_nav_connection<S, T>(
    ctx: ServerContext<S>,
    stream: T,
) -> Result<(), ServerError>
where
    S: FeedbagStore,
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FlapReader::new(read_half);
    let mut writer = FlapWriter::new(write_half);

    let signon = signon_handshake(&mut reader, &mut writer).await?;
    let Some(cookie) = signon.tlvs.string(SIGNON_TLV_COOKIE) else {
        let _ = writer.send_signoff().await;
        return Err(ServerError::SignonRejected("missing service cookie"));
    };
    let Some(Handoff::Nav { screen_name }) = ctx.chat.take_handoff(&cookie) else {
        let _ = writer.send_signoff().await;
        return Err(ServerError::SignonRejected("unknown service cookie"));
    };
    tracing::debug!(user = %screen_name, "chat-nav connection attached");

    let host_online = HostOnline { food_groups: vec![foodgroup::OSERVICE, foodgroup::CHAT_NAV] };
    writer
        .send_snac(
            &SnacHeader::new(foodgroup::OSERVICE, SUBGROUP_HOST_ONLINE),
            &to_bytes(&host_online)?,
        )
        .await?;

    loop {
        let (flap, payload) = read_frame_deadline(&mut reader).await?;
        match flap.frame_type {
            FlapFrameType::Data => {
                let mut body = payload;
                let snac = SnacHeader::unmarshal(&mut body)?;
                let replies = handlers::route_chat_nav(&ctx, &snac, &mut body).await?;
                for reply in replies {
                    writer.send_message(&reply).await?;
                }
            }
            FlapFrameType::KeepAlive => {}
            FlapFrameType::SignOn => {
                return Err(ServerError::SignonRejected("unexpected sign-on frame"));
            }
            FlapFrameType::SignOff | FlapFrameType::Error => {
                let _ = writer.send_signoff().await;
                return Ok(());
            }
        }
    }
}

/// Drives a chat-room connection: redeem the hand-off, join the roster,
/// relay traffic, and announce the leave on the way out.
pub async fn run_chat_connection<S, T>(ctx: ServerContext<S>, stream: T) -> Result<(), ServerError>
where
    S: FeedbagStore,
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FlapReader::new(read_half);
    let mut writer = FlapWriter::new(write_half);

    let signon = signon_handshake(&mut reader, &mut writer).await?;
    let Some(cookie) = signon.tlvs.string(SIGNON_TLV_COOKIE) else {
        let _ = writer.send_signoff().await;
        return Err(ServerError::SignonRejected("missing service cookie"));
    };
    let Some(Handoff::Room { screen_name, room_cookie }) = ctx.chat.take_handoff(&cookie) else {
        let _ = writer.send_signoff().await;
        return Err(ServerError::SignonRejected("unknown service cookie"));
    };
    let Some(room) = ctx.chat.room(&room_cookie) else {
        let _ = writer.send_signoff().await;
        return Err(ServerError::SignonRejected("room is gone"));
    };

    let host_online = HostOnline { food_groups: vec![foodgroup::OSERVICE, foodgroup::CHAT] };
    writer
        .send_snac(
            &SnacHeader::new(foodgroup::OSERVICE, SUBGROUP_HOST_ONLINE),
            &to_bytes(&host_online)?,
        )
        .await?;

    // The room keeps its own session per member connection
    let session = room.sessions.new_session();
    session.set_screen_name(screen_name.clone());
    session.set_capabilities(vec![CHAT_CAPABILITY]);
    if let Some(bos_session) = ctx.sessions.retrieve_by_screen_name(&screen_name) {
        session.incr_warning(bos_session.warning_level());
    }
    let Some(mut inbound) = session.take_receiver() else {
        room.sessions.remove(&session);
        return Err(ServerError::SignonRejected("room session already attached"));
    };
    tracing::debug!(user = %screen_name, room = %room.name, "joined chat room");

    // Room metadata and current roster go to the joiner
    writer
        .send_snac(
            &SnacHeader::new(foodgroup::CHAT, SUBGROUP_ROOM_INFO_UPDATE),
            &to_bytes(&room.room_info())?,
        )
        .await?;
    let roster: Vec<_> = room
        .sessions
        .all()
        .iter()
        .filter(|member| member.cookie() != session.cookie())
        .map(|member| member.user_info())
        .collect();
    if !roster.is_empty() {
        writer
            .send_snac(
                &SnacHeader::new(foodgroup::CHAT, SUBGROUP_USERS_JOINED),
                &to_bytes(&UsersJoined { users: roster })?,
            )
            .await?;
    }
    // Peers learn about the join
    let joined = SnacMessage::new(
        foodgroup::CHAT,
        SUBGROUP_USERS_JOINED,
        &UsersJoined { users: vec![session.user_info()] },
    )?;
    room.sessions.broadcast_except(&session, joined).await;

    let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
    let writer_task = tokio::spawn(drain_outbound(writer, out_rx));
    let forward_tx = out_tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(msg) = inbound.recv().await {
            if forward_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let result = chat_read_loop(&ctx, &room, &session, &mut reader, &out_tx).await;

    room.sessions.remove(&session);
    session.close();
    let left = SnacMessage::new(
        foodgroup::CHAT,
        SUBGROUP_USERS_LEFT,
        &UsersLeft { users: vec![session.user_info()] },
    );
    if let Ok(left) = left {
        room.sessions.broadcast_except(&session, left).await;
    }
    tracing::debug!(user = %screen_name, room = %room.name, "left chat room");

    forwarder.abort();
    drop(out_tx);
    if let Ok(mut writer) = writer_task.await {
        let _ = writer.send_signoff().await;
    }
    result
}

async fn chat_read_loop<S, R>(
    ctx: &ServerContext<S>,
    room: &Arc<ChatRoom>,
    session: &Arc<Session>,
    reader: &mut FlapReader<R>,
    out_tx: &mpsc::Sender<SnacMessage>,
) -> Result<(), ServerError>
where
    S: FeedbagStore,
    R: AsyncRead + Unpin,
{
    loop {
        let framed = tokio::select! {
            framed = read_frame_deadline(reader) => framed,
            () = session.stopped() => return Ok(()),
        };
        let (flap, payload) = framed?;
        match flap.frame_type {
            FlapFrameType::Data => {
                let mut body = payload;
                let snac = SnacHeader::unmarshal(&mut body)?;
                let replies = handlers::route_chat(ctx, room, session, &snac, &mut body).await?;
                for reply in replies {
                    if out_tx.send(reply).await.is_err() {
                        return Ok(());
                    }
                }
            }
            FlapFrameType::KeepAlive => {}
            FlapFrameType::SignOn => {
                return Err(ServerError::SignonRejected("unexpected sign-on frame"));
            }
            FlapFrameType::SignOff | FlapFrameType::Error => return Ok(()),
        }
    }
}
