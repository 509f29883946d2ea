//! Sessions and the process-wide session manager.
//!
//! A [`Session`] is created at authentication, keyed by its sign-on cookie,
//! and removed on disconnect. Cross-connection delivery is message passing:
//! every session owns a bounded inbound channel that its connection worker
//! drains, so no handler ever holds a remote session's lock while doing I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use oscar_proto::snac::SnacHeader;
use oscar_proto::snacs::{TlvUserInfo, userinfo};
use oscar_proto::tlv::{Tlv, TlvBlock};
use oscar_proto::wire::{Marshal, WireError, to_bytes};

/// Depth of each session's inbound channel. Bounded so slow consumers exert
/// backpressure on their senders.
const INBOUND_QUEUE_DEPTH: usize = 8;

/// A pre-marshaled SNAC ready for delivery: header plus body bytes. Cheap to
/// clone for fan-out.
#[derive(Debug, Clone)]
pub struct SnacMessage {
    /// SNAC header; request id zero for asynchronous pushes
    pub header: SnacHeader,
    /// Marshaled body
    pub body: Bytes,
}

impl SnacMessage {
    /// Asynchronous push with a zeroed request id.
    pub fn new<T: Marshal>(
        food_group: u16,
        subgroup: u16,
        body: &T,
    ) -> Result<Self, WireError> {
        Ok(Self { header: SnacHeader::new(food_group, subgroup), body: to_bytes(body)? })
    }

    /// Reply within the request's food group, mirroring its request id.
    pub fn reply<T: Marshal>(
        request: &SnacHeader,
        subgroup: u16,
        body: &T,
    ) -> Result<Self, WireError> {
        let mut header = SnacHeader::new(request.food_group, subgroup);
        header.request_id = request.request_id;
        Ok(Self { header, body: to_bytes(body)? })
    }

    /// Error reply carrying one SNAC error code.
    pub fn error(request: &SnacHeader, code: u16) -> Result<Self, WireError> {
        Self::reply(request, oscar_proto::snac::SUBGROUP_ERR, &oscar_proto::SnacError::new(code))
    }
}

/// Mutable per-session attributes, guarded by the session's own lock.
struct SessionState {
    screen_name: String,
    warning_level: u16,
    away_message: String,
    invisible: bool,
    idle_since: Option<Instant>,
    signon_time: SystemTime,
    capabilities: Vec<[u8; 16]>,
}

/// One signed-on connection, identified by an opaque cookie that is stable
/// for the connection's lifetime.
pub struct Session {
    cookie: String,
    state: Mutex<SessionState>,
    msg_tx: mpsc::Sender<SnacMessage>,
    msg_rx: Mutex<Option<mpsc::Receiver<SnacMessage>>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl Session {
    fn new(cookie: String) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            cookie,
            state: Mutex::new(SessionState {
                screen_name: String::new(),
                warning_level: 0,
                away_message: String::new(),
                invisible: false,
                idle_since: None,
                signon_time: SystemTime::now(),
                capabilities: Vec::new(),
            }),
            msg_tx,
            msg_rx: Mutex::new(Some(msg_rx)),
            stop_tx,
            stop_rx,
        }
    }

    #[allow(clippy::expect_used)]
    fn state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state lock poisoned")
    }

    /// The sign-on cookie identifying this session.
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Current screen name; empty until login completes.
    pub fn screen_name(&self) -> String {
        self.state().screen_name.clone()
    }

    /// Sets the screen name, normally once at login.
    pub fn set_screen_name(&self, screen_name: String) {
        self.state().screen_name = screen_name;
    }

    /// Current warning ("evil") level.
    pub fn warning_level(&self) -> u16 {
        self.state().warning_level
    }

    /// Raises the warning level. Monotonically non-decreasing for the
    /// session's lifetime.
    pub fn incr_warning(&self, delta: u16) -> u16 {
        let mut state = self.state();
        state.warning_level = state.warning_level.saturating_add(delta);
        state.warning_level
    }

    /// Current away message; empty when available.
    pub fn away_message(&self) -> String {
        self.state().away_message.clone()
    }

    /// Sets or clears (empty string) the away message.
    pub fn set_away_message(&self, message: String) {
        self.state().away_message = message;
    }

    /// Whether the session is invisible to watchers.
    pub fn invisible(&self) -> bool {
        self.state().invisible
    }

    /// Toggles invisibility. The caller is responsible for the matching
    /// arrival/departure broadcast.
    pub fn set_invisible(&self, invisible: bool) {
        self.state().invisible = invisible;
    }

    /// Marks the session idle for `idle_for` already-elapsed time, so
    /// watchers see a counter that started in the past.
    pub fn set_idle(&self, idle_for: Duration) {
        let start = Instant::now().checked_sub(idle_for).unwrap_or_else(Instant::now);
        self.state().idle_since = Some(start);
    }

    /// Clears idle state.
    pub fn clear_idle(&self) {
        self.state().idle_since = None;
    }

    /// Replaces the advertised capability UUIDs.
    pub fn set_capabilities(&self, capabilities: Vec<[u8; 16]>) {
        self.state().capabilities = capabilities;
    }

    /// Presence record with the full user-info TLV list: sign-on time,
    /// flags, status, idle seconds, and capabilities.
    pub fn user_info(&self) -> TlvUserInfo {
        let state = self.state();
        let signon_epoch = state
            .signon_time
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;

        let mut flags = userinfo::FLAG_AIM;
        if !state.away_message.is_empty() {
            flags |= userinfo::FLAG_UNAVAILABLE;
        }
        let mut status = 0u16;
        if state.invisible {
            status |= userinfo::STATUS_INVISIBLE;
        }
        let idle_secs = state
            .idle_since
            .map(|since| since.elapsed().as_secs().min(u64::from(u16::MAX)) as u16)
            .unwrap_or(0);

        let mut tlvs = vec![
            Tlv::new_u16(userinfo::TLV_FLAGS, flags),
            Tlv::new_u32(userinfo::TLV_SIGNON_TIME, signon_epoch),
            Tlv::new_u16(userinfo::TLV_IDLE_TIME, idle_secs),
            Tlv::new_u16(userinfo::TLV_STATUS, status),
        ];
        if !state.capabilities.is_empty() {
            let mut caps = Vec::with_capacity(state.capabilities.len() * 16);
            for cap in &state.capabilities {
                caps.extend_from_slice(cap);
            }
            tlvs.push(Tlv::new(userinfo::TLV_CAPABILITIES, caps));
        }

        TlvUserInfo {
            screen_name: state.screen_name.clone(),
            warning_level: state.warning_level,
            tlv_block: TlvBlock::from(tlvs),
        }
    }

    /// Minimal presence record for departures: screen name and warning
    /// level, no info TLVs.
    pub fn departed_info(&self) -> TlvUserInfo {
        let state = self.state();
        TlvUserInfo {
            screen_name: state.screen_name.clone(),
            warning_level: state.warning_level,
            tlv_block: TlvBlock::new(),
        }
    }

    /// Enqueues a message for the session's connection worker. The send
    /// races the stop signal: once the session is closed the message is
    /// silently dropped.
    pub async fn send_message(&self, msg: SnacMessage) {
        let mut stop_rx = self.stop_rx.clone();
        if *stop_rx.borrow() {
            return;
        }
        tokio::select! {
            result = self.msg_tx.send(msg) => {
                if result.is_err() {
                    tracing::debug!(cookie = %self.cookie, "dropping message for closed session");
                }
            }
            _ = stop_rx.changed() => {}
        }
    }

    /// Hands the inbound channel to the connection worker. `None` on a
    /// second call: each session has exactly one reader.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<SnacMessage>> {
        #[allow(clippy::expect_used)]
        self.msg_rx.lock().expect("session receiver lock poisoned").take()
    }

    /// Fires the stop signal; pending and future sends abort.
    pub fn close(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Whether [`Session::close`] has been called.
    pub fn is_closed(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Resolves once the session is closed.
    pub async fn stopped(&self) {
        let mut stop_rx = self.stop_rx.clone();
        if *stop_rx.borrow() {
            return;
        }
        let _ = stop_rx.changed().await;
    }
}

/// Registry of live sessions, keyed by cookie. Reads take the shared lock,
/// writes the exclusive lock.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::expect_used)]
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Session>>> {
        self.sessions.read().expect("session map lock poisoned")
    }

    #[allow(clippy::expect_used)]
    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Session>>> {
        self.sessions.write().expect("session map lock poisoned")
    }

    /// Allocates a fresh cookie, registers a session under it, and returns
    /// the session.
    pub fn new_session(&self) -> Arc<Session> {
        let cookie = Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(cookie.clone()));
        self.write().insert(cookie, Arc::clone(&session));
        session
    }

    /// Session for a cookie, if registered.
    pub fn retrieve(&self, cookie: &str) -> Option<Arc<Session>> {
        self.read().get(cookie).cloned()
    }

    /// Session for a screen name, if signed on.
    pub fn retrieve_by_screen_name(&self, screen_name: &str) -> Option<Arc<Session>> {
        self.read().values().find(|s| s.screen_name() == screen_name).cloned()
    }

    /// Sessions for each signed-on name in `screen_names`.
    pub fn retrieve_by_screen_names(&self, screen_names: &[String]) -> Vec<Arc<Session>> {
        let sessions = self.read();
        screen_names
            .iter()
            .filter_map(|name| sessions.values().find(|s| &s.screen_name() == name).cloned())
            .collect()
    }

    /// Every registered session.
    pub fn all(&self) -> Vec<Arc<Session>> {
        self.read().values().cloned().collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Enqueues for one screen name; a no-op if the user is not signed on.
    pub async fn send_to_screen_name(&self, screen_name: &str, msg: SnacMessage) {
        if let Some(session) = self.retrieve_by_screen_name(screen_name) {
            session.send_message(msg).await;
        }
    }

    /// Fan-out to every signed-on name in `screen_names`.
    pub async fn broadcast_to_screen_names(&self, screen_names: &[String], msg: SnacMessage) {
        for session in self.retrieve_by_screen_names(screen_names) {
            session.send_message(msg.clone()).await;
        }
    }

    /// Fan-out to every ready session except `excluded`. A session is ready
    /// once its screen name is set.
    pub async fn broadcast_except(&self, excluded: &Arc<Session>, msg: SnacMessage) {
        let targets: Vec<Arc<Session>> = self
            .read()
            .values()
            .filter(|s| s.cookie() != excluded.cookie() && !s.screen_name().is_empty())
            .cloned()
            .collect();
        for session in targets {
            session.send_message(msg.clone()).await;
        }
    }

    /// Deregisters a session. The caller closes it separately.
    pub fn remove(&self, session: &Session) {
        self.write().remove(session.cookie());
    }
}
