//! Listener setup: one TCP endpoint per service role, one spawned task per
//! accepted connection.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::chat::ChatRegistry;
use crate::endpoint;
use crate::error::ServerError;
use crate::handlers::ServerContext;
use crate::session::SessionManager;
use crate::store::FeedbagStore;

/// Bind and advertise configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listeners bind to
    pub bind_host: String,
    /// Hostname clients are told to reconnect to for service hand-off
    pub advertised_host: String,
    /// Authentication endpoint port
    pub auth_port: u16,
    /// BOS (basic services) endpoint port
    pub bos_port: u16,
    /// Chat-navigation endpoint port
    pub chat_nav_port: u16,
    /// Chat-room endpoint port
    pub chat_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            advertised_host: "127.0.0.1".to_string(),
            auth_port: 5190,
            bos_port: 5191,
            chat_nav_port: 5192,
            chat_port: 5193,
        }
    }
}

impl ServerConfig {
    /// `host:port` clients reconnect to after login.
    pub fn bos_address(&self) -> String {
        format!("{}:{}", self.advertised_host, self.bos_port)
    }

    /// `host:port` of the chat-navigation service.
    pub fn chat_nav_address(&self) -> String {
        format!("{}:{}", self.advertised_host, self.chat_nav_port)
    }

    /// `host:port` of the chat-room service.
    pub fn chat_address(&self) -> String {
        format!("{}:{}", self.advertised_host, self.chat_port)
    }
}

/// Which service a listener speaks.
#[derive(Debug, Clone, Copy)]
enum Role {
    Auth,
    Bos,
    ChatNav,
    Chat,
}

/// The OSCAR server: four listeners over one shared context.
pub struct Server<S> {
    ctx: ServerContext<S>,
}

impl<S: FeedbagStore> Server<S> {
    /// Builds a server around a feedbag store handle.
    pub fn new(config: ServerConfig, store: S) -> Self {
        Self {
            ctx: ServerContext {
                sessions: Arc::new(SessionManager::new()),
                store,
                chat: Arc::new(ChatRegistry::new()),
                config,
            },
        }
    }

    /// Binds all four endpoints and serves until interrupted.
    pub async fn run(self) -> Result<(), ServerError> {
        let config = &self.ctx.config;
        let bind = config.bind_host.as_str();
        let auth = TcpListener::bind((bind, config.auth_port)).await?;
        let bos = TcpListener::bind((bind, config.bos_port)).await?;
        let chat_nav = TcpListener::bind((bind, config.chat_nav_port)).await?;
        let chat = TcpListener::bind((bind, config.chat_port)).await?;

        tracing::info!(auth = config.auth_port, bos = config.bos_port,
            chat_nav = config.chat_nav_port, chat = config.chat_port,
            "listening on {bind}");

        tokio::spawn(accept_loop(auth, self.ctx.clone(), Role::Auth));
        tokio::spawn(accept_loop(bos, self.ctx.clone(), Role::Bos));
        tokio::spawn(accept_loop(chat_nav, self.ctx.clone(), Role::ChatNav));
        tokio::spawn(accept_loop(chat, self.ctx.clone(), Role::Chat));

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutting down");
        Ok(())
    }
}

async fn accept_loop<S: FeedbagStore>(listener: TcpListener, ctx: ServerContext<S>, role: Role) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, ?role, "connection accepted");
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let result = match role {
                        Role::Auth => endpoint::run_auth_connection(ctx, stream).await,
                        Role::Bos => endpoint::run_bos_connection(ctx, stream).await,
                        Role::ChatNav => endpoint::run_chat_nav_connection(ctx, stream).await,
                        Role::Chat => endpoint::run_chat_connection(ctx, stream).await,
                    };
                    if let Err(err) = result {
                        tracing::debug!(%peer, error = %err, "connection closed");
                    }
                });
            }
            Err(err) => {
                tracing::error!(error = %err, ?role, "accept failed");
            }
        }
    }
}
