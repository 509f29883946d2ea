//! OSCAR server binary.
//!
//! # Usage
//!
//! ```bash
//! # Local development: all four services on their default ports
//! oscar-server --db ./oscar.sqlite
//!
//! # Reachable from other machines
//! oscar-server --bind 0.0.0.0 --host chat.example.net --db /var/lib/oscar.sqlite
//! ```

use clap::Parser;
use oscar_server::store::SqliteFeedbagStore;
use oscar_server::{Server, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// OSCAR instant-messaging server
#[derive(Parser, Debug)]
#[command(name = "oscar-server")]
#[command(about = "Instant-messaging server speaking the OSCAR protocol")]
#[command(version)]
struct Args {
    /// Address to bind all listeners to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Hostname advertised to clients for reconnect and service hand-off
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Authentication service port
    #[arg(long, default_value = "5190")]
    auth_port: u16,

    /// BOS (basic services) port
    #[arg(long, default_value = "5191")]
    bos_port: u16,

    /// Chat navigation port
    #[arg(long, default_value = "5192")]
    chat_nav_port: u16,

    /// Chat room port
    #[arg(long, default_value = "5193")]
    chat_port: u16,

    /// SQLite database file
    #[arg(long, default_value = "oscar.sqlite")]
    db: std::path::PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("oscar-server starting");

    let store = SqliteFeedbagStore::open(&args.db)?;
    tracing::info!(db = %args.db.display(), "feedbag store opened");

    let config = ServerConfig {
        bind_host: args.bind,
        advertised_host: args.host,
        auth_port: args.auth_port,
        bos_port: args.bos_port,
        chat_nav_port: args.chat_nav_port,
        chat_port: args.chat_port,
    };
    Server::new(config, store).run().await?;

    Ok(())
}
