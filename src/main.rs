//! Tank Arena Host - authoritative peer for a multiplayer tank arena
//!
//! This binary runs a headless host: it claims the room identifier for the
//! configured room code, fields the bots, and serves joining peers. Set
//! ARENA_DEMO_CLIENTS to also spawn wandering headless clients against it.

mod config;
mod game;
mod lobby;
mod net;
mod util;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::game::{InputState, Region};
use crate::lobby::{InMemoryLobby, LobbyDirectory};
use crate::net::broker::PeerBroker;
use crate::net::{client, negotiate_role, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Tank Arena host");
    info!(
        room_code = %config.room_code,
        room_name = %config.room_name,
        bots = config.bot_count,
        "Room configuration"
    );

    let broker = PeerBroker::new();

    let session = negotiate_role(
        &broker,
        &config.room_code,
        &config.host_name,
        config.host_region,
        &config.room_name,
        config.settings(),
    )
    .await?;

    let host = match session {
        Session::Host(host) => host,
        Session::Client(_) => anyhow::bail!("room code already hosted in this process"),
    };

    // Publish the room to the directory the lobby UI reads
    let lobby = InMemoryLobby::new();
    lobby.publish(host.advert());
    info!(rooms = lobby.list().len(), "Room advertised");

    for i in 0..config.demo_clients {
        let broker = broker.clone();
        let room_code = config.room_code.clone();
        tokio::spawn(async move {
            run_demo_client(broker, room_code, i).await;
        });
    }

    shutdown_signal().await;

    lobby.remove(&config.room_code);
    host.shutdown();
    info!("Host shutdown complete");
    Ok(())
}

/// A headless client that wanders and occasionally shoots
async fn run_demo_client(broker: PeerBroker, room_code: String, index: u32) {
    let mut rng = ChaCha8Rng::from_entropy();
    let region = Region::ALL[rng.gen_range(0..Region::ALL.len())];
    let name = format!("Demo {}", index + 1);

    let mut handle = match client::join(&broker, &room_code, &name, region).await {
        Ok(handle) => handle,
        Err(e) => {
            warn!(index, error = %e, "Demo client failed to join");
            return;
        }
    };

    loop {
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.send_input(InputState {
            up: rng.gen_bool(0.3),
            down: rng.gen_bool(0.3),
            left: rng.gen_bool(0.3),
            right: rng.gen_bool(0.3),
            fire: rng.gen_bool(0.2),
        });
    }
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
