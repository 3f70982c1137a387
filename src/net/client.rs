//! Client session: a render-only follower of host state
//!
//! The client runs no physics. It joins, adopts the welcome snapshot, then
//! replaces its render state wholesale on every broadcast — reinstating
//! only its own entity id and forcing the role flag off. Losing the host
//! ends the session; there is no reconnection.

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::{GameState, InputState, Region};
use crate::util::time::unix_millis;

use super::broker::{ClaimError, PeerBroker, PeerReceiver, PeerSender};
use super::protocol::{room_channel_id, ChatMessage, NetMessage};
use super::send_msg;

/// Why a join attempt or a running session ended
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error(transparent)]
    Connect(#[from] ClaimError),

    /// The host refused us (room full or fatal condition)
    #[error("Join rejected: {0}")]
    Rejected(String),

    /// The link died before the handshake finished
    #[error("Connection closed during join")]
    ConnectionClosed,
}

/// Events surfaced to the embedding UI
#[derive(Debug)]
pub enum ClientEvent {
    Chat(ChatMessage),
    /// Terminal: the session is over and must be restarted from the join flow
    Ended { reason: String },
}

/// Handle held by the embedding UI of a client peer
pub struct ClientHandle {
    /// Entity id assigned by the host's welcome, preserved across snapshots
    pub player_id: String,
    /// Latest adopted snapshot, for rendering
    pub state_rx: watch::Receiver<GameState>,
    pub events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    sender: PeerSender,
    last_sent: InputState,
}

impl ClientHandle {
    /// Send the current input flags. Edge-triggered: consecutive identical
    /// states are suppressed, matching the on-change wire contract.
    pub fn send_input(&mut self, input: InputState) {
        if input == self.last_sent {
            return;
        }
        self.last_sent = input;
        send_msg(&self.sender, &NetMessage::Input { input });
    }

    /// Send a chat line to the host, which relays it to everyone else
    pub fn send_chat(&self, text: impl Into<String>) {
        let (sender_name, color) = {
            let state = self.state_rx.borrow();
            match state.player(&self.player_id) {
                Some(me) => (me.name.clone(), me.color.clone()),
                None => (self.player_id.clone(), "#fff".to_string()),
            }
        };
        send_msg(
            &self.sender,
            &NetMessage::Chat {
                message: ChatMessage {
                    id: Uuid::new_v4(),
                    sender: sender_name,
                    text: text.into(),
                    color,
                    timestamp: unix_millis(),
                },
            },
        );
    }
}

/// Connect to the holder of a room code and run the join handshake
pub async fn join(
    broker: &PeerBroker,
    room_code: &str,
    name: &str,
    region: Region,
) -> Result<ClientHandle, JoinError> {
    let channel_id = room_channel_id(room_code);
    let link = broker.connect(&channel_id)?;
    let (_host_id, sender, mut receiver) = link.split();

    send_msg(
        &sender,
        &NetMessage::Join {
            name: name.to_string(),
            region,
        },
    );

    // Broadcasts can race the welcome; skip frames until our id arrives
    let (player_id, state) = loop {
        let Some(text) = receiver.recv().await else {
            return Err(JoinError::ConnectionClosed);
        };
        match serde_json::from_str::<NetMessage>(&text) {
            Ok(NetMessage::Welcome { player_id, mut state }) => {
                state.my_id = Some(player_id.clone());
                state.is_host = false;
                break (player_id, state);
            }
            Ok(NetMessage::Error { message }) => {
                warn!(channel_id = %channel_id, error = %message, "Join rejected by host");
                return Err(JoinError::Rejected(message));
            }
            Ok(other) => {
                debug!("Skipping pre-welcome frame: {other:?}");
            }
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "Failed to parse frame, dropping");
            }
        }
    };

    info!(
        channel_id = %channel_id,
        player_id = %player_id,
        "Joined room as client"
    );

    let (state_tx, state_rx) = watch::channel(state);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let session_player_id = player_id.clone();
    tokio::spawn(async move {
        run_session(session_player_id, receiver, state_tx, events_tx).await;
    });

    Ok(ClientHandle {
        player_id,
        state_rx,
        events_rx,
        sender,
        last_sent: InputState::default(),
    })
}

/// Pump host frames into the render state until the link dies
async fn run_session(
    player_id: String,
    mut receiver: PeerReceiver,
    state_tx: watch::Sender<GameState>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
) {
    while let Some(text) = receiver.recv().await {
        let msg = match serde_json::from_str::<NetMessage>(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Failed to parse frame, dropping");
                continue;
            }
        };
        match msg {
            NetMessage::StateUpdate { mut state } => {
                // Wholesale replacement, except our identity survives
                state.my_id = Some(player_id.clone());
                state.is_host = false;
                let _ = state_tx.send(state);
            }
            NetMessage::Chat { message } => {
                let _ = events_tx.send(ClientEvent::Chat(message));
            }
            NetMessage::Error { message } => {
                warn!(player_id = %player_id, error = %message, "Fatal error from host");
                let _ = events_tx.send(ClientEvent::Ended { reason: message });
                return;
            }
            other => {
                debug!(player_id = %player_id, "Dropping unexpected frame: {other:?}");
            }
        }
    }

    info!(player_id = %player_id, "Lost connection to host, session over");
    let _ = events_tx.send(ClientEvent::Ended {
        reason: "Connection to host lost".to_string(),
    });
}
