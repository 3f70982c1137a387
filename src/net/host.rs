//! Host session: the authoritative side of a match
//!
//! One task owns the state, the per-tick input map and the connection
//! table. Connection readers fan frames into the session channel; the
//! tick loop drains nothing — an arriving INPUT mutates the slot the
//! *next* tick reads, never the executing one.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::audio::{AudioPort, NullAudio};
use crate::game::tuning::Tuning;
use crate::game::{advance, GameState, InputState, TickContext, HOST_PLAYER_ID};
use crate::lobby::RoomAdvert;
use crate::util::rate_limit::PeerRateLimiter;
use crate::util::time::{frame_delta, unix_millis, TICK_DURATION_MICROS};

use super::broker::{Listener, PeerLink, PeerSender};
use super::protocol::{ChatMessage, NetMessage, MAX_CONNECTIONS};
use super::send_msg;

/// How long a rejected connection is kept open so the error frame can be
/// delivered before the host closes it
const REJECT_GRACE: Duration = Duration::from_millis(500);

/// Commands from the embedding UI on the host machine
enum HostCommand {
    LocalInput(InputState),
    LocalChat(String),
    SetPing(String, u32),
    Shutdown,
}

/// Connection events fanned into the session loop
enum PeerEvent {
    Message { peer_id: String, msg: NetMessage },
    Disconnected { peer_id: String },
}

struct Connection {
    sender: PeerSender,
    joined: bool,
    limiter: PeerRateLimiter,
    reader: tokio::task::JoinHandle<()>,
}

/// Handle held by the embedding UI of the host peer
pub struct HostHandle {
    cmd_tx: mpsc::UnboundedSender<HostCommand>,
    /// Latest authoritative snapshot, for local rendering
    pub state_rx: watch::Receiver<GameState>,
    /// Chat applied locally on the host (own lines and relayed ones)
    pub chat_rx: mpsc::UnboundedReceiver<ChatMessage>,
}

impl HostHandle {
    /// Replace the host tank's input slot for the next tick
    pub fn set_local_input(&self, input: InputState) {
        let _ = self.cmd_tx.send(HostCommand::LocalInput(input));
    }

    /// Say something: applied locally and broadcast to every client
    pub fn send_chat(&self, text: impl Into<String>) {
        let _ = self.cmd_tx.send(HostCommand::LocalChat(text.into()));
    }

    /// Update the display-only latency estimate for a player
    pub fn set_ping(&self, player_id: impl Into<String>, ping_ms: u32) {
        let _ = self.cmd_tx.send(HostCommand::SetPing(player_id.into(), ping_ms));
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(HostCommand::Shutdown);
    }

    /// Room metadata for publication to a lobby directory
    pub fn advert(&self) -> RoomAdvert {
        RoomAdvert::from_state(&self.state_rx.borrow())
    }
}

/// The authoritative host session
pub struct HostSession {
    state: GameState,
    inputs: HashMap<String, InputState>,
    conns: HashMap<String, Connection>,
    listener: Listener,
    peer_tx: mpsc::UnboundedSender<PeerEvent>,
    peer_rx: mpsc::UnboundedReceiver<PeerEvent>,
    cmd_rx: mpsc::UnboundedReceiver<HostCommand>,
    state_tx: watch::Sender<GameState>,
    chat_tx: mpsc::UnboundedSender<ChatMessage>,
    rng: ChaCha8Rng,
    tuning: Tuning,
    audio: Box<dyn AudioPort>,
}

impl HostSession {
    /// Spawn a session task with default tuning and no audio output
    pub fn start(listener: Listener, state: GameState) -> HostHandle {
        Self::start_with(listener, state, Tuning::default(), Box::new(NullAudio))
    }

    /// Spawn a session task with explicit tuning and audio port
    pub fn start_with(
        listener: Listener,
        state: GameState,
        tuning: Tuning,
        audio: Box<dyn AudioPort>,
    ) -> HostHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (chat_tx, chat_rx) = mpsc::unbounded_channel();

        let session = Self {
            state,
            inputs: HashMap::new(),
            conns: HashMap::new(),
            listener,
            peer_tx,
            peer_rx,
            cmd_rx,
            state_tx,
            chat_tx,
            rng: ChaCha8Rng::from_entropy(),
            tuning,
            audio,
        };
        tokio::spawn(session.run());

        HostHandle {
            cmd_tx,
            state_rx,
            chat_rx,
        }
    }

    async fn run(mut self) {
        info!(
            room_id = %self.state.room_id,
            channel_id = %self.listener.channel_id(),
            "Hosting room"
        );

        let mut ticker = interval(Duration::from_micros(TICK_DURATION_MICROS));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let dt = frame_delta(now - last_tick);
                    last_tick = now;
                    self.run_tick(dt);
                }
                Some(link) = self.listener.accept() => {
                    self.handle_connect(link);
                }
                Some(event) = self.peer_rx.recv() => {
                    self.handle_peer_event(event);
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(HostCommand::LocalInput(input)) => {
                            self.inputs.insert(HOST_PLAYER_ID.to_string(), input);
                        }
                        Some(HostCommand::LocalChat(text)) => self.local_chat(text),
                        Some(HostCommand::SetPing(player_id, ping_ms)) => {
                            if let Some(p) = self.state.player_mut(&player_id) {
                                p.set_ping(ping_ms);
                            }
                        }
                        Some(HostCommand::Shutdown) | None => break,
                    }
                }
            }
        }

        // Closing the session drops every connection sender; clients see
        // the link die and end their own sessions
        for (_, conn) in self.conns.drain() {
            conn.reader.abort();
        }
        info!(room_id = %self.state.room_id, "Host session ended");
    }

    /// One simulation step plus the per-tick broadcast
    fn run_tick(&mut self, dt: f64) {
        let mut ctx = TickContext {
            now_ms: unix_millis(),
            rng: &mut self.rng,
            tuning: &self.tuning,
            audio: self.audio.as_ref(),
        };
        self.state = advance(&self.state, &self.inputs, dt, &mut ctx);

        let _ = self.state_tx.send(self.state.clone());

        // Encode the snapshot once, every connection gets the same frame
        let update = NetMessage::StateUpdate {
            state: self.state.clone(),
        };
        match serde_json::to_string(&update) {
            Ok(frame) => {
                for conn in self.conns.values() {
                    conn.sender.send(frame.clone());
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode state update"),
        }
    }

    /// Admit or reject an incoming connection
    fn handle_connect(&mut self, link: PeerLink) {
        let (peer_id, sender, mut receiver) = link.split();

        if self.conns.len() >= MAX_CONNECTIONS {
            warn!(peer_id = %peer_id, "Room full, rejecting connection");
            send_msg(
                &sender,
                &NetMessage::Error {
                    message: "Room is full".to_string(),
                },
            );
            // Keep the link alive briefly so the error frame gets through,
            // then close it from our side
            tokio::spawn(async move {
                tokio::time::sleep(REJECT_GRACE).await;
                drop(sender);
                drop(receiver);
            });
            return;
        }

        let events = self.peer_tx.clone();
        let reader_peer_id = peer_id.clone();
        let reader = tokio::spawn(async move {
            while let Some(text) = receiver.recv().await {
                let msg = match serde_json::from_str::<NetMessage>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(peer_id = %reader_peer_id, error = %e, "Failed to parse frame, dropping");
                        continue;
                    }
                };
                if events
                    .send(PeerEvent::Message {
                        peer_id: reader_peer_id.clone(),
                        msg,
                    })
                    .is_err()
                {
                    return;
                }
            }
            let _ = events.send(PeerEvent::Disconnected {
                peer_id: reader_peer_id,
            });
        });

        debug!(peer_id = %peer_id, "Connection accepted, awaiting join");
        self.conns.insert(
            peer_id,
            Connection {
                sender,
                joined: false,
                limiter: PeerRateLimiter::new(),
                reader,
            },
        );
    }

    fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Message { peer_id, msg } => self.handle_message(peer_id, msg),
            PeerEvent::Disconnected { peer_id } => self.remove_peer(&peer_id),
        }
    }

    fn handle_message(&mut self, peer_id: String, msg: NetMessage) {
        match msg {
            NetMessage::Join { name, region } => {
                let Some(conn) = self.conns.get_mut(&peer_id) else {
                    return;
                };
                if conn.joined {
                    warn!(peer_id = %peer_id, "Duplicate join ignored");
                    return;
                }
                conn.joined = true;

                self.state.add_player(&peer_id, &name, region, &mut self.rng);
                let welcome = NetMessage::Welcome {
                    player_id: peer_id.clone(),
                    state: self.state.clone(),
                };
                if let Some(conn) = self.conns.get(&peer_id) {
                    send_msg(&conn.sender, &welcome);
                }
                info!(
                    peer_id = %peer_id,
                    name = %name,
                    region = %region,
                    player_count = self.state.players.len(),
                    "Player joined"
                );
            }
            NetMessage::Input { input } => {
                let Some(conn) = self.conns.get(&peer_id) else {
                    return;
                };
                if !conn.limiter.check_input() {
                    warn!(peer_id = %peer_id, "Rate limited input message");
                    return;
                }
                if conn.joined {
                    self.inputs.insert(peer_id, input);
                }
            }
            NetMessage::Chat { message } => {
                let Some(conn) = self.conns.get(&peer_id) else {
                    return;
                };
                if !conn.limiter.check_chat() {
                    warn!(peer_id = %peer_id, "Rate limited chat message");
                    return;
                }
                // Apply locally, then relay to every other connection
                let _ = self.chat_tx.send(message.clone());
                for (other_id, other) in &self.conns {
                    if other_id != &peer_id {
                        send_msg(
                            &other.sender,
                            &NetMessage::Chat {
                                message: message.clone(),
                            },
                        );
                    }
                }
            }
            other => {
                debug!(peer_id = %peer_id, "Dropping unexpected message: {other:?}");
            }
        }
    }

    /// Prune a departed peer from the simulation and the input map
    fn remove_peer(&mut self, peer_id: &str) {
        if let Some(conn) = self.conns.remove(peer_id) {
            conn.reader.abort();
            self.state.remove_player(peer_id);
            self.inputs.remove(peer_id);
            info!(
                peer_id = %peer_id,
                player_count = self.state.players.len(),
                "Peer disconnected, entity removed"
            );
        }
    }

    /// Chat originated by the host's own UI
    fn local_chat(&mut self, text: String) {
        let (sender, color) = match self.state.player(HOST_PLAYER_ID) {
            Some(host) => (host.name.clone(), host.color.clone()),
            None => ("Host".to_string(), "#fff".to_string()),
        };
        let message = ChatMessage {
            id: Uuid::new_v4(),
            sender,
            text,
            color,
            timestamp: unix_millis(),
        };
        let _ = self.chat_tx.send(message.clone());
        for conn in self.conns.values() {
            send_msg(
                &conn.sender,
                &NetMessage::Chat {
                    message: message.clone(),
                },
            );
        }
    }
}
