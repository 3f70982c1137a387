//! Peer channel brokering
//!
//! Peers bootstrap a match by racing to claim a well-known identifier in a
//! shared namespace: the first claimant listens for incoming links, later
//! claimants get [`ClaimError::IdTaken`] — the signal to fall back to
//! joining as a client. Links are ordered, bidirectional, fire-and-forget
//! text-frame channels; dropping an end closes it. Encoding and decoding
//! of frames belongs to the sessions, not the transport.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Namespace registry shared by all peers of one brokering domain
type Registry = Arc<DashMap<String, mpsc::UnboundedSender<PeerLink>>>;

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    /// Another peer already holds the identifier. Expected during the
    /// host/client race, not a failure.
    #[error("Identifier already claimed: {0}")]
    IdTaken(String),

    /// Nobody is listening on the identifier
    #[error("No peer is listening on: {0}")]
    NoSuchPeer(String),
}

/// The peer brokering namespace
#[derive(Clone, Default)]
pub struct PeerBroker {
    registry: Registry,
}

impl PeerBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim an identifier. The first claimant becomes its listener;
    /// the claim is released when the listener is dropped.
    pub fn claim(&self, channel_id: &str) -> Result<Listener, ClaimError> {
        use dashmap::mapref::entry::Entry;
        match self.registry.entry(channel_id.to_string()) {
            Entry::Occupied(_) => Err(ClaimError::IdTaken(channel_id.to_string())),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::unbounded_channel();
                slot.insert(tx);
                debug!(channel_id, "Channel identifier claimed");
                Ok(Listener {
                    channel_id: channel_id.to_string(),
                    rx,
                    registry: self.registry.clone(),
                })
            }
        }
    }

    /// Open a data channel to the holder of an identifier
    pub fn connect(&self, channel_id: &str) -> Result<PeerLink, ClaimError> {
        let listener_tx = self
            .registry
            .get(channel_id)
            .ok_or_else(|| ClaimError::NoSuchPeer(channel_id.to_string()))?;

        let peer_id = format!("peer-{}", &Uuid::new_v4().to_string()[..8]);
        let (to_host_tx, to_host_rx) = mpsc::unbounded_channel();
        let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();

        let host_side = PeerLink {
            peer_id: peer_id.clone(),
            tx: to_peer_tx,
            rx: to_host_rx,
        };
        listener_tx
            .send(host_side)
            .map_err(|_| ClaimError::NoSuchPeer(channel_id.to_string()))?;

        Ok(PeerLink {
            peer_id: channel_id.to_string(),
            tx: to_host_tx,
            rx: to_peer_rx,
        })
    }
}

/// Accepts incoming peer links on a claimed identifier
#[derive(Debug)]
pub struct Listener {
    channel_id: String,
    rx: mpsc::UnboundedReceiver<PeerLink>,
    registry: Registry,
}

impl Listener {
    pub async fn accept(&mut self) -> Option<PeerLink> {
        self.rx.recv().await
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.registry.remove(&self.channel_id);
        debug!(channel_id = %self.channel_id, "Channel identifier released");
    }
}

/// One end of an ordered, fire-and-forget peer data channel
pub struct PeerLink {
    /// Stable identifier of the remote peer
    pub peer_id: String,
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl PeerLink {
    /// Split into an id plus independent send/receive halves
    pub fn split(self) -> (String, PeerSender, PeerReceiver) {
        (
            self.peer_id,
            PeerSender { tx: self.tx },
            PeerReceiver { rx: self.rx },
        )
    }
}

/// Sending half of a link. Sends never block and never fail loudly; a
/// closed remote end simply swallows the frame.
#[derive(Clone)]
pub struct PeerSender {
    tx: mpsc::UnboundedSender<String>,
}

impl PeerSender {
    pub fn send(&self, frame: String) {
        let _ = self.tx.send(frame);
    }
}

/// Receiving half of a link; `None` means the remote end is gone
pub struct PeerReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl PeerReceiver {
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
