//! Host-authoritative network synchronization
//!
//! Roles are negotiated, never configured: a joining peer races to claim
//! the room's channel identifier. Winning the race makes it the host and
//! the simulation authority; losing it means somebody already hosts, so
//! the peer discards the claim attempt and connects as a client.

pub mod broker;
pub mod client;
pub mod host;
pub mod protocol;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::game::{GameSettings, GameState, Region};

use broker::{ClaimError, PeerBroker, PeerSender};
use client::{ClientHandle, JoinError};
use host::{HostHandle, HostSession};
use protocol::{room_channel_id, NetMessage};

/// The role this peer ended up with
pub enum Session {
    Host(HostHandle),
    Client(ClientHandle),
}

/// Encode a message and fire it down a link
pub(crate) fn send_msg(sender: &PeerSender, msg: &NetMessage) {
    match serde_json::to_string(msg) {
        Ok(frame) => sender.send(frame),
        Err(e) => tracing::warn!(error = %e, "Failed to encode frame"),
    }
}

/// Claim the room identifier or fall back to joining as a client
pub async fn negotiate_role(
    broker: &PeerBroker,
    room_code: &str,
    name: &str,
    region: Region,
    room_name: &str,
    settings: GameSettings,
) -> Result<Session, JoinError> {
    let channel_id = room_channel_id(room_code);

    match broker.claim(&channel_id) {
        Ok(listener) => {
            info!(room_code, "Claimed room identifier, becoming host");
            let mut rng = ChaCha8Rng::from_entropy();
            let state =
                GameState::init_host(name, region, room_code, room_name, settings, &mut rng);
            Ok(Session::Host(HostSession::start(listener, state)))
        }
        Err(ClaimError::IdTaken(_)) => {
            info!(room_code, "Room already hosted, joining as client");
            Ok(Session::Client(client::join(broker, room_code, name, region).await?))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{InputState, HOST_PLAYER_ID};
    use crate::net::client::ClientEvent;
    use crate::net::protocol::MAX_CONNECTIONS;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn no_bots() -> GameSettings {
        GameSettings {
            bot_count: 0,
            ..GameSettings::default()
        }
    }

    fn open_state(room_code: &str) -> GameState {
        let mut rng = ChaCha8Rng::from_entropy();
        let mut state = GameState::init_host(
            "Ann",
            Region::Taipei,
            room_code,
            "test room",
            no_bots(),
            &mut rng,
        );
        // Obstacle-free arena keeps movement assertions deterministic
        state.walls.clear();
        state
    }

    async fn recv_event(handle: &mut ClientHandle) -> ClientEvent {
        timeout(Duration::from_secs(2), handle.events_rx.recv())
            .await
            .expect("timed out waiting for client event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn first_peer_hosts_second_joins() {
        let broker = PeerBroker::new();

        let first = negotiate_role(&broker, "314159", "Ann", Region::Taipei, "room", no_bots())
            .await
            .unwrap();
        let Session::Host(host) = first else {
            panic!("first peer should have claimed the room");
        };

        let second = negotiate_role(&broker, "314159", "Ben", Region::Tainan, "room", no_bots())
            .await
            .unwrap();
        let Session::Client(client) = second else {
            panic!("second peer should have fallen back to client");
        };

        assert!(client.player_id.starts_with("peer-"));
        let snapshot = client.state_rx.borrow().clone();
        assert!(!snapshot.is_host);
        assert_eq!(snapshot.my_id.as_deref(), Some(client.player_id.as_str()));
        assert!(snapshot.player(HOST_PLAYER_ID).is_some());
        assert!(snapshot.player(&client.player_id).is_some());

        drop(host);
    }

    #[tokio::test]
    async fn welcome_assigns_id_and_carries_own_entity() {
        let broker = PeerBroker::new();
        let listener = broker.claim(&room_channel_id("271828")).unwrap();
        let _host = HostSession::start(listener, open_state("271828"));

        let client = client::join(&broker, "271828", "Ben", Region::Kaohsiung)
            .await
            .unwrap();

        let state = client.state_rx.borrow().clone();
        let me = state.player(&client.player_id).expect("own entity present");
        assert_eq!(me.name, "Ben");
        assert_eq!(me.region, Region::Kaohsiung);
        assert_eq!(me.hp, 100);
    }

    #[tokio::test]
    async fn client_input_steers_its_tank() {
        let broker = PeerBroker::new();
        let listener = broker.claim(&room_channel_id("161803")).unwrap();
        let _host = HostSession::start(listener, open_state("161803"));

        let mut client = client::join(&broker, "161803", "Ben", Region::Tainan)
            .await
            .unwrap();
        let x0 = client.state_rx.borrow().player(&client.player_id).unwrap().x;

        client.send_input(InputState {
            right: true,
            ..InputState::default()
        });
        sleep(Duration::from_millis(300)).await;

        let snapshot = client.state_rx.borrow().clone();
        let me = snapshot.player(&client.player_id).unwrap();
        assert!(
            me.x > x0,
            "tank should have moved right ({} -> {})",
            x0,
            me.x
        );
        assert!(!snapshot.is_host);
        assert_eq!(snapshot.my_id.as_deref(), Some(client.player_id.as_str()));
    }

    #[tokio::test]
    async fn ninth_connection_is_rejected_with_error() {
        let broker = PeerBroker::new();
        let listener = broker.claim(&room_channel_id("999999")).unwrap();
        let _host = HostSession::start(listener, open_state("999999"));

        let mut admitted = Vec::new();
        for i in 0..MAX_CONNECTIONS {
            let client = client::join(&broker, "999999", &format!("P{i}"), Region::Yilan)
                .await
                .expect("connection within capacity should be admitted");
            admitted.push(client);
        }

        match client::join(&broker, "999999", "Late", Region::Miaoli).await {
            Err(JoinError::Rejected(message)) => assert_eq!(message, "Room is full"),
            Err(e) => panic!("expected room-full rejection, got {e}"),
            Ok(_) => panic!("ninth connection should have been rejected"),
        }
    }

    #[tokio::test]
    async fn chat_relays_to_other_clients_and_the_host() {
        let broker = PeerBroker::new();
        let listener = broker.claim(&room_channel_id("555555")).unwrap();
        let mut host = HostSession::start(listener, open_state("555555"));

        let alice = client::join(&broker, "555555", "Alice", Region::Hualien)
            .await
            .unwrap();
        let mut bob = client::join(&broker, "555555", "Bob", Region::Penghu)
            .await
            .unwrap();

        alice.send_chat("gg");

        match recv_event(&mut bob).await {
            ClientEvent::Chat(message) => {
                assert_eq!(message.text, "gg");
                assert_eq!(message.sender, "Alice");
            }
            other => panic!("expected relayed chat, got {other:?}"),
        }

        let local = timeout(Duration::from_secs(2), host.chat_rx.recv())
            .await
            .expect("timed out waiting for host chat")
            .expect("host chat channel closed");
        assert_eq!(local.text, "gg");
    }

    #[tokio::test]
    async fn disconnect_prunes_the_player() {
        let broker = PeerBroker::new();
        let listener = broker.claim(&room_channel_id("123321")).unwrap();
        let host = HostSession::start(listener, open_state("123321"));

        let client = client::join(&broker, "123321", "Ghost", Region::Chiayi)
            .await
            .unwrap();
        let ghost_id = client.player_id.clone();
        sleep(Duration::from_millis(100)).await;
        assert!(host.state_rx.borrow().player(&ghost_id).is_some());

        drop(client);
        sleep(Duration::from_millis(200)).await;
        assert!(
            host.state_rx.borrow().player(&ghost_id).is_none(),
            "departed peer should be pruned from the simulation"
        );
    }

    #[tokio::test]
    async fn client_learns_when_the_host_vanishes() {
        let broker = PeerBroker::new();
        let listener = broker.claim(&room_channel_id("654321")).unwrap();
        let host = HostSession::start(listener, open_state("654321"));

        let mut client = client::join(&broker, "654321", "Orphan", Region::Taitung)
            .await
            .unwrap();

        host.shutdown();

        loop {
            match recv_event(&mut client).await {
                ClientEvent::Ended { reason } => {
                    assert_eq!(reason, "Connection to host lost");
                    break;
                }
                ClientEvent::Chat(_) => continue,
            }
        }
    }

    #[tokio::test]
    async fn host_handle_drives_its_own_tank_and_chat() {
        let broker = PeerBroker::new();
        let listener = broker.claim(&room_channel_id("808808")).unwrap();
        let host = HostSession::start(listener, open_state("808808"));

        let mut client = client::join(&broker, "808808", "Ben", Region::Nantou)
            .await
            .unwrap();
        let x0 = host.state_rx.borrow().player(HOST_PLAYER_ID).unwrap().x;

        host.set_local_input(InputState {
            right: true,
            ..InputState::default()
        });
        host.set_ping(client.player_id.as_str(), 42);
        host.send_chat("welcome");

        match recv_event(&mut client).await {
            ClientEvent::Chat(message) => {
                assert_eq!(message.text, "welcome");
                assert_eq!(message.sender, "Ann");
            }
            other => panic!("expected host chat, got {other:?}"),
        }

        sleep(Duration::from_millis(300)).await;
        let snapshot = host.state_rx.borrow().clone();
        assert!(snapshot.player(HOST_PLAYER_ID).unwrap().x > x0);
        assert_eq!(snapshot.player(&client.player_id).unwrap().ping, 42);
    }

    #[tokio::test]
    async fn released_room_is_claimable_again() {
        let broker = PeerBroker::new();
        {
            let _listener = broker.claim(&room_channel_id("777000")).unwrap();
            assert!(matches!(
                broker.claim(&room_channel_id("777000")),
                Err(ClaimError::IdTaken(_))
            ));
        }
        assert!(broker.claim(&room_channel_id("777000")).is_ok());
    }
}
