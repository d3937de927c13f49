//! Connection management: maps peer connections to players and dispatches their events.
//!
//! The transport is owned by the host. It hands the manager a [`ConnectionEvent`] for
//! every connection established, payload received, and connection closed or failed.
//! Each connection moves through
//!
//! ```text
//! Connected -> (Active)* -> Closed | Errored
//! ```
//!
//! A closed or failed connection is a departure: its player is removed and nothing is
//! retried. Outbound state is broadcast to every live connection with no acknowledgment.

use crate::codec::{self, ApplyOutcome};
use crate::player::{Player, PlayerId};
use crate::registry::PlayerRegistry;
use log::{error, info, warn};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use thiserror::Error;

/// Host-assigned handle for one remote connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to frame packet: {0}")]
    Framing(String),
}

/// One live link to a remote peer.
pub trait PeerConnection: Send {
    fn id(&self) -> ConnectionId;

    /// The remote peer's stable public identity.
    fn remote_public_key(&self) -> &[u8];

    /// Queues `payload` for delivery. Fire-and-forget: success means accepted, not delivered.
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;
}

pub enum ConnectionEvent {
    Established(Box<dyn PeerConnection>),
    Data {
        connection: ConnectionId,
        payload: Vec<u8>,
    },
    Closed {
        connection: ConnectionId,
    },
    Errored {
        connection: ConnectionId,
        reason: String,
    },
}

impl fmt::Debug for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEvent::Established(conn) => {
                f.debug_tuple("Established").field(&conn.id()).finish()
            }
            ConnectionEvent::Data {
                connection,
                payload,
            } => f
                .debug_struct("Data")
                .field("connection", connection)
                .field("len", &payload.len())
                .finish(),
            ConnectionEvent::Closed { connection } => f
                .debug_struct("Closed")
                .field("connection", connection)
                .finish(),
            ConnectionEvent::Errored { connection, reason } => f
                .debug_struct("Errored")
                .field("connection", connection)
                .field("reason", reason)
                .finish(),
        }
    }
}

/// How many ended connections keep their final state for [`ConnectionManager::state`].
pub const ENDED_HISTORY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Established, nothing received yet.
    Connected,
    /// At least one payload received.
    Active,
    Closed,
    Errored,
}

struct ConnectionEntry {
    link: Box<dyn PeerConnection>,
    player_id: PlayerId,
    state: ConnectionState,
}

pub struct ConnectionManager {
    local_id: PlayerId,
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// Final state of the most recently ended connections, oldest first.
    ended: VecDeque<(ConnectionId, ConnectionState)>,
}

impl ConnectionManager {
    /// `local_id` is never overwritten by inbound updates.
    pub fn new(local_id: PlayerId) -> Self {
        Self {
            local_id,
            connections: HashMap::new(),
            ended: VecDeque::with_capacity(ENDED_HISTORY),
        }
    }

    /// Reacts to one transport event. Runs to completion; never fails.
    pub fn handle_event(&mut self, registry: &mut PlayerRegistry, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Established(link) => self.on_established(registry, link),
            ConnectionEvent::Data {
                connection,
                payload,
            } => {
                self.on_data(registry, connection, &payload);
            }
            ConnectionEvent::Closed { connection } => {
                self.on_departure(registry, connection, ConnectionState::Closed);
            }
            ConnectionEvent::Errored { connection, reason } => {
                warn!("Connection {} failed: {}", connection, reason);
                self.on_departure(registry, connection, ConnectionState::Errored);
            }
        }
    }

    fn on_established(&mut self, registry: &mut PlayerRegistry, link: Box<dyn PeerConnection>) {
        let connection = link.id();
        let player_id = PlayerId::from_public_key(link.remote_public_key());

        if player_id == self.local_id {
            warn!(
                "Connection {} presents our own identity {}; ignoring",
                connection, player_id
            );
            return;
        }

        if !registry.contains(&player_id) {
            registry.insert(Player::new(player_id.clone(), Some(connection)));
        }

        info!("Peer {} joined on {}", player_id, connection);
        self.ended.retain(|(ended, _)| *ended != connection);
        self.connections.insert(
            connection,
            ConnectionEntry {
                link,
                player_id,
                state: ConnectionState::Connected,
            },
        );
    }

    fn on_data(
        &mut self,
        registry: &mut PlayerRegistry,
        connection: ConnectionId,
        payload: &[u8],
    ) -> Option<ApplyOutcome> {
        let Some(entry) = self.connections.get_mut(&connection) else {
            warn!("Data from unknown connection {}", connection);
            return None;
        };
        entry.state = ConnectionState::Active;

        Some(codec::apply_update(registry, payload, Some(&self.local_id)))
    }

    fn on_departure(
        &mut self,
        registry: &mut PlayerRegistry,
        connection: ConnectionId,
        state: ConnectionState,
    ) {
        let Some(entry) = self.connections.remove(&connection) else {
            return;
        };
        self.record_ended(connection, state);

        // The same identity may still be reachable over another link.
        let survivor = self
            .connections
            .iter()
            .filter(|(_, other)| other.player_id == entry.player_id)
            .map(|(id, _)| *id)
            .min();

        match survivor {
            Some(other) => {
                info!(
                    "Peer {} lost {} ({:?}); still connected on {}",
                    entry.player_id, connection, state, other
                );
                if let Some(player) = registry.get_mut(&entry.player_id) {
                    player.connection = Some(other);
                }
            }
            None => {
                info!("Peer {} left ({:?})", entry.player_id, state);
                registry.remove(&entry.player_id);
            }
        }
    }

    fn record_ended(&mut self, connection: ConnectionId, state: ConnectionState) {
        if self.ended.len() == ENDED_HISTORY {
            self.ended.pop_front();
        }
        self.ended.push_back((connection, state));
    }

    /// Sends `payload` to every live connection. Returns how many accepted it.
    ///
    /// A failed send is logged and skipped; only a close or error event ends a connection.
    pub fn broadcast(&mut self, payload: &[u8]) -> usize {
        let mut sent = 0;
        for (connection, entry) in self.connections.iter_mut() {
            match entry.link.send(payload) {
                Ok(()) => sent += 1,
                Err(e) => error!("Failed to send to {}: {}", connection, e),
            }
        }
        sent
    }

    /// Runs the close path for every connection, removing their players.
    pub fn close_all(&mut self, registry: &mut PlayerRegistry) {
        let open: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for connection in open {
            self.on_departure(registry, connection, ConnectionState::Closed);
        }
    }

    pub fn state(&self, connection: ConnectionId) -> Option<ConnectionState> {
        self.connections
            .get(&connection)
            .map(|entry| entry.state)
            .or_else(|| {
                self.ended
                    .iter()
                    .find(|(ended, _)| *ended == connection)
                    .map(|(_, state)| *state)
            })
    }

    pub fn player_for(&self, connection: ConnectionId) -> Option<&PlayerId> {
        self.connections.get(&connection).map(|entry| &entry.player_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
