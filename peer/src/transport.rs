//! UDP links between peers.
//!
//! Every peer binds one socket and speaks a four-packet protocol framed with bincode:
//!
//! - `Hello` carries the game topic and the sender's public key. A `Hello` with our topic
//!   opens a link if we have none to that address, and is always answered with a
//!   `Welcome`, so a dialer whose first answer was lost gets another on its next re-dial.
//! - `Welcome` carries the same fields and links the dialer in turn. It is never answered.
//! - `Data` carries one replication payload, passed through untouched.
//! - `Goodbye` closes the link.
//!
//! Links that stay silent longer than the configured timeout are dropped as failed.
//! Every link change is reported to the game thread as a [`ConnectionEvent`]; the game
//! thread answers by sending through the [`UdpPeerLink`] handed over in `Established`.

use crate::config::{Identity, Topic, KEY_LEN};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use shared::{ConnectionEvent, ConnectionId, PeerConnection, TransportError};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// How often timeouts are checked and unanswered bootstrap peers are re-dialed.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Hello {
        topic: [u8; KEY_LEN],
        public_key: [u8; KEY_LEN],
    },
    Welcome {
        topic: [u8; KEY_LEN],
        public_key: [u8; KEY_LEN],
    },
    Data {
        payload: Vec<u8>,
    },
    Goodbye,
}

/// Messages sent from the game thread to the transport task
#[derive(Debug)]
pub enum NetCommand {
    Send { addr: SocketAddr, packet: Packet },
    Shutdown,
}

/// The game thread's end of one link.
pub struct UdpPeerLink {
    id: ConnectionId,
    addr: SocketAddr,
    public_key: [u8; KEY_LEN],
    commands: mpsc::UnboundedSender<NetCommand>,
}

impl PeerConnection for UdpPeerLink {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn remote_public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.commands
            .send(NetCommand::Send {
                addr: self.addr,
                packet: Packet::Data {
                    payload: payload.to_vec(),
                },
            })
            .map_err(|_| TransportError::Closed(self.id))
    }
}

#[derive(Debug)]
struct Link {
    id: ConnectionId,
    last_seen: Instant,
}

impl Link {
    fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Live links keyed by remote address.
#[derive(Debug, Default)]
pub struct LinkTable {
    links: HashMap<SocketAddr, Link>,
    next_id: u64,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a link to `addr`, returning its fresh connection id.
    pub fn add(&mut self, addr: SocketAddr) -> ConnectionId {
        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        self.links.insert(
            addr,
            Link {
                id,
                last_seen: Instant::now(),
            },
        );
        id
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<ConnectionId> {
        self.links.remove(addr).map(|link| link.id)
    }

    pub fn find(&self, addr: &SocketAddr) -> Option<ConnectionId> {
        self.links.get(addr).map(|link| link.id)
    }

    /// Marks `addr` as alive. Returns false if there is no link to it.
    pub fn touch(&mut self, addr: &SocketAddr) -> bool {
        match self.links.get_mut(addr) {
            Some(link) => {
                link.last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Removes and returns every link silent for longer than `timeout`.
    pub fn take_timed_out(&mut self, timeout: Duration) -> Vec<(SocketAddr, ConnectionId)> {
        let timed_out: Vec<(SocketAddr, ConnectionId)> = self
            .links
            .iter()
            .filter(|(_, link)| link.is_timed_out(timeout))
            .map(|(addr, link)| (*addr, link.id))
            .collect();

        for (addr, _) in &timed_out {
            self.links.remove(addr);
        }

        timed_out
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.links.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub bind: SocketAddr,
    pub bootstrap: Vec<SocketAddr>,
    pub topic: Topic,
    pub identity: Identity,
    pub timeout: Duration,
}

/// Cloneable control handle for a running [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<NetCommand>,
}

impl TransportHandle {
    /// Says goodbye to every linked peer and stops the transport task.
    pub fn shutdown(&self) {
        if self.commands.send(NetCommand::Shutdown).is_err() {
            debug!("Transport already stopped");
        }
    }
}

pub struct Transport {
    socket: UdpSocket,
    config: TransportConfig,
    links: LinkTable,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    commands_tx: mpsc::UnboundedSender<NetCommand>,
    commands_rx: mpsc::UnboundedReceiver<NetCommand>,
}

impl Transport {
    pub async fn bind(
        config: TransportConfig,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(config.bind).await?;
        info!("Peer listening on {}", socket.local_addr()?);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        Ok(Transport {
            socket,
            config,
            links: LinkTable::new(),
            events,
            commands_tx,
            commands_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            commands: self.commands_tx.clone(),
        }
    }

    /// Main transport loop. Returns after a shutdown command.
    pub async fn run(mut self) -> Result<(), TransportError> {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut maintenance = interval(MAINTENANCE_INTERVAL);
        maintenance.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, addr)) => match deserialize::<Packet>(&buffer[..len]) {
                            Ok(packet) => self.handle_packet(packet, addr).await,
                            Err(e) => warn!("Failed to deserialize packet from {}: {}", addr, e),
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                command = self.commands_rx.recv() => {
                    match command {
                        Some(NetCommand::Send { addr, packet }) => {
                            self.send_packet(&packet, addr).await;
                        }
                        Some(NetCommand::Shutdown) | None => {
                            self.say_goodbye().await;
                            info!("Transport shutting down");
                            break;
                        }
                    }
                },

                _ = maintenance.tick() => {
                    self.check_timeouts();
                    self.dial_bootstrap().await;
                },
            }
        }

        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Hello { topic, public_key } => {
                if self.accept_greeting(topic, public_key, addr) {
                    self.send_packet(&self.welcome(), addr).await;
                }
            }

            Packet::Welcome { topic, public_key } => {
                self.accept_greeting(topic, public_key, addr);
            }

            Packet::Data { payload } => match self.links.find(&addr) {
                Some(connection) => {
                    self.links.touch(&addr);
                    self.emit(ConnectionEvent::Data {
                        connection,
                        payload,
                    });
                }
                None => debug!("Dropping data from unlinked address {}", addr),
            },

            Packet::Goodbye => {
                if let Some(connection) = self.links.remove(&addr) {
                    info!("Peer at {} said goodbye", addr);
                    self.emit(ConnectionEvent::Closed { connection });
                    self.log_peer_count();
                }
            }
        }
    }

    /// Links `addr` on a valid greeting, or refreshes the existing link.
    /// Returns false if the greeting was for another topic or from ourselves.
    fn accept_greeting(
        &mut self,
        topic: [u8; KEY_LEN],
        public_key: [u8; KEY_LEN],
        addr: SocketAddr,
    ) -> bool {
        if topic != *self.config.topic.as_bytes() {
            warn!("Ignoring greeting from {} for a different topic", addr);
            return false;
        }
        if public_key == *self.config.identity.public_key() {
            debug!("Ignoring greeting from ourselves at {}", addr);
            return false;
        }
        if self.links.touch(&addr) {
            return true;
        }

        let id = self.links.add(addr);
        info!("Linked to {} as {}", addr, id);
        self.emit(ConnectionEvent::Established(Box::new(UdpPeerLink {
            id,
            addr,
            public_key,
            commands: self.commands_tx.clone(),
        })));
        self.log_peer_count();
        true
    }

    fn check_timeouts(&mut self) {
        let timed_out = self.links.take_timed_out(self.config.timeout);
        if timed_out.is_empty() {
            return;
        }

        for (addr, connection) in timed_out {
            warn!("Peer at {} timed out", addr);
            self.emit(ConnectionEvent::Errored {
                connection,
                reason: "timed out".to_string(),
            });
        }
        self.log_peer_count();
    }

    async fn dial_bootstrap(&self) {
        let hello = self.hello();
        for addr in &self.config.bootstrap {
            if self.links.find(addr).is_none() {
                debug!("Dialing {}", addr);
                self.send_packet(&hello, *addr).await;
            }
        }
    }

    async fn say_goodbye(&mut self) {
        for addr in self.links.addrs() {
            self.send_packet(&Packet::Goodbye, addr).await;
        }
    }

    fn hello(&self) -> Packet {
        Packet::Hello {
            topic: *self.config.topic.as_bytes(),
            public_key: *self.config.identity.public_key(),
        }
    }

    fn welcome(&self) -> Packet {
        Packet::Welcome {
            topic: *self.config.topic.as_bytes(),
            public_key: *self.config.identity.public_key(),
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.events.send(event).is_err() {
            debug!("Game thread is gone; dropping connection event");
        }
    }

    fn log_peer_count(&self) {
        info!("{} peers connected", self.links.len());
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = Self::send_packet_impl(&self.socket, packet, addr).await {
            error!("Failed to send packet to {}: {}", addr, e);
        }
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), TransportError> {
        let data = serialize(packet).map_err(|e| TransportError::Framing(e.to_string()))?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[test]
    fn test_link_table_add_and_find() {
        let mut links = LinkTable::new();
        assert!(links.is_empty());

        let a = links.add(addr(4000));
        let b = links.add(addr(4001));

        assert_ne!(a, b);
        assert_eq!(links.len(), 2);
        assert_eq!(links.find(&addr(4000)), Some(a));
        assert_eq!(links.find(&addr(4999)), None);
    }

    #[test]
    fn test_link_table_remove() {
        let mut links = LinkTable::new();
        let a = links.add(addr(4000));

        assert_eq!(links.remove(&addr(4000)), Some(a));
        assert_eq!(links.remove(&addr(4000)), None);
        assert!(!links.touch(&addr(4000)));
    }

    #[test]
    fn test_link_table_timeouts() {
        let mut links = LinkTable::new();
        let stale = links.add(addr(4000));
        links.add(addr(4001));

        links.links.get_mut(&addr(4000)).unwrap().last_seen =
            Instant::now() - Duration::from_secs(10);

        let timed_out = links.take_timed_out(Duration::from_secs(5));

        assert_eq!(timed_out, vec![(addr(4000), stale)]);
        assert_eq!(links.len(), 1);
        assert!(links.find(&addr(4001)).is_some());
    }

    #[test]
    fn test_packet_serialization_roundtrip() {
        let packets = vec![
            Packet::Hello {
                topic: [7; KEY_LEN],
                public_key: [9; KEY_LEN],
            },
            Packet::Data {
                payload: br#"{"id":"a1"}"#.to_vec(),
            },
            Packet::Goodbye,
        ];

        for packet in packets {
            let bytes = serialize(&packet).unwrap();
            let decoded: Packet = deserialize(&bytes).unwrap();
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn test_link_send_queues_data_packet() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut link = UdpPeerLink {
            id: ConnectionId(1),
            addr: addr(4000),
            public_key: [1; KEY_LEN],
            commands: tx,
        };

        link.send(b"state").unwrap();

        match rx.try_recv().unwrap() {
            NetCommand::Send { addr: to, packet } => {
                assert_eq!(to, addr(4000));
                assert_eq!(
                    packet,
                    Packet::Data {
                        payload: b"state".to_vec()
                    }
                );
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bind_assigns_local_port() {
        let (events, _events_rx) = mpsc::unbounded_channel();
        let config = TransportConfig {
            bind: addr(0),
            bootstrap: vec![],
            topic: Topic::from_bytes([5; KEY_LEN]),
            identity: Identity::from_public_key([6; KEY_LEN]),
            timeout: Duration::from_secs(5),
        };

        let transport = tokio_test::block_on(Transport::bind(config, events)).unwrap();
        let local = tokio_test::assert_ok!(transport.local_addr());

        assert_ne!(local.port(), 0);
        assert_eq!(transport.links.len(), 0);
    }

    #[tokio::test]
    async fn test_redialed_hello_is_answered_again() {
        let topic = Topic::from_bytes([5; KEY_LEN]);
        let (events, mut events_rx) = mpsc::unbounded_channel();
        let transport = Transport::bind(
            TransportConfig {
                bind: addr(0),
                bootstrap: vec![],
                topic,
                identity: Identity::from_public_key([6; KEY_LEN]),
                timeout: Duration::from_secs(5),
            },
            events,
        )
        .await
        .unwrap();
        let target = transport.local_addr().unwrap();
        let handle = transport.handle();
        let task = tokio::spawn(transport.run());

        let dialer = UdpSocket::bind(addr(0)).await.unwrap();
        let hello = serialize(&Packet::Hello {
            topic: *topic.as_bytes(),
            public_key: [7; KEY_LEN],
        })
        .unwrap();
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        // The second hello stands in for a re-dial after a lost answer.
        for _ in 0..2 {
            dialer.send_to(&hello, target).await.unwrap();
            let (len, from) = tokio::time::timeout(
                Duration::from_secs(2),
                dialer.recv_from(&mut buffer),
            )
            .await
            .expect("hello was not answered")
            .unwrap();

            assert_eq!(from, target);
            assert_eq!(
                deserialize::<Packet>(&buffer[..len]).unwrap(),
                Packet::Welcome {
                    topic: *topic.as_bytes(),
                    public_key: [6; KEY_LEN],
                }
            );
        }

        assert!(matches!(
            events_rx.try_recv(),
            Ok(ConnectionEvent::Established(_))
        ));
        assert!(events_rx.try_recv().is_err());

        handle.shutdown();
        tokio_test::assert_ok!(task.await.unwrap());
    }

    #[test]
    fn test_link_send_after_shutdown_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut link = UdpPeerLink {
            id: ConnectionId(3),
            addr: addr(4000),
            public_key: [1; KEY_LEN],
            commands: tx,
        };

        assert!(matches!(
            link.send(b"state"),
            Err(TransportError::Closed(ConnectionId(3)))
        ));
    }
}
