//! # Shared Game Core
//!
//! The peer-independent heart of the game: entity model, physics, replication and
//! the per-frame loop. Everything that touches the outside world (sockets, windows,
//! keyboards) is reached through a trait, so a peer binary and the tests drive the
//! same code.
//!
//! ## Replication Model
//!
//! There is no server. Every peer is the only simulator of its own player and
//! broadcasts that player's state once per frame. Every other peer displays what it
//! is told, unverified, with the most recently received update winning.
//!
//! ## Module Organization
//!
//! - `vector`, `world`: 2D vectors, world constants and decorative terrain
//! - `player`, `pattern`: the player entity and its gesture buffer
//! - `simulator`: one-tick kinematics for the local player
//! - `codec`: JSON wire format for a player's self-reported state
//! - `registry`: owner of every player, keyed by id
//! - `connection`: connection lifecycle, inbound dispatch, broadcast
//! - `session`: the per-frame game loop tying it together
//!
//! ## Usage Example
//!
//! ```rust
//! use shared::{InputState, PlayerId, Session, StaticInput, WorldConstants};
//! use shared::session::{Frame, RenderTarget};
//! use std::time::Instant;
//!
//! struct Headless;
//!
//! impl RenderTarget for Headless {
//!     fn draw(&mut self, frame: &Frame<'_>) {
//!         for player in frame.registry.iter() {
//!             let _ = (player.position.x, player.position.y);
//!         }
//!     }
//! }
//!
//! let mut session = Session::start(PlayerId::new("a1b2c3"), WorldConstants::default());
//! let input = StaticInput {
//!     input: InputState { left: false, right: true, jump: false },
//!     ..StaticInput::default()
//! };
//!
//! for _ in 0..60 {
//!     session.tick(&input, Instant::now(), &mut Headless);
//! }
//! assert!(session.local_player().unwrap().position.x > 0.0);
//! ```

pub mod codec;
pub mod connection;
pub mod input;
pub mod pattern;
pub mod player;
pub mod registry;
pub mod session;
pub mod simulator;
pub mod vector;
pub mod world;

pub use codec::{ApplyOutcome, CodecError, PlayerState};
pub use connection::{
    ConnectionEvent, ConnectionId, ConnectionManager, ConnectionState, PeerConnection,
    TransportError,
};
pub use input::{InputSource, InputState, StaticInput};
pub use pattern::{PatternBuffer, FINALIZE_DELAY, MAX_PATTERN_LENGTH};
pub use player::{BlockRecord, Player, PlayerId, PLAYER_ID_HEX_LEN};
pub use registry::PlayerRegistry;
pub use session::{Frame, RenderTarget, Session, TickReport};
pub use simulator::Simulator;
pub use vector::Vector2;
pub use world::{generate_terrain, TerrainBlock, WorldConstants};
