use crate::connection::ConnectionId;
use crate::pattern::PatternBuffer;
use crate::vector::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hex characters of the peer's public key used as its display id.
pub const PLAYER_ID_HEX_LEN: usize = 6;

/// One opaque world-modification record. Replicated verbatim, never interpreted.
pub type BlockRecord = serde_json::Value;

/// Short, stable identifier of a participant, unique within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    /// Derives the id from a peer's public key: the first [`PLAYER_ID_HEX_LEN`] hex digits.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let mut hex = hex::encode(public_key);
        hex.truncate(PLAYER_ID_HEX_LEN);
        PlayerId(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A participant in the session, local or remote.
///
/// The local player is advanced by the simulator. Remote players only change when
/// their own peer reports a new state.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub position: Vector2,
    pub velocity: Vector2,
    /// True while airborne. Gates the one-shot landing reset.
    pub jump_state: bool,
    pub blocks: Vec<BlockRecord>,
    /// Gun direction in radians, aimed at the pointer.
    pub gun_rotation: f32,
    pub pattern: PatternBuffer,
    /// The connection this player arrived on; `None` for the local player.
    pub connection: Option<ConnectionId>,
}

impl Player {
    /// Spawns at the origin, airborne, so the first ticks drop it onto the ground.
    pub fn new(id: PlayerId, connection: Option<ConnectionId>) -> Self {
        Self {
            id,
            position: Vector2::ZERO,
            velocity: Vector2::ZERO,
            jump_state: true,
            blocks: Vec::new(),
            gun_rotation: 0.0,
            pattern: PatternBuffer::new(),
            connection,
        }
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn velocity(&self) -> Vector2 {
        self.velocity
    }

    pub fn blocks(&self) -> &[BlockRecord] {
        &self.blocks
    }

    pub fn is_remote(&self) -> bool {
        self.connection.is_some()
    }

    /// Hex colour derived from the id, e.g. `#a1b2c3`.
    pub fn color_hex(&self) -> String {
        format!("#{}", self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_creation() {
        let player = Player::new(PlayerId::new("a1b2c3"), None);
        assert_eq!(player.id.as_str(), "a1b2c3");
        assert_eq!(player.position, Vector2::ZERO);
        assert_eq!(player.velocity, Vector2::ZERO);
        assert!(player.jump_state);
        assert!(player.blocks().is_empty());
        assert!(!player.pattern.is_drawing());
        assert!(!player.is_remote());
    }

    #[test]
    fn test_remote_player_keeps_connection() {
        let player = Player::new(PlayerId::new("ffeedd"), Some(ConnectionId(7)));
        assert!(player.is_remote());
        assert_eq!(player.connection, Some(ConnectionId(7)));
    }

    #[test]
    fn test_id_from_public_key() {
        let key = [0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67];
        assert_eq!(PlayerId::from_public_key(&key).as_str(), "abcdef");
    }

    #[test]
    fn test_id_from_short_key() {
        assert_eq!(PlayerId::from_public_key(&[0x0f]).as_str(), "0f");
    }

    #[test]
    fn test_color_from_id() {
        let player = Player::new(PlayerId::new("00ff00"), None);
        assert_eq!(player.color_hex(), "#00ff00");
    }
}
