//! Replication codec for a player's self-reported state.
//!
//! Each peer simulates only its own player and broadcasts the result. The payload is a
//! flat JSON object:
//!
//! ```json
//! {"id":"a1b2c3","position":{"x":10.0,"y":20.0},"velocity":{"x":1.0,"y":0.0},"blocks":[]}
//! ```
//!
//! Numbers are read and written as `f32`. A value sent with more precision, such as
//! `10.1` from a double-precision sender, is rounded to the nearest `f32` on arrival and
//! re-encoded in its shortest `f32` form, so it reads back as `10.1` but is not the same
//! double.
//!
//! There is no sequence number or timestamp. Whatever arrives last wins, field group by
//! field group, and a payload is never allowed to create a player: players come into
//! existence only through a connection being established.

use crate::player::{BlockRecord, Player, PlayerId};
use crate::registry::PlayerRegistry;
use crate::vector::Vector2;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to encode player state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed player state: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// The replicated subset of a [`Player`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub position: Vector2,
    pub velocity: Vector2,
    pub blocks: Vec<BlockRecord>,
}

impl PlayerState {
    pub fn from_player(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            position: player.position,
            velocity: player.velocity,
            blocks: player.blocks.clone(),
        }
    }

    /// Overwrites the replicated fields of `player` wholesale.
    pub fn apply_to(&self, player: &mut Player) {
        player.position = self.position;
        player.velocity = self.velocity;
        player.blocks = self.blocks.clone();
    }
}

/// What happened to one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(PlayerId),
    /// No player with this id is registered; the update was dropped.
    UnknownPlayer(PlayerId),
    /// The update targeted a protected player (the local one) and was dropped.
    Rejected(PlayerId),
    /// The payload did not parse and was discarded.
    Malformed,
}

pub fn encode(player: &Player) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&PlayerState::from_player(player)).map_err(CodecError::Encode)
}

pub fn decode(payload: &[u8]) -> Result<PlayerState, CodecError> {
    serde_json::from_slice(payload).map_err(CodecError::Malformed)
}

/// Decodes `payload` and applies it to the matching registered player.
///
/// Never fails: a bad payload is logged and discarded, and the registry is left as it
/// was. Updates addressed to `protected` are refused.
pub fn apply_update(
    registry: &mut PlayerRegistry,
    payload: &[u8],
    protected: Option<&PlayerId>,
) -> ApplyOutcome {
    let state = match decode(payload) {
        Ok(state) => state,
        Err(e) => {
            warn!(
                "Discarding bad incoming message ({} bytes): {}",
                payload.len(),
                e
            );
            return ApplyOutcome::Malformed;
        }
    };

    if protected == Some(&state.id) {
        warn!("Ignoring remote update addressed to local player {}", state.id);
        return ApplyOutcome::Rejected(state.id);
    }

    match registry.get_mut(&state.id) {
        Some(player) => {
            state.apply_to(player);
            ApplyOutcome::Applied(state.id)
        }
        None => {
            debug!("Dropping update for unregistered player {}", state.id);
            ApplyOutcome::UnknownPlayer(state.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_player() -> Player {
        let mut player = Player::new(PlayerId::new("a1b2c3"), None);
        player.position = Vector2::new(10.25, 194.7);
        player.velocity = Vector2::new(-2.0, 0.3);
        player.blocks = vec![json!({"x": 40, "y": 195, "width": 40, "height": 40})];
        player
    }

    #[test]
    fn test_encode_shape() {
        let mut player = Player::new(PlayerId::new("a1"), None);
        player.position = Vector2::new(10.0, 20.0);
        player.velocity = Vector2::new(1.0, 0.0);

        let value: serde_json::Value = serde_json::from_slice(&encode(&player).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "a1",
                "position": {"x": 10.0, "y": 20.0},
                "velocity": {"x": 1.0, "y": 0.0},
                "blocks": []
            })
        );
    }

    #[test]
    fn test_encode_then_apply_to_fresh_player() {
        let source = sample_player();
        let payload = encode(&source).unwrap();

        let mut registry = PlayerRegistry::new();
        registry.insert(Player::new(source.id.clone(), None));

        let outcome = apply_update(&mut registry, &payload, None);
        assert_eq!(outcome, ApplyOutcome::Applied(source.id.clone()));

        let replica = registry.get(&source.id).unwrap();
        assert_eq!(replica.position, source.position);
        assert_eq!(replica.velocity, source.velocity);
        assert_eq!(replica.blocks, source.blocks);
    }

    #[test]
    fn test_malformed_payload_leaves_state_unchanged() {
        let mut registry = PlayerRegistry::new();
        registry.insert(sample_player());
        let id = PlayerId::new("a1b2c3");

        for payload in [
            &b"not json"[..],
            &b"{\"id\":\"a1b2c3\",\"position\":{\"x\":1}"[..],
            &b"{\"id\":\"a1b2c3\",\"position\":{\"x\":1,\"y\":2},\"velocity\":{\"x\":0,\"y\":0}}"[..],
            &b""[..],
        ] {
            assert_eq!(
                apply_update(&mut registry, payload, None),
                ApplyOutcome::Malformed
            );
        }

        let player = registry.get(&id).unwrap();
        assert_eq!(player.position, Vector2::new(10.25, 194.7));
        assert_eq!(player.velocity, Vector2::new(-2.0, 0.3));
    }

    #[test]
    fn test_unknown_id_creates_nothing() {
        let mut registry = PlayerRegistry::new();
        let payload = encode(&sample_player()).unwrap();

        let outcome = apply_update(&mut registry, &payload, None);

        assert_eq!(outcome, ApplyOutcome::UnknownPlayer(PlayerId::new("a1b2c3")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_protected_player_is_not_overwritten() {
        let mut registry = PlayerRegistry::new();
        let local = Player::new(PlayerId::new("a1b2c3"), None);
        registry.insert(local);
        let payload = encode(&sample_player()).unwrap();

        let outcome = apply_update(&mut registry, &payload, Some(&PlayerId::new("a1b2c3")));

        assert_eq!(outcome, ApplyOutcome::Rejected(PlayerId::new("a1b2c3")));
        assert_eq!(
            registry.get(&PlayerId::new("a1b2c3")).unwrap().position,
            Vector2::ZERO
        );
    }

    #[test]
    fn test_last_write_wins() {
        let mut registry = PlayerRegistry::new();
        registry.insert(Player::new(PlayerId::new("a1b2c3"), None));

        let mut older = sample_player();
        older.position = Vector2::new(1.0, 1.0);
        let mut newer = sample_player();
        newer.position = Vector2::new(2.0, 2.0);

        // Delivered out of order: the older state arrives last and wins.
        apply_update(&mut registry, &encode(&newer).unwrap(), None);
        apply_update(&mut registry, &encode(&older).unwrap(), None);

        assert_eq!(
            registry.get(&PlayerId::new("a1b2c3")).unwrap().position,
            Vector2::new(1.0, 1.0)
        );
    }

    #[test]
    fn test_opaque_blocks_survive() {
        let payload = br#"{"id":"a1b2c3","position":{"x":0,"y":0},"velocity":{"x":0,"y":0},"blocks":[{"kind":"ladder","cells":[1,2,3]},7,"x",null]}"#;

        let state = decode(payload).unwrap();

        assert_eq!(
            state.blocks,
            vec![
                json!({"kind": "ladder", "cells": [1, 2, 3]}),
                json!(7),
                json!("x"),
                json!(null)
            ]
        );
    }

    #[test]
    fn test_double_precision_numbers_round_to_f32() {
        let payload = br#"{"id":"a1","position":{"x":10.1,"y":194.99999999},"velocity":{"x":0.1,"y":0},"blocks":[]}"#;

        let state = decode(payload).unwrap();
        assert_eq!(state.position.x, 10.1_f32);
        assert_eq!(state.position.y, 195.0_f32);
        assert_eq!(state.velocity.x, 0.1_f32);

        let mut player = Player::new(PlayerId::new("a1"), None);
        state.apply_to(&mut player);
        let encoded = String::from_utf8(encode(&player).unwrap()).unwrap();
        assert!(encoded.contains(r#""position":{"x":10.1,"y":195.0}"#));
    }
}
