//! The per-frame game loop for one peer.
//!
//! A [`Session`] owns the player registry and the connection manager and is driven from
//! a single thread by three kinds of calls: [`Session::tick`] once per rendered frame,
//! [`Session::handle_event`] for each transport event, and the gesture methods for
//! pointer input. Each call runs to completion, so remote updates are applied in the
//! order they are received and the next frame renders whatever the registry holds.
//!
//! Only the local player is simulated here. Remote players change exclusively through
//! their own peer's broadcasts.

use crate::codec;
use crate::connection::{ConnectionEvent, ConnectionManager};
use crate::input::InputSource;
use crate::player::{Player, PlayerId};
use crate::registry::PlayerRegistry;
use crate::simulator::Simulator;
use crate::world::{generate_terrain, TerrainBlock, WorldConstants};
use log::{debug, error, info};
use std::time::Instant;

/// Everything a renderer needs for one frame.
pub struct Frame<'a> {
    pub registry: &'a PlayerRegistry,
    pub local_id: &'a PlayerId,
    pub terrain: &'a [TerrainBlock],
    pub world: &'a WorldConstants,
    pub peer_count: usize,
    pub tick: u64,
}

/// Host drawing surface, invoked once per tick.
pub trait RenderTarget {
    fn draw(&mut self, frame: &Frame<'_>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Connections that accepted this tick's state broadcast.
    pub sent_to: usize,
    pub player_count: usize,
}

pub struct Session {
    simulator: Simulator,
    registry: PlayerRegistry,
    connections: ConnectionManager,
    local_id: PlayerId,
    terrain: Vec<TerrainBlock>,
    tick: u64,
}

impl Session {
    /// Creates the session and registers the local player.
    pub fn start(local_id: PlayerId, world: WorldConstants) -> Self {
        let mut registry = PlayerRegistry::new();
        registry.insert(Player::new(local_id.clone(), None));
        info!("Session started as {}", local_id);

        Self {
            simulator: Simulator::new(world),
            terrain: generate_terrain(&world),
            connections: ConnectionManager::new(local_id.clone()),
            registry,
            local_id,
            tick: 0,
        }
    }

    pub fn handle_event(&mut self, event: ConnectionEvent) {
        debug!("Connection event: {:?}", event);
        self.connections.handle_event(&mut self.registry, event);
    }

    /// Runs one frame: simulate the local player, broadcast its state, render everyone.
    pub fn tick<I, R>(&mut self, input_source: &I, now: Instant, target: &mut R) -> TickReport
    where
        I: InputSource + ?Sized,
        R: RenderTarget + ?Sized,
    {
        let input = input_source.input();
        let pointer = input_source.pointer();
        let mut sent_to = 0;

        if let Some(local) = self.registry.get_mut(&self.local_id) {
            self.simulator.step(local, &input);
            self.simulator.aim(local, pointer);
            local.pattern.advance(now);

            match codec::encode(local) {
                Ok(payload) => sent_to = self.connections.broadcast(&payload),
                Err(e) => error!("Failed to encode local state: {}", e),
            }
        }

        self.tick += 1;

        target.draw(&Frame {
            registry: &self.registry,
            local_id: &self.local_id,
            terrain: &self.terrain,
            world: self.simulator.world(),
            peer_count: self.connections.connection_count(),
            tick: self.tick,
        });

        TickReport {
            sent_to,
            player_count: self.registry.len(),
        }
    }

    pub fn start_drawing(&mut self) {
        if let Some(local) = self.local_player_mut() {
            local.pattern.start_drawing();
        }
    }

    pub fn record_point(&mut self, x: f32, y: f32) -> bool {
        self.local_player_mut()
            .map(|local| local.pattern.record_point(x, y))
            .unwrap_or(false)
    }

    pub fn stop_drawing(&mut self, now: Instant) {
        if let Some(local) = self.local_player_mut() {
            local.pattern.stop_drawing(now);
        }
    }

    /// Closes every connection; each one's close path removes its player.
    pub fn teardown(&mut self) {
        info!(
            "Tearing down session with {} connections",
            self.connections.connection_count()
        );
        self.connections.close_all(&mut self.registry);
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.registry.get(&self.local_id)
    }

    fn local_player_mut(&mut self) -> Option<&mut Player> {
        self.registry.get_mut(&self.local_id)
    }

    pub fn local_id(&self) -> &PlayerId {
        &self.local_id
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn terrain(&self) -> &[TerrainBlock] {
        &self.terrain
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }
}
