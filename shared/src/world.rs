use serde::{Deserialize, Serialize};

pub const TERRAIN_TILE_COUNT: usize = 20;
pub const TERRAIN_TILE_SIZE: f32 = 40.0;

/// Simulation parameters shared read-only by every entity in a session.
///
/// Units are pixels and pixels per tick; there is no delta time, one tick is one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConstants {
    /// Added to vertical velocity every airborne tick.
    pub gravity: f32,
    /// Horizontal velocity set while left or right is held.
    pub speed: f32,
    /// Upward impulse applied on jump.
    pub jump_force: f32,
    /// Y coordinate of the flat ground. Anything at or below it is grounded.
    pub ground_level: f32,
    /// Render surface width.
    pub width: f32,
    /// Render surface height. Falling past it snaps the entity back to the ground.
    pub height: f32,
}

impl Default for WorldConstants {
    fn default() -> Self {
        Self {
            gravity: 0.3,
            speed: 3.0,
            jump_force: 7.0,
            ground_level: 195.0,
            width: 900.0,
            height: 250.0,
        }
    }
}

/// A decorative ground tile. Drawn but never collided with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainBlock {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Lays a row of tiles along the ground line, starting at x = 0.
pub fn generate_terrain(world: &WorldConstants) -> Vec<TerrainBlock> {
    (0..TERRAIN_TILE_COUNT)
        .map(|i| TerrainBlock {
            x: i as f32 * TERRAIN_TILE_SIZE,
            y: world.ground_level,
            width: TERRAIN_TILE_SIZE,
            height: TERRAIN_TILE_SIZE,
        })
        .collect()
}
