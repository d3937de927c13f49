//! Per-tick kinematics for a single player.
//!
//! One call to [`Simulator::step`] advances exactly one tick, in this fixed order:
//!
//! 1. Gravity and landing, judged on the position from the previous tick.
//! 2. Vertical integration.
//! 3. Horizontal input and jump impulse. The impulse is integrated on the next tick.
//! 4. Horizontal integration.
//! 5. Friction: horizontal speed loses 1.0 per tick and stops at zero.
//!
//! Then the fall clamp snaps anything below the render surface back to the ground.
//!
//! The ground is a flat line at `ground_level`. Terrain tiles are not colliders.
//! Stepping is deterministic for identical input and state, but peers do not share
//! inputs or ticks, so nothing here is expected to agree bit-for-bit across peers.

use crate::input::InputState;
use crate::player::Player;
use crate::vector::Vector2;
use crate::world::WorldConstants;

/// Horizontal speed lost per tick.
pub const FRICTION_STEP: f32 = 1.0;

/// Offset from a player's position to the gun pivot.
pub const GUN_PIVOT_OFFSET: Vector2 = Vector2::new(15.0, -20.0);

#[derive(Debug, Clone)]
pub struct Simulator {
    world: WorldConstants,
}

impl Simulator {
    pub fn new(world: WorldConstants) -> Self {
        Self { world }
    }

    pub fn world(&self) -> &WorldConstants {
        &self.world
    }

    pub fn on_ground(&self, player: &Player) -> bool {
        player.position.y >= self.world.ground_level
    }

    /// Advances `player` by one tick under `input`.
    pub fn step(&self, player: &mut Player, input: &InputState) {
        self.apply_gravity(player);
        self.apply_input(player, input);
        self.clamp_fall(player);
    }

    fn apply_gravity(&self, player: &mut Player) {
        if !self.on_ground(player) {
            player.velocity.y += self.world.gravity;
            player.jump_state = true;
        }
        if player.jump_state && self.on_ground(player) {
            player.velocity.y = 0.0;
            player.jump_state = false;
        }
        player.position.y += player.velocity.y;
    }

    fn apply_input(&self, player: &mut Player, input: &InputState) {
        if input.left {
            player.velocity.x = -self.world.speed;
        }
        if input.right {
            player.velocity.x = self.world.speed;
        }
        if input.jump && self.on_ground(player) {
            player.velocity.y = -self.world.jump_force;
        }

        player.position.x += player.velocity.x;
        player.velocity.x = decay_toward_zero(player.velocity.x, FRICTION_STEP);
    }

    fn clamp_fall(&self, player: &mut Player) {
        if player.position.y > self.world.height {
            player.position.y = self.world.ground_level;
        }
    }

    /// Points the gun from its pivot at `pointer`.
    pub fn aim(&self, player: &mut Player, pointer: Vector2) {
        let pivot = player.position.add(&GUN_PIVOT_OFFSET);
        player.gun_rotation = pivot.angle_to(&pointer);
    }
}

/// Moves `value` toward zero by `step` without crossing it.
fn decay_toward_zero(value: f32, step: f32) -> f32 {
    if value > 0.0 {
        (value - step).max(0.0)
    } else if value < 0.0 {
        (value + step).min(0.0)
    } else {
        value
    }
}
