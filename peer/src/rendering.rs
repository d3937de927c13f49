use macroquad::prelude::*;
use shared::{Frame, Player, RenderTarget, TerrainBlock, Vector2};

pub const PLAYER_WIDTH: f32 = 30.0;
pub const PLAYER_HEIGHT: f32 = 40.0;
pub const GUN_LENGTH: f32 = 24.0;

const SKY: Color = Color::new(0.529, 0.808, 0.922, 1.0);
const GROUND: Color = Color::new(0.36, 0.25, 0.2, 1.0);
const LASER: Color = RED;
const DASH: f32 = 6.0;
const GAP: f32 = 3.0;

/// Draws a session frame with macroquad.
pub struct Renderer {
    topic_hex: String,
}

impl Renderer {
    pub fn new(topic_hex: String) -> Self {
        Renderer { topic_hex }
    }

    fn draw_terrain(&self, terrain: &[TerrainBlock]) {
        for block in terrain {
            draw_rectangle(block.x, block.y, block.width, block.height, GROUND);
            draw_rectangle_lines(block.x, block.y, block.width, block.height, 1.0, BLACK);
        }
    }

    fn draw_player(&self, player: &Player, is_local: bool) {
        let x = player.position.x;
        let y = player.position.y - PLAYER_HEIGHT;
        draw_rectangle(x, y, PLAYER_WIDTH, PLAYER_HEIGHT, player_color(player));

        let outline = if is_local { WHITE } else { BLACK };
        draw_rectangle_lines(x, y, PLAYER_WIDTH, PLAYER_HEIGHT, 2.0, outline);

        draw_text(player.id.as_str(), x - 4.0, y - 4.0, 14.0, BLACK);

        self.draw_gun(player);
    }

    fn draw_gun(&self, player: &Player) {
        let pivot = player.position.add(&shared::simulator::GUN_PIVOT_OFFSET);
        let end = Vector2::new(
            pivot.x + GUN_LENGTH * player.gun_rotation.cos(),
            pivot.y + GUN_LENGTH * player.gun_rotation.sin(),
        );
        draw_line(pivot.x, pivot.y, end.x, end.y, 4.0, DARKGRAY);
    }

    fn draw_patterns(&self, player: &Player) {
        let active = player.pattern.active();
        if active.len() > 1 {
            for (from, to) in dash_segments(active, DASH, GAP) {
                draw_line(from.x, from.y, to.x, to.y, 2.0, LASER);
            }
        }

        let finalized = player.pattern.finalized();
        if finalized.len() > 1 {
            for pair in finalized.windows(2) {
                draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, 2.0, LASER);
            }
        }
    }

    fn draw_hud(&self, frame: &Frame<'_>) {
        let topic = format!("topic {}", self.topic_hex);
        draw_text(&topic, 10.0, 16.0, 16.0, BLACK);

        let status = format!(
            "you {} | {} peers | {} players",
            frame.local_id,
            frame.peer_count,
            frame.registry.len()
        );
        draw_text(&status, 10.0, 32.0, 16.0, BLACK);
    }
}

impl RenderTarget for Renderer {
    fn draw(&mut self, frame: &Frame<'_>) {
        clear_background(SKY);

        self.draw_terrain(frame.terrain);

        for id in frame.registry.ids() {
            if let Some(player) = frame.registry.get(&id) {
                self.draw_player(player, &id == frame.local_id);
                self.draw_patterns(player);
            }
        }

        self.draw_hud(frame);
    }
}

/// Colour from the player's hex id, grey if the id is not a hex triple.
pub fn player_color(player: &Player) -> Color {
    match player.id.as_str().get(..6).map(hex::decode) {
        Some(Ok(rgb)) => Color::from_rgba(rgb[0], rgb[1], rgb[2], 255),
        _ => GRAY,
    }
}

/// Splits a polyline into dash segments of `dash` length separated by `gap`.
pub fn dash_segments(points: &[Vector2], dash: f32, gap: f32) -> Vec<(Vector2, Vector2)> {
    let mut segments = Vec::new();
    let period = dash + gap;
    // Distance travelled within the current dash/gap period.
    let mut phase = 0.0_f32;

    for pair in points.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let delta = end.sub(&start);
        let length = (delta.x * delta.x + delta.y * delta.y).sqrt();
        if length == 0.0 {
            continue;
        }

        let mut travelled = 0.0_f32;
        while travelled < length {
            let in_dash = phase < dash;
            let remaining_in_phase = if in_dash { dash - phase } else { period - phase };
            let step = remaining_in_phase.min(length - travelled);

            if in_dash {
                let from = lerp(start, delta, travelled / length);
                let to = lerp(start, delta, (travelled + step) / length);
                segments.push((from, to));
            }

            travelled += step;
            phase = (phase + step) % period;
        }
    }

    segments
}

fn lerp(start: Vector2, delta: Vector2, t: f32) -> Vector2 {
    Vector2::new(start.x + delta.x * t, start.y + delta.y * t)
}
