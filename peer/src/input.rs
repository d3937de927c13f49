//! Keyboard and mouse sampling for the local player

use macroquad::prelude::*;
use shared::{InputSource, InputState, Session, Vector2};
use std::time::Instant;

/// Pointer-driven gesture steps, in the order they happened this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Button pressed: a new gesture begins at this point.
    Start(Vector2),
    /// Pointer moved while the button may be held.
    Move(Vector2),
    /// Button released.
    Stop,
}

impl GestureEvent {
    pub fn apply(self, session: &mut Session, now: Instant) {
        match self {
            GestureEvent::Start(point) => {
                session.start_drawing();
                session.record_point(point.x, point.y);
            }
            GestureEvent::Move(point) => {
                session.record_point(point.x, point.y);
            }
            GestureEvent::Stop => session.stop_drawing(now),
        }
    }
}

/// Samples macroquad's input state once per frame.
pub struct InputManager {
    current: InputState,
    pointer: Vector2,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            current: InputState::default(),
            pointer: Vector2::ZERO,
        }
    }

    /// Samples keys and pointer, returning this frame's gesture steps.
    pub fn update(&mut self) -> Vec<GestureEvent> {
        // Arrow keys, plus WASD/Space
        self.current = InputState {
            left: is_key_down(KeyCode::Left) || is_key_down(KeyCode::A),
            right: is_key_down(KeyCode::Right) || is_key_down(KeyCode::D),
            jump: is_key_down(KeyCode::Up)
                || is_key_down(KeyCode::W)
                || is_key_down(KeyCode::Space),
        };

        let (x, y) = mouse_position();
        let pointer = Vector2::new(x, y);
        let moved = pointer != self.pointer;
        self.pointer = pointer;

        gesture_events(
            is_mouse_button_pressed(MouseButton::Left),
            is_mouse_button_released(MouseButton::Left),
            moved,
            pointer,
        )
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for InputManager {
    fn input(&self) -> InputState {
        self.current
    }

    fn pointer(&self) -> Vector2 {
        self.pointer
    }
}

/// Orders one frame's mouse transitions into gesture steps.
pub fn gesture_events(
    pressed: bool,
    released: bool,
    moved: bool,
    pointer: Vector2,
) -> Vec<GestureEvent> {
    let mut events = Vec::new();
    if pressed {
        events.push(GestureEvent::Start(pointer));
    } else if moved {
        events.push(GestureEvent::Move(pointer));
    }
    if released {
        events.push(GestureEvent::Stop);
    }
    events
}
