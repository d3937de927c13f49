use crate::vector::Vector2;

/// Held movement keys, sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

/// Host-provided input, updated asynchronously and read synchronously once per tick.
pub trait InputSource {
    fn input(&self) -> InputState;

    /// Pointer position in render-surface coordinates.
    fn pointer(&self) -> Vector2;
}

/// Fixed input, for hosts that feed the loop from a script or a test.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticInput {
    pub input: InputState,
    pub pointer: Vector2,
}

impl InputSource for StaticInput {
    fn input(&self) -> InputState {
        self.input
    }

    fn pointer(&self) -> Vector2 {
        self.pointer
    }
}
