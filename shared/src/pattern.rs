//! Gesture capture for the cosmetic laser effect.
//!
//! A gesture is the trail of pointer points recorded while the mouse button is held.
//! The buffer has two slots: the `active` slot fills while drawing, and a short while
//! after the gesture ends it is moved into the `finalized` slot so the finished shape
//! stays on screen before the next one replaces it.
//!
//! The delayed move is a scheduled transition driven by [`PatternBuffer::advance`], which
//! the game loop calls once per tick with the current time.

use crate::vector::Vector2;
use std::time::{Duration, Instant};

/// Points beyond this are dropped while drawing.
pub const MAX_PATTERN_LENGTH: usize = 20;

/// How long a finished gesture stays in the active slot before it is finalized.
pub const FINALIZE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
pub struct PatternBuffer {
    active: Vec<Vector2>,
    finalized: Vec<Vector2>,
    drawing: bool,
    finalize_at: Option<Instant>,
}

impl PatternBuffer {
    pub fn new() -> Self {
        Self {
            active: Vec::with_capacity(MAX_PATTERN_LENGTH),
            ..Self::default()
        }
    }

    /// Begins a new gesture, discarding whatever the active slot held.
    ///
    /// A previous gesture still waiting to be finalized is finalized now.
    pub fn start_drawing(&mut self) {
        if self.finalize_at.take().is_some() {
            self.finalize();
        }
        self.active.clear();
        self.drawing = true;
    }

    /// Appends a point while drawing. Returns false if the point was dropped.
    pub fn record_point(&mut self, x: f32, y: f32) -> bool {
        if !self.drawing || self.active.len() >= MAX_PATTERN_LENGTH {
            return false;
        }
        self.active.push(Vector2::new(x, y));
        true
    }

    pub fn stop_drawing(&mut self, now: Instant) {
        self.drawing = false;
        self.finalize_at = Some(now + FINALIZE_DELAY);
    }

    /// Runs the pending finalize if its deadline has passed. Returns true if it ran.
    pub fn advance(&mut self, now: Instant) -> bool {
        match self.finalize_at {
            Some(deadline) if now >= deadline => {
                self.finalize_at = None;
                self.finalize();
                true
            }
            _ => false,
        }
    }

    fn finalize(&mut self) {
        self.finalized = std::mem::take(&mut self.active);
    }

    pub fn active(&self) -> &[Vector2] {
        &self.active
    }

    pub fn finalized(&self) -> &[Vector2] {
        &self.finalized
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn is_finalize_pending(&self) -> bool {
        self.finalize_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_ignored_when_not_drawing() {
        let mut pattern = PatternBuffer::new();
        assert!(!pattern.record_point(1.0, 2.0));
        assert!(pattern.active().is_empty());
    }

    #[test]
    fn test_start_clears_active_slot() {
        let mut pattern = PatternBuffer::new();
        pattern.start_drawing();
        pattern.record_point(1.0, 1.0);
        pattern.start_drawing();

        assert!(pattern.is_drawing());
        assert!(pattern.active().is_empty());
    }

    #[test]
    fn test_overflow_keeps_earliest_points() {
        let mut pattern = PatternBuffer::new();
        pattern.start_drawing();

        for i in 0..(MAX_PATTERN_LENGTH + 5) {
            pattern.record_point(i as f32, 0.0);
        }

        assert_eq!(pattern.active().len(), MAX_PATTERN_LENGTH);
        assert_eq!(pattern.active()[0], Vector2::new(0.0, 0.0));
        assert_eq!(
            pattern.active()[MAX_PATTERN_LENGTH - 1],
            Vector2::new((MAX_PATTERN_LENGTH - 1) as f32, 0.0)
        );
    }

    #[test]
    fn test_finalize_waits_for_delay() {
        let mut pattern = PatternBuffer::new();
        let t0 = Instant::now();

        pattern.start_drawing();
        pattern.record_point(5.0, 6.0);
        pattern.record_point(7.0, 8.0);
        pattern.stop_drawing(t0);

        assert!(!pattern.is_drawing());
        assert!(!pattern.record_point(9.0, 9.0));

        assert!(!pattern.advance(t0 + Duration::from_millis(50)));
        assert_eq!(pattern.active().len(), 2);
        assert!(pattern.finalized().is_empty());

        assert!(pattern.advance(t0 + FINALIZE_DELAY));
        assert!(pattern.active().is_empty());
        assert_eq!(
            pattern.finalized(),
            &[Vector2::new(5.0, 6.0), Vector2::new(7.0, 8.0)]
        );
        assert!(!pattern.is_finalize_pending());
    }

    #[test]
    fn test_new_gesture_commits_pending_finalize() {
        let mut pattern = PatternBuffer::new();
        let t0 = Instant::now();

        pattern.start_drawing();
        pattern.record_point(1.0, 1.0);
        pattern.stop_drawing(t0);

        pattern.start_drawing();
        pattern.record_point(2.0, 2.0);

        assert_eq!(pattern.finalized(), &[Vector2::new(1.0, 1.0)]);
        assert_eq!(pattern.active(), &[Vector2::new(2.0, 2.0)]);

        // The old deadline must not clobber the gesture in progress.
        assert!(!pattern.advance(t0 + FINALIZE_DELAY * 2));
        assert_eq!(pattern.active(), &[Vector2::new(2.0, 2.0)]);
    }
}
