/// Ratchet invariant enforcement
///
/// **Core Rule:** Stops may tighten, never loosen.
///
/// - Long positions: stop can only rise
/// - Short positions: stop can only fall
use crate::domain::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatchetState {
    level: f64,
    direction: Direction,
}

impl RatchetState {
    pub fn new(direction: Direction, initial_level: f64) -> Self {
        Self { level: initial_level, direction }
    }

    /// Apply the ratchet to a proposed stop and return the resulting level.
    ///
    /// # Example
    /// ```
    /// use orb_core::components::pm::RatchetState;
    /// use orb_core::domain::Direction;
    ///
    /// let mut ratchet = RatchetState::new(Direction::Long, 95.0);
    /// assert_eq!(ratchet.apply(100.0), 100.0);
    /// // Loosening is blocked
    /// assert_eq!(ratchet.apply(90.0), 100.0);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        if self.direction.improves(proposed, self.level) {
            self.level = proposed;
        }
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}
