//! # Pointer input
//!
//! A toolkit-independent stream of pointer events. Whatever owns the window translates its own
//! mouse/stylus callbacks into these, already mapped into the receiving surface's coordinate space,
//! and feeds them to the per-surface state machines in order.

use crate::util::Point;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PointerEvent {
    /// Primary button went down.
    Press(Point),
    /// Pointer moved, regardless of button state.
    Move(Point),
    /// Primary button went up.
    Release(Point),
}
impl PointerEvent {
    #[must_use]
    pub fn position(&self) -> Point {
        match self {
            Self::Press(pos) | Self::Move(pos) | Self::Release(pos) => *pos,
        }
    }
}
