//! # Region selection
//!
//! Each page surface owns a [`RegionSelector`], a tiny two-state machine turning pointer drags into
//! normalized rectangles. Whether selecting is allowed at all is decided by a single
//! [`SelectionState`] owned by the document and lent to every selector, so all pages switch modes
//! together.
//!
//! The selector itself never stores regions. It reports a committed rectangle and the owning page
//! decides what to do with it.

use crate::{
    input::PointerEvent,
    util::{Point, Rect},
};

/// Document-wide selection mode. Not persisted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    enabled: bool,
}
impl SelectionState {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
    /// Flip the mode, returning the new value.
    pub(crate) fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum SelectorState {
    #[default]
    Idle,
    Dragging {
        origin: Point,
        current: Point,
    },
}

#[derive(Clone, Debug, Default)]
pub struct RegionSelector {
    state: SelectorState,
}
impl RegionSelector {
    #[must_use]
    pub fn state(&self) -> SelectorState {
        self.state
    }
    /// The rectangle currently being dragged out, if any.
    #[must_use]
    pub fn preview(&self) -> Option<Rect> {
        match self.state {
            SelectorState::Idle => None,
            SelectorState::Dragging { origin, current } => Some(Rect::from_corners(origin, current)),
        }
    }
    /// Start a drag. Ignored unless selection is enabled and no drag is in progress.
    /// Returns true if a drag was started.
    pub fn begin_drag(&mut self, selection: &SelectionState, point: Point) -> bool {
        if !selection.is_enabled() {
            return false;
        }
        match self.state {
            SelectorState::Idle => {
                self.state = SelectorState::Dragging {
                    origin: point,
                    current: point,
                };
                true
            }
            // One rectangle at a time.
            SelectorState::Dragging { .. } => false,
        }
    }
    /// Move the free corner of the in-progress drag. Returns the updated preview.
    pub fn update_drag(&mut self, point: Point) -> Option<Rect> {
        if let SelectorState::Dragging { current, .. } = &mut self.state {
            *current = point;
        }
        self.preview()
    }
    /// Finish the drag, returning the committed rectangle. Zero-area rectangles are committed too.
    pub fn end_drag(&mut self, point: Point) -> Option<Rect> {
        match std::mem::take(&mut self.state) {
            SelectorState::Idle => None,
            SelectorState::Dragging { origin, .. } => Some(Rect::from_corners(origin, point)),
        }
    }
    /// Drop any in-progress drag without committing it.
    pub fn cancel(&mut self) {
        if let SelectorState::Dragging { origin, current } = self.state {
            log::trace!("discarding uncommitted drag {origin:?} -> {current:?}");
        }
        self.state = SelectorState::Idle;
    }
    /// Feed one pointer event. Returns a rectangle when the event commits one.
    pub fn process(&mut self, selection: &SelectionState, event: PointerEvent) -> Option<Rect> {
        let pos = event.position();
        match event {
            PointerEvent::Press(_) => {
                self.begin_drag(selection, pos);
                None
            }
            PointerEvent::Move(_) => {
                self.update_drag(pos);
                None
            }
            PointerEvent::Release(_) => self.end_drag(pos),
        }
    }
}
