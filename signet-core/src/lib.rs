//! # signet-core
//!
//! The parts of signet that don't care about windows or files: page surfaces and their regions,
//! the region selector, mark capture, compositing, and layout persistence.

pub mod capture;
pub mod composite;
pub mod document;
pub mod input;
pub mod layout;
pub mod selection;
pub mod session;
pub mod util;

pub use capture::{CaptureSettings, MarkCapture, MarkImage};
pub use document::{Document, Page, Region};
pub use input::PointerEvent;
pub use layout::{LayoutStore, PersistedLayout};
pub use session::Session;
