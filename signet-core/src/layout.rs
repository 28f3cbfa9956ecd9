//! # Layouts
//!
//! A layout is every region of a document reduced to `(page, rectangle)`, so a returning user can
//! stamp a new mark into the same places without drawing them again. There is one layout per
//! application, not per document: the most recent successful placement wins.
//!
//! Coordinates are in display space. Alongside them the layout keeps the display size of every page
//! it was drawn against, and refuses to restore into a document whose pages have different sizes,
//! where the rectangles would land in the wrong places.

use crate::{
    document::{Document, Region},
    util::{Rect, RectError},
};

/// The fixed name layouts are stored under.
pub const LAYOUT_KEY: &str = "sign_points";

#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed layout: {0}")]
    Format(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayoutEntry {
    pub page: usize,
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}
impl LayoutEntry {
    #[must_use]
    pub fn from_region(region: &Region) -> Self {
        let [x_min, y_min, x_max, y_max] = region.rect().bounds();
        Self {
            page: region.page(),
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }
    pub fn rect(&self) -> Result<Rect, RectError> {
        Rect::try_new(self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PersistedLayout {
    /// Display size of every page when the layout was captured.
    /// Empty for layouts that predate size tracking, which are restored unchecked.
    #[serde(default)]
    pub page_sizes: Vec<[u32; 2]>,
    /// Regions in page order, then in the order they were drawn.
    #[serde(default)]
    pub entries: Vec<LayoutEntry>,
}
impl PersistedLayout {
    /// Snapshot every region of the document, placed or not.
    #[must_use]
    pub fn capture(document: &Document) -> Self {
        Self {
            page_sizes: document.pages().iter().map(|page| page.display_size()).collect(),
            entries: document.regions().map(LayoutEntry::from_region).collect(),
        }
    }
    /// Check that every page this layout refers to, and that the document has, is the same size
    /// it was when the layout was drawn.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        if self.page_sizes.is_empty() {
            return true;
        }
        self.entries.iter().all(|entry| match document.page(entry.page) {
            // Pages the document doesn't have are skipped on restore anyway.
            None => true,
            Some(page) => self.page_sizes.get(entry.page) == Some(&page.display_size()),
        })
    }
    /// Add a pending region for every entry whose page exists in the document.
    /// Returns how many were added. Nothing is added if the page sizes don't match.
    pub fn restore_into(&self, document: &mut Document) -> usize {
        if !self.matches(document) {
            log::warn!(
                "saved layout was drawn on differently sized pages than {:?}, ignoring it",
                document.name
            );
            return 0;
        }
        let mut restored = 0;
        for entry in &self.entries {
            let rect = match entry.rect() {
                Ok(rect) => rect,
                Err(e) => {
                    log::warn!("skipping saved region {entry:?}: {e}");
                    continue;
                }
            };
            let Some(page) = document.pages_mut().get_mut(entry.page) else {
                log::debug!("skipping saved region for missing page {}", entry.page);
                continue;
            };
            page.push_region(rect);
            restored += 1;
        }
        restored
    }
}

/// Somewhere to keep the single application-wide layout.
pub trait LayoutStore {
    /// Fetch the stored layout, `Ok(None)` if there has never been one.
    fn read(&self) -> Result<Option<PersistedLayout>, LayoutError>;
    /// Replace the stored layout.
    fn write(&self, layout: &PersistedLayout) -> Result<(), LayoutError>;

    /// Capture and store the layout of `document`, overwriting the previous one.
    fn save(&self, document: &Document) -> Result<PersistedLayout, LayoutError> {
        let layout = PersistedLayout::capture(document);
        self.write(&layout)?;
        log::debug!("saved layout with {} region(s)", layout.entries.len());
        Ok(layout)
    }
    /// Fetch the stored layout, treating failures as "no layout".
    fn load(&self) -> Option<PersistedLayout> {
        match self.read() {
            Ok(layout) => layout,
            Err(e) => {
                log::warn!("failed to read saved layout: {e}");
                None
            }
        }
    }
}

/// A store that forgets everything when dropped.
#[derive(Default)]
pub struct MemoryLayoutStore {
    layout: std::cell::RefCell<Option<PersistedLayout>>,
}
impl LayoutStore for MemoryLayoutStore {
    fn read(&self) -> Result<Option<PersistedLayout>, LayoutError> {
        Ok(self.layout.borrow().clone())
    }
    fn write(&self, layout: &PersistedLayout) -> Result<(), LayoutError> {
        *self.layout.borrow_mut() = Some(layout.clone());
        Ok(())
    }
}
