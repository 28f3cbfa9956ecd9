//! # Sessions
//!
//! A session owns everything the user is working on: at most one open document, at most one
//! open capture, and the store the layout is remembered in. The windowing shell translates its
//! buttons and pointer callbacks into calls here, all on one thread.

use image::RgbaImage;

use crate::{
    capture::{CaptureSettings, MarkCapture, MarkImage},
    composite,
    document::Document,
    input::PointerEvent,
    layout::LayoutStore,
    util::Rect,
};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("no document is open")]
    NoDocument,
    #[error("document has no page {0}")]
    NoSuchPage(usize),
    #[error("no mark capture is open")]
    NoCapture,
}

pub struct Session<Store> {
    store: Store,
    capture_settings: CaptureSettings,
    document: Option<Document>,
    capture: Option<MarkCapture>,
}
impl<Store: LayoutStore> Session<Store> {
    pub fn new(store: Store, capture_settings: CaptureSettings) -> Self {
        Self {
            store,
            capture_settings,
            document: None,
            capture: None,
        }
    }
    pub fn store(&self) -> &Store {
        &self.store
    }
    #[must_use]
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }
    #[must_use]
    pub fn capture(&self) -> Option<&MarkCapture> {
        self.capture.as_ref()
    }
    /// Replace the open document, pre-populating it from the saved layout.
    /// Returns how many regions were restored.
    pub fn open(&mut self, mut document: Document) -> usize {
        self.reset();
        let restored = self
            .store
            .load()
            .map_or(0, |layout| layout.restore_into(&mut document));
        log::info!(
            "opened {:?}: {} page(s), {restored} region(s) restored",
            document.name,
            document.pages().len()
        );
        self.document = Some(document);
        restored
    }
    /// Drop the document and any capture in progress.
    pub fn reset(&mut self) {
        if let Some(document) = self.document.take() {
            log::debug!("closing {:?}", document.name);
        }
        self.capture = None;
    }
    /// Switch region selection mode for every page. Returns the new mode.
    pub fn toggle_selection(&mut self) -> Result<bool, SessionError> {
        let document = self.document.as_mut().ok_or(SessionError::NoDocument)?;
        Ok(document.toggle_selection())
    }
    /// Route a pointer event to one page. Returns the rectangle it committed, if any.
    pub fn pointer(&mut self, page: usize, event: PointerEvent) -> Result<Option<Rect>, SessionError> {
        let document = self.document.as_mut().ok_or(SessionError::NoDocument)?;
        if document.page(page).is_none() {
            return Err(SessionError::NoSuchPage(page));
        }
        Ok(document.handle_pointer(page, event))
    }
    /// Open a fresh capture, discarding any previous one.
    pub fn begin_capture(&mut self) {
        self.capture = Some(MarkCapture::new(self.capture_settings));
    }
    pub fn capture_event(&mut self, event: PointerEvent) -> Result<(), SessionError> {
        self.capture
            .as_mut()
            .ok_or(SessionError::NoCapture)?
            .process(event);
        Ok(())
    }
    pub fn clear_capture(&mut self) -> Result<(), SessionError> {
        self.capture.as_mut().ok_or(SessionError::NoCapture)?.clear();
        Ok(())
    }
    /// Close the capture and stamp its mark into every pending region.
    /// Returns how many regions were stamped.
    pub fn confirm_capture(&mut self) -> Result<usize, SessionError> {
        if self.document.is_none() {
            return Err(SessionError::NoDocument);
        }
        let capture = self.capture.take().ok_or(SessionError::NoCapture)?;
        self.apply_mark(capture.confirm())
    }
    /// Stamp `mark` into every pending region. If anything was stamped, the layout is saved.
    pub fn apply_mark(&mut self, mark: MarkImage) -> Result<usize, SessionError> {
        let document = self.document.as_mut().ok_or(SessionError::NoDocument)?;
        let placed = composite::apply(document, &mark);
        if placed > 0 {
            // Losing the layout only costs the user a redraw next time.
            if let Err(e) = self.store.save(document) {
                log::warn!("failed to save layout: {e}");
            }
        }
        Ok(placed)
    }
    /// Every page with its marks burned in, for the exporter.
    pub fn flattened_pages(&self) -> Result<Vec<RgbaImage>, SessionError> {
        Ok(self
            .document
            .as_ref()
            .ok_or(SessionError::NoDocument)?
            .flatten_pages())
    }
}

#[cfg(test)]
mod test {
    use super::{Session, SessionError};
    use crate::{
        capture::{CaptureSettings, MarkImage},
        document::Document,
        input::PointerEvent,
        layout::{LayoutStore, MemoryLayoutStore},
    };
    use image::{Rgba, RgbaImage};

    fn two_page_document() -> Document {
        let blank = RgbaImage::from_pixel(400, 400, Rgba([255; 4]));
        Document::new(Some("/docs/lease.pdf".into()), vec![blank.clone(), blank], None)
    }
    fn session() -> Session<MemoryLayoutStore> {
        Session::new(MemoryLayoutStore::default(), CaptureSettings::default())
    }
    fn draw(session: &mut Session<MemoryLayoutStore>, page: usize, from: [f32; 2], to: [f32; 2]) {
        session.pointer(page, PointerEvent::Press(from)).unwrap();
        session.pointer(page, PointerEvent::Move(to)).unwrap();
        session.pointer(page, PointerEvent::Release(to)).unwrap();
    }
    fn sign(session: &mut Session<MemoryLayoutStore>, path: &[[f32; 2]]) -> usize {
        session.begin_capture();
        session.capture_event(PointerEvent::Press(path[0])).unwrap();
        for point in &path[1..] {
            session.capture_event(PointerEvent::Move(*point)).unwrap();
        }
        session
            .capture_event(PointerEvent::Release(*path.last().unwrap()))
            .unwrap();
        session.confirm_capture().unwrap()
    }

    #[test]
    fn end_to_end() {
        let mut session = session();
        assert_eq!(session.open(two_page_document()), 0);

        assert_eq!(session.toggle_selection(), Ok(true));
        draw(&mut session, 0, [100.0, 100.0], [200.0, 150.0]);
        assert_eq!(session.toggle_selection(), Ok(false));

        assert_eq!(sign(&mut session, &[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]), 1);
        assert!(session.capture().is_none());

        let document = session.document().unwrap();
        let page = &document.pages()[0];
        assert_eq!(page.regions().len(), 1);
        let region = &page.regions()[0];
        let placement = region.placed().unwrap();
        assert_eq!(placement.bounds.width(), 100.0);
        assert_eq!(placement.bounds.min()[0], 100.0);
        // Centered on the 50 tall band starting at y=100.
        let center = placement.bounds.min()[1] + placement.bounds.height() / 2.0;
        assert!((center - 125.0).abs() < 1e-3, "{center}");
        assert!(document.pages()[1].regions().is_empty());

        // Flattened output keeps raster dimensions, page 1 untouched.
        let pages = session.flattened_pages().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].dimensions(), (400, 400));
        assert_eq!(pages[1], RgbaImage::from_pixel(400, 400, Rgba([255; 4])));
    }
    #[test]
    fn returning_user_gets_layout_back() {
        let mut session = session();
        session.open(two_page_document());
        session.toggle_selection().unwrap();
        draw(&mut session, 0, [10.0, 10.0], [50.0, 40.0]);
        draw(&mut session, 1, [5.0, 5.0], [20.0, 20.0]);
        session.toggle_selection().unwrap();
        assert_eq!(sign(&mut session, &[[0.0, 0.0], [30.0, 10.0]]), 2);
        assert_eq!(session.store().load().unwrap().entries.len(), 2);

        // New run, same document.
        assert_eq!(session.open(two_page_document()), 2);
        let document = session.document().unwrap();
        assert!(document.regions().all(|region| region.is_pending()));
        assert_eq!(sign(&mut session, &[[0.0, 0.0], [30.0, 10.0]]), 2);
    }
    #[test]
    fn empty_capture_places_nothing_and_saves_nothing() {
        let mut session = session();
        session.open(two_page_document());
        session.toggle_selection().unwrap();
        draw(&mut session, 0, [10.0, 10.0], [50.0, 40.0]);
        session.toggle_selection().unwrap();

        session.begin_capture();
        assert_eq!(session.confirm_capture(), Ok(0));
        assert!(session.document().unwrap().regions().all(|r| r.is_pending()));
        assert_eq!(session.store().load(), None);
    }
    #[test]
    fn cleared_capture_is_empty() {
        let mut session = session();
        session.open(two_page_document());
        session.begin_capture();
        session.capture_event(PointerEvent::Press([0.0, 0.0])).unwrap();
        session.capture_event(PointerEvent::Move([40.0, 0.0])).unwrap();
        session.capture_event(PointerEvent::Release([40.0, 0.0])).unwrap();
        session.clear_capture().unwrap();
        assert!(session.capture().unwrap().strokes().is_empty());
    }
    #[test]
    fn misuse_is_reported() {
        let mut session = session();
        assert_eq!(session.toggle_selection(), Err(SessionError::NoDocument));
        assert_eq!(
            session.pointer(0, PointerEvent::Press([0.0, 0.0])),
            Err(SessionError::NoDocument)
        );
        assert_eq!(
            session.apply_mark(MarkImage::empty()),
            Err(SessionError::NoDocument)
        );
        assert_eq!(session.clear_capture(), Err(SessionError::NoCapture));

        session.open(two_page_document());
        assert_eq!(
            session.pointer(5, PointerEvent::Press([0.0, 0.0])),
            Err(SessionError::NoSuchPage(5))
        );
        assert_eq!(session.confirm_capture(), Err(SessionError::NoCapture));
    }
    #[test]
    fn reset_drops_everything() {
        let mut session = session();
        session.open(two_page_document());
        session.begin_capture();
        session.reset();
        assert!(session.document().is_none());
        assert!(session.capture().is_none());
    }
}
