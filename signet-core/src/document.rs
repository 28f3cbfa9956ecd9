//! # Documents and page surfaces
//!
//! A [`Document`] is the rasterized form of whatever file the user opened: an ordered list of
//! [`Page`]s, each an immutable raster plus the placement [`Region`]s drawn on top of it.
//!
//! Pages may be *displayed* at a different width than their raster (every page is shown scaled to
//! the viewer width). Region rectangles live in that display space, and are mapped back into raster
//! space only when the page is flattened for export.

use image::{imageops, Rgba, RgbaImage};

use crate::{
    capture::MarkImage,
    input::PointerEvent,
    selection::{RegionSelector, SelectionState},
    util::{Point, Rect},
};

/// Fill for regions still waiting for a mark.
pub const REGION_FILL: Rgba<u8> = Rgba([0x00, 0x98, 0x3A, 120]);
/// Outline of the rectangle being dragged out.
pub const PREVIEW_OUTLINE: Rgba<u8> = Rgba([0x00, 0x98, 0x3A, 255]);

/// A mark that has been scaled and positioned into a region.
#[derive(Clone, Debug)]
pub struct Placement {
    /// Where the image lands, in display coordinates. May extend past the region vertically.
    pub bounds: Rect,
    /// The mark, resampled to `bounds` at display resolution.
    pub image: RgbaImage,
    /// The mark as captured. Flattening resamples from this, not from `image`.
    pub mark: MarkImage,
}

#[derive(Clone, Debug)]
pub struct Region {
    page: usize,
    rect: Rect,
    placed: Option<Placement>,
}
impl Region {
    #[must_use]
    pub fn new(page: usize, rect: Rect) -> Self {
        Self {
            page,
            rect,
            placed: None,
        }
    }
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }
    #[must_use]
    pub fn placed(&self) -> Option<&Placement> {
        self.placed.as_ref()
    }
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.placed.is_none()
    }
    /// Set the placement, unless one is already there. Returns true if it was set.
    pub(crate) fn place(&mut self, placement: Placement) -> bool {
        if self.placed.is_some() {
            return false;
        }
        self.placed = Some(placement);
        true
    }
}

/// One page surface: a raster, its regions, and the selector drawing new ones.
pub struct Page {
    index: usize,
    raster: RgbaImage,
    display_size: [u32; 2],
    regions: Vec<Region>,
    selector: RegionSelector,
}
impl Page {
    /// Create a page. If `display_width` is given, the page is shown scaled to that width
    /// with its aspect ratio kept, otherwise at raster size.
    #[must_use]
    pub fn new(index: usize, raster: RgbaImage, display_width: Option<u32>) -> Self {
        let (width, height) = raster.dimensions();
        let display_size = match display_width {
            Some(display_width) if display_width > 0 && width > 0 => {
                let scale = f64::from(display_width) / f64::from(width);
                let display_height = (f64::from(height) * scale).round() as u32;
                [display_width, display_height.max(1)]
            }
            _ => [width, height],
        };
        Self {
            index,
            raster,
            display_size,
            regions: Vec::new(),
            selector: RegionSelector::default(),
        }
    }
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
    #[must_use]
    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }
    #[must_use]
    pub fn display_size(&self) -> [u32; 2] {
        self.display_size
    }
    /// Display pixels per raster pixel.
    #[must_use]
    pub fn scale(&self) -> f32 {
        let width = self.raster.width();
        if width == 0 {
            1.0
        } else {
            self.display_size[0] as f32 / width as f32
        }
    }
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
    pub(crate) fn regions_mut(&mut self) -> &mut [Region] {
        &mut self.regions
    }
    /// The displayed page, `(0, 0)` to its display size.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let [width, height] = self.display_size;
        Rect::from_corners([0.0, 0.0], [width as f32, height as f32])
    }
    /// Add a pending region, clipped to the page. Returns the rectangle as stored.
    pub fn push_region(&mut self, rect: Rect) -> Rect {
        let rect = rect.clamped(self.bounds());
        self.regions.push(Region::new(self.index, rect));
        rect
    }
    pub(crate) fn clear_regions(&mut self) {
        self.regions.clear();
    }
    pub(crate) fn selector_mut(&mut self) -> &mut RegionSelector {
        &mut self.selector
    }
    /// Live preview of the rectangle being drawn on this page.
    #[must_use]
    pub fn preview(&self) -> Option<Rect> {
        self.selector.preview()
    }
    /// Feed a pointer event to this page's selector, storing anything it commits.
    pub fn handle_pointer(&mut self, selection: &SelectionState, event: PointerEvent) -> Option<Rect> {
        let committed = self.selector.process(selection, event)?;
        let committed = self.push_region(committed);
        log::debug!("page {}: committed region {:?}", self.index, committed.bounds());
        Some(committed)
    }
    /// Draw the page as the user sees it: scaled raster, marks, pending regions and the live preview.
    #[must_use]
    pub fn render(&self) -> RgbaImage {
        let [width, height] = self.display_size;
        let mut view = if self.raster.dimensions() == (width, height) {
            self.raster.clone()
        } else {
            imageops::resize(&self.raster, width, height, imageops::FilterType::Triangle)
        };

        for region in &self.regions {
            match region.placed() {
                Some(placement) => {
                    let [x, y] = placement.bounds.min();
                    imageops::overlay(&mut view, &placement.image, round_i64(x), round_i64(y));
                }
                None => fill_rect(&mut view, region.rect, REGION_FILL),
            }
        }
        if let Some(preview) = self.preview() {
            outline_rect(&mut view, preview, PREVIEW_OUTLINE);
        }
        view
    }
    /// The base raster with every placed mark burned in, at raster resolution.
    /// Pending regions and previews are not drawn.
    #[must_use]
    pub fn flatten(&self) -> RgbaImage {
        let mut out = self.raster.clone();
        let to_raster = 1.0 / self.scale();
        for placement in self.regions.iter().filter_map(Region::placed) {
            let bounds = placement.bounds.scaled(to_raster);
            let width = (bounds.width().round() as u32).max(1);
            let height = (bounds.height().round() as u32).max(1);
            let [x, y] = bounds.min();
            let mark = placement.mark.image();
            if mark.dimensions() == (width, height) {
                imageops::overlay(&mut out, mark, round_i64(x), round_i64(y));
            } else {
                let resampled = imageops::resize(
                    mark,
                    width,
                    height,
                    imageops::FilterType::CatmullRom,
                );
                imageops::overlay(&mut out, &resampled, round_i64(x), round_i64(y));
            }
        }
        out
    }
}

fn round_i64(v: f32) -> i64 {
    v.round() as i64
}

/// Pixel span `[start, end)` of a rect along one axis, clamped to `len`.
fn pixel_span(min: f32, max: f32, len: u32) -> std::ops::Range<u32> {
    let start = min.floor().max(0.0).min(len as f32) as u32;
    let end = max.ceil().max(0.0).min(len as f32) as u32;
    start..end
}

fn fill_rect(image: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    use image::Pixel;
    let (width, height) = image.dimensions();
    let [x_min, y_min] = rect.min();
    let [x_max, y_max] = rect.max();
    for y in pixel_span(y_min, y_max, height) {
        for x in pixel_span(x_min, x_max, width) {
            image.get_pixel_mut(x, y).blend(&color);
        }
    }
}

fn outline_rect(image: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let (width, height) = image.dimensions();
    let [x_min, y_min] = rect.min();
    let [x_max, y_max] = rect.max();
    let mut put = |[x, y]: Point| {
        if x >= 0.0 && y >= 0.0 && (x as u32) < width && (y as u32) < height {
            image.put_pixel(x as u32, y as u32, color);
        }
    };
    for x in pixel_span(x_min, x_max + 1.0, width) {
        put([x as f32, y_min]);
        put([x as f32, y_max]);
    }
    for y in pixel_span(y_min, y_max + 1.0, height) {
        put([x_min, y as f32]);
        put([x_max, y as f32]);
    }
}

/// The rasterized document of one session.
pub struct Document {
    /// The path the document was loaded from, or None if built in memory.
    pub path: Option<std::path::PathBuf>,
    /// Name of the document, inferred from its path or generated.
    pub name: String,
    selection: SelectionState,
    pages: Vec<Page>,
}
impl Document {
    /// Build a document from ordered page rasters. Page indices are assigned here, once.
    #[must_use]
    pub fn new(
        path: Option<std::path::PathBuf>,
        rasters: Vec<RgbaImage>,
        display_width: Option<u32>,
    ) -> Self {
        let name = path
            .as_deref()
            .and_then(std::path::Path::file_name)
            .map_or_else(
                || "Untitled Document".to_owned(),
                |name| name.to_string_lossy().into_owned(),
            );
        let pages = rasters
            .into_iter()
            .enumerate()
            .map(|(index, raster)| Page::new(index, raster, display_width))
            .collect();
        Self {
            path,
            name,
            selection: SelectionState::default(),
            pages,
        }
    }
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }
    #[must_use]
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }
    pub(crate) fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }
    #[must_use]
    pub fn selection(&self) -> SelectionState {
        self.selection
    }
    /// Switch selection mode for every page at once, returning the new mode.
    ///
    /// Turning it on throws away every region on every page so a fresh layout can be drawn.
    /// Turning it off keeps committed regions but drops any half-finished drag.
    pub fn toggle_selection(&mut self) -> bool {
        let enabled = self.selection.toggle();
        for page in &mut self.pages {
            page.selector_mut().cancel();
            if enabled {
                page.clear_regions();
            }
        }
        log::debug!("selection mode {}", if enabled { "on" } else { "off" });
        enabled
    }
    /// Start a drag on the given page. False if ignored or the page doesn't exist.
    pub fn begin_drag(&mut self, page: usize, point: Point) -> bool {
        let Some(page) = self.pages.get_mut(page) else {
            return false;
        };
        page.selector_mut().begin_drag(&self.selection, point)
    }
    pub fn update_drag(&mut self, page: usize, point: Point) -> Option<Rect> {
        self.pages.get_mut(page)?.selector_mut().update_drag(point)
    }
    /// Finish a drag on the given page, committing a region. Returns the committed rectangle.
    pub fn end_drag(&mut self, page: usize, point: Point) -> Option<Rect> {
        self.handle_pointer(page, PointerEvent::Release(point))
    }
    /// Route a pointer event to the given page.
    pub fn handle_pointer(&mut self, page: usize, event: PointerEvent) -> Option<Rect> {
        self.pages
            .get_mut(page)?
            .handle_pointer(&self.selection, event)
    }
    /// Every region, in page order then insertion order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> + '_ {
        self.pages.iter().flat_map(|page| page.regions().iter())
    }
    /// Flattened raster of every page, ready for an exporter.
    #[must_use]
    pub fn flatten_pages(&self) -> Vec<RgbaImage> {
        self.pages.iter().map(Page::flatten).collect()
    }
}

#[cfg(test)]
mod test {
    use super::{Document, Page, Placement, REGION_FILL};
    use crate::{capture::MarkImage, input::PointerEvent, util::Rect};
    use image::{Rgba, RgbaImage};

    const WHITE: Rgba<u8> = Rgba([255; 4]);

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, WHITE)
    }
    fn two_pages() -> Document {
        Document::new(
            Some("/tmp/contract.pdf".into()),
            vec![blank(300, 400), blank(300, 400)],
            None,
        )
    }
    fn drag(document: &mut Document, page: usize, from: [f32; 2], to: [f32; 2]) -> Option<Rect> {
        document.handle_pointer(page, PointerEvent::Press(from));
        document.handle_pointer(page, PointerEvent::Move(to));
        document.handle_pointer(page, PointerEvent::Release(to))
    }

    #[test]
    fn name_from_path() {
        assert_eq!(two_pages().name, "contract.pdf");
        assert_eq!(Document::new(None, vec![], None).name, "Untitled Document");
    }
    #[test]
    fn page_indices_in_order() {
        let document = two_pages();
        let indices: Vec<_> = document.pages().iter().map(Page::index).collect();
        assert_eq!(indices, [0, 1]);
    }
    #[test]
    fn display_width_scales() {
        let page = Page::new(0, blank(400, 600), Some(200));
        assert_eq!(page.display_size(), [200, 300]);
        assert_eq!(page.scale(), 0.5);
        let unscaled = Page::new(0, blank(400, 600), None);
        assert_eq!(unscaled.display_size(), [400, 600]);
        assert_eq!(unscaled.scale(), 1.0);
    }
    #[test]
    fn toggle_on_clears_every_page() {
        let mut document = two_pages();
        document.toggle_selection();
        drag(&mut document, 0, [10.0, 10.0], [20.0, 20.0]);
        drag(&mut document, 1, [10.0, 10.0], [20.0, 20.0]);
        drag(&mut document, 1, [30.0, 30.0], [40.0, 40.0]);
        assert_eq!(document.regions().count(), 3);

        // Off keeps them.
        assert!(!document.toggle_selection());
        assert_eq!(document.regions().count(), 3);
        // Back on throws them away.
        assert!(document.toggle_selection());
        assert_eq!(document.regions().count(), 0);
        assert!(document.pages().iter().all(|page| page.regions().is_empty()));
    }
    #[test]
    fn toggle_off_discards_drag_in_progress() {
        let mut document = two_pages();
        document.toggle_selection();
        drag(&mut document, 0, [10.0, 10.0], [20.0, 20.0]);
        assert!(document.begin_drag(1, [5.0, 5.0]));
        document.update_drag(1, [50.0, 50.0]);
        assert!(document.page(1).unwrap().preview().is_some());

        document.toggle_selection();
        assert!(document.page(1).unwrap().preview().is_none());
        // Releasing after the toggle commits nothing.
        assert_eq!(document.end_drag(1, [50.0, 50.0]), None);
        assert_eq!(document.regions().count(), 1);
    }
    #[test]
    fn drags_are_ignored_while_disabled() {
        let mut document = two_pages();
        assert_eq!(drag(&mut document, 0, [10.0, 10.0], [20.0, 20.0]), None);
        assert_eq!(document.regions().count(), 0);
    }
    #[test]
    fn unknown_page_is_ignored() {
        let mut document = two_pages();
        document.toggle_selection();
        assert!(!document.begin_drag(7, [0.0, 0.0]));
        assert_eq!(drag(&mut document, 7, [0.0, 0.0], [1.0, 1.0]), None);
    }
    #[test]
    fn regions_in_page_then_insertion_order() {
        let mut document = two_pages();
        document.toggle_selection();
        drag(&mut document, 1, [1.0, 1.0], [2.0, 2.0]);
        drag(&mut document, 0, [3.0, 3.0], [4.0, 4.0]);
        drag(&mut document, 0, [5.0, 5.0], [6.0, 6.0]);
        let order: Vec<_> = document
            .regions()
            .map(|region| (region.page(), region.rect().min()[0]))
            .collect();
        assert_eq!(order, [(0, 3.0), (0, 5.0), (1, 1.0)]);
    }
    #[test]
    fn render_shows_pending_regions_and_preview() {
        let mut document = two_pages();
        document.toggle_selection();
        drag(&mut document, 0, [10.0, 10.0], [20.0, 20.0]);
        document.begin_drag(0, [100.0, 100.0]);
        document.update_drag(0, [120.0, 120.0]);

        let view = document.page(0).unwrap().render();
        assert_eq!(view.dimensions(), (300, 400));
        let mut expected = WHITE;
        image::Pixel::blend(&mut expected, &REGION_FILL);
        assert_eq!(*view.get_pixel(15, 15), expected);
        assert_eq!(*view.get_pixel(25, 25), WHITE);
        // Outline only, interior untouched.
        assert_eq!(*view.get_pixel(100, 110), super::PREVIEW_OUTLINE);
        assert_eq!(*view.get_pixel(110, 110), WHITE);
    }
    #[test]
    fn flatten_maps_display_to_raster() {
        let mut page = Page::new(0, blank(400, 400), Some(200));
        page.push_region(Rect::from_corners([10.0, 10.0], [20.0, 20.0]));
        let ink = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let placement = Placement {
            bounds: Rect::from_corners([10.0, 10.0], [20.0, 20.0]),
            image: ink.clone(),
            mark: MarkImage::from_image(ink),
        };
        assert!(page.regions_mut()[0].place(placement));

        let flat = page.flatten();
        assert_eq!(flat.dimensions(), (400, 400));
        // Display (10..20) is raster (20..40).
        assert_eq!(*flat.get_pixel(30, 30), Rgba([0, 0, 0, 255]));
        assert_eq!(*flat.get_pixel(45, 45), WHITE);
        assert_eq!(*flat.get_pixel(15, 15), WHITE);
    }
    #[test]
    fn flatten_resamples_from_the_captured_mark() {
        let mut page = Page::new(0, blank(400, 400), Some(200));
        page.push_region(Rect::from_corners([0.0, 0.0], [100.0, 50.0]));
        // Hard edge down the middle: ink on the left, nothing on the right.
        let ink = RgbaImage::from_fn(200, 100, |x, _| {
            if x < 100 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([0; 4])
            }
        });
        let placement = Placement {
            bounds: Rect::from_corners([0.0, 0.0], [100.0, 50.0]),
            // Stand-in for a blurry display-resolution copy.
            image: RgbaImage::from_pixel(100, 50, Rgba([128, 128, 128, 255])),
            mark: MarkImage::from_image(ink),
        };
        assert!(page.regions_mut()[0].place(placement));

        // Raster size matches the mark exactly, so the edge stays sharp.
        let flat = page.flatten();
        assert_eq!(*flat.get_pixel(99, 50), Rgba([0, 0, 0, 255]));
        assert_eq!(*flat.get_pixel(100, 50), WHITE);
    }
    #[test]
    fn regions_are_clipped_to_the_page() {
        let mut document = two_pages();
        document.toggle_selection();
        let committed = drag(&mut document, 0, [250.0, -30.0], [900.0, 50.0]).unwrap();
        assert_eq!(committed.bounds(), [250.0, 0.0, 300.0, 50.0]);
        assert_eq!(document.regions().next().unwrap().rect(), committed);

        let mut page = Page::new(0, blank(100, 100), None);
        let stored = page.push_region(Rect::from_corners([0.0, 0.0], [1e6, 10.0]));
        assert_eq!(stored.bounds(), [0.0, 0.0, 100.0, 10.0]);
    }
    #[test]
    fn flatten_ignores_pending_regions() {
        let mut page = Page::new(0, blank(50, 50), None);
        page.push_region(Rect::from_corners([0.0, 0.0], [50.0, 50.0]));
        assert_eq!(page.flatten(), blank(50, 50));
    }
}
