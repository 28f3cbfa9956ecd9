//! # Compositing
//!
//! Stamps a [`MarkImage`] into every pending region of a document. The mark is scaled to the
//! region's width with its aspect ratio kept, left-aligned, and centered on the region's vertical
//! midline. A tall mark in a short region therefore overhangs above and below it.

use image::imageops;

use crate::{
    capture::MarkImage,
    document::{Document, Placement},
    util::Rect,
};

/// Compute where and how large `mark` lands in `rect` on a page of `page_size`, without touching any
/// document. `None` if either the mark or the region has nothing to place.
///
/// `rect` is clipped to the page first. A mark so tall that it would outgrow the page is instead
/// fitted to the page height, still left-aligned and centered on the region.
#[must_use]
pub fn place(mark: &MarkImage, rect: Rect, page_size: [u32; 2]) -> Option<Placement> {
    let page = Rect::from_corners([0.0, 0.0], [page_size[0] as f32, page_size[1] as f32]);
    let rect = rect.clamped(page);
    if mark.is_empty() || rect.is_empty() {
        return None;
    }
    let aspect = mark.height() as f32 / mark.width() as f32;
    let mut width = rect.width();
    let mut height = width * aspect;
    if height > page.height() {
        log::warn!(
            "{}x{} mark is too tall for a {:.0} wide region, fitting it to the page height",
            mark.width(),
            mark.height(),
            rect.width()
        );
        height = page.height();
        width = height / aspect;
    }

    let x = rect.min()[0];
    let y = rect.min()[1] + rect.height() / 2.0 - height / 2.0;
    let bounds = Rect::from_corners([x, y], [x + width, y + height]);

    let pixel_width = (width.round() as u32).max(1);
    let pixel_height = (height.round() as u32).max(1);
    let image = imageops::resize(
        mark.image(),
        pixel_width,
        pixel_height,
        imageops::FilterType::CatmullRom,
    );
    Some(Placement {
        bounds,
        image,
        mark: mark.clone(),
    })
}

/// Stamp `mark` into every pending region of every page. Regions that already carry a mark are
/// left alone, so applying twice never double-stamps. Returns how many regions were stamped.
pub fn apply(document: &mut Document, mark: &MarkImage) -> usize {
    if mark.is_empty() {
        log::info!("mark is empty, nothing to place");
        return 0;
    }
    let mut placed = 0;
    for page in document.pages_mut() {
        let page_size = page.display_size();
        for region in page.regions_mut().iter_mut().filter(|r| r.is_pending()) {
            let Some(placement) = place(mark, region.rect(), page_size) else {
                log::debug!(
                    "page {}: skipping empty region {:?}",
                    region.page(),
                    region.rect().bounds()
                );
                continue;
            };
            if region.place(placement) {
                placed += 1;
            }
        }
    }
    log::debug!("placed mark into {placed} region(s)");
    placed
}
