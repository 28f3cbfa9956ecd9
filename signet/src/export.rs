//! Writing flattened pages back out next to the source, as `<stem>_signed<ext>`.
//!
//! PDFs come back as image-only PDFs built with `lopdf`, one full-page picture per page. Image
//! sources are written in their own format.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use image::{DynamicImage, ImageFormat, RgbaImage};
use lopdf::{
    content::{Content, Operation},
    Dictionary, Document, Object, ObjectId, Stream,
};

use crate::loader::DocumentKind;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("nothing to export")]
    NoPages,
    #[error("{format:?} holds one page, got {pages}")]
    TooManyPages { format: ImageFormat, pages: usize },
    #[error("don't know how to write {0}")]
    Unsupported(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
}

/// `dir/name.pdf` becomes `dir/name_signed.pdf`.
#[must_use]
pub fn signed_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map_or_else(|| "document".into(), |stem| stem.to_string_lossy());
    let name = match source.extension() {
        Some(extension) => format!("{stem}_signed.{}", extension.to_string_lossy()),
        None => format!("{stem}_signed"),
    };
    source.with_file_name(name)
}

pub trait Exporter {
    fn export(&self, pages: &[RgbaImage], out: &Path) -> Result<(), ExportError>;
}

/// Writes the single page of an image document.
pub struct ImageExporter {
    pub format: ImageFormat,
}
impl Exporter for ImageExporter {
    fn export(&self, pages: &[RgbaImage], out: &Path) -> Result<(), ExportError> {
        let page = match pages {
            [] => return Err(ExportError::NoPages),
            [page] => page,
            _ => {
                return Err(ExportError::TooManyPages {
                    format: self.format,
                    pages: pages.len(),
                })
            }
        };
        match self.format {
            // No alpha channel.
            ImageFormat::Jpeg => DynamicImage::ImageRgba8(page.clone())
                .to_rgb8()
                .save_with_format(out, self.format)?,
            format => page.save_with_format(out, format)?,
        }
        Ok(())
    }
}

/// Writes an image-only PDF. Each page is sized so that its raster covers it at `dpi`.
pub struct PdfExporter {
    pub dpi: u32,
}
impl PdfExporter {
    /// One PDF page per raster, showing nothing but that raster.
    pub fn build(&self, pages: &[RgbaImage]) -> Result<Document, ExportError> {
        if pages.is_empty() {
            return Err(ExportError::NoPages);
        }
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let page_id = add_page(&mut document, pages_id, page, self.dpi)?;
            kids.push(Object::Reference(page_id));
        }
        let mut tree = Dictionary::new();
        tree.set("Type", Object::Name(b"Pages".to_vec()));
        tree.set("Count", Object::Integer(kids.len() as i64));
        tree.set("Kids", Object::Array(kids));
        document.objects.insert(pages_id, Object::Dictionary(tree));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = document.add_object(Object::Dictionary(catalog));
        document.trailer.set("Root", Object::Reference(catalog_id));
        Ok(document)
    }
}
impl Exporter for PdfExporter {
    fn export(&self, pages: &[RgbaImage], out: &Path) -> Result<(), ExportError> {
        let mut document = self.build(pages)?;
        document.save(out)?;
        Ok(())
    }
}

/// Add the image, its content stream and the page showing it. Returns the page.
fn add_page(
    document: &mut Document,
    pages_id: ObjectId,
    page: &RgbaImage,
    dpi: u32,
) -> Result<ObjectId, ExportError> {
    let (width, height) = page.dimensions();
    let points = |pixels: u32| pixels as f32 * 72.0 / dpi.max(1) as f32;
    let (page_width, page_height) = (points(width), points(height));

    let mut image = Dictionary::new();
    image.set("Type", Object::Name(b"XObject".to_vec()));
    image.set("Subtype", Object::Name(b"Image".to_vec()));
    image.set("Width", Object::Integer(i64::from(width)));
    image.set("Height", Object::Integer(i64::from(height)));
    image.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    image.set("BitsPerComponent", Object::Integer(8));
    image.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    let image_id = document.add_object(Stream::new(image, deflate(&rgb_on_white(page))?));

    // Stretch the unit square the image occupies over the whole page.
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(page_width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page_height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = document.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let mut xobjects = Dictionary::new();
    xobjects.set(IMAGE_NAME.to_vec(), Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut leaf = Dictionary::new();
    leaf.set("Type", Object::Name(b"Page".to_vec()));
    leaf.set("Parent", Object::Reference(pages_id));
    leaf.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page_width),
            Object::Real(page_height),
        ]),
    );
    leaf.set("Resources", Object::Dictionary(resources));
    leaf.set("Contents", Object::Reference(content_id));
    Ok(document.add_object(Object::Dictionary(leaf)))
}

const IMAGE_NAME: &[u8] = b"Im0";

/// Drop alpha by compositing over white, as a viewer would show the page.
fn rgb_on_white(page: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(page.as_raw().len() / 4 * 3);
    for pixel in page.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            let over = (u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(over as u8);
        }
    }
    rgb
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Write `pages` next to `source` in the source's own format. Returns where they went.
pub fn export_document(
    source: &Path,
    pages: &[RgbaImage],
    dpi: u32,
) -> Result<PathBuf, ExportError> {
    let out = signed_path(source);
    match DocumentKind::detect(source) {
        Some(DocumentKind::Pdf) => PdfExporter { dpi }.export(pages, &out)?,
        Some(DocumentKind::Raster(format)) => ImageExporter { format }.export(pages, &out)?,
        None => return Err(ExportError::Unsupported(source.to_owned())),
    }
    log::info!("wrote {} page(s) to {}", pages.len(), out.display());
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::{export_document, signed_path, ExportError, Exporter, PdfExporter};
    use image::{Rgba, RgbaImage};
    use std::{io::Read, path::PathBuf};

    /// Write with `exporter` and read the result back.
    fn reparse(exporter: &PdfExporter, pages: &[RgbaImage]) -> lopdf::Document {
        let mut bytes = Vec::new();
        exporter.build(pages).unwrap().save_to(&mut bytes).unwrap();
        lopdf::Document::load_mem(&bytes).unwrap()
    }

    #[test]
    fn signed_names() {
        assert_eq!(
            signed_path("/docs/lease.pdf".as_ref()),
            PathBuf::from("/docs/lease_signed.pdf")
        );
        assert_eq!(
            signed_path("scan.tar.png".as_ref()),
            PathBuf::from("scan.tar_signed.png")
        );
        assert_eq!(signed_path("README".as_ref()), PathBuf::from("README_signed"));
    }
    #[test]
    fn pdf_pages_in_order_and_sized_by_dpi() {
        let pages = vec![
            RgbaImage::from_pixel(400, 200, Rgba([255; 4])),
            RgbaImage::from_pixel(10, 30, Rgba([255, 0, 0, 255])),
        ];
        let document = reparse(&PdfExporter { dpi: 200 }, &pages);
        let page_ids: Vec<_> = document.get_pages().into_values().collect();
        assert_eq!(page_ids.len(), 2);

        let media_box = |index: usize| -> Vec<f32> {
            let page = document.get_dictionary(page_ids[index]).unwrap();
            page.get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_float().unwrap())
                .collect()
        };
        let close = |a: Vec<f32>, b: [f32; 4]| a.iter().zip(b).all(|(a, b)| (a - b).abs() < 1e-3);
        // 400px at 200 DPI is two inches.
        assert!(close(media_box(0), [0.0, 0.0, 144.0, 72.0]), "{:?}", media_box(0));
        assert!(close(media_box(1), [0.0, 0.0, 3.6, 10.8]), "{:?}", media_box(1));
    }
    #[test]
    fn pdf_image_is_flattened_rgb() {
        let mut page = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 255]));
        page.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        let document = reparse(&PdfExporter { dpi: 72 }, &[page]);

        let page_id = *document.get_pages().values().next().unwrap();
        let image_id = document
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Im0")
            .unwrap()
            .as_reference()
            .unwrap();
        let image = document.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 2);
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 1);

        let mut decoded = Vec::new();
        flate2::read::ZlibDecoder::new(image.content.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        // Transparent shows as white.
        assert_eq!(decoded, [255, 0, 0, 255, 255, 255]);
    }
    #[test]
    fn export_next_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.png");
        let original = RgbaImage::from_pixel(8, 8, Rgba([255; 4]));
        original.save(&source).unwrap();

        let signed = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let out = export_document(&source, &[signed.clone()], 200).unwrap();
        assert_eq!(out, dir.path().join("scan_signed.png"));
        assert_eq!(image::open(&out).unwrap().to_rgba8(), signed);
        // Source untouched.
        assert_eq!(image::open(&source).unwrap().to_rgba8(), original);
    }
    #[test]
    fn export_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lease.pdf");
        let out = export_document(&source, &[RgbaImage::new(4, 4)], 200).unwrap();
        let bytes = std::fs::read(out).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
    }
    #[test]
    fn bad_page_counts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.pdf");
        assert!(matches!(
            PdfExporter { dpi: 200 }.export(&[], &out),
            Err(ExportError::NoPages)
        ));
        let two = [RgbaImage::new(1, 1), RgbaImage::new(1, 1)];
        assert!(matches!(
            export_document(&dir.path().join("scan.png"), &two, 200),
            Err(ExportError::TooManyPages { pages: 2, .. })
        ));
        assert!(matches!(
            export_document(&dir.path().join("notes.txt"), &two, 200),
            Err(ExportError::Unsupported(_))
        ));
    }
}
