//! Turning a path into a [`Document`]: checking the file is something we can show, and
//! rasterizing it into page images.

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use signet_core::Document;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("{0} does not exist or is not a file")]
    Missing(PathBuf),
    #[error("{0} is not a PDF or a supported image")]
    Unsupported(PathBuf),
    #[error("{0} has no pages")]
    Empty(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("rasterizer failed: {0}")]
    Rasterizer(String),
}

/// Interpret a drag-and-drop payload as a local path.
///
/// `file://` payloads are `text/uri-list`: one percent-encoded URI per line, of which only the first
/// is used. Anything else is already a path and is passed through untouched.
#[must_use]
pub fn path_from_drop_payload(payload: &str) -> PathBuf {
    if !payload.starts_with("file://") {
        return PathBuf::from(payload);
    }
    let first = payload.lines().next().unwrap_or_default();
    let encoded = first.strip_prefix("file://").unwrap_or(first);
    match urlencoding::decode(encoded) {
        Ok(decoded) => PathBuf::from(decoded.into_owned()),
        Err(e) => {
            log::warn!("drop payload {first:?} isn't valid UTF-8 once decoded: {e}");
            PathBuf::from(encoded)
        }
    }
}

/// A command line argument as a path. Arguments handed over as `file://` URIs are decoded,
/// everything else is used verbatim.
#[must_use]
pub fn path_from_arg(arg: std::ffi::OsString) -> PathBuf {
    match arg.to_str() {
        Some(text) if text.starts_with("file://") => path_from_drop_payload(text),
        _ => arg.into(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Raster(ImageFormat),
}
impl DocumentKind {
    /// Guess the kind from the file extension. `None` if it's neither a PDF nor an image format
    /// this build can both read and write.
    #[must_use]
    pub fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("pdf") {
            return Some(Self::Pdf);
        }
        let format = ImageFormat::from_extension(extension)?;
        (format.reading_enabled() && format.writing_enabled()).then_some(Self::Raster(format))
    }
}

/// Produces one raster per page, in page order.
pub trait Rasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<RgbaImage>, LoadError>;
}

/// Rasterizes PDFs by running poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    pub program: PathBuf,
    pub dpi: u32,
}
impl PdftoppmRasterizer {
    #[must_use]
    pub fn new(dpi: u32) -> Self {
        Self {
            program: "pdftoppm".into(),
            dpi,
        }
    }
}
impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<RgbaImage>, LoadError> {
        let scratch = tempfile::tempdir()?;
        let output = std::process::Command::new(&self.program)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(path)
            .arg(scratch.path().join("page"))
            .output()
            .map_err(|e| LoadError::Rasterizer(format!("running {}: {e}", self.program.display())))?;
        if !output.status.success() {
            return Err(LoadError::Rasterizer(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // Files are named page-N.png, zero-padded to the width of the page count.
        let mut numbered = Vec::new();
        for entry in std::fs::read_dir(scratch.path())? {
            let path = entry?.path();
            let number = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.rsplit_once('-'))
                .and_then(|(_, number)| number.parse::<u32>().ok());
            match number {
                Some(number) => numbered.push((number, path)),
                None => log::debug!("ignoring stray rasterizer output {}", path.display()),
            }
        }
        numbered.sort_unstable_by_key(|(number, _)| *number);

        let mut pages = Vec::with_capacity(numbered.len());
        for (_, path) in numbered {
            pages.push(image::open(path)?.to_rgba8());
        }
        log::debug!("rasterized {} page(s) at {} DPI", pages.len(), self.dpi);
        Ok(pages)
    }
}

/// Image files are a single page as-is.
pub struct ImageRasterizer;
impl Rasterizer for ImageRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<RgbaImage>, LoadError> {
        Ok(vec![image::open(path)?.to_rgba8()])
    }
}

/// Check, rasterize, and wrap the file at `path`. Nothing is created on failure.
pub fn load_document(
    path: &Path,
    dpi: u32,
    display_width: Option<u32>,
) -> Result<Document, LoadError> {
    if !path.is_file() {
        return Err(LoadError::Missing(path.to_owned()));
    }
    let kind = DocumentKind::detect(path).ok_or_else(|| LoadError::Unsupported(path.to_owned()))?;
    let pages = match kind {
        DocumentKind::Pdf => PdftoppmRasterizer::new(dpi).rasterize(path)?,
        DocumentKind::Raster(_) => ImageRasterizer.rasterize(path)?,
    };
    if pages.is_empty() {
        return Err(LoadError::Empty(path.to_owned()));
    }
    Ok(Document::new(Some(path.to_owned()), pages, display_width))
}
