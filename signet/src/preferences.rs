//! User preferences: the settings file and the saved layout, both kept as TOML in the
//! platform preferences directory.

use signet_core::{
    capture::CaptureSettings,
    layout::{LayoutError, LayoutStore, PersistedLayout, LAYOUT_KEY},
};

const SETTINGS_DOCUMENTATION: &str = r#"# Signet settings. You may edit this file, but be aware that formatting and comments will not
# be preserved. Missing keys fall back to their defaults.

# raster_dpi: resolution PDF pages are rasterized at.
# display_width: if set, pages are shown scaled to this many pixels wide. Saved layouts are only
#                reused on pages of the same displayed size.
# pen_width, pen_color ([r, g, b, a]), movement_threshold, capture_size: the signature pad.

"#;

const LAYOUT_DOCUMENTATION: &str = r#"# Signet saved sign points. Rewritten every time a signature is placed.
# Coordinates are in displayed page pixels. page_sizes records the size of each page they were drawn on.

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

/// Create the preferences directory if it's missing.
fn ensure_dir(dir: &std::path::Path) {
    // Explicity do *not* create recursively. If not found, the user probably has a good reason.
    // Ignore errors (could already exist). Any real errors will be emitted by file access after.
    let _ = std::fs::DirBuilder::new().create(dir);
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub raster_dpi: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_width: Option<u32>,
    pub pen_width: f32,
    pub pen_color: [u8; 4],
    pub movement_threshold: f32,
    pub capture_size: [u32; 2],
    #[serde(skip)]
    failed_to_load: bool,
}
impl Default for Settings {
    fn default() -> Self {
        let capture = CaptureSettings::default();
        Self {
            raster_dpi: 200,
            display_width: None,
            pen_width: capture.pen_width,
            pen_color: capture.pen_color.0,
            movement_threshold: capture.movement_threshold,
            capture_size: capture.canvas_size,
            failed_to_load: false,
        }
    }
}
impl Settings {
    const FILENAME: &'static str = "settings.toml";
    /// Shared global settings, loaded from user preferences.
    /// (Or defaulted, if unavailable for some reason)
    #[must_use]
    pub fn get() -> &'static Self {
        static GLOBAL_SETTINGS: std::sync::OnceLock<Settings> = std::sync::OnceLock::new();

        GLOBAL_SETTINGS.get_or_init(|| match preferences_dir() {
            None => Self::no_path(),
            Some(mut dir) => {
                dir.push(Self::FILENAME);
                Self::load_or_default(&dir)
            }
        })
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Settings weren't available, defaulting.");
        Self {
            failed_to_load: true,
            ..Self::default()
        }
    }
    #[must_use]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Settings> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let settings: Settings = toml::from_str(&string)?;
            Ok(settings)
        };
        match settings {
            Ok(settings) => settings,
            Err(e) => {
                log::debug!("reading {}: {e:#}", path.display());
                Self::no_path()
            }
        }
    }
    /// Return true if loading user's settings failed. Saving will then write out the defaults.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    /// Settings for the signature pad. Ink is always fully opaque, whatever alpha the file asks for.
    #[must_use]
    pub fn capture_settings(&self) -> CaptureSettings {
        let [r, g, b, _] = self.pen_color;
        CaptureSettings {
            canvas_size: self.capture_size,
            pen_width: self.pen_width,
            pen_color: image::Rgba([r, g, b, 255]),
            movement_threshold: self.movement_threshold,
        }
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        ensure_dir(&preferences);
        preferences.push(Self::FILENAME);
        self.save_to(&preferences)
    }
    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let string = SETTINGS_DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(self)?;
        std::fs::write(path, string)?;
        Ok(())
    }
}

/// Keeps the layout in a TOML file.
pub struct FileLayoutStore {
    path: std::path::PathBuf,
}
impl FileLayoutStore {
    #[must_use]
    pub fn new(path: std::path::PathBuf) -> Self {
        Self { path }
    }
    /// The store in the user's preferences directory, under the fixed layout key.
    #[must_use]
    pub fn in_preferences() -> Option<Self> {
        let mut path = preferences_dir()?;
        path.push(format!("{LAYOUT_KEY}.toml"));
        Some(Self::new(path))
    }
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}
impl LayoutStore for FileLayoutStore {
    fn read(&self) -> Result<Option<PersistedLayout>, LayoutError> {
        let string = match std::fs::read_to_string(&self.path) {
            Ok(string) => string,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let layout = toml::from_str(&string).map_err(|e| LayoutError::Format(Box::new(e)))?;
        Ok(Some(layout))
    }
    fn write(&self, layout: &PersistedLayout) -> Result<(), LayoutError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent);
        }
        let string = toml::ser::to_string_pretty(layout)
            .map_err(|e| LayoutError::Format(Box::new(e)))?;
        std::fs::write(&self.path, LAYOUT_DOCUMENTATION.to_owned() + &string)?;
        Ok(())
    }
}
