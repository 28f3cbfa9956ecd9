mod export;
mod loader;
mod preferences;

use anyhow::Result as AnyResult;
use signet_core::{MarkImage, Session};

const USAGE: &str = "usage: signet <document> <mark image>

Stamps <mark image> into the sign points saved by the last signing session and writes
<document stem>_signed next to <document>. There is no drawing surface here: sign points are
only ever created by a session that drew them, so a fresh install has nothing to stamp.";

/// Re-sign a document into the places it was signed last time, with a previously saved mark.
fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    // Paths are OSStrings, let the system handle character encoding restrictions.
    let mut args = std::env::args_os().skip(1).map(loader::path_from_arg);
    let (Some(document_path), Some(mark_path)) = (args.next(), args.next()) else {
        log::error!("{USAGE}");
        anyhow::bail!(USAGE);
    };

    let settings = preferences::Settings::get();
    if settings.did_fail_to_load() {
        if let Err(e) = settings.save() {
            log::warn!("Failed to save settings:\n{e:?}");
        }
    }
    let store = preferences::FileLayoutStore::in_preferences()
        .ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
    log::debug!("layout file: {}", store.path().display());

    let document =
        match loader::load_document(&document_path, settings.raster_dpi, settings.display_width) {
            Ok(document) => document,
            Err(e) => {
                log::error!("failed to open file {document_path:?}: {e:#}");
                return Err(e.into());
            }
        };
    let mark = match image::open(&mark_path) {
        Ok(mark) => MarkImage::from_image(mark.to_rgba8()),
        Err(e) => {
            log::error!("failed to open mark {mark_path:?}: {e:#}");
            return Err(e.into());
        }
    };

    let mut session = Session::new(store, settings.capture_settings());
    if session.open(document) == 0 {
        log::warn!("No saved sign points apply to {document_path:?}, nothing to do.\n\n{USAGE}");
        return Ok(());
    }
    let placed = session.apply_mark(mark)?;
    if placed == 0 {
        log::warn!("Mark {mark_path:?} is empty, nothing placed.");
        return Ok(());
    }

    let out = export::export_document(
        &document_path,
        &session.flattened_pages()?,
        settings.raster_dpi,
    )
    .map_err(|e| {
        log::error!("failed to export {document_path:?}: {e:#}");
        e
    })?;
    println!("{}", out.display());
    Ok(())
}
