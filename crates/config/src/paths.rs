//! Path helpers for token file locations.
//!
//! Responsibilities:
//! - Determine the standard token file path.
//! - Use `directories` crate for platform-appropriate paths.
//!
//! Does NOT handle:
//! - File I/O operations (client storage backend).

use std::path::PathBuf;

use anyhow::Context;

/// Returns the default path to the persisted token file.
///
/// This path is the **documented** token location:
/// - Linux/macOS: `~/.config/garmin-connect/tokens.json`
/// - Windows: `%AppData%\garmin-connect\tokens.json`
pub fn default_token_path() -> Result<PathBuf, anyhow::Error> {
    let proj_dirs = directories::ProjectDirs::from("", "", "garmin-connect")
        .context("Failed to determine project directories")?;

    Ok(proj_dirs.config_dir().join("tokens.json"))
}
