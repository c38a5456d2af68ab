//! Finding the ffmpeg binary used for merging and audio conversion.

use crate::settings::Settings;
use std::path::{Path, PathBuf};

/// Recommended Windows build, offered when ffmpeg is missing
pub const WINDOWS_DOWNLOAD_URL: &str = "https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip";

pub fn executable_name() -> &'static str {
    if cfg!(target_os = "windows") { "ffmpeg.exe" } else { "ffmpeg" }
}

/// Outcome of a transcoder lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// The path remembered in the settings still exists
    Saved(PathBuf),
    /// Found on PATH; the caller should remember it
    Found(PathBuf),
    Missing,
}

impl Located {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Located::Saved(p) | Located::Found(p) => Some(p),
            Located::Missing => None,
        }
    }
}

/// Saved path first, then a PATH search.
pub fn locate_with(settings: &Settings, search: impl FnOnce(&str) -> Option<PathBuf>) -> Located {
    if let Some(saved) = settings.ffmpeg_path.as_deref() {
        if saved.exists() {
            tracing::info!("using saved ffmpeg at {}", saved.display());
            return Located::Saved(saved.to_path_buf());
        }
        tracing::warn!("saved ffmpeg path {} no longer exists", saved.display());
    }
    match search(executable_name()) {
        Some(found) => {
            tracing::info!("found ffmpeg on PATH at {}", found.display());
            Located::Found(found)
        }
        None => {
            tracing::warn!("ffmpeg not found on PATH");
            Located::Missing
        }
    }
}

/// Looks the transcoder up on the real PATH and remembers a hit in `settings`.
pub fn resolve(settings: &mut Settings) -> Located {
    resolve_with(settings, |name| which::which(name).ok())
}

pub fn resolve_with(settings: &mut Settings, search: impl FnOnce(&str) -> Option<PathBuf>) -> Located {
    let located = locate_with(settings, search);
    if let Located::Found(path) = &located {
        settings.ffmpeg_path = Some(path.clone());
    }
    located
}

pub const READY_STATUS: &str = "Enter a URL and click 'Fetch Formats'";
pub const MISSING_STATUS: &str = "FFmpeg not found. Merging videos may fail. Configure in Settings.";

/// Status line for the current transcoder
pub fn status_line(ffmpeg: Option<&Path>) -> &'static str {
    if ffmpeg.is_some() { READY_STATUS } else { MISSING_STATUS }
}

/// What to tell the user when no transcoder is available
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remediation {
    /// Ask whether to open a download page
    OfferDownload { message: String, url: &'static str },
    /// Point at the system package manager
    ManualInstall { message: String },
}

pub const REMEDIATION_TITLE: &str = "FFmpeg Not Found";

impl Remediation {
    pub fn for_platform() -> Self {
        if cfg!(target_os = "windows") {
            Remediation::OfferDownload {
                message: "FFmpeg is required for audio conversion and merging video/audio.\n\n\
                          Would you like to open a recommended download page now?\n\n\
                          (After downloading, extract 'ffmpeg.exe' and select it under Settings > Configure.)"
                    .to_owned(),
                url: WINDOWS_DOWNLOAD_URL,
            }
        } else {
            Remediation::ManualInstall {
                message: "FFmpeg is required but could not be found in your PATH.\n\n\
                          Please install it using your system's package manager.\n\
                          Example for Debian/Ubuntu:\nsudo apt install ffmpeg"
                    .to_owned(),
            }
        }
    }
}
