//! Persistent user settings stored as a small JSON document.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

/// Default settings file, relative to the working directory
pub const CONFIG_FILE: &str = "config.json";

/// Target format for audio-only downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioFormat {
    #[default]
    #[serde(rename = "mp3")]
    Mp3,
    #[serde(rename = "flac")]
    Flac,
    #[serde(rename = "Keep Original")]
    KeepOriginal,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Mp3, AudioFormat::Flac, AudioFormat::KeepOriginal];

    /// Codec name handed to the audio extractor, `None` when no conversion is wanted
    pub fn codec(self) -> Option<&'static str> {
        match self {
            AudioFormat::Mp3 => Some("mp3"),
            AudioFormat::Flac => Some("flac"),
            AudioFormat::KeepOriginal => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::KeepOriginal => "Keep Original",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bitrate {
    #[serde(rename = "128k")]
    K128,
    #[default]
    #[serde(rename = "192k")]
    K192,
    #[serde(rename = "256k")]
    K256,
    #[serde(rename = "320k")]
    K320,
}

impl Bitrate {
    pub const ALL: [Bitrate; 4] = [Bitrate::K128, Bitrate::K192, Bitrate::K256, Bitrate::K320];

    pub fn label(self) -> &'static str {
        match self {
            Bitrate::K128 => "128k",
            Bitrate::K192 => "192k",
            Bitrate::K256 => "256k",
            Bitrate::K320 => "320k",
        }
    }

    /// Bitrate without the unit letter, as the audio extractor expects it ("192k" -> "192")
    pub fn quality(self) -> &'static str {
        self.label().trim_end_matches('k')
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// User settings. Missing keys take their default value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio_format: AudioFormat,
    pub mp3_bitrate: Bitrate,
    /// Absolute path to ffmpeg; written as an empty string when unset
    #[serde(with = "empty_path")]
    pub ffmpeg_path: Option<PathBuf>,
}

impl Settings {
    /// Reads the settings file, falling back to defaults when it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("no settings at {}: {e}; using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("ignoring malformed settings file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Overwrites the settings file with pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        fs::write(path, buf).map_err(|source| AppError::SettingsWrite {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("settings saved to {}", path.display());
        Ok(())
    }
}

mod empty_path {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S: Serializer>(path: &Option<PathBuf>, s: S) -> Result<S::Ok, S::Error> {
        match path {
            Some(p) => s.serialize_str(&p.to_string_lossy()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PathBuf>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.filter(|s| !s.trim().is_empty()).map(PathBuf::from))
    }
}
