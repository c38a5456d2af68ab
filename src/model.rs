use std::path::PathBuf;

/// One row of the extractor's format listing
#[derive(Debug, Clone, PartialEq)]
pub struct FormatEntry {
    /// Extractor format id (e.g. "137", "251", "hls-720p")
    pub id: String,
    /// Container extension
    pub ext: String,
    /// Resolution, or "audio only"
    pub resolution: String,
    pub note: String,
    /// Exact size in bytes, when the site reports it
    pub filesize: Option<f64>,
    /// Estimated size in bytes
    pub filesize_approx: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Result of one metadata fetch
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    /// Extractor key, e.g. "Youtube", "Facebook"
    pub site_id: String,
    pub thumbnail: Option<String>,
    pub formats: Vec<FormatEntry>,
}

/// What the user picked in the format list
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    Format(FormatEntry),
    /// Best video merged with best audio
    BestMergedVideo,
    /// Best audio, converted per settings
    BestAudio,
}

/// A single download, alive for one worker run
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    pub url: String,
    pub destination: PathBuf,
    pub choice: Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Downloading,
    Finished,
    Error,
}

/// One progress record reported by the extractor
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    pub phase: Phase,
    pub bytes_done: Option<u64>,
    /// Exact total, or the extractor's estimate
    pub bytes_total: Option<u64>,
    pub speed: String,
}

/// Where the download controls currently are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Fetching,
    FormatsReady,
    Downloading,
}
