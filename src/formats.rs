//! Turning format rows into list labels, and the per-site choice list.

use crate::model::{Choice, FormatEntry, MediaInfo};

pub const BEST_VIDEO_LABEL: &str = "Best Quality Video (MP4 - Merged)";
pub const BEST_AUDIO_LABEL: &str = "Best Quality Audio (auto-convert)";

/// Site whose formats are listed one by one
const PER_FORMAT_SITE: &str = "youtube";

/// "12.34 MB" from the exact size, else the estimate, else zero.
pub fn size_label(entry: &FormatEntry) -> String {
    let bytes = entry.filesize.or(entry.filesize_approx).unwrap_or(0.0);
    format!("{:.2} MB", bytes / (1024.0 * 1024.0))
}

pub fn label(entry: &FormatEntry) -> String {
    let video = if entry.has_video { "video" } else { "none" };
    let audio = if entry.has_audio { "audio" } else { "none" };
    format!(
        "{:<10} | {:<8} | {:<15} | {:<10} | {:<15} | v:{} a:{}",
        entry.id,
        entry.ext,
        entry.resolution,
        entry.note,
        size_label(entry),
        video,
        audio
    )
}

/// Labels for every entry, in the extractor's order.
pub fn to_display_strings(entries: &[FormatEntry]) -> Vec<(String, FormatEntry)> {
    entries.iter().map(|e| (label(e), e.clone())).collect()
}

pub fn lists_every_format(site_id: &str) -> bool {
    site_id.eq_ignore_ascii_case(PER_FORMAT_SITE)
}

/// Rows shown in the format list after a fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceList {
    rows: Vec<(String, Choice)>,
}

impl ChoiceList {
    pub fn for_media(info: &MediaInfo) -> Self {
        let rows = if lists_every_format(&info.site_id) {
            to_display_strings(&info.formats)
                .into_iter()
                .map(|(label, entry)| (label, Choice::Format(entry)))
                .collect()
        } else {
            vec![
                (BEST_VIDEO_LABEL.to_owned(), Choice::BestMergedVideo),
                (BEST_AUDIO_LABEL.to_owned(), Choice::BestAudio),
            ]
        };
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(label, _)| label.as_str())
    }

    pub fn lookup(&self, label: &str) -> Option<&Choice> {
        self.rows.iter().find(|(l, _)| l == label).map(|(_, choice)| choice)
    }
}
