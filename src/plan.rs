//! Deciding what to ask the extractor for, given the user's choice and settings.

use crate::{
    model::Choice,
    settings::{AudioFormat, Settings},
};

/// Container used whenever two streams get merged
pub const MERGE_CONTAINER: &str = "mp4";

/// Post-download conversion to a target audio codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtraction {
    pub codec: &'static str,
    /// Bitrate without the unit letter
    pub quality: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub selector: String,
    pub merge_container: Option<&'static str>,
    pub extract_audio: Option<AudioExtraction>,
    /// Status line shown while the download starts
    pub status: String,
}

fn audio_extraction(settings: &Settings) -> Option<AudioExtraction> {
    match settings.audio_format {
        AudioFormat::KeepOriginal => None,
        format => format.codec().map(|codec| AudioExtraction {
            codec,
            quality: settings.mp3_bitrate.quality(),
        }),
    }
}

pub fn plan_for(choice: &Choice, settings: &Settings) -> DownloadPlan {
    match choice {
        Choice::BestMergedVideo => DownloadPlan {
            selector: "bestvideo+bestaudio/best".to_owned(),
            merge_container: Some(MERGE_CONTAINER),
            extract_audio: None,
            status: "Downloading best video and audio...".to_owned(),
        },
        Choice::BestAudio => DownloadPlan {
            selector: "bestaudio/best".to_owned(),
            merge_container: None,
            extract_audio: audio_extraction(settings),
            status: "Downloading best audio...".to_owned(),
        },
        Choice::Format(f) if f.has_video && !f.has_audio => DownloadPlan {
            selector: format!("{}+bestaudio", f.id),
            merge_container: Some(MERGE_CONTAINER),
            extract_audio: None,
            status: format!("Downloading video format {} and merging with best audio...", f.id),
        },
        Choice::Format(f) if f.has_audio && !f.has_video => DownloadPlan {
            selector: f.id.clone(),
            merge_container: None,
            extract_audio: audio_extraction(settings),
            status: format!("Downloading audio format {}...", f.id),
        },
        // Both tracks present (or the extractor did not say): take it as is.
        Choice::Format(f) => DownloadPlan {
            selector: f.id.clone(),
            merge_container: None,
            extract_audio: None,
            status: format!("Downloading pre-merged format {}...", f.id),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::FormatEntry, settings::Bitrate};

    fn format(id: &str, has_video: bool, has_audio: bool) -> Choice {
        Choice::Format(FormatEntry {
            id: id.to_owned(),
            ext: "webm".to_owned(),
            resolution: "audio only".to_owned(),
            note: String::new(),
            filesize: None,
            filesize_approx: None,
            has_video,
            has_audio,
        })
    }

    #[test]
    fn combined_format_is_taken_verbatim() {
        let plan = plan_for(&format("18", true, true), &Settings::default());
        assert_eq!(plan.selector, "18");
        assert_eq!(plan.merge_container, None);
        assert_eq!(plan.extract_audio, None);
    }

    #[test]
    fn video_only_gets_best_audio_merged() {
        let plan = plan_for(&format("137", true, false), &Settings::default());
        assert_eq!(plan.selector, "137+bestaudio");
        assert_eq!(plan.merge_container, Some("mp4"));
    }

    #[test]
    fn audio_only_is_converted_per_settings() {
        let settings = Settings { mp3_bitrate: Bitrate::K192, ..Settings::default() };
        let plan = plan_for(&format("251", false, true), &settings);
        assert_eq!(plan.selector, "251");
        assert_eq!(plan.merge_container, None);
        assert_eq!(plan.extract_audio, Some(AudioExtraction { codec: "mp3", quality: "192" }));

        let flac = Settings { audio_format: AudioFormat::Flac, mp3_bitrate: Bitrate::K320, ..Settings::default() };
        let plan = plan_for(&format("251", false, true), &flac);
        assert_eq!(plan.extract_audio, Some(AudioExtraction { codec: "flac", quality: "320" }));
    }

    #[test]
    fn keep_original_skips_conversion() {
        let settings = Settings { audio_format: AudioFormat::KeepOriginal, ..Settings::default() };
        assert_eq!(plan_for(&format("251", false, true), &settings).extract_audio, None);
        assert_eq!(plan_for(&Choice::BestAudio, &settings).extract_audio, None);
    }

    #[test]
    fn synthetic_choices() {
        let video = plan_for(&Choice::BestMergedVideo, &Settings::default());
        assert_eq!(video.selector, "bestvideo+bestaudio/best");
        assert_eq!(video.merge_container, Some("mp4"));

        let audio = plan_for(&Choice::BestAudio, &Settings::default());
        assert_eq!(audio.selector, "bestaudio/best");
        assert_eq!(audio.extract_audio, Some(AudioExtraction { codec: "mp3", quality: "192" }));
    }
}
