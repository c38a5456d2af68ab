//! The yt-dlp client: format listing and downloads through the external binary.

use crate::{
    error::{AppError, Result},
    logsink::LogSink,
    model::{DownloadTask, FormatEntry, MediaInfo, ProgressSample},
    plan::{DownloadPlan, plan_for},
    settings::Settings,
    progress::{parse_progress_from_line, progress_template},
};
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    process::Command,
    sync::mpsc::Sender,
};

/// Prefix for the final-path line printed after post-processing
const SAVED_PREFIX: &str = "saved:";

pub fn executable_name() -> &'static str {
    if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" }
}

/// Everything a download needs, captured when the user clicks Download
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub task: DownloadTask,
    pub plan: DownloadPlan,
    pub ffmpeg: PathBuf,
}

impl DownloadRequest {
    /// Plans the download from the task's choice and the settings in effect now.
    pub fn new(task: DownloadTask, settings: &Settings, ffmpeg: PathBuf) -> Self {
        let plan = plan_for(&task.choice, settings);
        Self { task, plan, ffmpeg }
    }
}

#[async_trait]
pub trait MediaClient: Send + Sync + 'static {
    /// Lists title, site and formats without downloading anything.
    async fn fetch_formats(&self, url: &str) -> Result<MediaInfo>;

    /// Downloads per `request`, reporting progress on `progress`; returns the final file path.
    async fn download(&self, request: DownloadRequest, progress: Sender<ProgressSample>) -> Result<PathBuf>;
}

#[derive(Deserialize)]
struct RawInfo {
    title: Option<String>,
    #[serde(default)]
    extractor_key: String,
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Deserialize)]
struct RawFormat {
    format_id: String,
    #[serde(default)]
    ext: String,
    resolution: Option<String>,
    format_note: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
}

impl From<RawFormat> for FormatEntry {
    fn from(raw: RawFormat) -> Self {
        FormatEntry {
            id: raw.format_id,
            ext: raw.ext,
            resolution: raw.resolution.unwrap_or_else(|| "audio only".to_owned()),
            note: raw.format_note.unwrap_or_default(),
            filesize: raw.filesize,
            filesize_approx: raw.filesize_approx,
            // an absent codec field counts as present, only "none" means no track
            has_video: raw.vcodec.as_deref() != Some("none"),
            has_audio: raw.acodec.as_deref() != Some("none"),
        }
    }
}

/// Parses the JSON document printed by `yt-dlp -J`.
pub fn parse_media_info(json: &[u8]) -> Result<MediaInfo> {
    let raw: RawInfo = serde_json::from_slice(json)
        .map_err(|e| AppError::ExtractionFailed(format!("unexpected yt-dlp output: {e}")))?;
    Ok(MediaInfo {
        title: raw.title.unwrap_or_else(|| "No title found".to_owned()),
        site_id: raw.extractor_key,
        thumbnail: raw.thumbnail,
        formats: raw
            .formats
            .into_iter()
            // storyboard previews, not playable media
            .filter(|f| f.ext != "mhtml")
            .map(FormatEntry::from)
            .collect(),
    })
}

/// Command-line arguments for one download.
pub fn download_args(request: &DownloadRequest) -> Vec<String> {
    let plan = &request.plan;
    let template = request.task.destination.join("%(title)s.%(ext)s");
    let mut args = vec![
        "--no-playlist".to_owned(),
        "--encoding".to_owned(),
        "utf-8".to_owned(),
        "-f".to_owned(),
        plan.selector.clone(),
        "--ffmpeg-location".to_owned(),
        request.ffmpeg.display().to_string(),
    ];
    if let Some(container) = plan.merge_container {
        args.push("--merge-output-format".to_owned());
        args.push(container.to_owned());
    }
    if let Some(extract) = &plan.extract_audio {
        args.push("-x".to_owned());
        args.push("--audio-format".to_owned());
        args.push(extract.codec.to_owned());
        args.push("--audio-quality".to_owned());
        args.push(extract.quality.to_owned());
    }

    args.push("--progress".to_owned());
    args.push("--progress-template".to_owned());
    args.push(progress_template());
    args.push("--newline".to_owned());
    args.push("--print".to_owned());
    args.push(format!("after_move:{SAVED_PREFIX}%(filepath)s"));

    args.push("-o".to_owned());
    args.push(template.display().to_string());
    args.push(request.task.url.clone());
    args
}

/// Reads one line, replacing bytes that are not UTF-8 (console code pages,
/// odd file names) instead of failing. `None` at end of stream.
async fn read_line_lossy<R: AsyncBufRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
}

/// Picks the error kind from the `ERROR:` lines yt-dlp printed.
pub fn classify_failure(error_lines: &[String], fallback: String) -> AppError {
    let conversion = error_lines.iter().any(|l| {
        let l = l.to_ascii_lowercase();
        l.contains("postprocessing") || l.contains("ffmpeg") || l.contains("ffprobe")
    });
    let message = error_lines.last().cloned().unwrap_or(fallback);
    if conversion {
        AppError::ConversionFailed(message)
    } else {
        AppError::DownloadFailed(message)
    }
}

fn last_error(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .filter(|l| l.starts_with("ERROR:"))
        .last()
        .map(str::to_owned)
}

/// yt-dlp invoked as a child process
pub struct YtDlp {
    binary: PathBuf,
    sink: LogSink,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, sink: LogSink) -> Self {
        Self { binary: binary.into(), sink }
    }

    /// Looks the binary up on PATH.
    pub fn locate(sink: LogSink) -> Result<Self> {
        let binary = which::which(executable_name()).map_err(|_| AppError::ToolNotFound("yt-dlp"))?;
        tracing::info!("using yt-dlp at {}", binary.display());
        Ok(Self::new(binary, sink))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl MediaClient for YtDlp {
    async fn fetch_formats(&self, url: &str) -> Result<MediaInfo> {
        self.sink.info(format!("Fetching formats for {url}"));
        let output = Command::new(&self.binary)
            .args(["-J", "--no-playlist", "--no-warnings", "--encoding", "utf-8"])
            .arg(url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::ExtractionFailed(format!("could not run yt-dlp: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            self.sink.info(line);
        }
        if !output.status.success() {
            let reason = last_error(&stderr).unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
            return Err(AppError::ExtractionFailed(reason));
        }
        let info = parse_media_info(&output.stdout)?;
        self.sink.info(format!(
            "{} ({}): {} formats",
            info.title,
            info.site_id,
            info.formats.len()
        ));
        Ok(info)
    }

    async fn download(&self, request: DownloadRequest, progress: Sender<ProgressSample>) -> Result<PathBuf> {
        let args = download_args(&request);
        self.sink.info(format!("yt-dlp {}", args.join(" ")));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::DownloadFailed(format!("could not run yt-dlp: {e}")))?;

        let out = child
            .stdout
            .take()
            .ok_or_else(|| AppError::DownloadFailed("yt-dlp stdout unavailable".to_owned()))?;
        let err = child
            .stderr
            .take()
            .ok_or_else(|| AppError::DownloadFailed("yt-dlp stderr unavailable".to_owned()))?;

        let err_sink = self.sink.clone();
        let err_progress = progress.clone();
        let stderr_task = tokio::spawn(async move {
            let mut errors = Vec::new();
            let mut reader = BufReader::new(err);
            let mut buf = Vec::new();
            while let Ok(Some(line)) = read_line_lossy(&mut reader, &mut buf).await {
                if let Some(sample) = parse_progress_from_line(&line) {
                    let _ = err_progress.send(sample).await;
                    continue;
                }
                if line.starts_with("ERROR:") {
                    errors.push(line.clone());
                }
                err_sink.info(line);
            }
            errors
        });

        let mut saved = None;
        let mut reader = BufReader::new(out);
        let mut buf = Vec::new();
        loop {
            let line = match read_line_lossy(&mut reader, &mut buf).await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    // don't leave yt-dlp running with nobody reading its output
                    let _ = child.kill().await;
                    stderr_task.abort();
                    return Err(AppError::DownloadFailed(format!("reading yt-dlp output failed: {e}")));
                }
            };
            if let Some(sample) = parse_progress_from_line(&line) {
                let _ = progress.send(sample).await;
            } else if let Some(path) = line.strip_prefix(SAVED_PREFIX) {
                saved = Some(PathBuf::from(path.trim()));
            } else {
                self.sink.info(line);
            }
        }

        let status = child.wait().await?;
        let errors = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(classify_failure(&errors, format!("yt-dlp exited with {status}")));
        }

        Ok(saved.unwrap_or_else(|| {
            tracing::warn!("yt-dlp did not report the final path");
            request.task.destination.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Choice, settings::AudioFormat};

    const SAMPLE: &str = r#"{
        "title": "Some clip",
        "extractor_key": "Youtube",
        "thumbnail": "https://i.ytimg.com/vi/abc/hqdefault.jpg",
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"},
            {"format_id": "251", "ext": "webm", "resolution": "audio only", "format_note": "medium",
             "filesize": 3500000, "vcodec": "none", "acodec": "opus"},
            {"format_id": "137", "ext": "mp4", "resolution": "1920x1080", "format_note": "1080p",
             "filesize_approx": 120000000.5, "vcodec": "avc1.640028", "acodec": "none"},
            {"format_id": "18", "ext": "mp4", "resolution": null, "vcodec": "avc1", "acodec": "mp4a"},
            {"format_id": "hls", "ext": "mp4"}
        ]
    }"#;

    #[test]
    fn parses_metadata_and_skips_storyboards() {
        let info = parse_media_info(SAMPLE.as_bytes()).unwrap();
        assert_eq!(info.title, "Some clip");
        assert_eq!(info.site_id, "Youtube");
        let ids: Vec<_> = info.formats.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["251", "137", "18", "hls"]);

        let audio = &info.formats[0];
        assert!(audio.has_audio && !audio.has_video);
        assert_eq!(audio.filesize, Some(3500000.0));

        let video = &info.formats[1];
        assert!(video.has_video && !video.has_audio);

        assert_eq!(info.formats[2].resolution, "audio only");
        assert!(info.formats[3].has_video && info.formats[3].has_audio);
    }

    #[test]
    fn garbage_is_an_extraction_failure() {
        assert!(matches!(parse_media_info(b"<html>"), Err(AppError::ExtractionFailed(_))));
    }

    #[test]
    fn missing_title_gets_placeholder() {
        let info = parse_media_info(br#"{"extractor_key": "Generic"}"#).unwrap();
        assert_eq!(info.title, "No title found");
        assert!(info.formats.is_empty());
    }

    fn request(choice: Choice, settings: &Settings) -> DownloadRequest {
        let task = DownloadTask {
            url: "https://example.com/v".into(),
            destination: PathBuf::from("out"),
            choice,
        };
        DownloadRequest::new(task, settings, PathBuf::from("/usr/bin/ffmpeg"))
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter().position(|a| a == flag).map(|i| args[i + 1].as_str())
    }

    #[test]
    fn merged_video_args() {
        let args = download_args(&request(Choice::BestMergedVideo, &Settings::default()));
        assert_eq!(value_after(&args, "-f"), Some("bestvideo+bestaudio/best"));
        assert_eq!(value_after(&args, "--merge-output-format"), Some("mp4"));
        assert_eq!(value_after(&args, "--ffmpeg-location"), Some("/usr/bin/ffmpeg"));
        assert!(!args.contains(&"-x".to_owned()));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/v"));
        let template = PathBuf::from("out").join("%(title)s.%(ext)s");
        assert_eq!(value_after(&args, "-o"), Some(template.display().to_string().as_str()));
    }

    #[test]
    fn audio_args_follow_settings() {
        let args = download_args(&request(Choice::BestAudio, &Settings::default()));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("192"));
        assert!(args.contains(&"-x".to_owned()));

        let keep = Settings { audio_format: AudioFormat::KeepOriginal, ..Settings::default() };
        let args = download_args(&request(Choice::BestAudio, &keep));
        assert!(!args.contains(&"-x".to_owned()));
        assert_eq!(value_after(&args, "--merge-output-format"), None);
    }

    #[test]
    fn failures_are_classified() {
        let conv = classify_failure(
            &["ERROR: Postprocessing: audio conversion failed: Error opening output file".into()],
            String::new(),
        );
        assert!(matches!(conv, AppError::ConversionFailed(_)));

        let dl = classify_failure(&["ERROR: [youtube] abc: Video unavailable".into()], String::new());
        assert!(matches!(dl, AppError::DownloadFailed(m) if m.contains("Video unavailable")));

        let bare = classify_failure(&[], "yt-dlp exited with exit status: 1".into());
        assert!(matches!(bare, AppError::DownloadFailed(m) if m.contains("exit status")));
    }

    #[test]
    fn last_error_line_is_reported() {
        let stderr = "WARNING: something\nERROR: first\nERROR: [generic] Unsupported URL\n";
        assert_eq!(last_error(stderr).as_deref(), Some("ERROR: [generic] Unsupported URL"));
        assert_eq!(last_error("all good"), None);
    }

    #[test]
    fn downloads_ask_for_utf8_output() {
        let args = download_args(&request(Choice::BestMergedVideo, &Settings::default()));
        assert_eq!(value_after(&args, "--encoding"), Some("utf-8"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_download_failure() {
        let client = YtDlp::new("/nonexistent/dir/yt-dlp", LogSink::new());
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        let result = client.download(request(Choice::BestAudio, &Settings::default()), tx).await;
        assert!(matches!(result, Err(AppError::DownloadFailed(m)) if m.contains("could not run yt-dlp")));
    }

    /// Stand-in yt-dlp: a shell script that ignores its arguments.
    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn download_streams_progress_and_survives_non_utf8_output() {
        use crate::model::Phase;
        let dir = tempfile::tempdir().unwrap();
        let bin = script(
            dir.path(),
            r#"printf 'progress:downloading|512|1024|NA|1.00MiB/s\n'
printf '[download] Destination: Caf\351 au lait.webm\n'
printf 'WARNING: \377 in a warning\n' >&2
printf 'progress:finished|1024|1024|NA|NA\n'
printf 'saved:/tmp/ytdl/clip.mp4\n'"#,
        );
        let sink = LogSink::new();
        let client = YtDlp::new(bin, sink.clone());
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);

        let path = client
            .download(request(Choice::BestMergedVideo, &Settings::default()), tx)
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/ytdl/clip.mp4"));

        let mut phases = Vec::new();
        while let Ok(sample) = rx.try_recv() {
            phases.push(sample.phase);
        }
        assert_eq!(phases, [Phase::Downloading, Phase::Finished]);

        let logged = sink.drain();
        assert!(logged.iter().any(|l| l == "[download] Destination: Caf\u{FFFD} au lait.webm"));
        assert!(logged.iter().any(|l| l == "WARNING: \u{FFFD} in a warning"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn postprocessing_error_is_a_conversion_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(
            dir.path(),
            r#"printf 'progress:downloading|10|100|NA|NA\n'
printf 'ERROR: Postprocessing: Conversion failed!\n' >&2
exit 1"#,
        );
        let client = YtDlp::new(bin, LogSink::new());
        let (tx, _rx) = tokio::sync::mpsc::channel(16);
        let result = client.download(request(Choice::BestAudio, &Settings::default()), tx).await;
        assert!(matches!(result, Err(AppError::ConversionFailed(m)) if m.contains("Conversion failed")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn plain_exit_failure_is_a_download_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "printf 'ERROR: [youtube] abc: Video unavailable\\n' >&2\nexit 1");
        let client = YtDlp::new(bin, LogSink::new());
        let (tx, _rx) = tokio::sync::mpsc::channel(16);
        let result = client.download(request(Choice::BestMergedVideo, &Settings::default()), tx).await;
        assert!(matches!(result, Err(AppError::DownloadFailed(m)) if m.contains("Video unavailable")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fetch_reads_the_json_document() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(
            dir.path(),
            r#"cat <<'JSON'
{"title": "Café", "extractor_key": "Generic",
 "formats": [{"format_id": "hd", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a"}]}
JSON"#,
        );
        let info = YtDlp::new(bin, LogSink::new()).fetch_formats("https://example.com/v").await.unwrap();
        assert_eq!(info.title, "Café");
        assert_eq!(info.site_id, "Generic");
        assert_eq!(info.formats.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fetch_failure_reports_the_last_error_line() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "echo 'ERROR: [generic] Unsupported URL: https://x' >&2\nexit 1");
        let result = YtDlp::new(bin, LogSink::new()).fetch_formats("https://x").await;
        assert!(matches!(result, Err(AppError::ExtractionFailed(m)) if m == "ERROR: [generic] Unsupported URL: https://x"));
    }
}
