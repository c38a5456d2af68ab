use crate::model::{Phase, ProgressSample};

/// Prefix of the machine-readable progress lines we ask yt-dlp to print
pub const PROGRESS_PREFIX: &str = "progress:";

/// Value for `--progress-template`; unknown fields come out as "NA".
pub fn progress_template() -> String {
    format!(
        "download:{PROGRESS_PREFIX}%(progress.status)s|%(progress.downloaded_bytes)s|\
         %(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress._speed_str)s"
    )
}

fn parse_bytes(field: &str) -> Option<u64> {
    let v = field.trim().parse::<f64>().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v as u64)
}

pub fn parse_progress_from_line(line: &str) -> Option<ProgressSample> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.splitn(5, '|');
    let phase = match fields.next()?.trim() {
        "downloading" => Phase::Downloading,
        "finished" => Phase::Finished,
        "error" => Phase::Error,
        _ => return None,
    };
    let bytes_done = fields.next().and_then(parse_bytes);
    let total = fields.next().and_then(parse_bytes);
    let estimate = fields.next().and_then(parse_bytes);
    let speed = match fields.next().map(str::trim) {
        Some(s) if !s.is_empty() && s != "NA" => s.to_owned(),
        _ => "N/A".to_owned(),
    };
    Some(ProgressSample {
        phase,
        bytes_done,
        bytes_total: total.or(estimate),
        speed,
    })
}

/// Percentage shown in the progress bar, fed in generation order.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    percent: f32,
}

impl ProgressTracker {
    /// 0.0 to 100.0
    pub fn percent(&self) -> f32 {
        self.percent
    }

    pub fn reset(&mut self) {
        self.percent = 0.0;
    }

    /// Applies one sample; returns the status line to show, if any.
    pub fn apply(&mut self, sample: &ProgressSample) -> Option<String> {
        match sample.phase {
            Phase::Downloading => {
                let (done, total) = (sample.bytes_done?, sample.bytes_total?);
                if done == 0 || total == 0 {
                    return None;
                }
                let pct = (done as f64 * 100.0 / total as f64).min(100.0) as f32;
                // a second stream (audio after video) restarts at zero; keep the bar where it is
                self.percent = self.percent.max(pct);
                Some(format!("Downloading: {pct:.1}% at {}", sample.speed))
            }
            Phase::Finished => {
                self.percent = 100.0;
                Some("Download finished. Merging/Processing...".to_owned())
            }
            Phase::Error => Some("An error occurred during download.".to_owned()),
        }
    }
}
