//! Diagnostic output: the tracing subscriber (stderr plus the debug window)
//! and the explicit sink that feeds the debug-log window.

use std::{
    collections::VecDeque,
    fmt::{self, Write as _},
    sync::{Arc, Mutex},
};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{EnvFilter, Layer, layer::Context, prelude::*};

/// Environment variable holding the log filter, e.g. `debug` or `ytdl_gui=trace`
pub const LOG_ENV: &str = "YTDL_GUI_LOG";

/// Filter used when `YTDL_GUI_LOG` is unset; windowing crates are chatty at info
const DEFAULT_FILTER: &str = "info,eframe=warn,egui=warn,egui_winit=warn,winit=warn,wgpu=warn,naga=warn,glutin=warn,reqwest=warn,hyper=warn";

/// Target of lines written through [`LogSink::write`]; they are already queued
const TOOL_TARGET: &str = "ytdl_gui::tool";

/// Lines kept for the debug window
const MAX_LINES: usize = 5000;

/// Installs the global subscriber: env-filtered stderr output, and every
/// record that passes the filter copied into `sink`. Safe to call more than once.
pub fn init(sink: LogSink) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(SinkLayer::new(sink))
        .try_init();
    if let Err(e) = installed {
        eprintln!("logging already initialised: {e}");
    }
}

/// Handle that components write diagnostic text into.
///
/// Everything written here is also emitted as a tracing event, so stderr
/// sees the same text whether or not the debug window is open.
#[derive(Clone, Default)]
pub struct LogSink {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        match level {
            Level::ERROR => tracing::error!(target: TOOL_TARGET, "{message}"),
            Level::WARN => tracing::warn!(target: TOOL_TARGET, "{message}"),
            Level::INFO => tracing::info!(target: TOOL_TARGET, "{message}"),
            Level::DEBUG => tracing::debug!(target: TOOL_TARGET, "{message}"),
            Level::TRACE => tracing::trace!(target: TOOL_TARGET, "{message}"),
        }
        self.push(message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.write(Level::INFO, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.write(Level::ERROR, message);
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            if lines.len() == MAX_LINES {
                lines.pop_front();
            }
            lines.push_back(line);
        }
    }

    /// Removes and returns everything queued since the last drain.
    pub fn drain(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(mut lines) => lines.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Copies tracing events (including bridged `log` records from eframe and
/// friends) into a [`LogSink`].
pub struct SinkLayer {
    sink: LogSink,
}

impl SinkLayer {
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }
}

impl<S: Subscriber> Layer<S> for SinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target() == TOOL_TARGET {
            return;
        }
        let mut fields = FieldText::default();
        event.record(&mut fields);
        self.sink.push(format!("{:<5} {}: {}", meta.level().as_str(), meta.target(), fields.0));
    }
}

/// `message` first, then any other fields as `name=value`
#[derive(Default)]
struct FieldText(String);

impl Visit for FieldText {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let rest = std::mem::take(&mut self.0);
            let _ = write!(self.0, "{value:?}{rest}");
        } else if !field.name().starts_with("log.") {
            let _ = write!(self.0, " {}={value:?}", field.name());
        }
    }
}
