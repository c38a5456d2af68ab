//! Desktop front-end for yt-dlp: list a URL's formats, pick one, download it.

// Failure kinds shared by all modules
mod error;
// Tracing subscriber and the debug-log sink
mod logsink;
// Data models for formats, choices, tasks and progress
mod model;
// JSON settings file
mod settings;
// Locating ffmpeg
mod transcoder;
// Format labels and the per-site choice list
mod formats;
// Selector / merge / conversion policy
mod plan;
// Progress parsing and tracking
mod progress;
// External downloader logic (yt-dlp)
mod downloader;
// Background workers
mod runner;
// Thumbnail fetching module
mod thumbnail;
// Opening folders and links
mod shell;
// Cut/Copy/Paste for the URL field
mod clipboard;
// Settings dialog and debug log window
mod windows;

use clipboard::{EditAction, SystemClipboard};
use downloader::{DownloadRequest, YtDlp};
use error::AppError;
use formats::ChoiceList;
use logsink::LogSink;
use model::{DownloadTask, MediaInfo, Stage};
use progress::ProgressTracker;
use runner::{TaskEvent, TaskRunner};
use settings::{CONFIG_FILE, Settings};
use transcoder::{Located, Remediation};
use windows::{DebugLogWindow, SettingsDialog};

// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{ColorImage, RichText, TextureOptions, Visuals};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection, MessageDialog for modal notices
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::runtime::Runtime;

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

const WINDOW_TITLE: &str = "Video & Audio Downloader (yt-dlp)";

/// Program entry point: initializes logging, runtime and tools, then launches the GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink = LogSink::new();
    logsink::init(sink.clone());

    let rt = Arc::new(Runtime::new()?);
    let handle = rt.handle().clone();
    RUNTIME.set(rt).map_err(|_| "runtime already initialized")?;

    let config_path = PathBuf::from(CONFIG_FILE);
    let mut settings = Settings::load(&config_path);

    let located = transcoder::resolve(&mut settings);
    match &located {
        Located::Saved(_) => {}
        Located::Found(_) => {
            if let Err(e) = settings.save(&config_path) {
                tracing::error!("could not remember ffmpeg path: {e}");
            }
        }
        Located::Missing => show_remediation(Remediation::for_platform()),
    }
    let ffmpeg = located.path().map(PathBuf::from);

    let (client, ytdlp_found) = match YtDlp::locate(sink.clone()) {
        Ok(client) => (client, true),
        Err(e) => {
            tracing::warn!("{e}");
            (YtDlp::new(downloader::executable_name(), sink.clone()), false)
        }
    };
    tracing::debug!("extractor binary: {}", client.binary().display());
    let runner = TaskRunner::new(Arc::new(client), handle, sink.clone());

    let mut app = DownloaderApp::new(runner, sink, settings, config_path, ffmpeg);
    if !ytdlp_found {
        app.status = "yt-dlp not found on PATH. Install it to fetch formats.".to_owned();
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([800.0, 650.0]),
        ..Default::default()
    };
    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| {
            // Use dark theme visuals
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(app)
        }),
    )?;
    Ok(())
}

fn show_remediation(remediation: Remediation) {
    match remediation {
        Remediation::OfferDownload { message, url } => {
            let open = MessageDialog::new()
                .set_level(MessageLevel::Warning)
                .set_title(transcoder::REMEDIATION_TITLE)
                .set_description(&message)
                .set_buttons(MessageButtons::YesNo)
                .show();
            if open {
                shell::open_externally(url.to_owned());
            }
        }
        Remediation::ManualInstall { message } => error_dialog(transcoder::REMEDIATION_TITLE, &message),
    }
}

fn error_dialog(title: &str, message: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn info_dialog(title: &str, message: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Info)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Application state for the GUI
struct DownloaderApp {
    /// Input field for the media URL
    url_input: String,
    /// URL the current format list belongs to
    fetched_url: String,
    /// Destination folder for downloads
    download_folder: String,
    settings: Settings,
    config_path: PathBuf,
    /// Transcoder in use; downloads stay disabled without one
    ffmpeg: Option<PathBuf>,
    title: String,
    thumbnail: Option<egui::TextureHandle>,
    /// Incoming thumbnail fetch results (url, image)
    thumbnail_results: Arc<Mutex<Vec<(String, ColorImage)>>>,
    choices: ChoiceList,
    /// Label of the highlighted row
    selected: Option<String>,
    stage: Stage,
    runner: TaskRunner,
    tracker: ProgressTracker,
    status: String,
    /// Folder of the last finished download, for "Open Folder"
    last_folder: Option<String>,
    settings_dialog: SettingsDialog,
    debug_window: DebugLogWindow,
    clipboard: Option<SystemClipboard>,
}

impl DownloaderApp {
    fn new(
        runner: TaskRunner,
        sink: LogSink,
        settings: Settings,
        config_path: PathBuf,
        ffmpeg: Option<PathBuf>,
    ) -> Self {
        let download_folder = std::env::current_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|_| ".".to_owned());
        let status = transcoder::status_line(ffmpeg.as_deref());
        Self {
            url_input: String::new(),
            fetched_url: String::new(),
            download_folder,
            settings,
            config_path,
            ffmpeg,
            title: "N/A".to_owned(),
            thumbnail: None,
            thumbnail_results: Arc::new(Mutex::new(Vec::new())),
            choices: ChoiceList::default(),
            selected: None,
            stage: Stage::Idle,
            runner,
            tracker: ProgressTracker::default(),
            status: status.to_owned(),
            last_folder: None,
            settings_dialog: SettingsDialog::default(),
            debug_window: DebugLogWindow::new(sink),
            clipboard: SystemClipboard::open(),
        }
    }

    fn can_download(&self) -> bool {
        !self.runner.is_busy() && self.selected.is_some() && self.ffmpeg.is_some()
    }

    fn start_fetch(&mut self, ctx: &egui::Context) {
        let url = self.url_input.trim().to_owned();
        if url.is_empty() {
            error_dialog("Error", "Please enter a URL.");
            return;
        }
        if let Err(e) = self.runner.start_fetch(url.clone()) {
            tracing::warn!("fetch not started: {e}");
            return;
        }
        self.fetched_url = url;
        self.stage = Stage::Fetching;
        self.title = "Fetching...".to_owned();
        self.thumbnail = None;
        self.choices = ChoiceList::default();
        self.selected = None;
        self.last_folder = None;
        self.status = "Fetching formats... Please wait.".to_owned();
        ctx.request_repaint();
    }

    fn start_download(&mut self) {
        let Some(choice) = self.selected.as_deref().and_then(|label| self.choices.lookup(label)).cloned() else {
            error_dialog("Error", "Please select an option to download.");
            return;
        };
        let Some(ffmpeg) = self.ffmpeg.clone() else {
            error_dialog("Error", &AppError::TranscoderNotFound.to_string());
            return;
        };
        let task = DownloadTask {
            url: self.fetched_url.clone(),
            destination: PathBuf::from(&self.download_folder),
            choice,
        };
        let request = DownloadRequest::new(task, &self.settings, ffmpeg);
        if let Err(e) = self.runner.start_download(request) {
            tracing::warn!("download not started: {e}");
            return;
        }
        self.tracker.reset();
        self.last_folder = None;
        self.stage = Stage::Downloading;
    }

    fn formats_loaded(&mut self, info: MediaInfo) {
        self.title = info.title.clone();
        self.choices = ChoiceList::for_media(&info);
        if self.choices.is_empty() {
            self.selected = None;
            self.stage = Stage::Idle;
            self.status = "No downloadable formats found.".to_owned();
        } else {
            self.selected = self.choices.labels().next().map(str::to_owned);
            self.stage = Stage::FormatsReady;
            self.status = "Formats loaded. Select an option and click Download.".to_owned();
        }
        tracing::info!("{} options for {}", self.choices.len(), self.fetched_url);

        // Spawn thumbnail fetch in blocking task
        if let (Some(url), Some(rt)) = (info.thumbnail, RUNTIME.get()) {
            let key = self.fetched_url.clone();
            let results = Arc::clone(&self.thumbnail_results);
            rt.spawn_blocking(move || {
                if let Some(img) = thumbnail::fetch_thumbnail(&url) {
                    if let Ok(mut pending) = results.lock() {
                        pending.push((key, img));
                    }
                }
            });
        }
    }

    fn handle_event(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Status(status) => self.status = status,
            TaskEvent::Progress(sample) => {
                if let Some(status) = self.tracker.apply(&sample) {
                    self.status = status;
                }
            }
            TaskEvent::FetchFinished(Ok(info)) => self.formats_loaded(info),
            TaskEvent::FetchFinished(Err(e)) => {
                self.title = "Failed to fetch title".to_owned();
                self.stage = Stage::Idle;
                self.status = "Error fetching formats.".to_owned();
                error_dialog("Error", &format!("Failed to fetch formats. See debug log for details.\n\n{e}"));
            }
            TaskEvent::DownloadFinished(result) => {
                self.stage = Stage::Idle;
                match result {
                    Ok(path) => {
                        self.status = "Download complete!".to_owned();
                        self.last_folder = Some(self.download_folder.clone());
                        info_dialog("Success", &format!("File successfully downloaded to:\n{}", path.display()));
                    }
                    Err(AppError::ConversionFailed(cause)) => {
                        self.status = "Download failed.".to_owned();
                        error_dialog(
                            "Conversion Error",
                            &format!(
                                "Converting the downloaded file failed:\n{cause}\n\n\
                                 Please verify the FFmpeg path under Settings > Configure."
                            ),
                        );
                    }
                    Err(e) => {
                        self.status = "Download failed.".to_owned();
                        error_dialog("Download Error", &format!("An error occurred. See debug log for details.\n\n{e}"));
                    }
                }
            }
        }
    }

    fn apply_settings(&mut self, mut settings: Settings) {
        let located = transcoder::resolve(&mut settings);
        self.settings = settings;
        match self.settings.save(&self.config_path) {
            Ok(()) => info_dialog("Saved", "Settings have been saved."),
            Err(e) => error_dialog("Error", &e.to_string()),
        }
        self.ffmpeg = located.path().map(PathBuf::from);
        // only replace the transcoder message, never a fetch/download status
        if self.ffmpeg.is_none() || self.status == transcoder::MISSING_STATUS {
            self.status = transcoder::status_line(self.ffmpeg.as_deref()).to_owned();
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("Settings", |ui| {
                    if ui.button("Configure...").clicked() {
                        self.settings_dialog.open_with(&self.settings);
                        ui.close_menu();
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.button("Show Debug Log").clicked() {
                        self.debug_window.open();
                        ui.close_menu();
                    }
                });
            });
        });
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for DownloaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 1️⃣ Apply worker events in the order they were produced
        for event in self.runner.poll() {
            self.handle_event(event);
        }
        self.debug_window.pull();

        // 2️⃣ Handle completed thumbnail fetches
        let arrived: Vec<_> = match self.thumbnail_results.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for (key, img) in arrived {
            if key == self.fetched_url {
                self.thumbnail = Some(ctx.load_texture("thumbnail", img, TextureOptions::default()));
            }
        }

        self.menu_bar(ctx);

        // 3️⃣ Bottom panel: download button, progress and status
        let busy = self.runner.is_busy();
        let mut download_clicked = false;
        egui::TopBottomPanel::bottom("actions").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let enabled = self.can_download() && !self.settings_dialog.is_open();
                if ui.add_enabled(enabled, egui::Button::new("Download Selected")).clicked() {
                    download_clicked = true;
                }
                if self.stage == Stage::Downloading {
                    ui.add(egui::ProgressBar::new(self.tracker.percent() / 100.0).show_percentage());
                }
                if let Some(folder) = &self.last_folder {
                    if ui.button("Open Folder").clicked() {
                        shell::open_externally(folder.clone());
                    }
                }
            });
            ui.horizontal(|ui| {
                if busy {
                    ui.spinner();
                }
                ui.label(&self.status);
            });
            ui.add_space(6.0);
        });

        // 4️⃣ Main panel: URL, title, format list, save location
        let mut fetch_clicked = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(!self.settings_dialog.is_open(), |ui| {
                ui.horizontal(|ui| {
                    ui.label("Video/Audio URL:");
                    let edit = ui.add(egui::TextEdit::singleline(&mut self.url_input).desired_width(520.0));
                    let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    edit.context_menu(|ui| {
                        for action in EditAction::ALL {
                            let enabled = self.clipboard.is_some();
                            if ui.add_enabled(enabled, egui::Button::new(action.label())).clicked() {
                                if let Some(clip) = self.clipboard.as_mut() {
                                    clipboard::apply(action, &mut self.url_input, clip);
                                }
                                ui.close_menu();
                            }
                        }
                    });
                    if ui.add_enabled(!busy, egui::Button::new("Fetch Formats")).clicked() || (submitted && !busy) {
                        fetch_clicked = true;
                    }
                });

                ui.horizontal(|ui| {
                    ui.label("Video Title:");
                    ui.label(RichText::new(&self.title).strong());
                });
                if let Some(tex) = &self.thumbnail {
                    ui.image(tex);
                }
                ui.separator();

                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .max_height((ui.available_height() - 40.0).max(80.0))
                    .show(ui, |ui| {
                        for label in self.choices.labels() {
                            let picked = self.selected.as_deref() == Some(label);
                            if ui.selectable_label(picked, RichText::new(label).monospace()).clicked() {
                                self.selected = Some(label.to_owned());
                            }
                        }
                    });
                ui.separator();

                // Folder selection
                ui.horizontal(|ui| {
                    ui.label("Save to:");
                    ui.add(egui::TextEdit::singleline(&mut self.download_folder).desired_width(520.0));
                    if ui.button("Browse...").clicked() {
                        if let Some(folder) = FileDialog::new().set_directory(&self.download_folder).pick_folder() {
                            self.download_folder = folder.display().to_string();
                        }
                    }
                });
            });
        });

        if fetch_clicked {
            self.start_fetch(ctx);
        }
        if download_clicked {
            self.start_download();
        }

        if let Some(settings) = self.settings_dialog.show(ctx) {
            self.apply_settings(settings);
        }
        self.debug_window.show(ctx);

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
