//! Secondary windows: the settings dialog and the debug log.

use crate::{
    logsink::LogSink,
    settings::{AudioFormat, Bitrate, Settings},
};
use eframe::egui;
use rfd::FileDialog;
use std::path::PathBuf;

/// Lines the debug window keeps before dropping the oldest
const MAX_LOG_LINES: usize = 10_000;

/// Modal editor for [`Settings`]; edits a draft until Save.
#[derive(Default)]
pub struct SettingsDialog {
    open: bool,
    draft: Settings,
    ffmpeg_text: String,
}

impl SettingsDialog {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open_with(&mut self, current: &Settings) {
        self.draft = current.clone();
        self.ffmpeg_text = current
            .ffmpeg_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.open = true;
    }

    /// Draws the dialog; returns the new settings when the user saves.
    pub fn show(&mut self, ctx: &egui::Context) -> Option<Settings> {
        if !self.open {
            return None;
        }
        let mut saved = None;
        let mut close = false;
        egui::Window::new("Configuration")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
                    ui.label("Audio Conversion Format:");
                    egui::ComboBox::from_id_source("audio_format")
                        .selected_text(self.draft.audio_format.to_string())
                        .show_ui(ui, |ui| {
                            for format in AudioFormat::ALL {
                                ui.selectable_value(&mut self.draft.audio_format, format, format.to_string());
                            }
                        });
                    ui.end_row();

                    ui.label("MP3 Bitrate (if converting):");
                    egui::ComboBox::from_id_source("mp3_bitrate")
                        .selected_text(self.draft.mp3_bitrate.label())
                        .show_ui(ui, |ui| {
                            for rate in Bitrate::ALL {
                                ui.selectable_value(&mut self.draft.mp3_bitrate, rate, rate.label());
                            }
                        });
                    ui.end_row();

                    ui.label("FFmpeg executable:");
                    ui.horizontal(|ui| {
                        ui.text_edit_singleline(&mut self.ffmpeg_text);
                        if ui.button("Browse…").clicked() {
                            if let Some(file) = FileDialog::new().pick_file() {
                                self.ffmpeg_text = file.display().to_string();
                            }
                        }
                    });
                    ui.end_row();
                });

                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        let path = self.ffmpeg_text.trim();
                        self.draft.ffmpeg_path = (!path.is_empty()).then(|| PathBuf::from(path));
                        saved = Some(self.draft.clone());
                        close = true;
                    }
                    if ui.button("Cancel").clicked() {
                        close = true;
                    }
                });
            });
        if close {
            self.open = false;
        }
        saved
    }
}

/// Debug log viewer fed from a [`LogSink`]
pub struct DebugLogWindow {
    open: bool,
    sink: LogSink,
    lines: Vec<String>,
}

impl DebugLogWindow {
    pub fn new(sink: LogSink) -> Self {
        Self { open: false, sink, lines: Vec::new() }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Moves queued sink lines into the window's history.
    pub fn pull(&mut self) {
        self.lines.extend(self.sink.drain());
        if self.lines.len() > MAX_LOG_LINES {
            let excess = self.lines.len() - MAX_LOG_LINES;
            self.lines.drain(..excess);
        }
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        let mut open = self.open;
        egui::Window::new("Debug Log")
            .open(&mut open)
            .default_size([700.0, 500.0])
            .show(ctx, |ui| {
                if ui.button("Clear").clicked() {
                    self.lines.clear();
                }
                ui.separator();
                let row_height = ui.text_style_height(&egui::TextStyle::Monospace);
                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .stick_to_bottom(true)
                    .show_rows(ui, row_height, self.lines.len(), |ui, rows| {
                        for line in &self.lines[rows] {
                            ui.monospace(line);
                        }
                    });
            });
        // closing hides the window; history is kept
        self.open = open;
    }
}
