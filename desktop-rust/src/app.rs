use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

use eframe::egui::{self, Color32, RichText};
use eframe::egui::{FontData, FontDefinitions, FontFamily};
use tokio::runtime::Runtime;
use tracing::warn;

use cad_text_rust::cli::ExportFormat;
use cad_text_rust::converter::OdaConverter;
use cad_text_rust::error::{CadTextError, Result};
use cad_text_rust::session::{BatchReport, Session};
use cad_text_rust::workspace::Workspace;

use crate::io::{default_export_dir, default_export_name, Environment};
use crate::model::{AppState, Progress};

pub struct DesktopApp {
    state: AppState,
    converter: OdaConverter,
    workspace: Workspace,
    runtime: Option<Runtime>,
    status: String,
    warning: bool,
    batch_rx: Option<Receiver<UiMessage>>,
    batch_worker: Option<JoinHandle<()>>,
    /// 作業スレッドが結果を返さずに終わった場合の復帰先
    batch_folder: Option<PathBuf>,
}

enum UiMessage {
    Progress(Progress),
    BatchDone { session: Session, outcome: Result<BatchReport> },
}

impl DesktopApp {
    pub fn new(env: Environment) -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build();
        let status = match &runtime {
            Ok(_) => String::new(),
            Err(err) => format!("Runtime failed: {err}"),
        };
        Self {
            state: AppState::new(env.config.threshold),
            converter: env.converter,
            workspace: env.workspace,
            runtime: runtime.ok(),
            status,
            warning: false,
            batch_rx: None,
            batch_worker: None,
            batch_folder: None,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.warning = false;
    }

    fn set_error(&mut self, err: &CadTextError) {
        warn!(error = %err, "操作に失敗");
        self.status = err.to_string();
        self.warning = err.is_warning();
    }

    fn open_folder(&mut self) {
        let Some(folder) = rfd::FileDialog::new().pick_folder() else {
            return;
        };
        match self.state.session.load_folder(&folder) {
            Ok(drawings) => {
                self.state.drawings = drawings.to_vec();
                self.state.selected_drawing = None;
                self.state.selected_text = None;
                self.state.failures.clear();
                let count = self.state.drawings.len();
                self.set_status(format!("Loaded {} ({count} drawings)", folder.display()));
            }
            Err(err) => self.set_error(&err),
        }
    }

    /// 変換が終わるまでUIは止まる
    fn preview(&mut self, index: usize) {
        let Some(drawing) = self.state.drawings.get(index).cloned() else {
            return;
        };
        let Some(runtime) = &self.runtime else {
            self.set_status("Runtime unavailable");
            return;
        };
        self.state.selected_drawing = Some(index);
        self.state.selected_text = None;

        let outcome = runtime.block_on(self.state.session.preview_drawing(
            &self.converter,
            &self.workspace,
            &drawing,
        ));
        match outcome {
            Ok(items) => {
                let count = items.len();
                self.set_status(format!("{}: {count} texts", drawing.file_name));
            }
            Err(err) => self.set_error(&err),
        }
    }

    fn set_anchor(&mut self) {
        let Some(index) = self.state.selected_text else {
            self.set_status("Select a text first");
            return;
        };
        match self.state.session.select_anchor(index, self.state.threshold) {
            Ok(pattern) => {
                let message = format!(
                    "Anchor: {} {} (threshold {})",
                    pattern.layer, pattern.position, pattern.threshold
                );
                self.set_status(message);
            }
            Err(err) => self.set_error(&err),
        }
    }

    fn run_batch(&mut self) {
        if self.state.session.reference().is_none() {
            self.set_error(&CadTextError::NoReferencePattern);
            return;
        }

        self.batch_folder = self.state.session.folder().map(|p| p.to_path_buf());
        let mut session = std::mem::take(&mut self.state.session);
        let converter = self.converter.clone();
        let workspace = self.workspace.clone();
        let (tx, rx) = mpsc::channel();
        self.batch_rx = Some(rx);
        self.state.progress = Some(Progress::default());
        self.state.failures.clear();
        self.set_status("Batch running...");

        let worker = std::thread::spawn(move || {
            let outcome = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(CadTextError::from)
                .and_then(|rt| {
                    rt.block_on(session.batch_process(&converter, &workspace, |done, total, name| {
                        let _ = tx.send(UiMessage::Progress(Progress {
                            done,
                            total,
                            current: name.to_string(),
                        }));
                    }))
                });
            let _ = tx.send(UiMessage::BatchDone { session, outcome });
        });
        self.batch_worker = Some(worker);
    }

    fn run_export(&mut self) {
        let format = self.state.export_format;
        let mut dialog = rfd::FileDialog::new()
            .add_filter(format.to_string(), &[format.extension()])
            .set_file_name(default_export_name(format));
        if let Some(dir) = default_export_dir(self.state.session.folder()) {
            dialog = dialog.set_directory(dir);
        }
        let Some(path): Option<PathBuf> = dialog.save_file() else {
            return;
        };
        match self.state.session.export(format, &path) {
            Ok(written) => self.set_status(format!("Saved {}", written.display())),
            Err(err) => self.set_error(&err),
        }
    }

    fn poll_messages(&mut self) {
        let Some(rx) = &self.batch_rx else {
            return;
        };
        let mut done = None;
        let mut disconnected = false;
        loop {
            match rx.try_recv() {
                Ok(UiMessage::Progress(progress)) => self.state.progress = Some(progress),
                Ok(UiMessage::BatchDone { session, outcome }) => done = Some((session, outcome)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if let Some((session, outcome)) = done {
            self.finish_worker();
            self.state.session = session;
            self.state.drawings = self.state.session.drawings().to_vec();
            self.state.selected_drawing = None;
            match outcome {
                Ok(report) => {
                    let message = format!(
                        "Batch complete: {} of {} matched, {} skipped",
                        report.results.len(),
                        report.scanned,
                        report.failures.len()
                    );
                    self.state.failures = report.failures;
                    self.set_status(message);
                }
                Err(err) => self.set_error(&err),
            }
        } else if disconnected {
            self.recover_lost_worker();
        }
    }

    fn finish_worker(&mut self) {
        self.state.progress = None;
        self.batch_rx = None;
        self.batch_folder = None;
        if let Some(worker) = self.batch_worker.take() {
            let _ = worker.join();
        }
    }

    /// 結果を返さずに終わった作業スレッドからの復帰（セッションは作り直す）
    fn recover_lost_worker(&mut self) {
        let folder = self.batch_folder.take();
        let reason = match self.batch_worker.take().map(JoinHandle::join) {
            Some(Err(payload)) => payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string()),
            _ => "worker exited".to_string(),
        };
        warn!(%reason, "一括抽出の作業スレッドが異常終了");
        self.finish_worker();

        self.state.session = Session::new();
        self.state.drawings.clear();
        self.state.selected_drawing = None;
        self.state.selected_text = None;
        if let Some(folder) = folder {
            if let Ok(drawings) = self.state.session.load_folder(&folder) {
                self.state.drawings = drawings.to_vec();
            }
        }
        self.status = format!("Batch stopped unexpectedly: {reason}");
        self.warning = false;
    }

    fn render_drawings(&mut self, ui: &mut egui::Ui) {
        let mut clicked = None;
        for (index, drawing) in self.state.drawings.iter().enumerate() {
            let selected = self.state.selected_drawing == Some(index);
            if ui.selectable_label(selected, &drawing.file_name).clicked() {
                clicked = Some(index);
            }
        }
        if let Some(index) = clicked {
            self.preview(index);
        }
    }

    fn render_texts(&mut self, ui: &mut egui::Ui) {
        let Some(preview) = self.state.session.preview() else {
            ui.label("Select a drawing to see its texts.");
            return;
        };
        ui.label(RichText::new(&preview.drawing.file_name).strong());
        if preview.items.is_empty() {
            ui.label("No texts found.");
            return;
        }

        egui::Grid::new("texts").striped(true).show(ui, |ui| {
            for (index, item) in preview.items.iter().enumerate() {
                let selected = self.state.selected_text == Some(index);
                if ui.selectable_label(selected, &item.layer).clicked() {
                    self.state.selected_text = Some(index);
                }
                if ui.selectable_label(selected, &item.text).clicked() {
                    self.state.selected_text = Some(index);
                }
                ui.label(RichText::new(item.position.to_string()).color(Color32::from_gray(170)));
                ui.end_row();
            }
        });
    }

    fn render_results(&self, ui: &mut egui::Ui) {
        let results = self.state.session.results();
        if results.is_empty() && self.state.failures.is_empty() {
            return;
        }
        ui.heading("Results");
        egui::Grid::new("results").striped(true).show(ui, |ui| {
            ui.label(RichText::new("ファイル名").strong());
            ui.label(RichText::new("抽出テキスト").strong());
            ui.end_row();
            for result in results {
                ui.label(&result.file_name);
                ui.label(&result.matched_text);
                ui.end_row();
            }
        });
        for failure in &self.state.failures {
            ui.label(
                RichText::new(format!("{}: {}", failure.file_name, failure.message))
                    .color(Color32::from_rgb(230, 120, 90)),
            );
        }
    }
}

pub fn configure_fonts(ctx: &egui::Context) {
    let mut fonts = FontDefinitions::default();
    let candidates = [
        r"C:\Windows\Fonts\meiryo.ttc",
        r"C:\Windows\Fonts\msgothic.ttc",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    ];

    for path in candidates {
        if let Ok(data) = std::fs::read(path) {
            fonts.font_data.insert("jp_fallback".to_string(), FontData::from_owned(data));
            fonts.families
                .entry(FontFamily::Proportional)
                .or_default()
                .insert(0, "jp_fallback".to_string());
            fonts.families
                .entry(FontFamily::Monospace)
                .or_default()
                .insert(0, "jp_fallback".to_string());
            ctx.set_fonts(fonts);
            return;
        }
    }
}

impl eframe::App for DesktopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.state.is_busy() {
            ctx.request_repaint();
        }
        self.poll_messages();
        let busy = self.state.is_busy();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.add_enabled(!busy, egui::Button::new("Open Folder")).clicked() {
                        self.open_folder();
                        ui.close_menu();
                    }
                });

                ui.menu_button("Export", |ui| {
                    ui.radio_value(&mut self.state.export_format, ExportFormat::Csv, "CSV");
                    ui.radio_value(&mut self.state.export_format, ExportFormat::Excel, "Excel");
                    let enabled = !busy && !self.state.session.results().is_empty();
                    if ui.add_enabled(enabled, egui::Button::new("Run Export")).clicked() {
                        self.run_export();
                        ui.close_menu();
                    }
                });

                ui.separator();
                ui.label("Threshold");
                ui.add(
                    egui::DragValue::new(&mut self.state.threshold)
                        .clamp_range(0.0..=10_000.0)
                        .speed(0.5),
                );
                if ui.add_enabled(!busy, egui::Button::new("Set Anchor")).clicked() {
                    self.set_anchor();
                }
                if ui.add_enabled(!busy, egui::Button::new("Batch Extract")).clicked() {
                    self.run_batch();
                }

                ui.separator();
                if !self.status.is_empty() {
                    let color = if self.warning {
                        Color32::from_rgb(246, 196, 69)
                    } else {
                        Color32::from_gray(170)
                    };
                    ui.label(RichText::new(&self.status).color(color));
                }
            });
        });

        egui::SidePanel::left("drawings").resizable(true).show(ctx, |ui| {
            ui.heading("Drawings");
            ui.label(format!("{} files", self.state.drawings.len()));
            ui.separator();
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                ui.add_enabled_ui(!busy, |ui| self.render_drawings(ui));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(progress) = &self.state.progress {
                ui.add(
                    egui::ProgressBar::new(progress.fraction())
                        .text(format!("{}/{} {}", progress.done, progress.total, progress.current)),
                );
                return;
            }

            if let Some(pattern) = self.state.session.reference() {
                ui.label(format!(
                    "Anchor: {} {} (threshold {})",
                    pattern.layer, pattern.position, pattern.threshold
                ));
                ui.separator();
            }
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.render_texts(ui);
                ui.separator();
                self.render_results(ui);
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cad_text_rust::config::Config;

    fn app(work: &std::path::Path) -> DesktopApp {
        let config = Config::default();
        DesktopApp::new(Environment {
            converter: OdaConverter::from_config(&config),
            workspace: Workspace::create(work).unwrap(),
            config,
        })
    }

    #[test]
    fn test_recovers_when_batch_worker_panics() {
        let work = tempfile::tempdir().unwrap();
        let folder = tempfile::tempdir().unwrap();
        std::fs::write(folder.path().join("a.dxf"), "").unwrap();

        let mut app = app(work.path());
        app.state.session.load_folder(folder.path()).unwrap();
        app.batch_folder = app.state.session.folder().map(|p| p.to_path_buf());
        app.state.session = Session::new();
        app.state.progress = Some(Progress::default());

        let (tx, rx) = mpsc::channel::<UiMessage>();
        app.batch_rx = Some(rx);
        app.batch_worker = Some(std::thread::spawn(move || {
            let _tx = tx;
            panic!("worker failure");
        }));

        for _ in 0..200 {
            app.poll_messages();
            if !app.state.is_busy() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert!(!app.state.is_busy());
        assert!(app.batch_rx.is_none());
        assert!(app.batch_worker.is_none());
        assert!(app.status.contains("worker failure"));
        assert_eq!(app.state.session.folder(), Some(folder.path()));
        assert_eq!(app.state.drawings.len(), 1);
    }

    #[test]
    fn test_batch_done_restores_session() {
        let work = tempfile::tempdir().unwrap();
        let mut app = app(work.path());
        app.state.progress = Some(Progress::default());

        let (tx, rx) = mpsc::channel();
        app.batch_rx = Some(rx);
        tx.send(UiMessage::Progress(Progress { done: 1, total: 2, current: "a.dxf".into() }))
            .unwrap();
        tx.send(UiMessage::BatchDone {
            session: Session::new(),
            outcome: Err(CadTextError::NoDrawingsFound("x".into())),
        })
        .unwrap();

        app.poll_messages();
        assert!(!app.state.is_busy());
        assert!(app.batch_rx.is_none());
        assert!(app.status.contains("図面が見つかりません"));
    }
}
