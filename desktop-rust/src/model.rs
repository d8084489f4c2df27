use cad_text_rust::cli::ExportFormat;
use cad_text_rust::scanner::DrawingInfo;
use cad_text_rust::session::{BatchFailure, Session};

/// 一括抽出の進捗
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub current: String,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.done as f32 / self.total as f32
        }
    }
}

#[derive(Debug)]
pub struct AppState {
    pub session: Session,
    /// 一括抽出中はセッションを別スレッドへ渡すため、一覧は手元に複製しておく
    pub drawings: Vec<DrawingInfo>,
    pub selected_drawing: Option<usize>,
    pub selected_text: Option<usize>,
    pub threshold: f64,
    pub export_format: ExportFormat,
    pub failures: Vec<BatchFailure>,
    pub progress: Option<Progress>,
}

impl AppState {
    pub fn new(threshold: f64) -> Self {
        Self {
            session: Session::new(),
            drawings: Vec::new(),
            selected_drawing: None,
            selected_text: None,
            threshold,
            export_format: ExportFormat::default(),
            failures: Vec::new(),
            progress: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.progress.is_some()
    }
}
