//! 作業セッション
//!
//! 選択中のフォルダ、プレビュー中の図面と検出文字、特徴パターン、
//! 一括抽出の結果を1つのオブジェクトにまとめ、各操作に明示的に渡す。
//!
//! 操作の流れ:
//! 1. load_folder: 図面一覧を読み込む
//! 2. preview: 図面1件を変換して文字を検出する
//! 3. select_anchor: 検出文字から特徴パターンを設定する
//! 4. batch_process: フォルダ全体を順に照合する（失敗した図面は記録して続行）
//! 5. export: 照合結果を出力する

use crate::cli::ExportFormat;
use crate::config;
use crate::converter::{self, DrawingConverter};
use crate::error::{CadTextError, Result};
use crate::export;
use crate::scanner::{self, DrawingInfo, DrawingKind};
use crate::workspace::Workspace;
use cad_text_common::{extract_text_items, match_drawing, DxfDocument, MatchResult, ReferencePattern, TextItem};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// プレビュー中の図面
#[derive(Debug, Clone)]
pub struct Preview {
    pub drawing: DrawingInfo,
    pub items: Vec<TextItem>,
}

/// 一括抽出で処理できなかった図面
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub file_name: String,
    pub message: String,
}

/// 一括抽出の結果
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub results: Vec<MatchResult>,
    pub failures: Vec<BatchFailure>,
    /// 読み込みを試みた図面の数
    pub scanned: usize,
}

#[derive(Debug, Default)]
pub struct Session {
    folder: Option<PathBuf>,
    drawings: Vec<DrawingInfo>,
    preview: Option<Preview>,
    reference: Option<ReferencePattern>,
    results: Vec<MatchResult>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// フォルダを選択して図面一覧を読み込む
    pub fn load_folder(&mut self, folder: &Path) -> Result<&[DrawingInfo]> {
        let drawings = scanner::scan_folder(folder)?;
        debug!(folder = %folder.display(), count = drawings.len(), "図面一覧を読み込み");
        self.folder = Some(folder.to_path_buf());
        self.drawings = drawings;
        self.preview = None;
        Ok(&self.drawings)
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn drawings(&self) -> &[DrawingInfo] {
        &self.drawings
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn reference(&self) -> Option<&ReferencePattern> {
        self.reference.as_ref()
    }

    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    /// 図面1件を読み込み、検出文字をプレビューとして保持する
    ///
    /// 変換に失敗した場合は直前のプレビューを破棄してエラーを返す。
    pub async fn preview_drawing<C: DrawingConverter>(
        &mut self,
        converter: &C,
        workspace: &Workspace,
        drawing: &DrawingInfo,
    ) -> Result<&[TextItem]> {
        self.preview = None;
        let items = load_text_items(converter, workspace, drawing).await?;
        debug!(file = %drawing.file_name, count = items.len(), "文字を検出");
        let preview = self.preview.insert(Preview {
            drawing: drawing.clone(),
            items,
        });
        Ok(&preview.items)
    }

    /// プレビュー中の文字を特徴パターンに設定（再選択で上書き）
    pub fn select_anchor(&mut self, index: usize, threshold: f64) -> Result<&ReferencePattern> {
        config::validate_threshold(threshold)?;
        let preview = self.preview.as_ref().ok_or(CadTextError::NoPreview)?;
        let item = preview.items.get(index).ok_or(CadTextError::AnchorOutOfRange {
            index,
            len: preview.items.len(),
        })?;
        let pattern = ReferencePattern::from_item(item, threshold);
        info!(layer = %pattern.layer, position = %pattern.position, threshold, "特徴パターンを設定");
        Ok(self.reference.insert(pattern))
    }

    /// 特徴パターンを直接設定
    pub fn set_reference(&mut self, pattern: ReferencePattern) {
        self.reference = Some(pattern);
    }

    /// フォルダ内の全図面を順に照合する
    ///
    /// DWGは一括変換してから、DXFはそのまま読む。図面ごとの読み込み失敗は
    /// 記録して次の図面に進む。変換ツール自体の失敗は一括処理全体を中断し、
    /// その場合は前回の結果をそのまま残す。
    pub async fn batch_process<C, F>(
        &mut self,
        converter: &C,
        workspace: &Workspace,
        mut on_progress: F,
    ) -> Result<BatchReport>
    where
        C: DrawingConverter,
        F: FnMut(usize, usize, &str),
    {
        let pattern = self.reference.clone().ok_or(CadTextError::NoReferencePattern)?;
        let folder = self
            .folder
            .clone()
            .ok_or_else(|| CadTextError::FolderNotFound("フォルダが選択されていません".into()))?;

        // 一覧を最新にする
        self.drawings = scanner::scan_folder(&folder)?;
        if self.drawings.is_empty() {
            return Err(CadTextError::NoDrawingsFound(folder.display().to_string()));
        }

        let mut report = BatchReport::default();
        let mut targets: Vec<(DrawingInfo, bool)> = Vec::new();
        let mut converted_stems: HashSet<String> = HashSet::new();

        let dwgs: Vec<&DrawingInfo> = self.drawings.iter().filter(|d| d.kind == DrawingKind::Dwg).collect();
        if !dwgs.is_empty() {
            let converted = converter::convert_batch(converter, workspace, &folder).await?;
            converted_stems = converted.iter().map(|d| d.base_name().to_lowercase()).collect();

            // 変換ツールが正常終了してもDXFが出ていない図面は失敗として残す
            for dwg in dwgs {
                if converted_stems.contains(&dwg.base_name().to_lowercase()) {
                    continue;
                }
                let err = CadTextError::ConvertedFileMissing(format!("{}.dxf", dwg.base_name()));
                warn!(file = %dwg.file_name, error = %err, "変換結果がありません、スキップ");
                report.scanned += 1;
                report.failures.push(BatchFailure {
                    file_name: dwg.file_name.clone(),
                    message: err.to_string(),
                });
            }
            targets.extend(converted.into_iter().map(|d| (d, true)));
        }

        for drawing in self.drawings.iter().filter(|d| d.kind == DrawingKind::Dxf) {
            // 同名のDWGを変換した結果を優先する
            if converted_stems.contains(&drawing.base_name().to_lowercase()) {
                info!(file = %drawing.file_name, "同名のDWGを変換済みのためスキップ");
                continue;
            }
            targets.push((drawing.clone(), false));
        }
        targets.sort_by(|a, b| a.0.file_name.cmp(&b.0.file_name));

        let total = targets.len();

        for (idx, (drawing, converted)) in targets.iter().enumerate() {
            on_progress(idx, total, &drawing.file_name);
            report.scanned += 1;

            match scan_drawing(&drawing.path, &drawing.file_name, &pattern) {
                Ok(Some(result)) => {
                    debug!(file = %drawing.file_name, matched = %result.matched_text, "一致");
                    report.results.push(result);
                }
                Ok(None) => debug!(file = %drawing.file_name, "一致なし"),
                Err(e) => {
                    warn!(file = %drawing.file_name, error = %e, "図面の処理に失敗、スキップ");
                    report.failures.push(BatchFailure {
                        file_name: drawing.file_name.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            }

            if *converted {
                if let Err(e) = std::fs::remove_file(&drawing.path) {
                    warn!(file = %drawing.path.display(), error = %e, "変換済みDXFを削除できません");
                }
            }
        }
        on_progress(total, total, "");

        info!(
            scanned = report.scanned,
            matched = report.results.len(),
            failed = report.failures.len(),
            "一括抽出完了"
        );

        self.results = report.results.clone();
        Ok(report)
    }

    /// 照合結果を出力
    pub fn export(&self, format: ExportFormat, output: &Path) -> Result<PathBuf> {
        export::export_results(&self.results, format, output)
    }
}

/// 図面1件の文字を読み込む（DWGは変換してから）
pub async fn load_text_items<C: DrawingConverter>(
    converter: &C,
    workspace: &Workspace,
    drawing: &DrawingInfo,
) -> Result<Vec<TextItem>> {
    match drawing.kind {
        DrawingKind::Dxf => read_text_items(&drawing.path),
        DrawingKind::Dwg => {
            let dxf_path = converter::convert_single(converter, workspace, drawing).await?;
            let items = read_text_items(&dxf_path);
            std::fs::remove_file(&dxf_path)?;
            items
        }
    }
}

/// DXFファイルから文字を読み込む
pub fn read_text_items(path: &Path) -> Result<Vec<TextItem>> {
    let doc = DxfDocument::from_path(path)?;
    Ok(extract_text_items(&doc).collect())
}

/// DXF1件を照合する
pub fn scan_drawing(path: &Path, file_name: &str, pattern: &ReferencePattern) -> Result<Option<MatchResult>> {
    let doc = DxfDocument::from_path(path)?;
    Ok(match_drawing(file_name, pattern, extract_text_items(&doc)))
}
