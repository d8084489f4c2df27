use crate::error::{CadTextError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 図面ファイルの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingKind {
    /// 変換が必要
    Dwg,
    /// そのまま読める
    Dxf,
}

#[derive(Debug, Clone)]
pub struct DrawingInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: DrawingKind,
}

impl DrawingInfo {
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CadTextError::FileNotFound(path.display().to_string()));
        }
        let kind = drawing_kind(path)
            .ok_or_else(|| CadTextError::FileNotFound(format!("図面ではありません: {}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            kind,
        })
    }

    /// 拡張子を除いたファイル名（変換後のDXF名の元）
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// 拡張子から図面種別を判定（大文字小文字は区別しない）
pub fn drawing_kind(path: &Path) -> Option<DrawingKind> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "dwg" => Some(DrawingKind::Dwg),
        "dxf" => Some(DrawingKind::Dxf),
        _ => None,
    }
}

pub fn scan_folder(folder: &Path) -> Result<Vec<DrawingInfo>> {
    if !folder.is_dir() {
        return Err(CadTextError::FolderNotFound(folder.display().to_string()));
    }

    let mut drawings = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if let Some(kind) = drawing_kind(path) {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            drawings.push(DrawingInfo {
                path: path.to_path_buf(),
                file_name,
                kind,
            });
        }
    }

    // ファイル名でソート
    drawings.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(drawings)
}

/// 指定フォルダ直下のDXFをファイル名順に列挙（一括変換の出力側）
pub fn scan_dxf_files(folder: &Path) -> Result<Vec<DrawingInfo>> {
    Ok(scan_folder(folder)?
        .into_iter()
        .filter(|d| d.kind == DrawingKind::Dxf)
        .collect())
}
