//! 一時作業フォルダ
//!
//! - input: 単一ファイル変換用にDWGをコピーする
//! - output: 単一ファイル変換の出力先
//! - batch_output: 一括変換の出力先

use crate::error::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    input_dir: PathBuf,
    output_dir: PathBuf,
    batch_output_dir: PathBuf,
}

impl Workspace {
    /// 作業フォルダを作成（既存なら再利用）
    pub fn create(root: &Path) -> Result<Self> {
        let workspace = Self {
            root: root.to_path_buf(),
            input_dir: root.join("temp_input"),
            output_dir: root.join("temp_output"),
            batch_output_dir: root.join("temp_batch_output"),
        };
        for dir in [&workspace.input_dir, &workspace.output_dir, &workspace.batch_output_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn batch_output_dir(&self) -> &Path {
        &self.batch_output_dir
    }

    /// 単一ファイル変換用フォルダを空にする
    pub fn clear_single(&self) -> Result<()> {
        clear_dir(&self.input_dir)?;
        clear_dir(&self.output_dir)
    }

    /// 一括変換の出力フォルダを空にする
    pub fn clear_batch(&self) -> Result<()> {
        clear_dir(&self.batch_output_dir)
    }
}

fn clear_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}
