use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use cad_text_rust::cli::ExportFormat;
use cad_text_rust::config::Config;
use cad_text_rust::converter::OdaConverter;
use cad_text_rust::export::DEFAULT_FILE_STEM;
use cad_text_rust::workspace::Workspace;

/// 起動時に読み込む設定一式
pub struct Environment {
    pub config: Config,
    pub converter: OdaConverter,
    pub workspace: Workspace,
}

pub fn load_environment() -> Result<Environment> {
    let config = Config::load().context("load config")?;
    config.validate().context("validate config")?;
    let root = config.work_root();
    let workspace = Workspace::create(&root).with_context(|| format!("create {}", root.display()))?;
    let converter = OdaConverter::from_config(&config);
    Ok(Environment { config, converter, workspace })
}

/// 保存ダイアログの初期ファイル名
pub fn default_export_name(format: ExportFormat) -> String {
    format!("{}.{}", DEFAULT_FILE_STEM, format.extension())
}

/// 保存ダイアログの初期フォルダ（選択中のフォルダ）
pub fn default_export_dir(folder: Option<&Path>) -> Option<PathBuf> {
    folder.filter(|p| p.is_dir()).map(Path::to_path_buf)
}
