use crate::cli::ExportFormat;
use crate::error::{CadTextError, Result};
use cad_text_common::export::csv_core;
use cad_text_common::export::excel_core;
use cad_text_common::MatchResult;
use std::path::{Path, PathBuf};

/// 既定の出力ファイル名（拡張子なし）
pub const DEFAULT_FILE_STEM: &str = "抽出結果";

/// 出力先がフォルダ（または拡張子なし）ならその中に既定名で作る
pub fn output_path_for_format(output: &Path, format: ExportFormat) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", DEFAULT_FILE_STEM, format.extension()))
    } else {
        output.to_path_buf()
    }
}

/// 照合結果を出力し、書き出したパスを返す
pub fn export_results(results: &[MatchResult], format: ExportFormat, output: &Path) -> Result<PathBuf> {
    if results.is_empty() {
        return Err(CadTextError::NoResults);
    }

    let output_path = output_path_for_format(output, format);
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        ExportFormat::Csv => csv_core::save_csv(results, &output_path)?,
        ExportFormat::Excel => excel_core::save_excel(results, &output_path)?,
    }

    Ok(output_path)
}
