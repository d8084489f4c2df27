//! Excel生成（共通ライブラリ）
//!
//! CSVと同じ2列（ファイル名・抽出テキスト）を1シートに書き出す

use super::HEADER;
use crate::error::{Error, Result};
use crate::types::MatchResult;
use rust_xlsxwriter::{Format, FormatBorder, Workbook, XlsxError};
use std::path::Path;

/// シート名
pub const SHEET_NAME: &str = "抽出結果";

const FILE_NAME_COL_WIDTH: f64 = 32.0;
const TEXT_COL_WIDTH: f64 = 60.0;

impl From<XlsxError> for Error {
    fn from(e: XlsxError) -> Self {
        Error::Excel(e.to_string())
    }
}

fn build_workbook(results: &[MatchResult]) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    worksheet.set_column_width(0, FILE_NAME_COL_WIDTH)?;
    worksheet.set_column_width(1, TEXT_COL_WIDTH)?;

    for (col, label) in HEADER.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *label, &header_format)?;
    }

    for (idx, result) in results.iter().enumerate() {
        let row = idx as u32 + 1;
        worksheet.write_string(row, 0, &result.file_name)?;
        worksheet.write_string(row, 1, &result.matched_text)?;
    }

    Ok(workbook)
}

/// Excelをバッファに生成
pub fn generate_excel_buffer(results: &[MatchResult]) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(results)?;
    Ok(workbook.save_to_buffer()?)
}

/// Excelファイルを保存
pub fn save_excel(results: &[MatchResult], path: &Path) -> Result<()> {
    let mut workbook = build_workbook(results)?;
    workbook.save(path)?;
    Ok(())
}
