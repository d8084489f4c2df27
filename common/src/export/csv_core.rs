//! CSV生成（共通ライブラリ）
//!
//! 見出し1行 + 照合結果1件につき1行の2列形式

use super::HEADER;
use crate::error::{Error, Result};
use crate::types::MatchResult;
use std::io::Write;
use std::path::Path;

/// 任意のWriterへCSVを書き出す
pub fn write_csv<W: Write>(writer: W, results: &[MatchResult]) -> Result<W> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for result in results {
        wtr.write_record([result.file_name.as_str(), result.matched_text.as_str()])?;
    }
    wtr.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// CSVをバッファに生成
pub fn generate_csv_buffer(results: &[MatchResult]) -> Result<Vec<u8>> {
    write_csv(Vec::new(), results)
}

/// CSVファイルを保存
pub fn save_csv(results: &[MatchResult], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut file = write_csv(std::io::BufWriter::new(file), results)?;
    file.flush()?;
    Ok(())
}
