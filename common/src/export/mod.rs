//! Export core modules shared across CLI and desktop wrappers.

pub mod csv_core;

#[cfg(feature = "excel")]
pub mod excel_core;

/// 出力ファイルの見出し行
pub const HEADER: [&str; 2] = ["ファイル名", "抽出テキスト"];
