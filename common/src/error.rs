//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DXF parse error (line {line}): {message}")]
    Dxf { line: usize, message: String },

    #[error("Unsupported drawing format: {0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(String),
}

impl Error {
    pub(crate) fn dxf(line: usize, message: impl Into<String>) -> Self {
        Error::Dxf {
            line,
            message: message.into(),
        }
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
