//! CAD Text Common Library
//!
//! CLIとデスクトップ版で共有される型とロジック:
//! - DXF読み込み（ENTITIESセクション）
//! - 文字エンティティの抽出
//! - 特徴位置との近接照合
//! - CSV/Excel出力

pub mod types;
pub mod error;
pub mod dxf;
pub mod extract;
pub mod matcher;
pub mod export;

pub use types::{MatchResult, Point2, ReferencePattern, TextItem, TextSource};
pub use error::{Error, Result};
pub use dxf::{DxfDocument, DxfEntity};
pub use extract::{extract_text_items, text_items};
pub use matcher::{distance, match_drawing, match_texts, DEFAULT_THRESHOLD};
