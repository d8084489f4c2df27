//! 結合テスト用の補助
//!
//! - DXFテキストの組み立て
//! - 変換ツールの代わり（DWGとして置いたDXFテキストをそのままコピーする）

#![allow(dead_code)]

use cad_text_rust::converter::DrawingConverter;
use cad_text_rust::error::{CadTextError, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

pub fn dxf_with_entities(entities: &str) -> String {
    format!(
        "  0\nSECTION\n  2\nENTITIES\n{}  0\nENDSEC\n  0\nEOF\n",
        entities
    )
}

pub fn text(layer: &str, value: &str, x: f64, y: f64) -> String {
    format!(
        "  0\nTEXT\n  8\n{}\n 10\n{}\n 20\n{}\n 30\n0.0\n  1\n{}\n",
        layer, x, y, value
    )
}

pub fn title_block(layer: &str, attribs: &[(&str, f64, f64)]) -> String {
    let mut out = format!("  0\nINSERT\n  8\n{}\n 66\n1\n  2\nTITLE\n 10\n0.0\n 20\n0.0\n", layer);
    for (value, x, y) in attribs {
        out.push_str(&format!(
            "  0\nATTRIB\n  8\n0\n 10\n{}\n 20\n{}\n  1\n{}\n  2\nTAG\n",
            x, y, value
        ));
    }
    out.push_str("  0\nSEQEND\n");
    out
}

/// 属性が続く旨（66）の指定がないブロック参照
pub fn title_block_without_follow_flag(layer: &str, value: &str, x: f64, y: f64) -> String {
    format!(
        "  0\nINSERT\n  8\n{}\n  2\nTITLE\n 10\n0.0\n 20\n0.0\n  0\nATTRIB\n  8\n0\n 10\n{}\n 20\n{}\n  1\n{}\n  2\nTAG\n  0\nSEQEND\n",
        layer, x, y, value
    )
}

/// 変換呼び出しの記録
#[derive(Debug, Clone)]
pub struct ConvertCall {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FakeMode {
    /// DWGを <名前>.dxf としてコピー
    Copy,
    /// 指定した名前のDWGだけコピーし、ほかは黙って出力しない
    CopyOnly(&'static str),
    /// 何も出力しない
    NoOutput,
    /// 終了コード2で失敗
    Fail,
}

pub struct FakeConverter {
    pub mode: FakeMode,
    pub calls: RefCell<Vec<ConvertCall>>,
}

impl FakeConverter {
    pub fn new(mode: FakeMode) -> Self {
        Self {
            mode,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl DrawingConverter for FakeConverter {
    async fn convert(&self, input_dir: &Path, output_dir: &Path, filter: Option<&str>) -> Result<()> {
        self.calls.borrow_mut().push(ConvertCall {
            input_dir: input_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            filter: filter.map(str::to_string),
        });

        match self.mode {
            FakeMode::Fail => {
                return Err(CadTextError::ConverterFailed {
                    code: Some(2),
                    stderr: "audit failed".to_string(),
                })
            }
            FakeMode::NoOutput => return Ok(()),
            FakeMode::Copy | FakeMode::CopyOnly(_) => {}
        }

        for entry in std::fs::read_dir(input_dir)? {
            let path = entry?.path();
            let is_dwg = path
                .extension()
                .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case("dwg"));
            if !is_dwg {
                continue;
            }
            let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
            if matches!(self.mode, FakeMode::CopyOnly(only) if only != stem) {
                continue;
            }
            std::fs::copy(&path, output_dir.join(format!("{}.dxf", stem)))?;
        }
        Ok(())
    }
}
