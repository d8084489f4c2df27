//! DWG→DXF変換ツール連携モジュール
//!
//! 変換ツールは位置引数で呼び出す:
//! `<入力フォルダ> <出力フォルダ> <出力バージョン> <出力形式> <再帰> <監査> [フィルタ]`
//!
//! 出力ファイル名は入力ファイルの拡張子を除いた名前 + ".dxf" になる前提。

use crate::config::Config;
use crate::error::{CadTextError, Result};
use crate::scanner::{self, DrawingInfo};
use crate::workspace::Workspace;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// 一括変換時のフィルタ（DXFは変換せずそのまま読む）
pub const BATCH_FILTER: &str = "*.DWG";

/// 図面フォルダを変換する能力
#[allow(async_fn_in_trait)]
pub trait DrawingConverter {
    /// `input_dir` の図面を `output_dir` にDXFとして出力する
    async fn convert(&self, input_dir: &Path, output_dir: &Path, filter: Option<&str>) -> Result<()>;
}

/// 外部の変換ツール（ODA File Converter 互換）
#[derive(Debug, Clone)]
pub struct OdaConverter {
    pub path: PathBuf,
    pub output_version: String,
    pub output_type: String,
    pub audit: bool,
    pub timeout: Duration,
}

impl OdaConverter {
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.converter_path.clone(),
            output_version: config.output_version.clone(),
            output_type: config.output_type.clone(),
            audit: config.audit,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// 変換ツールへの引数を組み立てる
    pub fn build_args(&self, input_dir: &Path, output_dir: &Path, filter: Option<&str>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            input_dir.as_os_str().to_owned(),
            output_dir.as_os_str().to_owned(),
            self.output_version.clone().into(),
            self.output_type.clone().into(),
            // 再帰しない
            "0".into(),
            OsString::from(if self.audit { "1" } else { "0" }),
        ];
        if let Some(filter) = filter {
            args.push(filter.into());
        }
        args
    }
}

impl DrawingConverter for OdaConverter {
    async fn convert(&self, input_dir: &Path, output_dir: &Path, filter: Option<&str>) -> Result<()> {
        // 作業ディレクトリを変えるため、パスはすべて絶対パスにする
        let program = absolute(&self.path);
        let args = self.build_args(&absolute(input_dir), &absolute(output_dir), filter);
        debug!(converter = %program.display(), ?args, "変換ツール起動");

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // 変換ツールは自身のフォルダで実行する（同梱DLLの解決のため）
        if let Some(dir) = program.parent().filter(|d| d.is_dir()) {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| CadTextError::ConverterLaunch {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Err(CadTextError::ConverterTimeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CadTextError::ConverterFailed {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(status = ?output.status.code(), "変換ツール終了");
        Ok(())
    }
}

/// 図面1件をDXFに変換し、出力されたDXFのパスを返す
///
/// 入力用コピーは変換後に削除する。DXFの削除は呼び出し側で行う。
pub async fn convert_single<C: DrawingConverter>(
    converter: &C,
    workspace: &Workspace,
    drawing: &DrawingInfo,
) -> Result<PathBuf> {
    workspace.clear_single()?;

    let temp_input = workspace.input_dir().join(&drawing.file_name);
    std::fs::copy(&drawing.path, &temp_input)?;

    let converted = converter
        .convert(workspace.input_dir(), workspace.output_dir(), Some(&drawing.file_name))
        .await;

    if temp_input.exists() {
        std::fs::remove_file(&temp_input)?;
    }
    converted?;

    converted_path(workspace.output_dir(), &drawing.base_name())
        .ok_or_else(|| CadTextError::ConvertedFileMissing(format!("{}.dxf", drawing.base_name())))
}

/// フォルダ内のDWGを一括変換し、出力DXFをファイル名順に返す
pub async fn convert_batch<C: DrawingConverter>(
    converter: &C,
    workspace: &Workspace,
    folder: &Path,
) -> Result<Vec<DrawingInfo>> {
    workspace.clear_batch()?;
    converter
        .convert(folder, workspace.batch_output_dir(), Some(BATCH_FILTER))
        .await?;
    scanner::scan_dxf_files(workspace.batch_output_dir())
}

fn absolute(path: &Path) -> PathBuf {
    // 単独のコマンド名はPATH検索に任せる
    if path.parent().map_or(true, |p| p.as_os_str().is_empty()) && !path.exists() {
        return path.to_path_buf();
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn converted_path(output_dir: &Path, base_name: &str) -> Option<PathBuf> {
    ["dxf", "DXF"]
        .iter()
        .map(|ext| output_dir.join(format!("{}.{}", base_name, ext)))
        .find(|p| p.is_file())
}
