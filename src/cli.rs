use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cad-text")]
#[command(about = "CAD図面の文字抽出ツール（特徴位置の近接照合）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 変換ツールのパス（設定ファイルより優先）
    #[arg(long, global = true)]
    pub converter: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// フォルダ内の図面を一覧表示
    List {
        /// 図面フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,
    },

    /// 図面1件を変換して検出文字を表示
    Preview {
        /// 図面ファイル（.dwg / .dxf）
        #[arg(required = true)]
        file: PathBuf,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 見本図面から特徴文字を選び、フォルダ全体を一括抽出して出力
    Run {
        /// 図面フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 見本図面（省略時はフォルダ内の先頭の図面）
        #[arg(short, long)]
        sample: Option<PathBuf>,

        /// 特徴文字の番号（previewの番号。省略時は対話選択）
        #[arg(short, long)]
        anchor: Option<usize>,

        /// 距離閾値（省略時は設定値）
        #[arg(short, long)]
        threshold: Option<f64>,

        /// 出力ファイル/ディレクトリ（デフォルト: 図面フォルダ）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (csv/excel)
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,
    },

    /// 画層・座標を直接指定して一括抽出
    Extract {
        /// 図面フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// 画層名（大文字小文字を区別）
        #[arg(short, long)]
        layer: String,

        /// 基準X座標
        #[arg(short, long, allow_hyphen_values = true)]
        x: f64,

        /// 基準Y座標
        #[arg(short, long, allow_hyphen_values = true)]
        y: f64,

        /// 距離閾値（省略時は設定値）
        #[arg(short, long)]
        threshold: Option<f64>,

        /// 出力ファイル/ディレクトリ（デフォルト: 図面フォルダ）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (csv/excel)
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,
    },

    /// 設定を表示/編集
    Config {
        /// 変換ツールのパスを設定
        #[arg(long)]
        set_converter: Option<PathBuf>,

        /// 距離閾値を設定
        #[arg(long)]
        set_threshold: Option<f64>,

        /// 変換タイムアウト（秒）を設定
        #[arg(long)]
        set_timeout: Option<u64>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Excel,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            _ => Err(format!("Unknown format: {}. Use csv or excel", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Excel => write!(f, "excel"),
        }
    }
}
