use crate::error::{CadTextError, Result};
use cad_text_common::DEFAULT_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[cfg(windows)]
const DEFAULT_CONVERTER: &str = r".\oda\ODAFileConverter.exe";
#[cfg(not(windows))]
const DEFAULT_CONVERTER: &str = "ODAFileConverter";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// DWG→DXF変換ツールのパス
    pub converter_path: PathBuf,
    /// 出力バージョン（例: ACAD2018）
    pub output_version: String,
    /// 出力形式（DXF）
    pub output_type: String,
    /// 変換時に監査（修復）を行うか
    pub audit: bool,
    pub timeout_seconds: u64,
    /// 特徴位置からの距離閾値（図面単位）
    pub threshold: f64,
    /// 一時作業フォルダ（未指定ならOSの一時フォルダ）
    pub work_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            converter_path: PathBuf::from(DEFAULT_CONVERTER),
            output_version: "ACAD2018".into(),
            output_type: "DXF".into(),
            audit: true,
            timeout_seconds: 60,
            threshold: DEFAULT_THRESHOLD,
            work_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CadTextError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("cad-text").join("config.json"))
    }

    /// 一時作業フォルダのルート
    pub fn work_root(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("cad-text"))
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)?;
        if self.timeout_seconds == 0 {
            return Err(CadTextError::Config("タイムアウトは1秒以上を指定してください".into()));
        }
        Ok(())
    }

    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(CadTextError::Config(format!(
            "閾値は0以上の数値を指定してください: {}",
            threshold
        )));
    }
    Ok(())
}
