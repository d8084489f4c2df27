//! 抽出結果の型定義
//!
//! CLIとデスクトップ版で共有される型:
//! - TextItem: 図面から抽出した文字（1ファイルのスキャン中のみ有効）
//! - ReferencePattern: オペレータが選んだ特徴文字の位置と閾値
//! - MatchResult: 1図面ぶんの照合結果（エクスポート単位）

use serde::{Deserialize, Serialize};
use std::fmt;

/// 2次元座標（図面単位）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// ユークリッド距離
    pub fn distance_to(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// 文字の出どころ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextSource {
    /// 単独のTEXTエンティティ
    #[default]
    Text,
    /// ブロック参照（INSERT）に付いた属性
    Attribute,
}

/// 図面から抽出した文字
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextItem {
    pub text: String,
    pub layer: String,
    pub position: Point2,
    #[serde(default)]
    pub source: TextSource,
}

impl TextItem {
    pub fn new(text: impl Into<String>, layer: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            text: text.into(),
            layer: layer.into(),
            position: Point2::new(x, y),
            source: TextSource::Text,
        }
    }

    /// 一覧表示用のラベル（"画層: 文字"）
    pub fn display_label(&self) -> String {
        format!("{}: {}", self.layer, self.text)
    }
}

/// 特徴文字の位置パターン
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencePattern {
    pub layer: String,
    pub position: Point2,
    pub threshold: f64,
}

impl ReferencePattern {
    pub fn new(layer: impl Into<String>, position: Point2, threshold: f64) -> Self {
        Self {
            layer: layer.into(),
            position,
            threshold,
        }
    }

    /// 選択した文字から特徴パターンを作成
    pub fn from_item(item: &TextItem, threshold: f64) -> Self {
        Self::new(item.layer.clone(), item.position, threshold)
    }

    /// 画層が完全一致し、距離が閾値以下なら一致
    pub fn matches(&self, item: &TextItem) -> bool {
        item.layer == self.layer && item.position.distance_to(&self.position) <= self.threshold
    }
}

/// 図面1件の照合結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub file_name: String,
    /// 一致した文字（", " 区切り、出現順）
    pub matched_text: String,
}
