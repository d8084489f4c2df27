//! 近接照合
//!
//! 特徴パターン（画層・位置・閾値）に対して、図面1件ぶんの文字を
//! 出現順に判定する。距離は閾値以下（境界を含む）で一致とする。

use crate::types::{MatchResult, Point2, ReferencePattern, TextItem};

/// 既定の距離閾値（図面単位）
pub const DEFAULT_THRESHOLD: f64 = 20.0;

/// 照合結果の区切り文字
pub const JOIN_SEPARATOR: &str = ", ";

/// 2点間のユークリッド距離
pub fn distance(a: &Point2, b: &Point2) -> f64 {
    a.distance_to(b)
}

/// 一致した文字を出現順に返す
pub fn match_texts<'a, I>(pattern: &ReferencePattern, items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a TextItem>,
{
    items
        .into_iter()
        .filter(|item| pattern.matches(item))
        .map(|item| item.text.clone())
        .collect()
}

/// 図面1件を照合し、一致がなければ None
pub fn match_drawing<I>(file_name: &str, pattern: &ReferencePattern, items: I) -> Option<MatchResult>
where
    I: IntoIterator<Item = TextItem>,
{
    let matched: Vec<String> = items
        .into_iter()
        .filter(|item| pattern.matches(item))
        .map(|item| item.text)
        .collect();

    if matched.is_empty() {
        return None;
    }

    Some(MatchResult {
        file_name: file_name.to_string(),
        matched_text: matched.join(JOIN_SEPARATOR),
    })
}
