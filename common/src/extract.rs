//! 文字エンティティの抽出
//!
//! エンティティ種別（TEXT / INSERT+ATTRIB）の違いをここで吸収し、
//! 照合側には一様な TextItem の列だけを渡す。

use crate::dxf::{DxfDocument, DxfEntity};
use crate::types::{TextItem, TextSource};

/// エンティティ1件から文字を取り出す
///
/// 属性の画層は、所属するブロック参照（INSERT）の画層を使う。
pub fn text_items(entity: &DxfEntity) -> Vec<TextItem> {
    match entity {
        DxfEntity::Text { layer, text, insert } => vec![TextItem {
            text: text.clone(),
            layer: layer.clone(),
            position: *insert,
            source: TextSource::Text,
        }],
        DxfEntity::Insert { layer, attribs, .. } => attribs
            .iter()
            .map(|attrib| TextItem {
                text: attrib.text.clone(),
                layer: layer.clone(),
                position: attrib.insert,
                source: TextSource::Attribute,
            })
            .collect(),
        DxfEntity::Other { .. } => Vec::new(),
    }
}

/// 図面全体の文字を出現順に遅延列挙
pub fn extract_text_items(doc: &DxfDocument) -> impl Iterator<Item = TextItem> + '_ {
    doc.entities().iter().flat_map(text_items)
}
