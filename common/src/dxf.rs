//! DXF読み込み（ASCII形式のみ）
//!
//! 変換ツールが出力したDXFのENTITIESセクションを読み、
//! 文字抽出に必要なエンティティだけを型付きで保持する。
//!
//! 使用するグループコード:
//! - 0: エンティティ種別 / セクション区切り
//! - 1: 文字列値
//! - 2: ブロック名 / 属性タグ / セクション名
//! - 8: 画層
//! - 10, 20: 挿入点 X, Y
//! - 66: 属性が後続するか
//! - 67: ペーパー空間フラグ

use crate::error::{Error, Result};
use crate::types::Point2;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::path::Path;

const BINARY_SENTINEL: &[u8] = b"AutoCAD Binary DXF";
const DEFAULT_LAYER: &str = "0";
/// この版以降のDXFはUTF-8
const UTF8_VERSION: &str = "AC1021";

/// ブロック参照に付いた属性
#[derive(Debug, Clone, PartialEq)]
pub struct Attrib {
    pub tag: String,
    pub text: String,
    pub layer: String,
    pub insert: Point2,
}

/// モデル空間のエンティティ
#[derive(Debug, Clone, PartialEq)]
pub enum DxfEntity {
    Text {
        layer: String,
        text: String,
        insert: Point2,
    },
    Insert {
        layer: String,
        block: String,
        insert: Point2,
        attribs: Vec<Attrib>,
    },
    Other {
        kind: String,
        layer: String,
    },
}

impl DxfEntity {
    /// DXF上のエンティティ名
    pub fn kind(&self) -> &str {
        match self {
            DxfEntity::Text { .. } => "TEXT",
            DxfEntity::Insert { .. } => "INSERT",
            DxfEntity::Other { kind, .. } => kind,
        }
    }

    pub fn layer(&self) -> &str {
        match self {
            DxfEntity::Text { layer, .. }
            | DxfEntity::Insert { layer, .. }
            | DxfEntity::Other { layer, .. } => layer,
        }
    }
}

/// 読み込み済みの図面
#[derive(Debug, Clone, Default)]
pub struct DxfDocument {
    entities: Vec<DxfEntity>,
}

impl DxfDocument {
    /// ファイルから読み込み
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// バイト列から読み込み
    ///
    /// AC1021（2007形式）以降はUTF-8。それより古い形式は $DWGCODEPAGE の
    /// コードページで読む。正しく読めない文字がある場合は UnsupportedFormat。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(BINARY_SENTINEL) {
            return Err(Error::UnsupportedFormat("binary DXF".into()));
        }
        let content = decode(bytes)?;
        Self::parse(&content)
    }

    /// DXFテキストをパース
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let pairs = read_pairs(content)?;
        let records = entity_records(&pairs)?;
        let entities = build_entities(&records)?;
        Ok(Self { entities })
    }

    /// モデル空間のエンティティ（出現順）
    pub fn entities(&self) -> &[DxfEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// 文字コードを判定してデコード
fn decode(bytes: &[u8]) -> Result<Cow<'_, str>> {
    // ヘッダ変数はASCIIなので、仮デコードで十分読める
    let header_view = String::from_utf8_lossy(bytes);
    let pairs = read_pairs(header_view.strip_prefix('\u{feff}').unwrap_or(&header_view))?;
    let version = header_value(&pairs, "$ACADVER");
    let codepage = header_value(&pairs, "$DWGCODEPAGE");

    let legacy = version.is_some_and(|v| v < UTF8_VERSION);
    if let Some(codepage) = codepage.filter(|_| legacy) {
        let encoding = codepage_encoding(codepage)
            .ok_or_else(|| Error::UnsupportedFormat(format!("code page {}", codepage)))?;
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(Error::UnsupportedFormat(format!("text is not valid {}", codepage)));
        }
        return Ok(text);
    }

    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| Error::UnsupportedFormat(format!("text is not valid UTF-8 ({})", e)))
}

/// HEADERセクションの変数値（例: $ACADVER → "AC1032"）
fn header_value<'a>(pairs: &[Pair<'a>], name: &str) -> Option<&'a str> {
    pairs
        .windows(2)
        .take_while(|w| !w[0].is(0, "ENDSEC"))
        .find(|w| w[0].is(9, name))
        .map(|w| w[1].value.trim())
}

/// "ANSI_932" などのコードページ名からエンコーディングを引く
fn codepage_encoding(codepage: &str) -> Option<&'static Encoding> {
    let number: u16 = codepage.trim().to_ascii_uppercase().strip_prefix("ANSI_")?.parse().ok()?;
    let label = match number {
        932 => "shift_jis".to_string(),
        936 => "gbk".to_string(),
        949 => "euc-kr".to_string(),
        950 => "big5".to_string(),
        n => format!("windows-{}", n),
    };
    Encoding::for_label(label.as_bytes())
}

/// グループコードと値の組
#[derive(Debug, Clone, Copy)]
struct Pair<'a> {
    code: i32,
    value: &'a str,
    line: usize,
}

impl Pair<'_> {
    fn is(&self, code: i32, value: &str) -> bool {
        self.code == code && self.value.trim() == value
    }
}

fn read_pairs(content: &str) -> Result<Vec<Pair<'_>>> {
    let mut pairs = Vec::new();
    let mut lines = content.lines().enumerate().peekable();

    while let Some((idx, code_line)) = lines.next() {
        let line = idx + 1;
        let code_str = code_line.trim();

        // 末尾の空行は無視
        if code_str.is_empty() && lines.peek().is_none() {
            break;
        }

        let code: i32 = code_str
            .parse()
            .map_err(|_| Error::dxf(line, format!("invalid group code: {:?}", code_str)))?;

        let Some((_, value)) = lines.next() else {
            return Err(Error::dxf(line, format!("missing value for group code {}", code)));
        };

        let pair = Pair { code, value, line };
        pairs.push(pair);

        if pair.is(0, "EOF") {
            break;
        }
    }

    Ok(pairs)
}

/// ENTITIESセクション内のエンティティ1件分のグループ
struct Record<'a> {
    kind: &'a str,
    line: usize,
    groups: Vec<Pair<'a>>,
}

impl<'a> Record<'a> {
    fn value(&self, code: i32) -> Option<&'a str> {
        self.groups.iter().find(|p| p.code == code).map(|p| p.value)
    }

    fn layer(&self) -> String {
        self.value(8)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_LAYER)
            .to_string()
    }

    fn text(&self) -> String {
        self.value(1).unwrap_or_default().to_string()
    }

    fn name(&self) -> String {
        self.value(2).map(|v| v.trim()).unwrap_or_default().to_string()
    }

    fn int(&self, code: i32) -> Result<Option<i32>> {
        let Some(pair) = self.groups.iter().find(|p| p.code == code) else {
            return Ok(None);
        };
        pair.value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::dxf(pair.line + 1, format!("invalid integer for group {}: {:?}", code, pair.value)))
    }

    fn coord(&self, code: i32) -> Result<f64> {
        let Some(pair) = self.groups.iter().find(|p| p.code == code) else {
            return Ok(0.0);
        };
        pair.value
            .trim()
            .parse()
            .map_err(|_| Error::dxf(pair.line + 1, format!("invalid coordinate for group {}: {:?}", code, pair.value)))
    }

    fn insert_point(&self) -> Result<Point2> {
        Ok(Point2::new(self.coord(10)?, self.coord(20)?))
    }

    fn in_paper_space(&self) -> Result<bool> {
        Ok(self.int(67)? == Some(1))
    }
}

fn entity_records<'a>(pairs: &[Pair<'a>]) -> Result<Vec<Record<'a>>> {
    let start = pairs
        .windows(2)
        .position(|w| w[0].is(0, "SECTION") && w[1].is(2, "ENTITIES"))
        .ok_or_else(|| {
            let last_line = pairs.last().map(|p| p.line + 1).unwrap_or(0);
            Error::dxf(last_line, "ENTITIES section not found")
        })?;

    let mut records: Vec<Record<'a>> = Vec::new();

    for pair in &pairs[start + 2..] {
        if pair.code == 0 {
            let kind = pair.value.trim();
            if kind == "ENDSEC" {
                return Ok(records);
            }
            records.push(Record {
                kind,
                line: pair.line,
                groups: Vec::new(),
            });
        } else if let Some(record) = records.last_mut() {
            record.groups.push(*pair);
        } else {
            return Err(Error::dxf(pair.line, "group found before first entity"));
        }
    }

    let last_line = pairs.last().map(|p| p.line).unwrap_or(0);
    Err(Error::dxf(last_line, "ENTITIES section is not terminated"))
}

fn build_entities(records: &[Record<'_>]) -> Result<Vec<DxfEntity>> {
    let mut entities = Vec::new();
    let mut i = 0;

    while i < records.len() {
        let record = &records[i];
        i += 1;

        let entity = match record.kind {
            "TEXT" => DxfEntity::Text {
                layer: record.layer(),
                text: record.text(),
                insert: record.insert_point()?,
            },
            "INSERT" => {
                let mut attribs = Vec::new();
                // 属性はINSERT直後に並び、SEQENDで閉じる
                while let Some(next) = records.get(i).filter(|r| r.kind == "ATTRIB") {
                    attribs.push(Attrib {
                        tag: next.name(),
                        text: next.text(),
                        layer: next.layer(),
                        insert: next.insert_point()?,
                    });
                    i += 1;
                }
                if !attribs.is_empty() && records.get(i).is_some_and(|r| r.kind == "SEQEND") {
                    i += 1;
                }
                if !attribs.is_empty() && record.int(66)? != Some(1) {
                    return Err(Error::dxf(
                        record.line,
                        "ATTRIB entities follow an INSERT without attributes-follow flag",
                    ));
                }
                DxfEntity::Insert {
                    layer: record.layer(),
                    block: record.name(),
                    insert: record.insert_point()?,
                    attribs,
                }
            }
            kind => DxfEntity::Other {
                kind: kind.to_string(),
                layer: record.layer(),
            },
        };

        if record.in_paper_space()? {
            continue;
        }
        entities.push(entity);
    }

    Ok(entities)
}
