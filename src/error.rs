use thiserror::Error;

#[derive(Error, Debug)]
pub enum CadTextError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("図面が見つかりません: {0}")]
    NoDrawingsFound(String),

    #[error("変換ツールを起動できません ({path}): {message}")]
    ConverterLaunch { path: String, message: String },

    #[error("変換ツールが失敗しました (code {code:?}): {stderr}")]
    ConverterFailed { code: Option<i32>, stderr: String },

    #[error("変換ツールが{0}秒以内に終了しませんでした")]
    ConverterTimeout(u64),

    #[error("DXFファイルが生成されませんでした: {0}")]
    ConvertedFileMissing(String),

    #[error("特徴文字が設定されていません。先にプレビューから特徴文字を選択してください")]
    NoReferencePattern,

    #[error("プレビュー中の図面がありません")]
    NoPreview,

    #[error("文字番号が範囲外です: {index} (0..{len})")]
    AnchorOutOfRange { index: usize, len: usize },

    #[error("出力する照合結果がありません")]
    NoResults,

    #[error("入力エラー: {0}")]
    Interactive(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] cad_text_common::Error),
}

impl CadTextError {
    /// 処理を中断せず警告として扱うべきエラーか
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            CadTextError::NoReferencePattern | CadTextError::NoPreview | CadTextError::NoResults
        )
    }
}

pub type Result<T> = std::result::Result<T, CadTextError>;
