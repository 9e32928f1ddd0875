use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("スクリプト実行エラー: {0}")]
    Script(String),

    #[error("ダウンロードエラー: {0}")]
    Download(String),

    #[error("不正なURL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),
}
