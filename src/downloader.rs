//! カード画像のダウンロード
//!
//! 1件ずつ順番に取得し、既に存在するファイルはスキップする。
//! 失敗した画像はログに残して次へ進む（リトライなし）。

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tracing::{debug, info, warn};

use crate::card::CardRecord;
use crate::config::DownloadConfig;
use crate::error::ScraperError;

/// 拡張子が見つからないときの既定値
pub const DEFAULT_EXTENSION: &str = ".png";

static IMAGE_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(png|jpg|webp)").unwrap());
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// 1件ごとの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    AlreadyExists(PathBuf),
    Failed { url: String, reason: String },
}

/// URL中で最初に現れる画像拡張子（ドット付き、大文字小文字はそのまま）
pub fn image_extension(url: &str) -> String {
    IMAGE_EXT
        .find(url)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// 既存ファイルの確認結果。確認できなかった場合は未保存として扱う
fn already_present(path: &Path, check: std::io::Result<bool>) -> bool {
    match check {
        Ok(exists) => exists,
        Err(e) => {
            debug!("存在確認に失敗 {}: {}", path.display(), e);
            false
        }
    }
}

/// 表示名からファイル名に使える部分を作る。空なら `card_<seq>`
pub fn safe_name(name: &str, seq: usize) -> String {
    let stripped = UNSAFE_CHARS.replace_all(name, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), "_");
    if collapsed.is_empty() {
        format!("card_{:03}", seq)
    } else {
        collapsed.into_owned()
    }
}

/// `<seq>_<safe_name><ext>`
pub fn file_name_for(seq: usize, card: &CardRecord) -> String {
    format!(
        "{:03}_{}{}",
        seq,
        safe_name(&card.name, seq),
        image_extension(&card.url)
    )
}

/// バッチ全体で1つの HTTP クライアントを使うダウンローダー
pub struct ImageDownloader {
    client: reqwest::Client,
    output_dir: PathBuf,
}

impl ImageDownloader {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        referer: &str,
        config: &DownloadConfig,
    ) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ScraperError::Download(format!("User-Agent: {}", e)))?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(referer)
                .map_err(|e| ScraperError::Download(format!("Referer: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            output_dir: output_dir.into(),
        })
    }

    /// 全カードを順番にダウンロードする
    ///
    /// 出力フォルダが作れない場合のみエラー。個々の失敗は結果に含める。
    pub async fn download_all(
        &self,
        cards: &[CardRecord],
    ) -> Result<Vec<DownloadOutcome>, ScraperError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let total = cards.len();
        let mut outcomes = Vec::with_capacity(total);

        for (i, card) in cards.iter().enumerate() {
            let seq = i + 1;
            let path = self.output_dir.join(file_name_for(seq, card));
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if already_present(&path, tokio::fs::try_exists(&path).await) {
                info!("  [{}/{}] 既に存在: {}", seq, total, file_name);
                outcomes.push(DownloadOutcome::AlreadyExists(path));
                continue;
            }

            match self.fetch(&card.url).await {
                Ok(body) => match tokio::fs::write(&path, &body).await {
                    Ok(()) => {
                        info!("  [{}/{}] 保存: {}", seq, total, file_name);
                        outcomes.push(DownloadOutcome::Saved(path));
                    }
                    Err(e) => {
                        warn!("  [{}/{}] 失敗 {}: {}", seq, total, card.url, e);
                        outcomes.push(DownloadOutcome::Failed {
                            url: card.url.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
                Err(e) => {
                    warn!("  [{}/{}] 失敗 {}: {}", seq, total, card.url, e);
                    outcomes.push(DownloadOutcome::Failed {
                        url: card.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(outcomes)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
