//! カードレコードと、抽出結果の正規化（URL解決・重複除去）

use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;
use url::Url;

/// ダウンロード対象のカード画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    /// 絶対URL
    pub url: String,
    /// 表示名（空の場合あり）
    pub name: String,
}

impl CardRecord {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}

/// ページから読み取ったままの画像（相対パスのまま）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

impl RawImage {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
        }
    }
}

/// スクレイプ結果
#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    pub cards: Vec<CardRecord>,
    /// ログ出力用の訪問ページ数
    pub pages_visited: usize,
}

/// URLの重複を除去する（初出順を維持）
pub fn dedup_by_url(cards: impl IntoIterator<Item = CardRecord>) -> Vec<CardRecord> {
    let mut seen = HashSet::new();
    cards
        .into_iter()
        .filter(|card| seen.insert(card.url.clone()))
        .collect()
}

/// 画像の src を base に対して絶対URLに解決し、名前をトリムして重複除去する
///
/// 解決できない src は捨てる。
pub fn resolve_cards(images: impl IntoIterator<Item = RawImage>, base: &Url) -> Vec<CardRecord> {
    let resolved = images.into_iter().filter_map(|image| match base.join(&image.src) {
        Ok(url) => Some(CardRecord::new(url, image.alt.trim())),
        Err(e) => {
            debug!("解決できない src をスキップ {:?}: {}", image.src, e);
            None
        }
    });
    dedup_by_url(resolved)
}
