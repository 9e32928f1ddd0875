use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{info, warn};
use url::Url;

use crate::card::{CardRecord, ScrapeOutcome};
use crate::card_search::CardSearchScraper;
use crate::config::{DownloadConfig, ScraperConfig};
use crate::downloader::{DownloadOutcome, ImageDownloader};
use crate::error::ScraperError;
use crate::gallery::TcgGalleryScraper;
use crate::site::Site;
use crate::traits::GalleryScraper;

/// 既定のギャラリーURL
pub const DEFAULT_GALLERY_URL: &str = "https://tcg.pokemon.com/en-us/galleries/151/";

/// ギャラリー1件分のリクエスト
#[derive(Debug, Clone)]
pub struct GalleryRequest {
    pub gallery_url: String,
    /// `<output_root>/<slug>/` に保存する
    pub output_root: PathBuf,
    pub scraper: ScraperConfig,
    pub download: DownloadConfig,
}

impl GalleryRequest {
    pub fn new(gallery_url: impl Into<String>) -> Self {
        Self {
            gallery_url: gallery_url.into(),
            output_root: PathBuf::from("./data/card-images"),
            scraper: ScraperConfig::default(),
            download: DownloadConfig::default(),
        }
    }

    pub fn with_output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_root = path.into();
        self
    }

    pub fn with_scraper_config(mut self, config: ScraperConfig) -> Self {
        self.scraper = config;
        self
    }

    pub fn with_download_config(mut self, config: DownloadConfig) -> Self {
        self.download = config;
        self
    }
}

/// 処理結果
#[derive(Debug)]
pub struct GalleryResult {
    pub site: Site,
    pub output_dir: PathBuf,
    pub cards: Vec<CardRecord>,
    pub pages_visited: usize,
    /// カードが見つからなかった場合は空
    pub downloads: Vec<DownloadOutcome>,
}

/// サイト種別に応じたスクレイパー
pub fn scraper_for(
    site: Site,
    config: ScraperConfig,
) -> Result<Box<dyn GalleryScraper>, ScraperError> {
    Ok(match site {
        Site::Tcg => Box::new(TcgGalleryScraper::new(config)),
        Site::PokemonCard => Box::new(CardSearchScraper::new(config)?),
    })
}

/// スクレイピング結果を出力フォルダへ保存する
///
/// カードが0件ならフォルダを作らず、警告だけ出して成功扱いで返す。
pub async fn deliver(
    site: Site,
    output_dir: PathBuf,
    outcome: ScrapeOutcome,
    download: &DownloadConfig,
) -> Result<GalleryResult, ScraperError> {
    if outcome.cards.is_empty() {
        warn!("カード画像が見つかりませんでした。ページ構造が変わった可能性があります。ブラウザで確認してください");
        return Ok(GalleryResult {
            site,
            output_dir,
            cards: Vec::new(),
            pages_visited: outcome.pages_visited,
            downloads: Vec::new(),
        });
    }

    info!(
        "{}件の画像を {}/ へダウンロード中",
        outcome.cards.len(),
        output_dir.display()
    );
    let downloader = ImageDownloader::new(&output_dir, site.referer(), download)?;
    let downloads = downloader.download_all(&outcome.cards).await?;

    Ok(GalleryResult {
        site,
        output_dir,
        cards: outcome.cards,
        pages_visited: outcome.pages_visited,
        downloads,
    })
}

/// tower::Serviceを実装したギャラリー処理サービス
#[derive(Debug, Clone, Default)]
pub struct GalleryService;

impl GalleryService {
    pub fn new() -> Self {
        Self
    }
}

impl Service<GalleryRequest> for GalleryService {
    type Response = GalleryResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GalleryRequest) -> Self::Future {
        Box::pin(async move {
            let site = Site::detect(&req.gallery_url);
            let output_dir = site.output_dir(&req.output_root, &req.gallery_url);
            info!("ギャラリー {} のサイト種別: {}", req.gallery_url, site);

            let gallery_url = Url::parse(&req.gallery_url)?;
            let scraper = scraper_for(site, req.scraper)?;
            let outcome = scraper.scrape(&gallery_url).await?;

            deliver(site, output_dir, outcome, &req.download).await
        })
    }
}
