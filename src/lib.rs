//! カード画像スクレイパーライブラリ
//!
//! - tcg.pokemon.com のギャラリーページからカード画像を抽出
//! - www.pokemon-card.com のカード検索ページをページ送りして抽出
//! - 抽出した画像を連番付きのファイル名で保存（既存ファイルはスキップ）
//!
//! # 使用例
//!
//! ```rust,ignore
//! use card_image_scraper::{GalleryRequest, GalleryService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = GalleryService::new();
//!
//!     let request = GalleryRequest::new("https://tcg.pokemon.com/en-us/galleries/151/")
//!         .with_output_root("./data/card-images");
//!
//!     let result = service.call(request).await.unwrap();
//!     println!("{} cards -> {:?}", result.cards.len(), result.output_dir);
//! }
//! ```

pub mod browser;
pub mod card;
pub mod card_search;
pub mod config;
pub mod downloader;
pub mod error;
pub mod gallery;
pub mod service;
pub mod site;
pub mod traits;

// 主要な型をリエクスポート
pub use card::{CardRecord, RawImage, ScrapeOutcome};
pub use card_search::CardSearchScraper;
pub use config::{DownloadConfig, ScraperConfig};
pub use downloader::{DownloadOutcome, ImageDownloader};
pub use error::ScraperError;
pub use gallery::TcgGalleryScraper;
pub use service::{deliver, GalleryRequest, GalleryResult, GalleryService, DEFAULT_GALLERY_URL};
pub use site::Site;
pub use traits::GalleryScraper;
