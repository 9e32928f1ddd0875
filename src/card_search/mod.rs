//! pokemon-card.com カード検索スクレイパーモジュール

mod scraper;

pub use scraper::{CardSearchScraper, BASE_URL};
