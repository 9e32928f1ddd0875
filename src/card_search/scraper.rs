//! pokemon-card.com スクレイパー実装
//!
//! ギャラリーページ → カード検索ページへ移動し、ページ送りしながら
//! 大サイズのカード画像を集める。

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

use crate::browser::{BrowserSession, WaitUntil};
use crate::card::{resolve_cards, RawImage, ScrapeOutcome};
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::GalleryScraper;

pub const BASE_URL: &str = "https://www.pokemon-card.com";

/// ギャラリーページからカード一覧への導線
const CARD_LIST_LINK_SELECTOR: &str = r#"a[href*="/card-search/index.php"]"#;
/// 大サイズのカード画像
const CARD_IMAGE_SELECTOR: &str = r#"img[src*="/card_images/large/"]"#;
/// 次のページ（Vueのページャーで <a> ではない）
const NEXT_PAGE_SELECTOR: &str = "div.next, div.nextButton";

const GALLERY_SETTLE_SECS: u64 = 2;
const CARD_LIST_SETTLE_SECS: u64 = 5;
const CARD_IMAGE_WAIT_SECS: u64 = 10;
const NEXT_PAGE_WAIT_SECS: u64 = 5;
const PAGE_CHANGE_SETTLE_SECS: u64 = 5;

/// 遅延読み込み用の小刻みスクロール
const SCROLL_STEPS: usize = 15;
const SCROLL_STEP_PX: i64 = 600;
const SCROLL_STEP_INTERVAL_MS: u64 = 400;
const SCROLL_TOP_SETTLE_SECS: u64 = 2;

/// pokemon-card.com のカード検索スクレイパー
pub struct CardSearchScraper {
    config: ScraperConfig,
    base_url: Url,
}

impl CardSearchScraper {
    pub fn new(config: ScraperConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            config,
            base_url: Url::parse(BASE_URL)?,
        })
    }

    /// ギャラリーページ上のカード一覧リンクを絶対URLで返す
    async fn find_card_list_url(
        &self,
        session: &BrowserSession,
        gallery_url: &Url,
    ) -> Result<Url, ScraperError> {
        info!("ギャラリー読み込み中: {}", gallery_url);
        session
            .goto(
                gallery_url.as_str(),
                WaitUntil::Load,
                self.config.navigation_timeout,
            )
            .await?;
        sleep(Duration::from_secs(GALLERY_SETTLE_SECS)).await;

        let href = session.attribute(CARD_LIST_LINK_SELECTOR, "href").await?;
        Ok(self.base_url.join(&href)?)
    }

    /// 小刻みにスクロールして画像の遅延読み込みを発火させ、先頭に戻る
    async fn trigger_lazy_images(&self, session: &BrowserSession) -> Result<(), ScraperError> {
        for _ in 0..SCROLL_STEPS {
            session.scroll_by(SCROLL_STEP_PX).await?;
            sleep(Duration::from_millis(SCROLL_STEP_INTERVAL_MS)).await;
        }
        session.scroll_to_top().await?;
        sleep(Duration::from_secs(SCROLL_TOP_SETTLE_SECS)).await;
        Ok(())
    }

    async fn extract_page(&self, session: &BrowserSession) -> Result<Vec<RawImage>, ScraperError> {
        let script = format!(
            r#"
            (() => Array.from(document.querySelectorAll('{selector}')).map(img => ({{
                src: img.getAttribute('src') || '',
                alt: img.getAttribute('alt') || ''
            }})))()
            "#,
            selector = CARD_IMAGE_SELECTOR,
        );
        session.evaluate(&script).await
    }

    /// 次ページへ進む。コントロールが無い・押せない場合は最終ページとみなす
    ///
    /// ページャーのクラス名が変わった場合も「最終ページ」と区別できない。
    async fn next_page(&self, session: &BrowserSession) -> Result<bool, ScraperError> {
        if !session
            .wait_for_visible(NEXT_PAGE_SELECTOR, Duration::from_secs(NEXT_PAGE_WAIT_SECS))
            .await?
        {
            return Ok(false);
        }

        if let Err(e) = session.click(NEXT_PAGE_SELECTOR).await {
            debug!("次ページボタンをクリックできません: {}", e);
            return Ok(false);
        }

        sleep(Duration::from_secs(PAGE_CHANGE_SETTLE_SECS)).await;
        Ok(true)
    }
}

/// カード画像が表示されなかったときの扱い
///
/// 1ページ目なら一覧自体が読めていないのでエラー、2ページ目以降は最終ページとして打ち切る。
fn listing_missing(page_num: usize, card_list_url: &Url) -> Result<(), ScraperError> {
    if page_num == 1 {
        return Err(ScraperError::Timeout(format!(
            "カード一覧が{}秒以内に表示されませんでした: {}",
            CARD_IMAGE_WAIT_SECS, card_list_url
        )));
    }
    Ok(())
}

#[async_trait]
impl GalleryScraper for CardSearchScraper {
    fn config(&self) -> &ScraperConfig {
        &self.config
    }

    async fn extract(
        &self,
        session: &BrowserSession,
        gallery_url: &Url,
    ) -> Result<ScrapeOutcome, ScraperError> {
        let card_list_url = self.find_card_list_url(session, gallery_url).await?;

        info!("カード一覧へ移動中: {}", card_list_url);
        session
            .goto(
                card_list_url.as_str(),
                WaitUntil::Load,
                self.config.navigation_timeout,
            )
            .await?;
        sleep(Duration::from_secs(CARD_LIST_SETTLE_SECS)).await;

        let mut images = Vec::new();
        let mut page_num = 1;

        loop {
            let rendered = session
                .wait_for_visible(
                    CARD_IMAGE_SELECTOR,
                    Duration::from_secs(CARD_IMAGE_WAIT_SECS),
                )
                .await?;

            if !rendered {
                listing_missing(page_num, &card_list_url)?;
                info!("  {}ページ目: カード画像なし。終了します", page_num);
                break;
            }

            self.trigger_lazy_images(session).await?;

            let on_page = self.extract_page(session).await?;
            info!("  {}ページ目: {}件", page_num, on_page.len());
            images.extend(on_page);

            if !self.next_page(session).await? {
                break;
            }
            page_num += 1;
        }

        let cards = resolve_cards(images, &self.base_url);
        info!(
            "{}ページから重複なしで{}件のカード画像を検出",
            page_num,
            cards.len()
        );

        Ok(ScrapeOutcome {
            cards,
            pages_visited: page_num,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_search_scraper_new() {
        let scraper = CardSearchScraper::new(ScraperConfig::default()).unwrap();
        assert_eq!(scraper.base_url.as_str(), "https://www.pokemon-card.com/");
        assert_eq!(scraper.config().headless, None);
        assert!(scraper.headless());
    }

    #[test]
    fn test_missing_listing_on_first_page_is_fatal() {
        let url = Url::parse("https://www.pokemon-card.com/card-search/index.php?pg=SV8").unwrap();
        let err = listing_missing(1, &url).unwrap_err();
        assert!(matches!(err, ScraperError::Timeout(_)));
        assert!(err.to_string().contains("pg=SV8"));
    }

    #[test]
    fn test_missing_listing_on_later_page_stops() {
        let url = Url::parse("https://www.pokemon-card.com/card-search/index.php?pg=SV8").unwrap();
        assert!(listing_missing(2, &url).is_ok());
        assert!(listing_missing(7, &url).is_ok());
    }

    #[test]
    fn test_card_list_link_resolves_against_base() {
        let scraper = CardSearchScraper::new(ScraperConfig::default()).unwrap();
        let url = scraper
            .base_url
            .join("/card-search/index.php?mode=statuslist&pg=SV8")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.pokemon-card.com/card-search/index.php?mode=statuslist&pg=SV8"
        );
    }

    #[tokio::test]
    #[ignore] // 実環境テスト用: cargo test test_card_search_live -- --ignored --nocapture
    async fn test_card_search_live() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info,card_image_scraper=debug")
            .try_init();

        let scraper = CardSearchScraper::new(ScraperConfig::default()).unwrap();
        let url = Url::parse("https://www.pokemon-card.com/ex/sv8/index.html").unwrap();

        let outcome = scraper.scrape(&url).await.expect("scrape failed");
        println!(
            "Cards: {} across {} page(s)",
            outcome.cards.len(),
            outcome.pages_visited
        );
        assert!(outcome.pages_visited >= 1);
    }
}
