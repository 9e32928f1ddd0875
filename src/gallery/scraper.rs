use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{BrowserSession, WaitUntil};
use crate::card::ScrapeOutcome;
use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::GalleryScraper;

use super::extract::{document_order_script, select_cards, DomNode};

/// 「View All」ボタン
const VIEW_ALL_SELECTOR: &str = "button.gallery__loadMoreButton";
const VIEW_ALL_WAIT_SECS: u64 = 10;
const VIEW_ALL_SETTLE_SECS: u64 = 3;

/// 遅延読み込み用スクロールの最大回数
const MAX_SCROLLS: usize = 30;
const SCROLL_INTERVAL_MS: u64 = 1500;
const FINAL_SETTLE_SECS: u64 = 2;

/// tcg.pokemon.com のギャラリースクレイパー
pub struct TcgGalleryScraper {
    config: ScraperConfig,
}

impl TcgGalleryScraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    /// 「View All」があれば押す。無い・押せない場合はそのまま続行
    async fn expand_gallery(&self, session: &BrowserSession) -> Result<(), ScraperError> {
        if !session
            .wait_for_visible(VIEW_ALL_SELECTOR, Duration::from_secs(VIEW_ALL_WAIT_SECS))
            .await?
        {
            debug!("「View All」ボタンなし。初期表示のまま続行");
            return Ok(());
        }

        info!("「View All」をクリック中...");
        if let Err(e) = session.click(VIEW_ALL_SELECTOR).await {
            debug!("「View All」をクリックできません: {}", e);
            return Ok(());
        }

        if let Err(e) = session
            .wait_for_network_idle(self.config.navigation_timeout)
            .await
        {
            warn!("「View All」後にネットワークがアイドルになりませんでした: {}", e);
        }
        sleep(Duration::from_secs(VIEW_ALL_SETTLE_SECS)).await;
        Ok(())
    }

    /// 高さが変わらなくなるまで（最大 MAX_SCROLLS 回）最下部へスクロール
    async fn scroll_until_stable(&self, session: &BrowserSession) -> Result<(), ScraperError> {
        info!("全カードを読み込むためスクロール中...");
        let mut prev_height = 0;

        for i in 0..MAX_SCROLLS {
            session.scroll_to_bottom().await?;
            sleep(Duration::from_millis(SCROLL_INTERVAL_MS)).await;

            let height = session.page_height().await?;
            if height == prev_height {
                debug!("{}回目のスクロールで高さが安定: {}", i + 1, height);
                break;
            }
            prev_height = height;
        }

        sleep(Duration::from_secs(FINAL_SETTLE_SECS)).await;
        Ok(())
    }
}

#[async_trait]
impl GalleryScraper for TcgGalleryScraper {
    fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// 既定は表示モード（ウィンドウあり）
    fn default_headless(&self) -> bool {
        false
    }

    async fn extract(
        &self,
        session: &BrowserSession,
        gallery_url: &Url,
    ) -> Result<ScrapeOutcome, ScraperError> {
        info!("ギャラリー読み込み中: {}", gallery_url);
        session
            .goto(
                gallery_url.as_str(),
                WaitUntil::NetworkIdle,
                self.config.navigation_timeout,
            )
            .await?;

        self.expand_gallery(session).await?;
        self.scroll_until_stable(session).await?;

        let nodes: Vec<DomNode> = session.evaluate(&document_order_script()).await?;
        debug!("ページ内クエリ結果: {}ノード", nodes.len());

        let cards = select_cards(&nodes, gallery_url);
        info!("カード画像を{}件検出", cards.len());

        Ok(ScrapeOutcome {
            cards,
            pages_visited: 1,
        })
    }
}
