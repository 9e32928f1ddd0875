use async_trait::async_trait;
use url::Url;

use crate::browser::BrowserSession;
use crate::card::ScrapeOutcome;
use crate::config::ScraperConfig;
use crate::error::ScraperError;

#[async_trait]
pub trait GalleryScraper: Send + Sync {
    /// ブラウザ設定
    fn config(&self) -> &ScraperConfig;

    /// headless 未指定時の既定値
    fn default_headless(&self) -> bool {
        true
    }

    /// 設定で指定があればそれを、無ければ既定値を使う
    fn headless(&self) -> bool {
        self.config().headless.unwrap_or_else(|| self.default_headless())
    }

    /// 起動済みセッション上でギャラリーを読み込み、カードを抽出する
    async fn extract(
        &self,
        session: &BrowserSession,
        gallery_url: &Url,
    ) -> Result<ScrapeOutcome, ScraperError>;

    /// 一括実行（launch → extract → close）
    ///
    /// extract の成否にかかわらずブラウザは必ず閉じる。
    async fn scrape(&self, gallery_url: &Url) -> Result<ScrapeOutcome, ScraperError> {
        let session = BrowserSession::launch(self.config(), self.headless()).await?;
        let result = self.extract(&session, gallery_url).await;
        session.close().await;
        result
    }
}
