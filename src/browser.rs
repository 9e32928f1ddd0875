//! chromiumoxide のブラウザセッション
//!
//! 起動・終了、ナビゲーション、表示待ち、スクリプト実行、スクロール・クリックをまとめる。

use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;

/// navigator.webdriver を隠す
const HIDE_WEBDRIVER_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// Resource Timing のバッファを空にし、上限を広げる
///
/// 既定の250件で溢れると以降の読み込みが記録されず、早すぎるアイドル判定になる。
const RESET_RESOURCE_TIMINGS_SCRIPT: &str =
    "performance.clearResourceTimings(); performance.setResourceTimingBufferSize(10000);";
/// 直近500ms以内に完了したリクエストが無ければ true
const NETWORK_IDLE_CHECK_SCRIPT: &str = r#"
    (() => {
        if (document.readyState !== 'complete') return false;
        const now = performance.now();
        return !performance.getEntriesByType('resource')
            .some(e => now - e.responseEnd < 500);
    })()
"#;

/// ネットワークアイドル判定のインターバル（ミリ秒）
const NETWORK_IDLE_CHECK_INTERVAL_MS: u64 = 500;
/// 連続何回アイドルならOKとするか
const REQUIRED_IDLE_CHECKS: u32 = 3;
/// 表示待ちのポーリング間隔（ミリ秒）
const VISIBLE_POLL_INTERVAL_MS: u64 = 250;

/// ナビゲーション完了の判定方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// ページ読み込みまで
    Load,
    /// 読み込み後、ネットワークが静かになるまで
    NetworkIdle,
}

/// 1回のスクレイプで使うブラウザとページ
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// ブラウザを起動し、UA偽装済みのページを1枚開く
    pub async fn launch(config: &ScraperConfig, headless: bool) -> Result<Self, ScraperError> {
        info!("ブラウザを起動中... (headless={})", headless);

        let (width, height) = config.window_size;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .request_timeout(config.navigation_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage");

        if let Some(path) = config.resolve_chrome_executable() {
            builder = builder.chrome_executable(path);
        }
        if !headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("ブラウザイベントエラー: {:?}", e);
                }
            }
        });

        match Self::open_page(&browser, config).await {
            Ok(page) => {
                info!("ブラウザ起動完了");
                Ok(Self {
                    browser,
                    page,
                    handler,
                })
            }
            Err(e) => {
                // ページ作成に失敗してもプロセスを残さない
                if let Err(close_err) = browser.close().await {
                    warn!("ブラウザ終了に失敗: {}", close_err);
                }
                handler.abort();
                Err(e)
            }
        }
    }

    /// UA偽装と webdriver 隠蔽を設定した空ページを作る
    async fn open_page(browser: &Browser, config: &ScraperConfig) -> Result<Page, ScraperError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        page.set_user_agent(user_agent_override(config))
            .await
            .map_err(|e| ScraperError::BrowserInit(format!("UA設定エラー: {}", e)))?;

        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
            HIDE_WEBDRIVER_SCRIPT,
        ))
        .await
        .map_err(|e| ScraperError::BrowserInit(format!("初期化スクリプト登録エラー: {}", e)))?;

        Ok(page)
    }

    /// URLへ移動する。timeout を超えたら致命的エラー
    pub async fn goto(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        let start = Instant::now();

        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| {
                ScraperError::Timeout(format!("{} の読み込みが{:?}以内に完了しませんでした", url, timeout))
            })?
            .map_err(|e| ScraperError::Navigation(format!("{}: {}", url, e)))?;

        if wait_until == WaitUntil::NetworkIdle {
            let remaining = timeout.saturating_sub(start.elapsed());
            self.wait_for_network_idle(remaining).await?;
        }

        debug!("{} へ移動完了 ({:?})", url, start.elapsed());
        Ok(())
    }

    /// ネットワークリクエストがアイドル状態になるまで待機
    ///
    /// Resource Timing で直近500ms以内に完了したリクエストが無い状態が
    /// 連続 REQUIRED_IDLE_CHECKS 回続いたらアイドルとみなす。
    pub async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), ScraperError> {
        let start = Instant::now();
        let mut idle_count = 0;

        if let Err(e) = self.run(RESET_RESOURCE_TIMINGS_SCRIPT).await {
            debug!("Resource Timing のリセットに失敗: {}", e);
        }

        while start.elapsed() < timeout {
            let result = self.evaluate::<bool>(NETWORK_IDLE_CHECK_SCRIPT).await;

            match result {
                Ok(true) => {
                    idle_count += 1;
                    if idle_count >= REQUIRED_IDLE_CHECKS {
                        debug!("ネットワークアイドル検出 ({:?})", start.elapsed());
                        return Ok(());
                    }
                }
                Ok(false) => idle_count = 0,
                Err(e) => {
                    debug!("ネットワークアイドル確認エラー: {}", e);
                    idle_count = 0;
                }
            }

            sleep(Duration::from_millis(NETWORK_IDLE_CHECK_INTERVAL_MS)).await;
        }

        Err(ScraperError::Timeout(format!(
            "ネットワークが{:?}以内にアイドルになりませんでした",
            timeout
        )))
    }

    /// セレクタに一致する要素が表示されるまで待つ
    ///
    /// 期限内に現れなければ `Ok(false)`。致命的かどうかは呼び出し側が決める。
    pub async fn wait_for_visible(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, ScraperError> {
        let script = visible_script(selector)?;
        let start = Instant::now();

        loop {
            match self.evaluate::<bool>(&script).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => debug!("{} の表示確認エラー: {}", selector, e),
            }

            if start.elapsed() >= timeout {
                debug!("{} は{:?}以内に表示されませんでした", selector, timeout);
                return Ok(false);
            }
            sleep(Duration::from_millis(VISIBLE_POLL_INTERVAL_MS)).await;
        }
    }

    /// スクリプトを評価し、結果をデシリアライズする
    pub async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> Result<T, ScraperError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::Script(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| ScraperError::Script(format!("結果の変換に失敗: {}", e)))
    }

    /// 戻り値を使わないスクリプトを実行する
    pub async fn run(&self, script: &str) -> Result<(), ScraperError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::Script(e.to_string()))?;
        Ok(())
    }

    pub async fn scroll_to_bottom(&self) -> Result<(), ScraperError> {
        self.run("window.scrollTo(0, document.body.scrollHeight)").await
    }

    pub async fn page_height(&self) -> Result<i64, ScraperError> {
        self.evaluate("document.body.scrollHeight").await
    }

    pub async fn scroll_by(&self, dy: i64) -> Result<(), ScraperError> {
        self.run(&format!("window.scrollBy(0, {})", dy)).await
    }

    pub async fn scroll_to_top(&self) -> Result<(), ScraperError> {
        self.run("window.scrollTo(0, 0)").await
    }

    /// 最初に一致する要素を表示位置までスクロールしてクリックする
    pub async fn click(&self, selector: &str) -> Result<(), ScraperError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))?;

        element
            .scroll_into_view()
            .await
            .map_err(|e| ScraperError::Navigation(format!("{} スクロール: {}", selector, e)))?;
        element
            .click()
            .await
            .map_err(|e| ScraperError::Navigation(format!("{} クリック: {}", selector, e)))?;

        Ok(())
    }

    /// 最初に一致する要素の属性値
    pub async fn attribute(&self, selector: &str, name: &str) -> Result<String, ScraperError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))?;

        element
            .attribute(name)
            .await
            .map_err(|e| ScraperError::Script(e.to_string()))?
            .ok_or_else(|| ScraperError::ElementNotFound(format!("{} の {} 属性", selector, name)))
    }

    /// ブラウザを終了する。失敗してもログに残すだけ
    pub async fn close(mut self) {
        info!("ブラウザを終了中...");

        if let Err(e) = self.browser.close().await {
            warn!("ブラウザ終了に失敗: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("ブラウザプロセスの終了待ちに失敗: {}", e);
        }
        self.handler.abort();

        info!("ブラウザ終了完了");
    }
}

/// セレクタの最初の要素が表示されているかを返すスクリプト
fn visible_script(selector: &str) -> Result<String, ScraperError> {
    let literal =
        serde_json::to_string(selector).map_err(|e| ScraperError::Script(e.to_string()))?;

    Ok(format!(
        r#"
        (() => {{
            const el = document.querySelector({literal});
            if (!el) return false;
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            return rect.width > 0 && rect.height > 0
                && style.visibility !== 'hidden' && style.display !== 'none';
        }})()
        "#
    ))
}

/// ページ単位の UA 上書き（Network ドメイン）
fn user_agent_override(config: &ScraperConfig) -> SetUserAgentOverrideParams {
    SetUserAgentOverrideParams::new(config.user_agent.clone())
}
