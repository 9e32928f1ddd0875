use std::path::PathBuf;
use std::time::Duration;

/// ブラウザで使うデスクトップ版ユーザーエージェント
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// 画像ダウンロード時のユーザーエージェント
pub const DOWNLOAD_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// ブラウザセッションの設定
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// 未指定ならスクレイパーごとの既定値
    pub headless: Option<bool>,
    pub no_sandbox: bool,
    /// 未指定なら CHROME_PATH / CHROMIUM_PATH、それも無ければ chromiumoxide の自動検出
    pub chrome_executable: Option<PathBuf>,
    pub user_agent: String,
    pub window_size: (u32, u32),
    /// ナビゲーション（ネットワークアイドル待ちを含む）の上限
    pub navigation_timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: None,
            no_sandbox: false,
            chrome_executable: None,
            user_agent: BROWSER_USER_AGENT.to_string(),
            window_size: (1280, 900),
            navigation_timeout: Duration::from_secs(60),
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = Some(headless);
        self
    }

    pub fn with_no_sandbox(mut self, no_sandbox: bool) -> Self {
        self.no_sandbox = no_sandbox;
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// 明示指定 → 環境変数の順でブラウザの実行ファイルを決める
    pub fn resolve_chrome_executable(&self) -> Option<PathBuf> {
        self.chrome_executable.clone().or_else(|| {
            std::env::var("CHROME_PATH")
                .or_else(|_| std::env::var("CHROMIUM_PATH"))
                .ok()
                .map(PathBuf::from)
        })
    }
}

/// 画像ダウンローダーの設定
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            user_agent: DOWNLOAD_USER_AGENT.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl DownloadConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
