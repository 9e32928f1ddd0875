use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tower::Service;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use card_image_scraper::{GalleryRequest, GalleryService, ScraperConfig, DEFAULT_GALLERY_URL};

#[derive(Parser, Debug)]
#[command(name = "card-image-scraper")]
#[command(about = "Download full-size card images from a Pokémon TCG gallery page")]
struct Cli {
    /// Gallery URL (tcg.pokemon.com or www.pokemon-card.com)
    #[arg(default_value = DEFAULT_GALLERY_URL)]
    url: String,

    /// Root folder; images go to <OUTPUT_ROOT>/<set>/
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/data/card-images"))]
    output_root: PathBuf,

    /// Show the browser window (default for tcg.pokemon.com)
    #[arg(long, conflicts_with = "headless")]
    headed: bool,

    /// Hide the browser window (default for www.pokemon-card.com)
    #[arg(long)]
    headless: bool,

    /// Launch Chromium with --no-sandbox (containers)
    #[arg(long)]
    no_sandbox: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,card_image_scraper=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut scraper_config = ScraperConfig::new().with_no_sandbox(cli.no_sandbox);
    if cli.headed || cli.headless {
        scraper_config = scraper_config.with_headless(cli.headless);
    }

    let request = GalleryRequest::new(cli.url)
        .with_output_root(cli.output_root)
        .with_scraper_config(scraper_config);

    let mut service = GalleryService::new();
    match service.call(request).await {
        Ok(result) => {
            if !result.cards.is_empty() {
                info!("完了: 画像の保存先 {}", result.output_dir.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("スクレイピング失敗: {}", e);
            ExitCode::FAILURE
        }
    }
}
