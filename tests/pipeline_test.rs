//! ギャラリーのDOM抽出結果からダウンロードまでの通しテスト

use card_image_scraper::gallery::{select_cards, DomNode};
use card_image_scraper::{DownloadConfig, DownloadOutcome, ImageDownloader, RawImage, Site};
use url::Url;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn img(src: &str, alt: &str) -> DomNode {
    DomNode::Image(RawImage::new(src, alt))
}

#[tokio::test]
async fn test_gallery_to_files() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/en-us/galleries/151/cards/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"card".to_vec()))
        .expect(3)
        .mount(&server)
        .await;

    let gallery_url = Url::parse(&format!("{}/en-us/galleries/151/", server.uri())).unwrap();

    // ページ内クエリが返す文書順のノード
    let nodes = vec![
        img("/static/site-logo.png", "header"),
        DomNode::Filter,
        img("cards/001.png", "Bulbasaur"),
        img("/static/logo.png", "Pokémon"),
        img("cards/002.jpg?w=600", "Ivysaur"),
        img("/favicon.ico", ""),
        img("cards/003.webp", "Venusaur ex"),
        DomNode::Callout,
        img("cards/004.png", "after the callout"),
    ];

    let cards = select_cards(&nodes, &gallery_url);
    assert_eq!(cards.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let out = Site::detect(gallery_url.as_str()).output_dir(dir.path(), gallery_url.as_str());
    let downloader =
        ImageDownloader::new(&out, Site::Tcg.referer(), &DownloadConfig::default()).unwrap();

    let outcomes = downloader.download_all(&cards).await.unwrap();
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, DownloadOutcome::Saved(_))));

    let mut names: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        ["001_Bulbasaur.png", "002_Ivysaur.jpg", "003_Venusaur_ex.webp"]
    );

    // 再実行では何も取得しない
    let rerun = downloader.download_all(&cards).await.unwrap();
    assert!(rerun
        .iter()
        .all(|o| matches!(o, DownloadOutcome::AlreadyExists(_))));
}
