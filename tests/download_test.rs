//! ImageDownloader の結合テスト（wiremock で画像サーバーを模擬）

use std::time::Duration;

use card_image_scraper::{CardRecord, DownloadConfig, DownloadOutcome, ImageDownloader};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REFERER: &str = "https://tcg.pokemon.com/";

fn downloader(dir: &std::path::Path) -> ImageDownloader {
    ImageDownloader::new(dir, REFERER, &DownloadConfig::default()).unwrap()
}

#[tokio::test]
async fn test_saves_body_verbatim_with_headers() {
    let server = MockServer::start().await;
    let body = vec![0x89, b'P', b'N', b'G', 0x00, 0xff];

    Mock::given(method("GET"))
        .and(path("/cards/mew.png"))
        .and(header("referer", REFERER))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("151");
    let cards = vec![CardRecord::new(
        format!("{}/cards/mew.png", server.uri()),
        "Mew ★/VMAX",
    )];

    let outcomes = downloader(&out).download_all(&cards).await.unwrap();

    let expected = out.join("001_Mew_VMAX.png");
    assert_eq!(outcomes, vec![DownloadOutcome::Saved(expected.clone())]);
    assert_eq!(std::fs::read(expected).unwrap(), body);
}

#[tokio::test]
async fn test_sends_desktop_user_agent() {
    let server = MockServer::start().await;
    let config = DownloadConfig::default();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cards = vec![CardRecord::new(format!("{}/a.webp", server.uri()), "A")];
    let outcomes = ImageDownloader::new(dir.path(), REFERER, &config)
        .unwrap()
        .download_all(&cards)
        .await
        .unwrap();

    assert!(matches!(outcomes[0], DownloadOutcome::Saved(_)));

    // UA にはカンマが含まれるので header マッチャーではなく受信リクエストで確認する
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let user_agent = requests[0]
        .headers
        .get("user-agent")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(user_agent, config.user_agent);
}

#[tokio::test]
async fn test_existing_file_is_skipped_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("001_Pikachu.png");
    std::fs::write(&existing, b"old").unwrap();

    let cards = vec![CardRecord::new(
        format!("{}/cards/pikachu.png", server.uri()),
        "Pikachu",
    )];
    let outcomes = downloader(dir.path()).download_all(&cards).await.unwrap();

    assert_eq!(outcomes, vec![DownloadOutcome::AlreadyExists(existing.clone())]);
    assert_eq!(std::fs::read(existing).unwrap(), b"old");
}

#[tokio::test]
async fn test_failed_status_does_not_abort_batch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/1.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"one".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/3.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"three".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cards: Vec<_> = (1..=3)
        .map(|i| CardRecord::new(format!("{}/{}.png", server.uri(), i), format!("Card {}", i)))
        .collect();

    let outcomes = downloader(dir.path()).download_all(&cards).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], DownloadOutcome::Saved(_)));
    match &outcomes[1] {
        DownloadOutcome::Failed { url, .. } => assert!(url.ends_with("/2.png")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(matches!(outcomes[2], DownloadOutcome::Saved(_)));
    assert!(!dir.path().join("002_Card_2.png").exists());
    assert_eq!(std::fs::read(dir.path().join("003_Card_3.png")).unwrap(), b"three");
}

#[tokio::test]
async fn test_timeout_is_a_per_item_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"slow".to_vec())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fast".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = DownloadConfig::default().with_timeout(Duration::from_millis(200));
    let cards = vec![
        CardRecord::new(format!("{}/slow.png", server.uri()), "Slow"),
        CardRecord::new(format!("{}/fast.png", server.uri()), "Fast"),
    ];

    let outcomes = ImageDownloader::new(dir.path(), REFERER, &config)
        .unwrap()
        .download_all(&cards)
        .await
        .unwrap();

    assert!(matches!(outcomes[0], DownloadOutcome::Failed { .. }));
    assert_eq!(
        outcomes[1],
        DownloadOutcome::Saved(dir.path().join("002_Fast.png"))
    );
}
