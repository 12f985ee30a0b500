use anyhow::Result;
use async_trait::async_trait;
use delos_dl::download::NoopObserver;
use delos_dl::{
    BatchSummary, CallbackObserver, DownloadEngine, DownloadManager, DownloadResult,
    DownloaderConfig, FetchError, MetadataSource,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLAYER_ENDPOINT: &str = "/services/presentationplayer";

fn config_for(server: &MockServer) -> DownloaderConfig {
    DownloaderConfig::default()
        .with_endpoint(format!("{}{}", server.uri(), PLAYER_ENDPOINT))
        .with_timeouts(Duration::from_secs(5), Duration::from_secs(5))
}

async fn mount_metadata(server: &MockServer, rid: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", PLAYER_ENDPOINT, rid)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_video(server: &MockServer, video_path: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(video_path.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_download_with_relative_video() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    Mock::given(method("GET"))
        .and(path(format!("{}/ABC123", PLAYER_ENDPOINT)))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(header("referer", "https://delos.uoa.gr/opendelos/player"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<presentation><title>Algorithms - L1</title><media type="video">lecture1.mp4</media></presentation>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    mount_video(
        &server,
        &format!("{}/lecture1.mp4", PLAYER_ENDPOINT),
        payload.clone(),
    )
    .await;

    let engine = DownloadEngine::new(config_for(&server))?;
    let result = engine
        .download_video("https://site/player?rid=ABC123", output.path())
        .await;

    assert!(result.success, "unexpected failure: {}", result.message);
    assert_eq!(result.message, "Downloaded: Algorithms/Algorithms - L1.mp4");

    let expected = output.path().join("Algorithms").join("Algorithms - L1.mp4");
    assert_eq!(result.saved_path.as_deref(), Some(expected.as_path()));
    assert_eq!(result.bytes_downloaded, payload.len() as u64);
    assert_eq!(std::fs::read(&expected)?, payload);

    Ok(())
}

#[tokio::test]
async fn test_untitled_presentation_uses_video_basename() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    mount_metadata(
        &server,
        "NOTITLE1",
        format!(
            "<presentation><video>{}/vod/2024/raw-lecture.mp4</video></presentation>",
            server.uri()
        ),
    )
    .await;
    mount_video(&server, "/vod/2024/raw-lecture.mp4", b"mp4 bytes".to_vec()).await;

    let engine = DownloadEngine::new(config_for(&server))?;
    let result = engine
        .download_video("https://site/show?rid=NOTITLE1", output.path())
        .await;

    assert!(result.success, "unexpected failure: {}", result.message);
    assert_eq!(result.message, "Downloaded: raw-lecture.mp4");
    assert_eq!(
        std::fs::read(output.path().join("raw-lecture.mp4"))?,
        b"mp4 bytes"
    );

    Ok(())
}

#[tokio::test]
async fn test_missing_video_writes_nothing() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    mount_metadata(
        &server,
        "NOVIDEO",
        "<presentation><title>Physics I - Intro</title><slides>deck.pdf</slides></presentation>"
            .to_string(),
    )
    .await;

    let engine = DownloadEngine::new(config_for(&server))?;
    let url = "https://site/player?rid=NOVIDEO";
    let result = engine.download_video(url, output.path()).await;

    assert!(!result.success);
    assert_eq!(result.message, format!("MP4 video not found for URL: {}", url));
    assert_eq!(std::fs::read_dir(output.path())?.count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_invalid_url_makes_no_request() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    let engine = DownloadEngine::new(config_for(&server))?;
    let url = "https://site/watch?v=ABC123";
    let result = engine.download_video(url, output.path()).await;

    assert!(!result.success);
    assert_eq!(result.message, format!("Invalid URL format: {}", url));

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_metadata_http_error_is_reported() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    Mock::given(method("GET"))
        .and(path(format!("{}/GONE", PLAYER_ENDPOINT)))
        .respond_with(ResponseTemplate::new(406))
        .mount(&server)
        .await;

    let engine = DownloadEngine::new(config_for(&server))?;
    let result = engine
        .download_video("https://site/player?rid=GONE", output.path())
        .await;

    assert!(!result.success);
    assert!(
        result.message.starts_with("Network error for rid GONE:"),
        "got: {}",
        result.message
    );
    assert!(result.message.contains("406"));

    Ok(())
}

#[tokio::test]
async fn test_metadata_timeout_is_reported() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    Mock::given(method("GET"))
        .and(path(format!("{}/SLOW", PLAYER_ENDPOINT)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>x</title><v>a.mp4</v>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server)
        .with_timeouts(Duration::from_millis(200), Duration::from_secs(5));
    let engine = DownloadEngine::new(config)?;
    let result = engine
        .download_video("https://site/player?rid=SLOW", output.path())
        .await;

    assert!(!result.success);
    assert!(
        result.message.starts_with("Network error for rid SLOW: request timed out"),
        "got: {}",
        result.message
    );

    Ok(())
}

#[tokio::test]
async fn test_video_http_error_is_reported() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    mount_metadata(
        &server,
        "BROKEN",
        format!(
            "<title>Databases: Joins</title><v>{}/vod/missing.mp4</v>",
            server.uri()
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/vod/missing.mp4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = DownloadEngine::new(config_for(&server))?;
    let result = engine
        .download_video("https://site/player?rid=BROKEN", output.path())
        .await;

    assert!(!result.success);
    assert_eq!(
        result.message,
        "Download failed for Databases- Joins.mp4: server responded with 404 Not Found"
    );

    Ok(())
}

#[tokio::test]
async fn test_batch_isolates_failures() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    for (rid, title) in [("OK1", "Compilers - Lexing"), ("OK2", "Compilers - Parsing")] {
        mount_metadata(
            &server,
            rid,
            format!("<title>{}</title><v>{}/vod/{}.mp4</v>", title, server.uri(), rid),
        )
        .await;
        mount_video(&server, &format!("/vod/{}.mp4", rid), rid.as_bytes().to_vec()).await;
    }
    Mock::given(method("GET"))
        .and(path(format!("{}/DOWN", PLAYER_ENDPOINT)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let urls = vec![
        "https://site/player?rid=OK1".to_string(),
        "https://site/player?rid=DOWN".to_string(),
        "https://site/nowhere".to_string(),
        "https://site/show?rid=OK2".to_string(),
    ];

    let manager = DownloadManager::new(config_for(&server))?;
    let summary = manager
        .run_batch(urls.clone(), output.path(), &NoopObserver)
        .await;

    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
    assert!(summary.is_complete());

    let by_url: HashMap<&str, &DownloadResult> = summary
        .results
        .iter()
        .map(|r| (r.url.as_str(), r))
        .collect();
    assert_eq!(by_url.len(), 4);

    assert!(by_url["https://site/player?rid=OK1"].success);
    assert!(by_url["https://site/show?rid=OK2"].success);
    assert!(!by_url["https://site/player?rid=DOWN"].success);
    assert_eq!(
        by_url["https://site/nowhere"].message,
        "Invalid URL format: https://site/nowhere"
    );

    let course_dir = output.path().join("Compilers");
    assert_eq!(std::fs::read(course_dir.join("Compilers - Lexing.mp4"))?, b"OK1");
    assert_eq!(std::fs::read(course_dir.join("Compilers - Parsing.mp4"))?, b"OK2");

    Ok(())
}

#[tokio::test]
async fn test_filesystem_errors_stay_with_their_task() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    for (rid, title) in [
        ("BLOCKED", "Compilers - Lexing"),
        ("CLASH", "Graphics - Shading"),
        ("FINE", "Networks - TCP"),
    ] {
        mount_metadata(
            &server,
            rid,
            format!("<title>{}</title><v>{}/vod/{}.mp4</v>", title, server.uri(), rid),
        )
        .await;
        mount_video(&server, &format!("/vod/{}.mp4", rid), rid.as_bytes().to_vec()).await;
    }

    // A regular file where the course directory should go.
    std::fs::write(output.path().join("Compilers"), b"not a directory")?;
    // A directory where the lecture file should go.
    std::fs::create_dir_all(output.path().join("Graphics").join("Graphics - Shading.mp4"))?;

    let manager = DownloadManager::new(config_for(&server))?;
    let summary = manager
        .run_batch(
            vec![
                "https://site/player?rid=BLOCKED".to_string(),
                "https://site/player?rid=CLASH".to_string(),
                "https://site/player?rid=FINE".to_string(),
            ],
            output.path(),
            &NoopObserver,
        )
        .await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 2);

    let by_url: HashMap<&str, &DownloadResult> = summary
        .results
        .iter()
        .map(|r| (r.url.as_str(), r))
        .collect();

    let blocked = by_url["https://site/player?rid=BLOCKED"];
    assert!(!blocked.success);
    assert!(
        blocked
            .message
            .starts_with("Download failed for Compilers - Lexing.mp4: could not create"),
        "got: {}",
        blocked.message
    );

    let clash = by_url["https://site/player?rid=CLASH"];
    assert!(!clash.success);
    assert!(
        clash
            .message
            .starts_with("Download failed for Graphics - Shading.mp4:"),
        "got: {}",
        clash.message
    );

    let fine = by_url["https://site/player?rid=FINE"];
    assert!(fine.success, "unexpected failure: {}", fine.message);
    assert_eq!(fine.message, "Downloaded: Networks/Networks - TCP.mp4");
    assert_eq!(
        std::fs::read(output.path().join("Networks").join("Networks - TCP.mp4"))?,
        b"FINE"
    );

    Ok(())
}

#[tokio::test]
async fn test_video_timeout_is_reported() -> Result<()> {
    let server = MockServer::start().await;
    let output = TempDir::new()?;

    mount_metadata(
        &server,
        "STALL",
        format!("<title>Robotics - L7</title><v>{}/vod/stall.mp4</v>", server.uri()),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/vod/stall.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server)
        .with_timeouts(Duration::from_secs(5), Duration::from_millis(300));
    let engine = DownloadEngine::new(config)?;
    let result = engine
        .download_video("https://site/player?rid=STALL", output.path())
        .await;

    assert!(!result.success);
    assert!(
        result
            .message
            .starts_with("Download failed for Robotics - L7.mp4: timed out after"),
        "got: {}",
        result.message
    );
    assert!(!output.path().join("Robotics").join("Robotics - L7.mp4").exists());

    Ok(())
}

#[tokio::test]
async fn test_dot_course_title_stays_inside_output() -> Result<()> {
    let server = MockServer::start().await;
    let root = TempDir::new()?;
    let output = root.path().join("lectures");
    std::fs::create_dir_all(&output)?;

    mount_metadata(
        &server,
        "DOTS",
        format!("<title>.. - L1</title><v>{}/vod/dots.mp4</v>", server.uri()),
    )
    .await;
    mount_video(&server, "/vod/dots.mp4", b"dots".to_vec()).await;

    let engine = DownloadEngine::new(config_for(&server))?;
    let result = engine
        .download_video("https://site/player?rid=DOTS", &output)
        .await;

    assert!(result.success, "unexpected failure: {}", result.message);
    assert_eq!(result.message, "Downloaded: .. - L1.mp4");
    assert_eq!(std::fs::read(output.join(".. - L1.mp4"))?, b"dots");
    assert!(!root.path().join(".. - L1.mp4").exists());

    Ok(())
}

/// Metadata source that records how many fetches overlap.
struct SlowSource {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowSource {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MetadataSource for SlowSource {
    fn metadata_url(&self, rid: &str) -> String {
        format!("http://metadata.invalid/{}", rid)
    }

    async fn fetch(&self, rid: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(40)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("<title>Stub {}</title>", rid))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_respects_concurrency_limit() -> Result<()> {
    let output = TempDir::new()?;
    let source = Arc::new(SlowSource::new());

    let engine = DownloadEngine::new(DownloaderConfig::default())?
        .with_metadata_source(source.clone());
    let manager = DownloadManager::from_engine(engine);
    assert_eq!(manager.max_concurrent(), 5);

    let urls: Vec<String> = (0..17)
        .map(|i| format!("https://site/player?rid=R{}", i))
        .collect();

    let progress = Mutex::new(Vec::new());
    let finished = AtomicUsize::new(0);
    let observer = CallbackObserver::new(
        |completed, _result: &DownloadResult| progress.lock().unwrap().push(completed),
        |summary: &BatchSummary| {
            assert!(summary.is_complete());
            finished.fetch_add(1, Ordering::SeqCst);
        },
    );

    let summary = manager.run_batch(urls, output.path(), &observer).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 17);
    let peak = source.peak.load(Ordering::SeqCst);
    assert!(peak <= 5, "peak concurrency was {}", peak);
    assert!(peak > 1, "downloads never overlapped");

    assert_eq!(summary.total, 17);
    assert_eq!(summary.failed, 17);
    assert!(
        summary
            .results
            .iter()
            .all(|r| r.message.starts_with("MP4 video not found for URL:"))
    );

    assert_eq!(*progress.lock().unwrap(), (1..=17).collect::<Vec<_>>());
    assert_eq!(finished.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_empty_batch_completes_immediately() -> Result<()> {
    let output = TempDir::new()?;
    let manager = DownloadManager::new(DownloaderConfig::default())?;

    let finished = AtomicUsize::new(0);
    let observer = CallbackObserver::new(
        |_completed, _result: &DownloadResult| panic!("no task should report"),
        |summary: &BatchSummary| {
            assert_eq!(summary.total, 0);
            finished.fetch_add(1, Ordering::SeqCst);
        },
    );

    let summary = manager.run_batch(Vec::new(), output.path(), &observer).await;

    assert_eq!(summary, BatchSummary::new(0));
    assert_eq!(finished.load(Ordering::SeqCst), 1);

    Ok(())
}
