use course_kraken::config::DownloadConfig;
use course_kraken::crawler::{Downloader, SaveOutcome};
use course_kraken::output::CrawlStats;
use course_kraken::Session;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(dir: &TempDir, max_file_size_mb: f64) -> (Downloader, Arc<CrawlStats>) {
    let session = Session::new(Duration::from_secs(5)).unwrap();
    let stats = Arc::new(CrawlStats::new());
    let config = DownloadConfig {
        directory: dir.path().to_path_buf(),
        max_file_size_mb,
    };
    (Downloader::new(session, &config, Arc::clone(&stats)), stats)
}

/// Mounts HEAD and GET for a file whose announced size matches its body
async fn mount_file(server: &MockServer, file_path: &str, body: Vec<u8>) {
    let length = body.len().to_string();

    Mock::given(method("HEAD"))
        .and(path(file_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-length", length.as_str())
                .set_body_bytes(body.clone()),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_file_within_cap_is_written() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_file(&mock_server, "/pluginfile.php/1/slides.pdf", vec![b'x'; 1000]).await;

    let (downloader, stats) = downloader(&dir, 200.0);
    let url = Url::parse(&format!("{}/pluginfile.php/1/slides.pdf", mock_server.uri())).unwrap();

    let outcome = downloader
        .save(&url, "Week 1 slides.pdf", "Intro to Robotics", "Week 1")
        .await;

    let expected = dir
        .path()
        .join("intro_to_robotics")
        .join("week_1")
        .join("Week_1_slides.pdf");
    assert_eq!(outcome, SaveOutcome::Saved(expected.clone()));
    assert_eq!(std::fs::read(&expected).unwrap().len(), 1000);

    let now = chrono::Utc::now();
    let snapshot = stats.snapshot(now, now);
    assert_eq!(snapshot.files_saved, 1);
    assert_eq!(snapshot.bytes_written, 1000);
}

#[tokio::test]
async fn test_file_over_cap_is_skipped() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("HEAD"))
        .and(path("/pluginfile.php/2/video.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-length", "2000")
                .set_body_bytes(vec![0u8; 2000]),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pluginfile.php/2/video.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2000]))
        .expect(0)
        .mount(&mock_server)
        .await;

    // 0.001 MB = 1000 bytes
    let (downloader, stats) = downloader(&dir, 0.001);
    let url = Url::parse(&format!("{}/pluginfile.php/2/video.mp4", mock_server.uri())).unwrap();

    let outcome = downloader.save(&url, "video.mp4", "Databases", "Recordings").await;

    assert_eq!(outcome, SaveOutcome::TooLarge { bytes: 2000 });
    assert!(!dir.path().join("databases").exists());

    let now = chrono::Utc::now();
    assert_eq!(stats.snapshot(now, now).skipped_too_large, 1);
}

#[tokio::test]
async fn test_missing_head_still_downloads() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/mod/folder/download_folder.php"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
        .mount(&mock_server)
        .await;

    let (downloader, _) = downloader(&dir, 0.5);
    let url = Url::parse(&format!("{}/mod/folder/download_folder.php?id=7", mock_server.uri())).unwrap();

    let outcome = downloader.save(&url, "Exercise sheets", "Databases", "Week 2").await;

    let expected = dir
        .path()
        .join("databases")
        .join("week_2")
        .join("Exercise_sheets.zip");
    assert_eq!(outcome, SaveOutcome::Saved(expected.clone()));
    assert_eq!(std::fs::read(&expected).unwrap(), b"PK\x03\x04".to_vec());
}

#[tokio::test]
async fn test_failed_get_writes_nothing() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/pluginfile.php/3/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (downloader, stats) = downloader(&dir, 200.0);
    let url = Url::parse(&format!("{}/pluginfile.php/3/gone.pdf", mock_server.uri())).unwrap();

    let outcome = downloader.save(&url, "gone.pdf", "Databases", "Week 3").await;

    assert_eq!(outcome, SaveOutcome::Failed);
    assert!(!dir.path().join("databases").exists());

    let now = chrono::Utc::now();
    assert_eq!(stats.snapshot(now, now).save_failures, 1);
}

#[tokio::test]
async fn test_existing_file_is_overwritten() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_file(&mock_server, "/pluginfile.php/4/notes.txt", b"new notes".to_vec()).await;

    let existing = dir.path().join("databases").join("week_4");
    std::fs::create_dir_all(&existing).unwrap();
    std::fs::write(existing.join("notes.txt"), b"old").unwrap();

    let (downloader, _) = downloader(&dir, 200.0);
    let url = Url::parse(&format!("{}/pluginfile.php/4/notes.txt", mock_server.uri())).unwrap();

    downloader.save(&url, "notes.txt", "Databases", "Week 4").await;

    assert_eq!(std::fs::read(existing.join("notes.txt")).unwrap(), b"new notes".to_vec());
}

#[tokio::test]
async fn test_unannounced_body_over_cap_is_abandoned() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pluginfile.php/5/lecture.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 5000]))
        .expect(1)
        .mount(&mock_server)
        .await;

    // 0.001 MB = 1000 bytes
    let (downloader, stats) = downloader(&dir, 0.001);
    let url = Url::parse(&format!("{}/pluginfile.php/5/lecture.mp4", mock_server.uri())).unwrap();

    let outcome = downloader.save(&url, "lecture.mp4", "Databases", "Recordings").await;

    assert!(matches!(outcome, SaveOutcome::TooLarge { bytes } if bytes > 1000));

    let block = dir.path().join("databases").join("recordings");
    assert!(!block.join("lecture.mp4").exists());
    assert!(!block.join("lecture.mp4.part").exists());

    let now = chrono::Utc::now();
    let snapshot = stats.snapshot(now, now);
    assert_eq!(snapshot.skipped_too_large, 1);
    assert_eq!(snapshot.files_saved, 0);
}
