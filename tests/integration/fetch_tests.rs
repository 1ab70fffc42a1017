use course_kraken::crawler::{FetchOutcome, FetchStrategy, Fetcher, StaticStrategy};
use course_kraken::output::CrawlStats;
use course_kraken::parser::descriptor_from_redirect;
use course_kraken::Session;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn static_fetcher(retries: u32) -> (Fetcher, Arc<CrawlStats>) {
    let session = Session::new(Duration::from_secs(5)).expect("session");
    let stats = Arc::new(CrawlStats::new());
    let fetcher = Fetcher::new(
        Arc::new(StaticStrategy::new(session)),
        retries,
        Arc::clone(&stats),
    )
    .with_retry_delay(Duration::ZERO);
    (fetcher, stats)
}

#[tokio::test]
async fn test_see_other_becomes_file_descriptor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mod/resource/view.php"))
        .respond_with(ResponseTemplate::new(303).insert_header("location", "https://x/f.pdf"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, stats) = static_fetcher(3);
    let url = Url::parse(&format!("{}/mod/resource/view.php?id=2", mock_server.uri())).unwrap();

    let outcome = fetcher.fetch(&url).await;
    assert_eq!(outcome, FetchOutcome::Redirect("https://x/f.pdf".to_string()));

    let FetchOutcome::Redirect(location) = outcome else {
        unreachable!()
    };
    let descriptor = descriptor_from_redirect(&Url::parse(&location).unwrap()).unwrap();
    assert_eq!(descriptor.name, "f.pdf");
    assert_eq!(descriptor.url, "https://x/f.pdf");

    let now = chrono::Utc::now();
    assert_eq!(stats.snapshot(now, now).fetch_attempts, 1);
}

#[tokio::test]
async fn test_success_returns_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/course/view.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>Databases</h1></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let (fetcher, _) = static_fetcher(3);
    let url = Url::parse(&format!("{}/course/view.php?id=1", mock_server.uri())).unwrap();

    match fetcher.fetch(&url).await {
        FetchOutcome::Content(body) => assert!(body.contains("<h1>Databases</h1>")),
        other => panic!("expected content, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_status_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mod/resource/view.php"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, stats) = static_fetcher(4);
    let url = Url::parse(&format!("{}/mod/resource/view.php?id=9", mock_server.uri())).unwrap();

    assert_eq!(fetcher.fetch(&url).await, FetchOutcome::Failed);

    let now = chrono::Utc::now();
    let snapshot = stats.snapshot(now, now);
    assert_eq!(snapshot.fetch_attempts, 1);
    assert_eq!(snapshot.fetch_failures, 1);
}

#[tokio::test]
async fn test_other_redirects_are_not_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mod/url/view.php"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200).set_body_string("followed"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let session = Session::new(Duration::from_secs(5)).unwrap();
    let strategy = StaticStrategy::new(session);
    let url = Url::parse(&format!("{}/mod/url/view.php?id=3", mock_server.uri())).unwrap();

    assert_eq!(strategy.attempt(&url).await.unwrap(), FetchOutcome::Failed);
}

#[tokio::test]
async fn test_unreachable_host_exhausts_attempts() {
    // Bind and drop a listener so the port is closed
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let (fetcher, stats) = static_fetcher(3);
    let url = Url::parse(&format!("http://127.0.0.1:{}/course/view.php?id=1", port)).unwrap();

    assert_eq!(fetcher.fetch(&url).await, FetchOutcome::Failed);

    let now = chrono::Utc::now();
    let snapshot = stats.snapshot(now, now);
    assert_eq!(snapshot.fetch_attempts, 3);
    assert_eq!(snapshot.fetch_failures, 1);
}
