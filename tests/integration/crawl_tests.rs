//! End-to-end crawls against a mock portal

use crate::{create_test_config, listing_body};
use course_kraken::config::FilterEntry;
use course_kraken::output::CrawlStats;
use course_kraken::{Crawler, Session};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_html(server: &MockServer, page_path: &str, id: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .and(query_param("id", id))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_bytes(server: &MockServer, file_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(1)
        .mount(server)
        .await;
}

fn crawler(server: &MockServer, dir: &TempDir, filters: Vec<FilterEntry>) -> Crawler {
    let config = create_test_config(&server.uri(), dir.path(), filters);
    let session = Session::new(Duration::from_secs(5)).unwrap();
    Crawler::new(config, session, Arc::new(CrawlStats::new())).expect("crawler")
}

#[tokio::test]
async fn test_full_crawl_single_course() {
    let mock_server = MockServer::start().await;

    // Listing with one kept and one filtered course
    Mock::given(method("GET"))
        .and(path("/courses"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
            &[
                ("/course/view.php?id=1", "Databases"),
                ("/course/view.php?id=2", "Intro to Robotics"),
            ],
            None,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_html(
        &mock_server,
        "/course/view.php",
        "1",
        r##"<html><head><title>Course: Databases</title></head><body>
        <h1>Databases</h1>
        <ul class="topics">
          <li class="section"><h4><a>Week 1</a></h4>
            <a href="/pluginfile.php/1/lecture.pdf">Lecture</a>
            <a href="/mod/forum/view.php?id=4">Announcements</a>
            <a href="#section-1">Jump</a>
          </li>
        </ul></body></html>"##
            .to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/course/view.php"))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Intro to Robotics</h1>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/mod/forum/view.php"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    mount_bytes(&mock_server, "/pluginfile.php/1/lecture.pdf", b"%PDF-1.4 lecture").await;

    let dir = TempDir::new().unwrap();
    let crawler = crawler(
        &mock_server,
        &dir,
        vec![FilterEntry {
            pattern: "Robotics".to_string(),
            include: false,
        }],
    );

    let stats = crawler.run().await;

    let expected = dir.path().join("databases").join("week_1").join("lecture.pdf");
    assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.4 lecture".to_vec());
    assert!(!dir.path().join("intro_to_robotics").exists());

    assert_eq!(stats.courses_listed, 2);
    assert_eq!(stats.courses_kept, 1);
    assert_eq!(stats.files_saved, 1);
    assert_eq!(stats.file_links, 1);
    assert_eq!(stats.handler_failures, 0);
    // root, one course page, one file page
    assert_eq!(stats.targets_visited, 3);

    assert!(crawler.frontier().is_empty());
}

#[tokio::test]
async fn test_crawl_resolves_redirects_and_folders() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
            &[("/course/view.php?id=1", "Signals &amp; Systems")],
            None,
        )))
        .mount(&mock_server)
        .await;

    mount_html(
        &mock_server,
        "/course/view.php",
        "1",
        r#"<html><body><h1>Signals &amp; Systems</h1><ul>
          <li class="section"><h3 class="sectionname">Exercises</h3>
            <a href="/mod/resource/view.php?id=5"><span class="instancename">Notes</span></a>
            <a href="/mod/folder/view.php?id=7">Sheets</a>
            <a href="/mod/resource/view.php?id=5">Notes again</a>
          </li></ul></body></html>"#
            .to_string(),
    )
    .await;

    // Resource page that redirects straight to its file
    Mock::given(method("GET"))
        .and(path("/mod/resource/view.php"))
        .and(query_param("id", "5"))
        .respond_with(
            ResponseTemplate::new(303).insert_header("location", "/pluginfile.php/5/Notes%202024.pdf"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_html(
        &mock_server,
        "/mod/folder/view.php",
        "7",
        r#"<html><body><h2>Exercise sheets</h2>
          <form method="post" action="download_folder.php">
            <input type="hidden" name="id" value="7">
            <button type="submit">Download folder</button>
          </form></body></html>"#
            .to_string(),
    )
    .await;

    mount_bytes(&mock_server, "/pluginfile.php/5/Notes%202024.pdf", b"notes").await;

    Mock::given(method("GET"))
        .and(path("/mod/folder/download_folder.php"))
        .and(query_param("id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let crawler = crawler(&mock_server, &dir, vec![]);
    let stats = crawler.run().await;

    let block = dir.path().join("signals_systems").join("exercises");
    assert_eq!(std::fs::read(block.join("Notes_2024.pdf")).unwrap(), b"notes".to_vec());
    assert_eq!(
        std::fs::read(block.join("Exercise_sheets.zip")).unwrap(),
        b"PK\x03\x04".to_vec()
    );

    assert_eq!(stats.files_saved, 2);
    assert_eq!(stats.redirects, 1);
}

#[tokio::test]
async fn test_broken_pages_do_not_stop_the_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
            &[
                ("/course/view.php?id=1", "Broken"),
                ("/course/view.php?id=2", "Working"),
            ],
            None,
        )))
        .mount(&mock_server)
        .await;

    // No course name at all: handler fails
    mount_html(
        &mock_server,
        "/course/view.php",
        "1",
        "<html><body><p>oops</p></body></html>".to_string(),
    )
    .await;

    mount_html(
        &mock_server,
        "/course/view.php",
        "2",
        r#"<html><body><h1>Working</h1><ul>
          <li class="section"><h4><a>Files</a></h4>
            <a href="/mod/resource/view.php?id=8">Missing</a>
            <a href="/pluginfile.php/9/ok.txt">Ok</a>
          </li></ul></body></html>"#
            .to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/mod/resource/view.php"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    mount_bytes(&mock_server, "/pluginfile.php/9/ok.txt", b"ok").await;

    let dir = TempDir::new().unwrap();
    let crawler = crawler(&mock_server, &dir, vec![]);
    let stats = crawler.run().await;

    assert_eq!(
        std::fs::read(dir.path().join("working").join("files").join("ok.txt")).unwrap(),
        b"ok".to_vec()
    );
    assert_eq!(stats.handler_failures, 1);
    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.files_saved, 1);
}

#[tokio::test]
async fn test_slow_course_page_outlasts_idle_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(
            &[("/course/view.php?id=1", "Databases")],
            None,
        )))
        .mount(&mock_server)
        .await;

    // Answers well after the idle timeout has passed
    Mock::given(method("GET"))
        .and(path("/course/view.php"))
        .and(query_param("id", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body><h1>Databases</h1><ul>
                      <li class="section"><h4><a>Week 1</a></h4>
                        <a href="/pluginfile.php/1/late.pdf">Late</a>
                      </li></ul></body></html>"#,
                )
                .set_delay(Duration::from_millis(2500)),
        )
        .mount(&mock_server)
        .await;

    mount_bytes(&mock_server, "/pluginfile.php/1/late.pdf", b"late").await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path(), vec![]);
    config.crawler.idle_timeout_secs = 1;
    let session = Session::new(Duration::from_secs(5)).unwrap();
    let crawler = Crawler::new(config, session, Arc::new(CrawlStats::new())).expect("crawler");

    let stats = crawler.run().await;

    assert_eq!(
        std::fs::read(dir.path().join("databases").join("week_1").join("late.pdf")).unwrap(),
        b"late".to_vec()
    );
    assert_eq!(stats.files_saved, 1);
    assert!(crawler.frontier().is_empty());
}
