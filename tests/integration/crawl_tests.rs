//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the library site and run
//! catalog traversal and book collection end-to-end.

use library_harvest::config::HttpConfig;
use library_harvest::crawler::{
    AssetLayout, BookPipeline, CategoryCrawler, Coordinator, Fetcher, RetryPolicy, SkipOptions,
};
use library_harvest::output::{read_records, write_records, CrawlEvent, MemorySink};
use library_harvest::state::SkipReason;
use library_harvest::url::book_urls_for_range;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATEGORY_ID: u32 = 55;

/// Renders a catalog page listing `book_ids`, with pagination up to `total_pages`
fn catalog_page(book_ids: &[u32], total_pages: u32) -> String {
    let entries: String = book_ids
        .iter()
        .map(|id| {
            format!(
                r#"<table class="d_book"><tr><td><a href="/b{id}/"><img src="/shots/{id}.jpg"></a></td></tr></table>"#
            )
        })
        .collect();
    let pagination: String = (1..=total_pages)
        .map(|page| format!(r#"<a class="npage" href="/l{CATEGORY_ID}/{page}/">{page}</a>"#))
        .collect();
    format!(r#"<html><body><div id="content">{entries}<p class="center">{pagination}</p></div></body></html>"#)
}

/// Renders a book detail page with a text link and a cover
fn book_page(id: u32, title: &str, author: &str) -> String {
    format!(
        r#"<html><body><div id="content">
        <h1>{title} :: {author}</h1>
        <div class="bookimage"><img src="/shots/{id}.jpg"></div>
        <table class="d_book"><tr><td><a href="/txt.php?id={id}">скачать txt</a></td></tr></table>
        <span class="d_book">Жанр книги: <a href="/l{CATEGORY_ID}/">Научная фантастика</a></span>
        <div class="texts"><span class="black">Отличная книга</span></div>
        </div></body></html>"#
    )
}

async fn mount_html(server: &MockServer, p: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts a complete book: detail page, text and cover
async fn mount_book(server: &MockServer, id: u32, title: &str) {
    mount_html(server, &format!("/b{}/", id), book_page(id, title, "Автор")).await;
    mount_html(server, &format!("/shots/{}.jpg", id), format!("cover {}", id)).await;
}

async fn mount_text(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/txt.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Текст"))
        .mount(server)
        .await;
}

fn base_url(server: &MockServer) -> Url {
    Url::parse(&server.uri()).unwrap()
}

fn fetcher() -> Fetcher {
    Fetcher::from_config(&HttpConfig::default()).unwrap()
}

/// A fetcher whose requests time out quickly, so delayed mocks look like
/// connection failures
fn impatient_fetcher() -> Fetcher {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    Fetcher::new(client)
}

fn category_crawler(
    server: &MockServer,
    sink: Arc<MemorySink>,
    cancel: CancellationToken,
) -> CategoryCrawler {
    CategoryCrawler::new(
        fetcher(),
        base_url(server),
        CATEGORY_ID,
        RetryPolicy::unbounded(Duration::from_millis(10)),
        sink,
        cancel,
    )
}

fn impatient_category_crawler(
    server: &MockServer,
    sink: Arc<MemorySink>,
    policy: RetryPolicy,
    cancel: CancellationToken,
) -> CategoryCrawler {
    CategoryCrawler::new(
        impatient_fetcher(),
        base_url(server),
        CATEGORY_ID,
        policy,
        sink,
        cancel,
    )
}

fn coordinator(
    fetcher: Fetcher,
    root: &Path,
    sink: Arc<MemorySink>,
    policy: RetryPolicy,
    cancel: CancellationToken,
) -> Coordinator {
    let pipeline = BookPipeline::new(fetcher, AssetLayout::new(root, "books", "images"), sink);
    Coordinator::new(pipeline, policy, cancel)
}

fn urls(server: &MockServer, ids: &[u32]) -> Vec<Url> {
    ids.iter()
        .map(|id| base_url(server).join(&format!("/b{}/", id)).unwrap())
        .collect()
}

fn titles(records: &[library_harvest::BookRecord]) -> Vec<&str> {
    records.iter().map(|r| r.title.as_str()).collect()
}

#[tokio::test]
async fn test_category_pages_in_range() {
    let server = MockServer::start().await;
    mount_html(&server, "/l55/1/", catalog_page(&[1, 2], 3)).await;
    mount_html(&server, "/l55/2/", catalog_page(&[10, 11], 3)).await;
    mount_html(&server, "/l55/3/", catalog_page(&[12], 3)).await;

    let sink = Arc::new(MemorySink::new());
    let crawler = category_crawler(&server, sink.clone(), CancellationToken::new());

    let book_urls = crawler.list_book_urls(2, 3).await;

    assert_eq!(book_urls, urls(&server, &[10, 11, 12]));
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_category_end_page_clamped() {
    let server = MockServer::start().await;
    for page in 1..=5 {
        mount_html(&server, &format!("/l55/{}/", page), catalog_page(&[page], 5)).await;
    }

    let sink = Arc::new(MemorySink::new());
    let crawler = category_crawler(&server, sink, CancellationToken::new());

    let book_urls = crawler.list_book_urls(1, 1000).await;
    assert_eq!(book_urls, urls(&server, &[1, 2, 3, 4, 5]));

    // Page 1 is fetched once and reused; nothing past page 5 is requested
    let requests = server.received_requests().await.unwrap();
    let paths: Vec<String> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(
        paths,
        vec!["/l55/1/", "/l55/2/", "/l55/3/", "/l55/4/", "/l55/5/"]
    );
}

#[tokio::test]
async fn test_category_start_past_last_page() {
    let server = MockServer::start().await;
    mount_html(&server, "/l55/1/", catalog_page(&[1], 5)).await;

    let sink = Arc::new(MemorySink::new());
    let crawler = category_crawler(&server, sink.clone(), CancellationToken::new());

    let book_urls = crawler.list_book_urls(6, 9).await;

    assert!(book_urls.is_empty());
    assert_eq!(
        sink.events(),
        vec![CrawlEvent::RangeOutOfBounds {
            start_page: 6,
            end_page: 9,
            total_pages: 5
        }]
    );
}

#[tokio::test]
async fn test_category_broken_page_skipped() {
    let server = MockServer::start().await;
    mount_html(&server, "/l55/1/", catalog_page(&[1], 3)).await;
    mount_html(&server, "/l55/2/", "<html><body>maintenance</body></html>".to_string()).await;
    mount_html(&server, "/l55/3/", catalog_page(&[3], 3)).await;

    let sink = Arc::new(MemorySink::new());
    let crawler = category_crawler(&server, sink.clone(), CancellationToken::new());

    let book_urls = crawler.list_book_urls(1, 3).await;

    assert_eq!(book_urls, urls(&server, &[1, 3]));
    let skipped = sink.matching(|e| matches!(e, CrawlEvent::PageSkipped { .. }));
    assert_eq!(skipped.len(), 1);
}

#[tokio::test]
async fn test_catalog_first_page_connection_failure_is_retried() {
    let server = MockServer::start().await;
    // The first request for page 1 hangs past the client timeout
    Mock::given(method("GET"))
        .and(path("/l55/1/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(catalog_page(&[1], 2))
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_html(&server, "/l55/1/", catalog_page(&[1], 2)).await;
    mount_html(&server, "/l55/2/", catalog_page(&[2], 2)).await;

    let sink = Arc::new(MemorySink::new());
    let crawler = impatient_category_crawler(
        &server,
        sink.clone(),
        RetryPolicy::unbounded(Duration::from_millis(10)),
        CancellationToken::new(),
    );

    let book_urls = crawler.list_book_urls(1, 2).await;

    assert_eq!(book_urls, urls(&server, &[1, 2]));
    let retries = sink.matching(|e| matches!(e, CrawlEvent::RetryScheduled { .. }));
    assert_eq!(retries.len(), 1);
    assert!(sink
        .matching(|e| matches!(e, CrawlEvent::CatalogUnreachable { .. }))
        .is_empty());
}

#[tokio::test]
async fn test_catalog_cancellation_keeps_collected_urls() {
    let server = MockServer::start().await;
    mount_html(&server, "/l55/1/", catalog_page(&[1], 3)).await;
    mount_html(&server, "/l55/2/", catalog_page(&[2], 3)).await;
    Mock::given(method("GET"))
        .and(path("/l55/3/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(catalog_page(&[3], 3))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let cancel = CancellationToken::new();
    let crawler = impatient_category_crawler(
        &server,
        sink.clone(),
        RetryPolicy::unbounded(Duration::from_secs(60)),
        cancel.clone(),
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        trigger.cancel();
    });

    let book_urls = tokio::time::timeout(Duration::from_secs(10), crawler.list_book_urls(1, 3))
        .await
        .expect("cancellation should end the traversal promptly");

    assert_eq!(book_urls, urls(&server, &[1, 2]));
    assert!(!sink
        .matching(|e| matches!(e, CrawlEvent::Cancelled { .. }))
        .is_empty());
    assert!(sink
        .matching(|e| matches!(e, CrawlEvent::PageSkipped { .. }))
        .is_empty());
}

#[tokio::test]
async fn test_catalog_redirect_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/l55/1/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/"))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let crawler = category_crawler(&server, sink.clone(), CancellationToken::new());

    assert!(crawler.list_book_urls(1, 2).await.is_empty());
    assert!(matches!(
        sink.events().as_slice(),
        [CrawlEvent::CatalogUnreachable {
            reason: SkipReason::NotFound,
            ..
        }]
    ));
}

#[tokio::test]
async fn test_malformed_book_is_skipped() {
    let server = MockServer::start().await;
    mount_text(&server).await;
    mount_book(&server, 1, "Первая").await;
    mount_html(
        &server,
        "/b2/",
        "<html><body><div id=\"content\"><h1>Без автора</h1></div></body></html>".to_string(),
    )
    .await;
    mount_book(&server, 3, "Третья").await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let mut coordinator = coordinator(
        fetcher(),
        dir.path(),
        sink.clone(),
        RetryPolicy::default(),
        CancellationToken::new(),
    );

    let records = coordinator
        .run(&urls(&server, &[1, 2, 3]), SkipOptions::default())
        .await;

    assert_eq!(titles(&records), vec!["Первая", "Третья"]);
    let skipped = sink.matching(|e| matches!(e, CrawlEvent::BookSkipped { .. }));
    assert!(matches!(
        skipped.as_slice(),
        [CrawlEvent::BookSkipped {
            reason: SkipReason::PageStructure,
            ..
        }]
    ));
    assert_eq!(coordinator.statistics().books_collected, 2);
    assert_eq!(coordinator.statistics().total_skipped(), 1);
}

#[tokio::test]
async fn test_missing_book_redirect_is_skipped() {
    let server = MockServer::start().await;
    mount_text(&server).await;
    mount_book(&server, 1, "Первая").await;
    Mock::given(method("GET"))
        .and(path("/b2/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let mut coordinator = coordinator(
        fetcher(),
        dir.path(),
        sink.clone(),
        RetryPolicy::default(),
        CancellationToken::new(),
    );

    let records = coordinator
        .run(&urls(&server, &[1, 2]), SkipOptions::default())
        .await;

    assert_eq!(titles(&records), vec!["Первая"]);
    assert_eq!(
        coordinator.statistics().books_skipped.get(&SkipReason::NotFound),
        Some(&1)
    );
}

#[tokio::test]
async fn test_transient_connection_failure_is_retried() {
    let server = MockServer::start().await;
    mount_text(&server).await;
    // The first request hangs past the client timeout
    Mock::given(method("GET"))
        .and(path("/b7/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(book_page(7, "Терпение", "Автор"))
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_book(&server, 7, "Терпение").await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let mut coordinator = coordinator(
        impatient_fetcher(),
        dir.path(),
        sink.clone(),
        RetryPolicy::unbounded(Duration::from_millis(10)),
        CancellationToken::new(),
    );

    let records = coordinator
        .run(&urls(&server, &[7]), SkipOptions::default())
        .await;

    assert_eq!(titles(&records), vec!["Терпение"]);
    let retries = sink.matching(|e| matches!(e, CrawlEvent::RetryScheduled { .. }));
    assert_eq!(retries.len(), 1);
    assert_eq!(coordinator.statistics().retries, 1);
}

#[tokio::test]
async fn test_retry_cap_skips_book() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/b8/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let mut coordinator = coordinator(
        impatient_fetcher(),
        dir.path(),
        sink.clone(),
        RetryPolicy::bounded(Duration::from_millis(10), 2),
        CancellationToken::new(),
    );

    let records = coordinator
        .run(&urls(&server, &[8]), SkipOptions::default())
        .await;

    assert!(records.is_empty());
    assert_eq!(
        coordinator
            .statistics()
            .books_skipped
            .get(&SkipReason::RetriesExhausted),
        Some(&1)
    );
}

#[tokio::test]
async fn test_concurrent_run_preserves_input_order() {
    let server = MockServer::start().await;
    mount_text(&server).await;
    for (id, delay_ms) in [(1u32, 300u64), (2, 0), (3, 150)] {
        Mock::given(method("GET"))
            .and(path(format!("/b{}/", id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(book_page(id, &format!("Книга {}", id), "Автор"))
                    .set_delay(Duration::from_millis(delay_ms)),
            )
            .mount(&server)
            .await;
        mount_html(&server, &format!("/shots/{}.jpg", id), "cover".to_string()).await;
    }

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let mut coordinator = coordinator(
        fetcher(),
        dir.path(),
        sink,
        RetryPolicy::default(),
        CancellationToken::new(),
    )
    .with_concurrency(3);

    let records = coordinator
        .run(&urls(&server, &[1, 2, 3]), SkipOptions::default())
        .await;

    assert_eq!(titles(&records), vec!["Книга 1", "Книга 2", "Книга 3"]);
    assert!(dir.path().join("books").join("Книга 2.txt").exists());
}

#[tokio::test]
async fn test_cancellation_keeps_collected_records() {
    let server = MockServer::start().await;
    mount_text(&server).await;
    mount_book(&server, 1, "Первая").await;
    Mock::given(method("GET"))
        .and(path("/b2/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    mount_book(&server, 3, "Третья").await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let cancel = CancellationToken::new();
    let mut coordinator = coordinator(
        impatient_fetcher(),
        dir.path(),
        sink.clone(),
        RetryPolicy::unbounded(Duration::from_secs(60)),
        cancel.clone(),
    );

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        trigger.cancel();
    });

    let records = tokio::time::timeout(
        Duration::from_secs(10),
        coordinator.run(&urls(&server, &[1, 2, 3]), SkipOptions::default()),
    )
    .await
    .expect("cancellation should end the run promptly");

    assert_eq!(titles(&records), vec!["Первая"]);
    let stats = coordinator.statistics();
    assert_eq!(stats.books_cancelled, 1);
    assert_eq!(stats.books_not_started, 1);
    assert!(!sink
        .matching(|e| matches!(e, CrawlEvent::Cancelled { .. }))
        .is_empty());
}

#[tokio::test]
async fn test_full_books_run_writes_records() {
    let server = MockServer::start().await;
    mount_text(&server).await;
    mount_book(&server, 1, "Первая").await;
    mount_book(&server, 2, "Вторая").await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let mut coordinator = coordinator(
        fetcher(),
        dir.path(),
        sink,
        RetryPolicy::default(),
        CancellationToken::new(),
    );

    let book_urls = book_urls_for_range(&base_url(&server), 1, 2).unwrap();
    let records = coordinator.run(&book_urls, SkipOptions::default()).await;

    let records_path = dir.path().join("books_details.json");
    write_records(&records_path, &records).unwrap();

    let written = std::fs::read_to_string(&records_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json[0]["title"], "Первая");
    assert_eq!(json[0]["author"], "Автор");
    assert_eq!(json[0]["img_src"], "images/1.jpg");
    assert_eq!(json[0]["book_path"], "books/Первая.txt");
    assert_eq!(json[1]["genres"][0], "Научная фантастика");
    assert!(written.contains("Первая"), "non-ASCII text must not be escaped");

    assert_eq!(read_records(&records_path).unwrap(), records);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("images").join("2.jpg")).unwrap(),
        "cover 2"
    );
}

#[tokio::test]
async fn test_category_then_books_end_to_end() {
    let server = MockServer::start().await;
    mount_text(&server).await;
    mount_html(&server, "/l55/1/", catalog_page(&[1], 2)).await;
    mount_html(&server, "/l55/2/", catalog_page(&[20, 21], 2)).await;
    mount_book(&server, 20, "Двадцатая").await;
    mount_book(&server, 21, "Двадцать первая").await;

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let cancel = CancellationToken::new();

    let book_urls = category_crawler(&server, sink.clone(), cancel.clone())
        .list_book_urls(2, 2)
        .await;
    let mut coordinator = coordinator(
        fetcher(),
        dir.path(),
        sink.clone(),
        RetryPolicy::default(),
        cancel,
    );
    let options = SkipOptions {
        skip_text: false,
        skip_images: true,
    };
    let records = coordinator.run(&book_urls, options).await;

    assert_eq!(titles(&records), vec!["Двадцатая", "Двадцать первая"]);
    assert!(records.iter().all(|r| r.cover_asset_path.is_empty()));
    assert!(!dir.path().join("images").exists());
}
