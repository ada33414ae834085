//! Engine behaviour tests
//!
//! These tests drive the crawl engine over in-memory link graphs and check
//! the traversal, deduplication, error and admission guarantees.

use depth_crawler::downloader::{Document, Downloader, FetchEvent, MemoryDownloader};
use depth_crawler::{CrawlEngine, CrawlError, DownloadError, EngineConfig, PageError};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

const A: &str = "https://a.test/";
const B: &str = "https://a.test/b";
const C: &str = "https://a.test/c";
const D: &str = "https://a.test/d";
const E: &str = "https://a.test/e";
const F: &str = "https://a.test/f";

fn engine(downloader: MemoryDownloader) -> CrawlEngine<MemoryDownloader> {
    CrawlEngine::new(downloader, &EngineConfig::new(4, 2, None)).expect("engine starts")
}

fn no_links() -> Vec<String> {
    Vec::new()
}

#[tokio::test]
async fn test_zero_depth_does_nothing() {
    let downloader = MemoryDownloader::new().page(A, [B]);
    let engine = engine(downloader);

    for seed in [A, "not even a url", ""] {
        let result = engine.download_all(seed, 0).await.unwrap();
        assert!(result.visited.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result.levels, 0);
    }
    assert_eq!(engine.downloader().total_fetches(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_limits_traversal() {
    let downloader = MemoryDownloader::new()
        .page(A, [B, C])
        .page(B, [D])
        .page(C, no_links())
        .page(D, no_links());
    let engine = engine(downloader);

    let result = engine.download_all(A, 2).await.unwrap();

    assert_eq!(result.visited, vec![A, B, C]);
    assert!(result.errors.is_empty());
    assert_eq!(result.levels, 2);
    assert_eq!(engine.downloader().fetch_count(D), 0);
}

#[tokio::test]
async fn test_seed_fetch_failure() {
    let downloader = MemoryDownloader::new()
        .page(A, [B])
        .failing_fetch(A, "connection refused");
    let engine = engine(downloader);

    let result = engine.download_all(A, 3).await.unwrap();

    assert!(result.visited.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(result.errors[A], PageError::Fetch(_)));
    assert_eq!(result.levels, 1);
    assert_eq!(engine.downloader().total_fetches(), 1);
}

#[tokio::test]
async fn test_seed_extraction_failure() {
    let downloader = MemoryDownloader::new()
        .page(A, [B])
        .failing_extract(A, "truncated document");
    let engine = engine(downloader);

    let result = engine.download_all(A, 1).await.unwrap();

    assert_eq!(result.visited, vec![A]);
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(result.errors[A], PageError::Extract(_)));
}

#[tokio::test]
async fn test_failed_page_does_not_stop_siblings() {
    let downloader = MemoryDownloader::new()
        .page(A, [B, C])
        .failing_fetch(B, "timeout")
        .page(C, [D])
        .page(D, no_links());
    let engine = engine(downloader);

    let result = engine.download_all(A, 3).await.unwrap();

    assert_eq!(result.visited, vec![A, C, D]);
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(result.errors[B], PageError::Fetch(_)));
}

#[tokio::test]
async fn test_unknown_page_recorded() {
    let downloader = MemoryDownloader::new().page(A, [B]);
    let engine = engine(downloader);

    let result = engine.download_all(A, 2).await.unwrap();

    assert_eq!(result.visited, vec![A]);
    assert!(matches!(
        result.errors[B],
        PageError::Fetch(DownloadError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_seed_is_normalized() {
    let downloader = MemoryDownloader::new().page(A, [B]).page(B, [A]);
    let engine = engine(downloader);

    for seed in ["https://a.test", "https://A.test/#top"] {
        let result = engine.download_all(seed, 3).await.unwrap();
        assert_eq!(result.visited, vec![A, B]);
        assert!(result.errors.is_empty());
    }
    assert_eq!(engine.downloader().fetch_count(A), 2);
    assert_eq!(engine.downloader().fetch_count("https://a.test"), 0);
}

#[tokio::test]
async fn test_unparseable_seed_kept_as_given() {
    let engine = engine(MemoryDownloader::new());

    let result = engine.download_all("not a url", 2).await.unwrap();

    assert!(result.visited.is_empty());
    assert!(matches!(result.errors["not a url"], PageError::InvalidUrl(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_link_fetched_once() {
    let x = "https://x.test/";
    let parents: Vec<String> = (0..10).map(|i| format!("https://p{}.test/", i)).collect();

    let mut downloader = MemoryDownloader::new()
        .page(A, parents.clone())
        .page(x, [A])
        .with_latency(Duration::from_millis(5));
    for parent in &parents {
        downloader = downloader.page(parent, [x, A]);
    }
    let engine = CrawlEngine::new(downloader, &EngineConfig::new(8, 4, None)).unwrap();

    let result = engine.download_all(A, 4).await.unwrap();

    assert_eq!(engine.downloader().fetch_count(x), 1);
    assert_eq!(engine.downloader().fetch_count(A), 1);
    assert_eq!(result.visited.len(), 12);
    assert_eq!(
        result.visited.iter().filter(|u| u.as_str() == x).count(),
        1
    );
}

#[tokio::test]
async fn test_cycle_stops_early() {
    let downloader = MemoryDownloader::new().page(A, [B]).page(B, [A]);
    let engine = engine(downloader);

    let result = engine.download_all(A, 10).await.unwrap();

    assert_eq!(result.visited, vec![A, B]);
    assert_eq!(result.levels, 2);
    assert_eq!(engine.downloader().total_fetches(), 2);
}

#[tokio::test]
async fn test_excluded_urls_never_touched() {
    let private = "https://a.test/private/page";
    let downloader = MemoryDownloader::new()
        .page(A, [B, private])
        .page(B, [private])
        .failing_fetch(private, "should never be fetched");
    let engine = engine(downloader);

    let excludes = vec!["/private/".to_string()];
    let result = engine.download(A, 3, &excludes).await.unwrap();

    assert_eq!(result.visited, vec![A, B]);
    assert!(result.errors.is_empty());
    assert_eq!(engine.downloader().fetch_count(private), 0);
}

#[tokio::test]
async fn test_excluded_seed() {
    let downloader = MemoryDownloader::new().page(A, [B]);
    let engine = engine(downloader);

    let result = engine
        .download(A, 2, &["a.test".to_string()])
        .await
        .unwrap();

    assert!(result.visited.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(engine.downloader().total_fetches(), 0);
}

#[tokio::test]
async fn test_invalid_link_recorded_without_fetch() {
    let downloader = MemoryDownloader::new().page(A, ["not a url"]);
    let engine = engine(downloader);

    let result = engine.download_all(A, 2).await.unwrap();

    assert_eq!(result.visited, vec![A]);
    assert!(matches!(result.errors["not a url"], PageError::InvalidUrl(_)));
    assert_eq!(engine.downloader().fetch_count("not a url"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_ceiling() {
    let a_pages: Vec<String> = (0..20).map(|i| format!("https://a.test/{}", i)).collect();
    let b_pages: Vec<String> = (0..20).map(|i| format!("https://b.test/{}", i)).collect();

    let mut downloader = MemoryDownloader::new()
        .page("https://seed.test/", a_pages.iter().chain(&b_pages).cloned())
        .with_latency(Duration::from_millis(10));
    for page in a_pages.iter().chain(&b_pages) {
        downloader = downloader.page(page, no_links());
    }

    let engine = CrawlEngine::new(downloader, &EngineConfig::new(16, 2, Some(2))).unwrap();
    let result = engine.download_all("https://seed.test/", 2).await.unwrap();

    assert_eq!(result.visited.len(), 41);
    assert!(result.errors.is_empty());
    assert!(engine.downloader().peak_in_flight("a.test") <= 2);
    assert!(engine.downloader().peak_in_flight("b.test") <= 2);
    assert!(engine.downloader().peak_in_flight("a.test") >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ceiling_of_one_serializes_host() {
    let pages: Vec<String> = (0..8).map(|i| format!("https://a.test/{}", i)).collect();
    let mut downloader = MemoryDownloader::new()
        .page(A, pages.clone())
        .with_latency(Duration::from_millis(5));
    for page in &pages {
        downloader = downloader.page(page, no_links());
    }

    let engine = CrawlEngine::new(downloader, &EngineConfig::new(8, 1, Some(1))).unwrap();
    let result = engine.download_all(A, 2).await.unwrap();

    assert_eq!(result.visited.len(), 9);
    assert_eq!(engine.downloader().peak_in_flight("a.test"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_levels_are_synchronized() {
    let downloader = MemoryDownloader::new()
        .page(A, [B, C])
        .page(B, [D])
        .page(C, [E])
        .page(D, [F])
        .page(E, no_links())
        .page(F, no_links())
        .with_latency(Duration::from_millis(3));
    let engine = CrawlEngine::new(downloader, &EngineConfig::new(4, 1, None)).unwrap();

    let result = engine.download_all(A, 4).await.unwrap();
    assert_eq!(result.visited, vec![A, B, C, D, E, F]);
    assert_eq!(result.levels, 4);

    let level_of: HashMap<&str, u32> = [(A, 1), (B, 2), (C, 2), (D, 3), (E, 3), (F, 4)]
        .into_iter()
        .collect();
    let events = engine.downloader().events();

    for level in 1..4 {
        let last_extract = events
            .iter()
            .rposition(|e| matches!(e, FetchEvent::LinksExtracted(u) if level_of[u.as_str()] == level))
            .expect("level had extractions");
        let first_fetch = events
            .iter()
            .position(|e| matches!(e, FetchEvent::FetchStarted(u) if level_of[u.as_str()] == level + 1))
            .expect("next level had fetches");
        assert!(
            last_extract < first_fetch,
            "level {} fetch started before level {} finished: {:?}",
            level + 1,
            level,
            events
        );
    }
}

#[tokio::test]
async fn test_engine_reused_across_downloads() {
    let downloader = MemoryDownloader::new().page(A, [B]).page(B, no_links());
    let engine = engine(downloader);

    let first = engine.download_all(A, 2).await.unwrap();
    let second = engine.download_all(A, 2).await.unwrap();

    assert_eq!(first.visited, second.visited);
    assert_eq!(engine.downloader().fetch_count(A), 2);
    assert_eq!(engine.downloader().fetch_count(B), 2);
}

#[tokio::test]
async fn test_download_after_close() {
    let engine = engine(MemoryDownloader::new().page(A, no_links()));
    engine.close();
    engine.close();

    assert!(engine.is_closed());
    assert!(matches!(
        engine.download_all(A, 1).await,
        Err(CrawlError::EngineClosed)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_interrupts_running_crawl() {
    let downloader = MemoryDownloader::new()
        .page(A, no_links())
        .with_latency(Duration::from_secs(30));
    let engine = engine(downloader);

    let (result, _) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(engine.download_all(A, 1), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            engine.close();
        })
    })
    .await
    .expect("close did not interrupt the crawl");

    assert!(matches!(result, Err(CrawlError::EngineClosed)));
}

#[tokio::test]
async fn test_invalid_configuration_rejected() {
    let result = CrawlEngine::new(MemoryDownloader::new(), &EngineConfig::new(0, 1, None));
    assert!(matches!(result, Err(CrawlError::Config(_))));

    let result = CrawlEngine::new(MemoryDownloader::new(), &EngineConfig::new(1, 1, Some(0)));
    assert!(matches!(result, Err(CrawlError::Config(_))));
}

#[test]
fn test_engine_requires_runtime() {
    let result = CrawlEngine::new(MemoryDownloader::new(), &EngineConfig::new(1, 1, None));
    assert!(matches!(result, Err(CrawlError::Runtime(_))));
}

struct PanickingDownloader;

struct EmptyDocument;

impl Document for EmptyDocument {
    fn extract_links(&self) -> Result<Vec<String>, DownloadError> {
        panic!("extractor bug")
    }
}

impl Downloader for PanickingDownloader {
    type Document = EmptyDocument;

    async fn fetch(&self, url: &str) -> Result<EmptyDocument, DownloadError> {
        if url.contains("explode") {
            panic!("downloader bug");
        }
        Ok(EmptyDocument)
    }
}

#[tokio::test]
async fn test_panics_recorded_per_url() {
    let engine = CrawlEngine::new(PanickingDownloader, &EngineConfig::new(2, 1, None)).unwrap();

    let fetch_panic = engine.download_all("https://explode.test/", 2).await.unwrap();
    assert!(fetch_panic.visited.is_empty());
    assert!(matches!(
        fetch_panic.errors["https://explode.test/"],
        PageError::Panicked { stage: "fetch", .. }
    ));

    let extract_panic = engine.download_all("https://calm.test/", 2).await.unwrap();
    assert_eq!(extract_panic.visited, vec!["https://calm.test/"]);
    assert!(matches!(
        extract_panic.errors["https://calm.test/"],
        PageError::Panicked { stage: "extract", .. }
    ));
}

struct EagerDownloader;

struct LinkList(Vec<String>);

impl Document for LinkList {
    fn extract_links(&self) -> Result<Vec<String>, DownloadError> {
        Ok(self.0.clone())
    }
}

impl Downloader for EagerDownloader {
    type Document = LinkList;

    // Rejects some URLs before building the future.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<LinkList, DownloadError>> + Send {
        if url.contains("bad") {
            panic!("rejected {}", url);
        }
        let links = if url == A {
            (0..8)
                .map(|i| format!("https://a.test/{}", i))
                .chain(["https://a.test/bad".to_string()])
                .collect()
        } else {
            Vec::new()
        };
        async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok(LinkList(links))
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_eager_panic_releases_host_slot() {
    let engine = CrawlEngine::new(EagerDownloader, &EngineConfig::new(4, 2, Some(1))).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), engine.download_all(A, 2))
        .await
        .expect("crawl stalled after a panicking fetch")
        .unwrap();

    assert_eq!(result.visited.len(), 9);
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        result.errors["https://a.test/bad"],
        PageError::Panicked { stage: "fetch", .. }
    ));
}

#[tokio::test]
async fn test_eager_panic_recorded_without_host_limit() {
    let engine = CrawlEngine::new(EagerDownloader, &EngineConfig::new(2, 1, None)).unwrap();

    let result = engine.download_all("https://a.test/bad", 1).await.unwrap();

    assert!(result.visited.is_empty());
    assert!(matches!(
        result.errors["https://a.test/bad"],
        PageError::Panicked { stage: "fetch", .. }
    ));
}
