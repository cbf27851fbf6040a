//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the GraphQL search endpoint and
//! drive the full crawl cycle end-to-end into a temporary SQLite database.

use serde_json::{json, Value};
use star_crawler::config::{
    ApiConfig, Config, CrawlerConfig, RateLimitConfig, RetryConfig, SearchConfig,
    StarBucketEntry, StorageConfig,
};
use star_crawler::crawler::Coordinator;
use star_crawler::query::{build_queries, FacetDimensions};
use star_crawler::storage::{RepositoryStore, RunStatus};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir, languages: &[&str]) -> Config {
    Config {
        api: ApiConfig {
            endpoint: format!("{}/graphql", server.uri()),
            request_timeout_secs: 5,
            ..ApiConfig::default()
        },
        crawler: CrawlerConfig {
            target_count: 100,
            max_concurrency: 4,
            flush_threshold: 2,
        },
        rate_limit: RateLimitConfig::default(),
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 10,
            max_backoff_ms: 20,
        },
        storage: StorageConfig {
            database_path: dir.path().join("stars.db").to_string_lossy().into_owned(),
            flush_attempts: 3,
        },
        search: SearchConfig {
            languages: languages.iter().map(|l| l.to_string()).collect(),
            years: vec![2023],
            windows: vec![],
            star_buckets: vec![StarBucketEntry { min: 10, max: None }],
        },
    }
}

/// The search text generated for each configured language, in order
fn query_texts(config: &Config) -> Vec<String> {
    let dimensions = FacetDimensions::from_config(&config.search).unwrap();
    build_queries(&dimensions)
        .iter()
        .map(|q| q.as_str().to_string())
        .collect()
}

fn node(id: &str, owner: &str, name: &str, stars: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "owner": { "login": owner },
        "stargazerCount": stars,
        "createdAt": "2023-03-01T10:00:00Z",
        "updatedAt": "2024-04-01T10:00:00Z"
    })
}

fn search_page(nodes: Vec<Value>, next: Option<&str>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "data": {
            "search": {
                "pageInfo": { "hasNextPage": next.is_some(), "endCursor": next },
                "nodes": nodes
            },
            "rateLimit": { "remaining": 4990, "resetAt": "2030-01-01T00:00:00Z" }
        }
    }))
}

/// Matches one page request: search text plus cursor (None = first page)
fn page_request(q: &str, after: Option<&str>) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "variables": { "q": q, "after": after, "first": 100 }
        })))
}

#[tokio::test]
async fn test_full_crawl_with_pagination_and_overlap() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir, &["Rust", "Go"]);
    let queries = query_texts(&config);

    page_request(&queries[0], None)
        .respond_with(search_page(
            vec![node("R_A", "tokio-rs", "tokio", 10), node("R_B", "serde-rs", "serde", 5)],
            Some("c1"),
        ))
        .expect(1)
        .mount(&server)
        .await;
    page_request(&queries[0], Some("c1"))
        .respond_with(search_page(vec![node("R_C", "rust-lang", "cargo", 7)], None))
        .expect(1)
        .mount(&server)
        .await;
    page_request(&queries[1], None)
        .respond_with(search_page(
            vec![node("R_A", "tokio-rs", "tokio", 11), node("R_D", "golang", "go", 20)],
            None,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(&config, TOKEN.to_string(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.queries, 2);
    assert_eq!(summary.records, 5);
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.pages_abandoned, 0);
    assert_eq!(summary.batches, 3);

    let storage = coordinator.storage();
    assert_eq!(storage.count_repositories().unwrap(), 4);
    assert_eq!(storage.count_samples().unwrap(), 4);

    let tokio = storage.get_repository("R_A").unwrap().unwrap();
    assert_eq!(tokio.full_name, "tokio-rs/tokio");
    assert_eq!(tokio.stars, 11);
    assert_eq!(tokio.created_at, "2023-03-01T10:00:00+00:00");

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash");
    assert_eq!(run.records_crawled, 5);
}

#[tokio::test]
async fn test_transient_server_error_is_retried() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir, &["Rust"]);
    let queries = query_texts(&config);

    page_request(&queries[0], None)
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    page_request(&queries[0], None)
        .respond_with(search_page(vec![node("R_A", "o", "a", 1)], None))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(&config, TOKEN.to_string(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.records, 1);
    assert_eq!(summary.pages_abandoned, 0);
}

#[tokio::test]
async fn test_exhausted_retries_abandon_the_page() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir, &["Rust"]);
    let queries = query_texts(&config);

    page_request(&queries[0], None)
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(&config, TOKEN.to_string(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.records, 0);
    assert_eq!(summary.pages_abandoned, 1);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried_and_other_facets_continue() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir, &["Rust", "Go"]);
    let queries = query_texts(&config);

    page_request(&queries[0], None)
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .expect(1)
        .mount(&server)
        .await;
    page_request(&queries[1], None)
        .respond_with(search_page(
            vec![node("R_D", "golang", "go", 20), node("R_E", "gin", "gin", 3)],
            None,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(&config, TOKEN.to_string(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.pages_abandoned, 1);
    assert_eq!(summary.records, 2);
    assert_eq!(coordinator.storage().count_repositories().unwrap(), 2);
}

#[tokio::test]
async fn test_graphql_errors_abandon_the_page() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir, &["Rust"]);
    let queries = query_texts(&config);

    page_request(&queries[0], None)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Parse error on \"stars\"" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(&config, TOKEN.to_string(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.pages_abandoned, 1);
    assert_eq!(summary.records, 0);
    assert_eq!(summary.batches, 0);
}

#[tokio::test]
async fn test_target_stops_pagination() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server, &dir, &["Rust"]);
    config.crawler.target_count = 1;
    let queries = query_texts(&config);

    page_request(&queries[0], None)
        .respond_with(search_page(
            vec![node("R_A", "o", "a", 1), node("R_B", "o", "b", 2)],
            Some("c1"),
        ))
        .expect(1)
        .mount(&server)
        .await;
    page_request(&queries[0], Some("c1"))
        .respond_with(search_page(vec![node("R_C", "o", "c", 3)], None))
        .expect(0)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(&config, TOKEN.to_string(), "hash").unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.records, 1);
    assert!(coordinator.storage().get_repository("R_B").unwrap().is_none());
}

#[tokio::test]
async fn test_rerun_same_day_updates_without_new_samples() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir, &["Rust"]);
    let queries = query_texts(&config);

    page_request(&queries[0], None)
        .respond_with(search_page(vec![node("R_A", "o", "a", 1)], None))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    page_request(&queries[0], None)
        .respond_with(search_page(vec![node("R_A", "o", "a", 2)], None))
        .mount(&server)
        .await;

    let mut first = Coordinator::new(&config, TOKEN.to_string(), "hash").unwrap();
    first.run().await.unwrap();
    drop(first);

    let mut second = Coordinator::new(&config, TOKEN.to_string(), "hash").unwrap();
    second.run().await.unwrap();

    let storage = second.storage();
    assert_eq!(storage.count_repositories().unwrap(), 1);
    assert_eq!(storage.count_samples().unwrap(), 1);
    assert_eq!(storage.get_repository("R_A").unwrap().unwrap().stars, 2);
    assert_ne!(second.run_id(), storage.get_run(1).unwrap().id);
}
