//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! index → leaf pages → checkpoint cycle end-to-end against temp directories.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};
use wikidex::catalog::{export, CatalogEntry, CatalogStore, Checkpoint};
use wikidex::config::Config;
use wikidex::crawler::Coordinator;
use wikidex::ledger::{LedgerStatus, ProgressLedger};
use wikidex::output::RunStats;
use wikidex::state::RunPhase;

/// Creates a test configuration pointing at the mock server, with no delays
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.source.base_url = base_url.to_string();
    config.crawler.request_delay_ms = 0;
    config.crawler.batch_delay_ms = 0;
    config.crawler.page_timeout_secs = 5;
    config.output.cache_dir = dir.path().join("cache");
    config.output.progress_file = dir.path().join("progress.txt");
    config.output.csv_path = dir.path().join("dex.csv");
    config.output.json_path = dir.path().join("dex.json");
    config
}

fn index_page(slugs: &[&str]) -> String {
    let links: String = slugs
        .iter()
        .map(|slug| format!(r#"<li><a href="/wiki/{0}">{0}</a></li>"#, slug))
        .collect();
    format!(
        r#"<html><body><div class="mw-parser-output"><ul>{}</ul></div></body></html>"#,
        links
    )
}

fn entry_page(name: &str, kind: &str) -> String {
    format!(
        r#"<html><head><meta property="og:image" content="https://img.example.com/{0}.png"></head>
        <body><h1>{0}</h1>
        <aside class="portable-infobox">
          <div class="pi-data"><h3 class="pi-data-label">Type</h3><div class="pi-data-value"><a href="/wiki/{1}">{1}</a></div></div>
          <div class="pi-data"><h3 class="pi-data-label">Favorite Food</h3><div class="pi-data-value">Pizza</div></div>
        </aside>
        <h2><span class="mw-headline">Bio</span></h2>
        <p>{0} is a {1}.</p>
        </body></html>"#,
        name, kind
    )
}

fn non_entry_page(title: &str) -> String {
    format!(
        r#"<html><body><h1>{}</h1><p>A page without an infobox.</p></body></html>"#,
        title
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String, calls: u64) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(calls)
        .mount(server)
        .await;
}

async fn run_once(config: Config) -> (Coordinator, RunStats) {
    let mut coordinator = Coordinator::new(config, Arc::new(AtomicBool::new(false))).unwrap();
    let mut stats = RunStats::new();
    coordinator.run(&mut stats).await.unwrap();
    (coordinator, stats)
}

fn catalog_names(csv_path: &Path) -> Vec<String> {
    export::read_csv(csv_path)
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect()
}

#[tokio::test]
async fn test_accept_fail_reject_scenario() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/wiki/Master_List",
        index_page(&["Fifi", "Broken", "List_Overview"]),
        1,
    )
    .await;
    mount_page(&server, "/wiki/Fifi", entry_page("Fifi", "Fox"), 1).await;

    // Fails on the first run, succeeds on the retry; the first mounted mock wins
    Mock::given(method("GET"))
        .and(path("/wiki/Broken"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/wiki/Broken", entry_page("Bramble", "Hedgehog"), 1).await;

    // Allow-listed key present, but the title is a known list page
    let list_body = r#"<html><body><h1>Master List</h1>
        <aside class="portable-infobox"><div class="pi-data">
          <h3 class="pi-data-label">Type</h3><div class="pi-data-value">Fox</div>
        </div></aside></body></html>"#;
    mount_page(&server, "/wiki/List_Overview", list_body.to_string(), 1).await;

    let config = create_test_config(&base, &dir);
    let (coordinator, stats) = run_once(config.clone()).await;

    let u1 = format!("{}/wiki/Fifi", base);
    let u2 = format!("{}/wiki/Broken", base);
    let u3 = format!("{}/wiki/List_Overview", base);

    assert_eq!(coordinator.phase(), RunPhase::Done);
    assert_eq!(stats.new_entries, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.total_available, 3);
    assert_eq!(catalog_names(&config.output.csv_path), vec!["Fifi"]);

    let ledger = ProgressLedger::open(&config.output.progress_file).unwrap();
    assert_eq!(ledger.status(&u1), LedgerStatus::Processed);
    assert_eq!(ledger.status(&u2), LedgerStatus::Unknown);
    assert_eq!(ledger.status(&u3), LedgerStatus::Rejected);

    let entry = &export::read_json(&config.output.json_path).unwrap()[0];
    assert_eq!(entry.kind.as_deref(), Some("Fox"));
    assert_eq!(entry.extra["Favorite Food"], "Pizza");
    assert_eq!(entry.description.as_deref(), Some("Fifi is a Fox."));
    assert_eq!(entry.image_url.as_deref(), Some("https://img.example.com/Fifi.png"));

    // Next run retries only the failed page; the index comes from cache
    let (_, stats) = run_once(config.clone()).await;

    assert_eq!(stats.new_entries, 1);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.network_requests, 1);
    assert_eq!(catalog_names(&config.output.csv_path), vec!["Fifi", "Bramble"]);
}

#[tokio::test]
async fn test_resume_fetches_only_new_pages() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base, &dir);

    let a = format!("{}/wiki/A", base);
    let b = format!("{}/wiki/B", base);

    // A prior run left {A, B} in both the checkpoint and the ledger
    let store = CatalogStore::from_entries(vec![CatalogEntry::new("A", &a), CatalogEntry::new("B", &b)]);
    Checkpoint::new(&config.output.csv_path, &config.output.json_path)
        .flush(&store)
        .unwrap();
    fs::write(&config.output.progress_file, format!("{}\n{}\n", a, b)).unwrap();

    mount_page(&server, "/wiki/Master_List", index_page(&["A", "B", "C"]), 1).await;
    mount_page(&server, "/wiki/A", entry_page("A", "Fox"), 0).await;
    mount_page(&server, "/wiki/B", entry_page("B", "Fox"), 0).await;
    mount_page(&server, "/wiki/C", entry_page("C", "Cat"), 1).await;

    let (coordinator, stats) = run_once(config.clone()).await;

    assert_eq!(stats.existing_entries, 2);
    assert_eq!(stats.new_entries, 1);
    assert_eq!(coordinator.store().len(), 3);
    assert_eq!(catalog_names(&config.output.csv_path), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_catalog_row_missing_from_ledger_is_not_refetched() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base, &dir);

    let a = format!("{}/wiki/A", base);
    let b = format!("{}/wiki/B", base);

    // The ledger lost B's line, but B still has a catalog row
    let store = CatalogStore::from_entries(vec![CatalogEntry::new("A", &a), CatalogEntry::new("B", &b)]);
    Checkpoint::new(&config.output.csv_path, &config.output.json_path)
        .flush(&store)
        .unwrap();
    fs::write(&config.output.progress_file, format!("{}\n", a)).unwrap();

    mount_page(&server, "/wiki/Master_List", index_page(&["A", "B"]), 1).await;
    // Would now classify as a non-entry if it were fetched again
    mount_page(&server, "/wiki/B", non_entry_page("Master List"), 0).await;

    let (coordinator, stats) = run_once(config.clone()).await;

    assert_eq!(stats.rejected, 0);
    assert_eq!(coordinator.ledger().status(&b), LedgerStatus::Processed);
    assert_eq!(coordinator.ledger().rejected_count(), 0);
    assert_eq!(catalog_names(&config.output.csv_path), vec!["A", "B"]);
}

/// Serves entry pages and requests cancellation once `after` pages were served
struct CancelAfter {
    cancel: Arc<AtomicBool>,
    served: AtomicUsize,
    after: usize,
}

impl Respond for CancelAfter {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let name = request
            .url
            .path()
            .rsplit('/')
            .next()
            .unwrap_or("Unknown")
            .to_string();

        let served = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        if served == self.after {
            self.cancel.store(true, Ordering::SeqCst);
        }
        ResponseTemplate::new(200).set_body_string(entry_page(&name, "Fox"))
    }
}

#[tokio::test]
async fn test_cancellation_checkpoints_accepted_entries() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base, &dir);
    config.crawler.batch_size = 100;

    let cancel = Arc::new(AtomicBool::new(false));

    mount_page(
        &server,
        "/wiki/Master_List",
        index_page(&["Squish_1", "Squish_2", "Squish_3", "Squish_4", "Squish_5"]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/wiki/Squish_\d$"))
        .respond_with(CancelAfter {
            cancel: Arc::clone(&cancel),
            served: AtomicUsize::new(0),
            after: 2,
        })
        .expect(2)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(config.clone(), cancel).unwrap();
    let mut stats = RunStats::new();
    coordinator.run(&mut stats).await.unwrap();

    assert!(stats.interrupted);
    assert_eq!(stats.new_entries, 2);
    assert_eq!(stats.batches_flushed, 0);

    let entries = export::read_csv(&config.output.csv_path).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| !e.name.is_empty()));
    assert_eq!(export::read_json(&config.output.json_path).unwrap(), entries);

    let ledger = ProgressLedger::open(&config.output.progress_file).unwrap();
    assert_eq!(ledger.processed_count(), 2);
    assert_eq!(ledger.rejected_count(), 0);
}

#[tokio::test]
async fn test_limit_counts_only_new_entries() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base, &dir);
    config.crawler.limit = 2;

    mount_page(
        &server,
        "/wiki/Master_List",
        index_page(&["Not_A_Squish", "Fifi", "Wendy", "Cam"]),
        1,
    )
    .await;
    mount_page(&server, "/wiki/Not_A_Squish", non_entry_page("Trivia"), 1).await;
    mount_page(&server, "/wiki/Fifi", entry_page("Fifi", "Fox"), 1).await;
    mount_page(&server, "/wiki/Wendy", entry_page("Wendy", "Frog"), 1).await;
    mount_page(&server, "/wiki/Cam", entry_page("Cam", "Cat"), 0).await;

    let (_, stats) = run_once(config.clone()).await;

    assert_eq!(stats.new_entries, 2);
    assert_eq!(stats.rejected, 1);
    assert!(stats.limit_reached);
    assert_eq!(catalog_names(&config.output.csv_path), vec!["Fifi", "Wendy"]);
}

#[tokio::test]
async fn test_checkpoint_every_batch() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base, &dir);
    config.crawler.batch_size = 2;

    mount_page(&server, "/wiki/Master_List", index_page(&["A", "B", "C", "D", "E"]), 1).await;
    for slug in ["A", "B", "C", "D", "E"] {
        mount_page(&server, &format!("/wiki/{}", slug), entry_page(slug, "Fox"), 1).await;
    }

    let (_, stats) = run_once(config.clone()).await;

    assert_eq!(stats.new_entries, 5);
    assert_eq!(stats.batches_flushed, 2);
    assert_eq!(stats.catalog_size, 5);
    assert_eq!(export::read_json(&config.output.json_path).unwrap().len(), 5);
}

#[tokio::test]
async fn test_rebuild_rederives_catalog_from_cache() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base, &dir);

    // Every page is downloaded once; the rebuild run reads the cache only
    mount_page(&server, "/wiki/Master_List", index_page(&["Fifi", "Trivia"]), 1).await;
    mount_page(&server, "/wiki/Fifi", entry_page("Fifi", "Fox"), 1).await;
    mount_page(&server, "/wiki/Trivia", non_entry_page("Trivia"), 1).await;

    run_once(config.clone()).await;

    // A stray row that no longer corresponds to any page
    let mut entries = export::read_csv(&config.output.csv_path).unwrap();
    entries.push(CatalogEntry::new("Ghost", format!("{}/wiki/Ghost", base)));
    export::write_csv(&entries, &config.output.csv_path).unwrap();

    let mut rebuild = config.clone();
    rebuild.crawler.rebuild = true;
    let (coordinator, stats) = run_once(rebuild).await;

    assert_eq!(stats.existing_entries, 0);
    assert_eq!(stats.new_entries, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.network_requests, 0);
    assert_eq!(coordinator.ledger().rejected_count(), 1);
    assert_eq!(catalog_names(&config.output.csv_path), vec!["Fifi"]);
}

#[tokio::test]
async fn test_missing_ledger_is_rebuilt_from_checkpoint() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base, &dir);

    mount_page(&server, "/wiki/Master_List", index_page(&["Wendy", "Fifi"]), 1).await;
    mount_page(&server, "/wiki/Wendy", entry_page("Wendy", "Frog"), 1).await;
    mount_page(&server, "/wiki/Fifi", entry_page("Fifi", "Fox"), 1).await;

    run_once(config.clone()).await;
    fs::remove_file(&config.output.progress_file).unwrap();

    let (coordinator, stats) = run_once(config.clone()).await;

    assert_eq!(stats.new_entries, 0);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(coordinator.ledger().processed_count(), 2);

    // Written once, sorted
    let contents = fs::read_to_string(&config.output.progress_file).unwrap();
    assert_eq!(
        contents,
        format!("{0}/wiki/Fifi\n{0}/wiki/Wendy\n", base)
    );
}

#[tokio::test]
async fn test_refresh_redownloads_but_keeps_ledger() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base, &dir);

    mount_page(&server, "/wiki/Master_List", index_page(&["Fifi"]), 2).await;
    mount_page(&server, "/wiki/Fifi", entry_page("Fifi", "Fox"), 1).await;

    run_once(config.clone()).await;

    let mut refresh = config.clone();
    refresh.crawler.refresh = true;
    let (_, stats) = run_once(refresh).await;

    assert_eq!(stats.network_requests, 1);
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.new_entries, 0);
    assert_eq!(catalog_names(&config.output.csv_path), vec!["Fifi"]);
}

#[tokio::test]
async fn test_storage_failure_ends_run() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base, &dir);

    // The JSON path is a directory, so the checkpoint cannot be completed
    config.output.json_path = dir.path().join("blocked");
    fs::create_dir(&config.output.json_path).unwrap();
    config.crawler.batch_size = 1;

    mount_page(&server, "/wiki/Master_List", index_page(&["Fifi", "Wendy"]), 1).await;
    mount_page(&server, "/wiki/Fifi", entry_page("Fifi", "Fox"), 1).await;
    mount_page(&server, "/wiki/Wendy", entry_page("Wendy", "Frog"), 0).await;

    let mut coordinator = Coordinator::new(config, Arc::new(AtomicBool::new(false))).unwrap();
    let mut stats = RunStats::new();
    let err = coordinator.run(&mut stats).await.unwrap_err();

    assert!(!err.is_page_level());
    assert_eq!(coordinator.phase(), RunPhase::Done);
    assert_eq!(stats.new_entries, 1);
}

#[tokio::test]
async fn test_batch_delay_follows_each_checkpoint() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base, &dir);
    config.crawler.batch_size = 1;
    config.crawler.batch_delay_ms = 300;

    mount_page(&server, "/wiki/Master_List", index_page(&["A", "B", "C"]), 1).await;
    for slug in ["A", "B", "C"] {
        mount_page(&server, &format!("/wiki/{}", slug), entry_page(slug, "Fox"), 1).await;
    }

    let started = Instant::now();
    let (_, stats) = run_once(config).await;

    assert_eq!(stats.batches_flushed, 3);
    assert!(started.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_no_batch_delay_once_limit_reached() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base, &dir);
    config.crawler.batch_size = 1;
    config.crawler.batch_delay_ms = 1000;
    config.crawler.limit = 2;

    mount_page(&server, "/wiki/Master_List", index_page(&["A", "B", "C"]), 1).await;
    mount_page(&server, "/wiki/A", entry_page("A", "Fox"), 1).await;
    mount_page(&server, "/wiki/B", entry_page("B", "Fox"), 1).await;
    mount_page(&server, "/wiki/C", entry_page("C", "Fox"), 0).await;

    let started = Instant::now();
    let (_, stats) = run_once(config).await;
    let elapsed = started.elapsed();

    // One pause after the first batch; none after the batch that hit the limit
    assert!(stats.limit_reached);
    assert_eq!(stats.batches_flushed, 2);
    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(2000));
}
