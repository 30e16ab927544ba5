//! End-to-end tests of the enumeration pipeline against a scripted
//! in-memory lookup service.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use teams_probe_core::{
    enumerate_identities, AppError, Config, ConfigBuilder, DirectoryRecord, EnumerationSummary,
    IdentitySource, LookupService, PresenceRecord, Prober, Result, ResultSink, SearchResponse,
    WorkerPool,
};

/// What the scripted service should answer for one identity.
#[derive(Clone)]
enum Script {
    /// 200 with a provisioned record (display name differs from given name).
    Hit,
    /// 200 with the placeholder record the service returns for
    /// unprovisioned identities.
    Placeholder,
    /// 200 with an empty result array.
    Empty,
    /// 403 with an undecodable body.
    Blocked,
    /// 401.
    Unauthorized,
    /// Any other status.
    Status(u16),
    /// The call never completes.
    NetworkError,
}

type Fallback = dyn Fn(&str) -> Script + Send + Sync;

struct ScriptedLookup {
    scripts: HashMap<String, Script>,
    fallback: Box<Fallback>,
    delay: Option<Duration>,
    search_calls: AtomicUsize,
    presence_calls: AtomicUsize,
    per_identity: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedLookup {
    fn new(scripts: impl IntoIterator<Item = (&'static str, Script)>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            fallback: Box::new(|_| Script::Empty),
            delay: None,
            search_calls: AtomicUsize::new(0),
            presence_calls: AtomicUsize::new(0),
            per_identity: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_fallback(mut self, fallback: impl Fn(&str) -> Script + Send + Sync + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn script_for(&self, identity: &str) -> Script {
        self.scripts
            .get(identity)
            .cloned()
            .unwrap_or_else(|| (self.fallback)(identity))
    }
}

#[async_trait]
impl LookupService for ScriptedLookup {
    async fn search_identity(&self, identity: &str) -> Result<SearchResponse> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut counts = self.per_identity.lock().expect("per-identity lock");
            *counts.entry(identity.to_string()).or_insert(0) += 1;
        }
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let record = |display_name: &str, given_name: &str| DirectoryRecord {
            display_name: display_name.to_string(),
            mri: format!("8:orgid:{}", identity),
            user_principal_name: identity.to_string(),
            given_name: given_name.to_string(),
        };

        match self.script_for(identity) {
            Script::Hit => Ok(SearchResponse {
                status: StatusCode::OK,
                record: Some(record("Alice A", "Alice")),
            }),
            Script::Placeholder => Ok(SearchResponse {
                status: StatusCode::OK,
                record: Some(record("ghost", "ghost")),
            }),
            Script::Empty => Ok(SearchResponse {
                status: StatusCode::OK,
                record: None,
            }),
            Script::Blocked => Ok(SearchResponse {
                status: StatusCode::FORBIDDEN,
                record: None,
            }),
            Script::Unauthorized => Ok(SearchResponse {
                status: StatusCode::UNAUTHORIZED,
                record: None,
            }),
            Script::Status(code) => Ok(SearchResponse {
                status: StatusCode::from_u16(code).expect("valid status code"),
                record: None,
            }),
            Script::NetworkError => Err(AppError::Initialization(
                "simulated connect failure".to_string(),
            )),
        }
    }

    async fn fetch_presence(&self, _mri: &str) -> Result<PresenceRecord> {
        self.presence_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PresenceRecord {
            availability: "Available".to_string(),
            device_type: "Desktop".to_string(),
        })
    }
}

fn write_fixture(lines: &[String]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("fixture file");
    for line in lines {
        writeln!(file, "{}", line).expect("write fixture line");
    }
    file
}

fn config_with(workers: usize, queue_capacity: usize) -> Config {
    ConfigBuilder::new()
        .workers(workers)
        .queue_capacity(queue_capacity)
        .build()
        .expect("test config builds")
}

async fn run_batch(
    lookup: Arc<ScriptedLookup>,
    config: Config,
    input: &[String],
    output: &Path,
) -> EnumerationSummary {
    let fixture = write_fixture(input);
    let source = IdentitySource::open(Some(fixture.path()))
        .await
        .expect("source opens");
    let sink = Arc::new(ResultSink::create(Some(output), false).expect("sink opens"));

    let summary = enumerate_identities(Arc::new(config), lookup, source, Arc::clone(&sink)).await;
    sink.finish().expect("flush sink");
    summary
}

fn output_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("read output")
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn provisioned_identity_is_confirmed_and_enriched() {
    let lookup = Arc::new(ScriptedLookup::new([("alice@example.com", Script::Hit)]));
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("found.txt");

    let summary = run_batch(
        Arc::clone(&lookup),
        config_with(2, 16),
        &["alice@example.com".to_string()],
        &output,
    )
    .await;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.confirmed, 1);
    assert_eq!(output_lines(&output), vec!["alice@example.com"]);
    assert_eq!(
        lookup.presence_calls.load(Ordering::SeqCst),
        1,
        "one presence fetch per confirmed record"
    );
}

#[tokio::test]
async fn placeholder_record_is_not_found_and_not_enriched() {
    let lookup = Arc::new(ScriptedLookup::new([(
        "ghost@example.com",
        Script::Placeholder,
    )]));
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("found.txt");

    let summary = run_batch(
        Arc::clone(&lookup),
        config_with(2, 16),
        &["ghost@example.com".to_string()],
        &output,
    )
    .await;

    assert_eq!(summary.not_found, 1);
    assert!(output_lines(&output).is_empty());
    assert_eq!(
        lookup.presence_calls.load(Ordering::SeqCst),
        0,
        "placeholder records must not trigger presence lookups"
    );
}

#[tokio::test]
async fn blocked_identity_is_confirmed_without_enrichment() {
    let lookup = Arc::new(ScriptedLookup::new([(
        "blocked@example.com",
        Script::Blocked,
    )]));
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("found.txt");

    let summary = run_batch(
        Arc::clone(&lookup),
        config_with(2, 16),
        &["blocked@example.com".to_string()],
        &output,
    )
    .await;

    assert_eq!(summary.confirmed, 1);
    assert_eq!(output_lines(&output), vec!["blocked@example.com"]);
    assert_eq!(lookup.presence_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_credential_cancels_the_run() {
    let lookup = Arc::new(ScriptedLookup::new([(
        "dead@example.com",
        Script::Unauthorized,
    )]));
    let mut input = vec!["dead@example.com".to_string()];
    input.extend((0..50).map(|i| format!("user{}@example.com", i)));
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("found.txt");

    let summary = run_batch(Arc::clone(&lookup), config_with(1, 4), &input, &output).await;

    assert_eq!(summary.auth_errors, 1);
    assert!(summary.cancelled, "a 401 must trip the cancellation token");
    assert!(output_lines(&output).is_empty());
    assert!(
        lookup.search_calls.load(Ordering::SeqCst) < input.len(),
        "queued identities must be abandoned once the credential is dead"
    );
}

#[tokio::test]
async fn transient_statuses_and_transport_failures_do_not_stop_the_batch() {
    let lookup = Arc::new(
        ScriptedLookup::new([
            ("flaky@example.com", Script::Status(500)),
            ("unroutable@example.com", Script::NetworkError),
            ("alice@example.com", Script::Hit),
        ])
        .with_fallback(|_| Script::Empty),
    );
    let input = vec![
        "flaky@example.com".to_string(),
        "unroutable@example.com".to_string(),
        "alice@example.com".to_string(),
        "nobody@example.com".to_string(),
    ];
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("found.txt");

    let summary = run_batch(Arc::clone(&lookup), config_with(2, 16), &input, &output).await;

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.transient, 2);
    assert_eq!(summary.confirmed, 1);
    assert_eq!(summary.not_found, 1);
    assert!(!summary.cancelled);
    assert_eq!(output_lines(&output), vec!["alice@example.com"]);
}

#[tokio::test]
async fn denylisted_identities_never_reach_the_service() {
    let lookup = Arc::new(ScriptedLookup::new([("ok@example.com", Script::Hit)]));
    let input = vec![
        "a/b@example.com".to_string(),
        "ok@example.com".to_string(),
        "x;y@example.com".to_string(),
    ];
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("found.txt");

    let summary = run_batch(Arc::clone(&lookup), config_with(2, 16), &input, &output).await;

    assert_eq!(summary.processed, 1);
    assert_eq!(lookup.search_calls.load(Ordering::SeqCst), 1);
    let counts = lookup.per_identity.lock().expect("per-identity lock");
    assert!(!counts.contains_key("a/b@example.com"));
    assert!(!counts.contains_key("x;y@example.com"));
}

#[tokio::test(flavor = "multi_thread")]
async fn confirmed_set_is_identical_across_pool_sizes() {
    let input: Vec<String> = (0..1000).map(|i| format!("user{}@example.com", i)).collect();
    let expected: HashSet<String> = (0..1000)
        .filter(|i| i % 3 == 0)
        .map(|i| format!("user{}@example.com", i))
        .collect();

    for workers in [1usize, 5, 50] {
        let lookup = Arc::new(ScriptedLookup::new([]).with_fallback(|identity: &str| {
            let index: usize = identity
                .trim_start_matches("user")
                .trim_end_matches("@example.com")
                .parse()
                .expect("numeric fixture identity");
            if index % 3 == 0 {
                Script::Hit
            } else {
                Script::Empty
            }
        }));
        let dir = tempfile::tempdir().expect("temp dir");
        let output = dir.path().join("found.txt");

        let summary = run_batch(Arc::clone(&lookup), config_with(workers, 64), &input, &output).await;

        assert_eq!(summary.processed, 1000, "workers={}", workers);
        let confirmed: HashSet<String> = output_lines(&output).into_iter().collect();
        assert_eq!(confirmed, expected, "workers={}", workers);
        assert_eq!(
            output_lines(&output).len(),
            expected.len(),
            "each confirmed identity is written exactly once (workers={})",
            workers
        );

        // Exactly one verdict per identity: one search call each.
        let counts = lookup.per_identity.lock().expect("per-identity lock");
        assert!(counts.values().all(|&n| n == 1), "workers={}", workers);
        assert_eq!(counts.len(), 1000, "workers={}", workers);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_lookups_never_exceed_the_worker_count() {
    let lookup = Arc::new(
        ScriptedLookup::new([])
            .with_fallback(|_| Script::Empty)
            .with_delay(Duration::from_millis(5)),
    );
    let input: Vec<String> = (0..100).map(|i| format!("user{}@example.com", i)).collect();
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("found.txt");

    let summary = run_batch(Arc::clone(&lookup), config_with(5, 16), &input, &output).await;

    assert_eq!(summary.processed, 100);
    assert!(
        lookup.max_in_flight.load(Ordering::SeqCst) <= 5,
        "observed {} concurrent lookups with 5 workers",
        lookup.max_in_flight.load(Ordering::SeqCst)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn queue_bound_limits_abandoned_work_on_external_cancel() {
    let queue_capacity = 8;
    let lookup = Arc::new(
        ScriptedLookup::new([])
            .with_fallback(|_| Script::Empty)
            .with_delay(Duration::from_millis(100)),
    );
    let input: Vec<String> = (0..200).map(|i| format!("user{}@example.com", i)).collect();
    let fixture = write_fixture(&input);

    let config = Arc::new(config_with(2, queue_capacity));
    let dir = tempfile::tempdir().expect("temp dir");
    let output = dir.path().join("found.txt");
    let sink = Arc::new(ResultSink::create(Some(&output), false).expect("sink opens"));
    let source = IdentitySource::open(Some(fixture.path()))
        .await
        .expect("source opens");

    let prober = Arc::new(Prober::new(
        Arc::clone(&lookup) as Arc<dyn LookupService>,
        &config,
    ));
    let pool = Arc::new(WorkerPool::new(prober, Arc::clone(&sink), &config));
    let token = pool.cancellation_token();

    let run = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.run(source).await }
    });
    tokio::time::sleep(Duration::from_millis(150)).await;
    token.cancel();
    let summary = run.await.expect("pool run joins");

    assert!(summary.cancelled);
    assert!(
        summary.abandoned <= queue_capacity,
        "the producer ran {} jobs ahead of consumption with capacity {}",
        summary.abandoned,
        queue_capacity
    );
    assert!(
        summary.abandoned > 0,
        "cancellation mid-run should strand queued jobs"
    );
    assert!(summary.processed < input.len());
}
