use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use screenwatch_collector::usage::{UsageSource, UsageWindow, parse_usage};
use screenwatch_collector::{AppError, Collector, CollectorConfig, CycleOutcome};
use screenwatch_shared::UsageSnapshot;
use screenwatch_shared::api::ChildIdentity;
use screenwatch_store::Store;
use tokio_util::sync::CancellationToken;

struct FixedSource(UsageSnapshot);

#[async_trait]
impl UsageSource for FixedSource {
    async fn collect_usage(&self, _window: UsageWindow) -> Result<UsageSnapshot, AppError> {
        Ok(self.0.clone())
    }
}

struct FailingSource;

#[async_trait]
impl UsageSource for FailingSource {
    async fn collect_usage(&self, _window: UsageWindow) -> Result<UsageSnapshot, AppError> {
        Err(AppError::Usage("permission denied".into()))
    }
}

struct Fixture {
    store_path: PathBuf,
    identity_path: PathBuf,
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            store_path: dir.path().join("screenwatch.json"),
            identity_path: dir.path().join("child_identity.json"),
            dir,
        }
    }

    fn write_identity(&self, email: &str, key: &str) {
        let id = ChildIdentity::new(email, key);
        std::fs::write(&self.identity_path, serde_json::to_string(&id).unwrap()).unwrap();
    }

    fn collector(&self, source: impl UsageSource + 'static) -> Collector {
        Collector::new(
            Store::open(&self.store_path),
            self.identity_path.clone(),
            Arc::new(source),
        )
    }
}

fn one_app() -> UsageSnapshot {
    UsageSnapshot::from([("com.app.one".to_string(), 120)])
}

#[tokio::test]
async fn cycle_without_identity_skips_persistence() {
    let f = Fixture::new();
    let outcome = f.collector(FixedSource(one_app())).run_cycle().await;
    assert_eq!(outcome, CycleOutcome::NoIdentity);
    assert!(!f.store_path.exists());
}

#[tokio::test]
async fn malformed_or_partial_identity_counts_as_missing() {
    let f = Fixture::new();
    std::fs::write(&f.identity_path, "not json").unwrap();
    let collector = f.collector(FixedSource(one_app()));
    assert_eq!(collector.run_cycle().await, CycleOutcome::NoIdentity);

    std::fs::write(&f.identity_path, r#"{"child_email": "b@x.com"}"#).unwrap();
    assert_eq!(collector.run_cycle().await, CycleOutcome::NoIdentity);

    f.write_identity("b@x.com", "  ");
    assert!(matches!(
        collector.identity(),
        Err(AppError::NoIdentityConfigured { .. })
    ));
    assert!(!f.store_path.exists());
}

#[tokio::test]
async fn empty_usage_skips_persistence() {
    let f = Fixture::new();
    f.write_identity("b@x.com", "K1");
    let outcome = f.collector(FixedSource(UsageSnapshot::new())).run_cycle().await;
    assert_eq!(outcome, CycleOutcome::NoData);
    assert!(!f.store_path.exists());
}

#[tokio::test]
async fn failing_source_is_not_fatal() {
    let f = Fixture::new();
    f.write_identity("b@x.com", "K1");
    let outcome = f.collector(FailingSource).run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::SourceFailed(_)));
    assert!(!f.store_path.exists());
}

#[tokio::test]
async fn reported_usage_lands_in_the_store_with_a_heartbeat() {
    let f = Fixture::new();
    f.write_identity("b@x.com", "K1");
    let dump = f.dir.path().join("debug").join("last_report.json");
    let collector = f
        .collector(FixedSource(one_app()))
        .with_debug_dump(Some(dump.clone()));

    assert_eq!(collector.run_cycle().await, CycleOutcome::Reported { apps: 1 });

    let doc = Store::open(&f.store_path).load();
    assert_eq!(doc.usage["b@x.com"], one_app());
    assert!(doc.heartbeat.contains_key("b@x.com"));

    let dumped: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
    assert_eq!(dumped["child_email"], "b@x.com");
    assert_eq!(dumped["family_key"], "K1");
    assert_eq!(dumped["usage"]["com.app.one"], 120);
}

#[tokio::test]
async fn unwritable_store_is_not_counted_as_reported() {
    let f = Fixture::new();
    f.write_identity("b@x.com", "K1");
    let blocker = f.dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let collector = Collector::new(
        Store::open(blocker.join("screenwatch.json")),
        f.identity_path.clone(),
        Arc::new(FixedSource(one_app())),
    );

    assert_eq!(collector.run_cycle().await, CycleOutcome::NotPersisted { apps: 1 });
    assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "file");
}

#[test]
fn new_collector_uses_the_configured_default_window() {
    let f = Fixture::new();
    let collector = f.collector(FixedSource(one_app()));
    assert_eq!(collector.window(), CollectorConfig::default().window());
    assert_eq!(collector.window(), Duration::from_secs(600));
    let shorter = collector.with_window(Duration::from_secs(60));
    assert_eq!(shorter.window(), Duration::from_secs(60));
}

#[test]
fn command_output_drops_idle_apps() {
    let usage = parse_usage(br#"{"a": 30, "b": 0, "c": -4}"#).unwrap();
    assert_eq!(usage, UsageSnapshot::from([("a".to_string(), 30)]));
    assert!(parse_usage(b"[1, 2]").is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn command_source_substitutes_the_window() {
    use screenwatch_collector::usage::CommandUsageSource;

    let source = CommandUsageSource::new(vec![
        "sh".into(),
        "-c".into(),
        r#"echo '{"com.app.one": 42, "window.end": {end}}'"#.into(),
    ])
    .unwrap();
    let window = UsageWindow::ending_now(Duration::from_secs(600));
    let usage = source.collect_usage(window).await.unwrap();
    assert_eq!(usage["com.app.one"], 42);
    assert_eq!(usage["window.end"], window.end.timestamp());
    assert_eq!((window.end - window.start).num_seconds(), 600);
}

#[cfg(unix)]
#[tokio::test]
async fn command_source_reports_failures() {
    use screenwatch_collector::usage::CommandUsageSource;

    let failing = CommandUsageSource::new(vec!["sh".into(), "-c".into(), "exit 3".into()]).unwrap();
    let window = UsageWindow::ending_now(Duration::from_secs(60));
    assert!(matches!(
        failing.collect_usage(window).await,
        Err(AppError::Usage(_))
    ));

    let slow = CommandUsageSource::new(vec!["sh".into(), "-c".into(), "sleep 5".into()])
        .unwrap()
        .with_timeout(Duration::from_millis(100));
    assert!(matches!(
        slow.collect_usage(window).await,
        Err(AppError::Usage(_))
    ));
    assert!(CommandUsageSource::new(vec![]).is_err());
}

#[tokio::test]
async fn loop_stops_when_cancelled() {
    let f = Fixture::new();
    f.write_identity("b@x.com", "K1");
    let collector = f.collector(FixedSource(one_app()));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(screenwatch_collector::app::agent::main_loop(
        cancel.clone(),
        collector,
        Duration::from_secs(3600),
    ));
    // Let the first cycle run before cancelling.
    for _ in 0..100 {
        if Store::open(&f.store_path).load().usage.contains_key("b@x.com") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop should stop promptly")
        .unwrap();
    assert!(Store::open(&f.store_path).load().usage.contains_key("b@x.com"));
}

#[test]
fn config_fills_in_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("collector.yaml");
    std::fs::write(&path, "store_path: /tmp/sw.json\nusage_cmd: [usage-report, \"{start}\"]\n").unwrap();
    let (_, cfg) = CollectorConfig::find_and_load(Some(path)).unwrap();
    assert_eq!(cfg.store_path, Some(PathBuf::from("/tmp/sw.json")));
    assert_eq!(cfg.interval_secs, 300);
    assert_eq!(cfg.window_secs, 600);
    assert_eq!(cfg.usage_cmd, Some(vec!["usage-report".to_string(), "{start}".to_string()]));
    assert_eq!(cfg.store_path().unwrap(), PathBuf::from("/tmp/sw.json"));
}

#[test]
fn explicit_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    assert!(matches!(
        CollectorConfig::find_and_load(Some(missing)),
        Err(AppError::Config(_))
    ));
}
