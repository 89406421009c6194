use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use screenwatch_shared::UsageSnapshot;
use screenwatch_shared::api::{ChildIdentity, UsageReport};
use screenwatch_shared::status::format_heartbeat;
use screenwatch_store::Store;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::CollectorConfig;
use crate::usage::{self, UsageSource, UsageWindow};
use crate::{AppError, identity};

/// What a single collection cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No usable identity file yet; nothing was collected.
    NoIdentity,
    /// The source returned nothing for the window.
    NoData,
    /// The source failed; retried next tick.
    SourceFailed(String),
    Reported { apps: usize },
    /// Usage was collected but could not be written to the store.
    NotPersisted { apps: usize },
}

/// One child's collector: identity check, usage query, persistence.
pub struct Collector {
    store: Store,
    identity_path: PathBuf,
    window: Duration,
    source: Arc<dyn UsageSource>,
    debug_dump: Option<PathBuf>,
}

impl Collector {
    pub fn new(store: Store, identity_path: PathBuf, source: Arc<dyn UsageSource>) -> Self {
        Self {
            store,
            identity_path,
            window: CollectorConfig::default().window(),
            source,
            debug_dump: None,
        }
    }

    pub fn from_config(cfg: &CollectorConfig) -> Result<Self, AppError> {
        let store = Store::open(cfg.store_path()?);
        let source = usage::detect(cfg)?;
        Ok(Self::new(store, cfg.identity_path()?, source)
            .with_window(cfg.window())
            .with_debug_dump(cfg.debug_dump_path.clone()))
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_debug_dump(mut self, path: Option<PathBuf>) -> Self {
        self.debug_dump = path;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn identity(&self) -> Result<ChildIdentity, AppError> {
        identity::load_identity(&self.identity_path)
    }

    /// Run one cycle. Never fails; problems are logged and retried on the
    /// next tick.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let identity = match self.identity() {
            Ok(id) => id,
            Err(e) => {
                info!(error=%e, "no child identity yet; waiting");
                return CycleOutcome::NoIdentity;
            }
        };

        let window = UsageWindow::ending_now(self.window);
        let usage = match self.source.collect_usage(window).await {
            Ok(u) => u,
            Err(e) => {
                warn!(error=%e, "usage collection failed");
                return CycleOutcome::SourceFailed(e.to_string());
            }
        };
        if usage.is_empty() {
            info!("no usage data this cycle");
            return CycleOutcome::NoData;
        }

        let apps = usage.len();
        info!(
            child=%identity.child_email,
            family_key=%identity.family_key,
            apps,
            "sending usage"
        );
        if let Some(path) = &self.debug_dump {
            write_debug_dump(path, &identity, &usage);
        }
        match self
            .store
            .record_usage(&identity.child_email, usage)
            .await
        {
            Ok(recorded) if recorded.persisted => {
                debug!(heartbeat=%recorded.heartbeat, "usage recorded");
                CycleOutcome::Reported { apps }
            }
            Ok(_) => {
                warn!(apps, "usage not persisted; retrying next cycle");
                CycleOutcome::NotPersisted { apps }
            }
            Err(e) => {
                error!(error=%e, "recording usage failed");
                CycleOutcome::NotPersisted { apps }
            }
        }
    }
}

fn write_debug_dump(path: &Path, identity: &ChildIdentity, usage: &UsageSnapshot) {
    let report = UsageReport {
        child_email: identity.child_email.clone(),
        family_key: identity.family_key.clone(),
        timestamp: format_heartbeat(chrono::Utc::now()),
        usage: usage.clone(),
    };
    let res = serde_json::to_string_pretty(&report)
        .map_err(std::io::Error::other)
        .and_then(|data| {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            std::fs::write(path, data)
        });
    if let Err(e) = res {
        warn!(path=%path.display(), error=%e, "failed to write debug dump");
    }
}

/// Entry point for the background collector.
pub async fn run(cfg: CollectorConfig) -> Result<(), AppError> {
    let collector = Collector::from_config(&cfg)?;
    info!(
        store=%collector.store.path().display(),
        identity=%collector.identity_path.display(),
        interval_secs=cfg.interval().as_secs(),
        "collector started"
    );

    let cancel = CancellationToken::new();
    let cancel_child = cancel.child_token();
    let interval = cfg.interval();
    let mut handle = tokio::spawn(async move {
        main_loop(cancel_child, collector, interval).await;
    });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received; requesting main loop to stop");
            cancel.cancel();
        }
        _ = &mut handle => {
            info!("main loop finished");
        }
    }

    if !handle.is_finished() {
        let _ = tokio::time::timeout(Duration::from_secs(3), handle).await;
    }
    Ok(())
}

pub async fn main_loop(cancel: CancellationToken, collector: Collector, interval: Duration) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let start = std::time::Instant::now();
        let outcome = collector.run_cycle().await;
        debug!(?outcome, "cycle finished");

        let elapsed = start.elapsed();
        if elapsed < interval {
            tokio::select! {
                _ = cancel.cancelled() => { break; }
                _ = sleep(interval - elapsed) => {}
            }
        }
    }
    info!("collector loop stopped");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigint = signal(SignalKind::interrupt()).expect("listen SIGINT");
        let mut sigterm = signal(SignalKind::terminate()).expect("listen SIGTERM");
        tokio::select! {
            _ = sigint.recv() => {
                info!("shutdown: received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("shutdown: received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown: received ctrl_c");
    }
}
