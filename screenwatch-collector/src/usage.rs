use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use screenwatch_shared::UsageSnapshot;
use tracing::{debug, info};

use crate::AppError;
use crate::config::CollectorConfig;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Time range a usage query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    pub fn ending_now(len: Duration) -> Self {
        let end = Utc::now();
        let len = chrono::TimeDelta::from_std(len).unwrap_or(chrono::TimeDelta::zero());
        Self {
            start: end - len,
            end,
        }
    }
}

/// Platform foreground-usage query.
#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn collect_usage(&self, window: UsageWindow) -> Result<UsageSnapshot, AppError>;
}

/// Used where no usage backend is configured; never reports anything.
pub struct NullUsageSource;

#[async_trait]
impl UsageSource for NullUsageSource {
    async fn collect_usage(&self, _window: UsageWindow) -> Result<UsageSnapshot, AppError> {
        Ok(UsageSnapshot::new())
    }
}

/// Runs an external usage command and reads its stdout as `{"app id": seconds, ...}`.
pub struct CommandUsageSource {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandUsageSource {
    pub fn new(argv: Vec<String>) -> Result<Self, AppError> {
        if argv.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(AppError::Config("usage_cmd must name a program".into()));
        }
        Ok(Self {
            argv,
            timeout: COMMAND_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn expand_args(&self, window: UsageWindow) -> Vec<String> {
        let start = window.start.timestamp().to_string();
        let end = window.end.timestamp().to_string();
        self.argv[1..]
            .iter()
            .map(|a| a.replace("{start}", &start).replace("{end}", &end))
            .collect()
    }
}

#[async_trait]
impl UsageSource for CommandUsageSource {
    async fn collect_usage(&self, window: UsageWindow) -> Result<UsageSnapshot, AppError> {
        let program = &self.argv[0];
        let args = self.expand_args(window);
        debug!(%program, ?args, "usage: running command");
        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(program)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| AppError::Usage(format!("{program} timed out after {:?}", self.timeout)))?
        .map_err(|e| AppError::Usage(format!("spawn {program} failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Usage(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        parse_usage(&output.stdout)
    }
}

/// Parse a usage command's JSON output, keeping only apps with positive time.
pub fn parse_usage(stdout: &[u8]) -> Result<UsageSnapshot, AppError> {
    let raw: UsageSnapshot = serde_json::from_slice(stdout)
        .map_err(|e| AppError::Usage(format!("invalid usage command output: {e}")))?;
    Ok(raw.into_iter().filter(|(_, secs)| *secs > 0).collect())
}

/// Pick the usage source from config.
pub fn detect(cfg: &CollectorConfig) -> Result<Arc<dyn UsageSource>, AppError> {
    match &cfg.usage_cmd {
        Some(argv) => {
            info!(program=%argv.first().map(String::as_str).unwrap_or_default(), "usage source: command");
            Ok(Arc::new(CommandUsageSource::new(argv.clone())?))
        }
        None => {
            info!("usage source: none configured; cycles will report nothing");
            Ok(Arc::new(NullUsageSource))
        }
    }
}
