use std::time::Duration;

use crate::error::{Error, Result};
use crate::process::ProcessSelector;

use super::{polling, process, retry, scan};

/// Runtime configuration of the poll loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    pub interval: Duration,
    pub min_retry_interval: Duration,
    pub attach_backoff: Vec<Duration>,
    pub init_attempts: u32,
    pub permission_failure_budget: u32,
    pub scan_cap: u64,
    /// How long a missing anchor is trusted before it is scanned for again.
    pub anchor_rescan: Duration,
    pub process_name: String,
    pub excluded_words: Vec<String>,
    /// Attach to this PID instead of searching by name.
    pub pid: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(polling::DEFAULT_INTERVAL_MS),
            min_retry_interval: Duration::from_millis(polling::MIN_RETRY_INTERVAL_MS),
            attach_backoff: retry::ATTACH_BACKOFF_MS
                .iter()
                .map(|&ms| Duration::from_millis(ms))
                .collect(),
            init_attempts: retry::MAX_INIT_ATTEMPTS,
            permission_failure_budget: retry::PERMISSION_FAILURE_BUDGET,
            scan_cap: scan::DEFAULT_SCAN_CAP,
            anchor_rescan: Duration::from_millis(scan::MISS_RESCAN_MS),
            process_name: process::DEFAULT_PROCESS_NAME.to_string(),
            excluded_words: process::EXCLUDED_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
            pid: None,
        }
    }
}

impl LoopConfig {
    pub fn builder() -> LoopConfigBuilder {
        LoopConfigBuilder::default()
    }

    /// Default configuration polling every `interval_ms` milliseconds.
    pub fn from_interval_ms(interval_ms: u64) -> Result<Self> {
        Self::builder()
            .interval(Duration::from_millis(interval_ms))
            .build()
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::invalid_config("polling interval must be positive"));
        }
        if self.interval < Duration::from_millis(polling::MIN_INTERVAL_MS) {
            return Err(Error::invalid_config(format!(
                "polling interval {}ms is below the {}ms minimum",
                self.interval.as_millis(),
                polling::MIN_INTERVAL_MS
            )));
        }
        if self.min_retry_interval.is_zero() {
            return Err(Error::invalid_config("minimum retry interval must be positive"));
        }
        if self.init_attempts == 0 {
            return Err(Error::invalid_config("at least one attach attempt is required"));
        }
        if self.scan_cap == 0 {
            return Err(Error::invalid_config("scan cap must be positive"));
        }
        if self.pid.is_none() && self.process_name.trim().is_empty() {
            return Err(Error::invalid_config("process name must not be empty"));
        }
        Ok(())
    }

    /// Delay before attach attempt `attempt`, never shorter than the minimum
    /// retry interval. The last schedule entry repeats.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let scheduled = self
            .attach_backoff
            .get(attempt as usize)
            .or(self.attach_backoff.last())
            .copied()
            .unwrap_or(self.min_retry_interval);
        scheduled.max(self.min_retry_interval)
    }

    pub fn selector(&self) -> ProcessSelector {
        match self.pid {
            Some(pid) => ProcessSelector::Pid(pid),
            None => ProcessSelector::Name {
                name: self.process_name.clone(),
                excluded: self.excluded_words.clone(),
            },
        }
    }
}

/// Builder for [`LoopConfig`]; `build` validates the result.
#[derive(Debug, Clone, Default)]
pub struct LoopConfigBuilder {
    config: LoopConfig,
}

impl LoopConfigBuilder {
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn min_retry_interval(mut self, interval: Duration) -> Self {
        self.config.min_retry_interval = interval;
        self
    }

    pub fn attach_backoff(mut self, schedule: Vec<Duration>) -> Self {
        self.config.attach_backoff = schedule;
        self
    }

    pub fn init_attempts(mut self, attempts: u32) -> Self {
        self.config.init_attempts = attempts;
        self
    }

    pub fn permission_failure_budget(mut self, budget: u32) -> Self {
        self.config.permission_failure_budget = budget;
        self
    }

    pub fn scan_cap(mut self, cap: u64) -> Self {
        self.config.scan_cap = cap;
        self
    }

    pub fn anchor_rescan(mut self, rescan_after: Duration) -> Self {
        self.config.anchor_rescan = rescan_after;
        self
    }

    pub fn process_name(mut self, name: impl Into<String>) -> Self {
        self.config.process_name = name.into();
        self
    }

    pub fn excluded_words(mut self, words: Vec<String>) -> Self {
        self.config.excluded_words = words;
        self
    }

    pub fn pid(mut self, pid: Option<u32>) -> Self {
        self.config.pid = pid;
        self
    }

    pub fn build(self) -> Result<LoopConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
