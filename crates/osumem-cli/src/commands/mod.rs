//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command and the
//! setup they share.

pub mod scan;
pub mod snapshot;
pub mod table;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use osumem_core::offset::{builtin, stable_table};
use osumem_core::{LoopConfig, OffsetRegistry};

use crate::cli::Args;

/// Global options shared by every command.
pub struct Options {
    pub pid: Option<u32>,
    pub process: String,
    pub interval_ms: u64,
    pub offsets: Option<PathBuf>,
}

impl Options {
    pub fn from_args(args: &Args) -> Self {
        Self {
            pid: args.pid,
            process: args.process.clone(),
            interval_ms: args.interval_ms,
            offsets: args.offsets.clone(),
        }
    }

    pub fn loop_config(&self) -> Result<LoopConfig> {
        let config = LoopConfig::builder()
            .interval(Duration::from_millis(self.interval_ms))
            .process_name(self.process.clone())
            .pid(self.pid)
            .build()?;
        Ok(config)
    }

    /// Offset tables to detect from. A table file, when given, is tried
    /// before the built-in one and replaces it if it has the same family.
    pub fn registry(&self) -> Result<Arc<OffsetRegistry>> {
        let mut registry = OffsetRegistry::new();
        if let Some(path) = &self.offsets {
            registry
                .load_file(path)
                .with_context(|| format!("Failed to load offset table from {}", path.display()))?;
        }
        if registry.get(builtin::FAMILY).is_none() {
            registry.register(stable_table())?;
        }
        Ok(Arc::new(registry))
    }
}
