//! CLI argument definitions for osumem.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use osumem_core::config::{polling, process};

#[derive(Parser)]
#[command(name = "osumem")]
#[command(about = "Reads the current beatmap from a running osu! client", version)]
pub struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Process ID (skip automatic detection)
    #[arg(long, global = true)]
    pub pid: Option<u32>,

    /// Executable name to search for
    #[arg(long, global = true, env = "OSUMEM_PROCESS", default_value = process::DEFAULT_PROCESS_NAME)]
    pub process: String,

    /// Polling interval in milliseconds
    #[arg(long, global = true, env = "OSUMEM_INTERVAL_MS", default_value_t = polling::DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Additional offset table (JSON), tried before the built-in tables
    #[arg(long, global = true, env = "OSUMEM_OFFSETS", value_name = "FILE")]
    pub offsets: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Follow the game and print every newly selected beatmap (default)
    Watch {
        /// Print JSON lines instead of colored text
        #[arg(long)]
        json: bool,
    },
    /// Print the current beatmap once
    Snapshot {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scan the game's memory for a byte signature
    Scan {
        /// Space-separated hex bytes, `??` for wildcards (e.g. "F8 01 74 04 83 65")
        pattern: String,
        /// Maximum bytes to scan
        #[arg(long, default_value_t = osumem_core::config::scan::DEFAULT_SCAN_CAP)]
        cap: u64,
    },
    /// Print the built-in offset table or check a table file
    Table {
        /// Validate this table file instead of printing the built-in table
        #[arg(long, value_name = "FILE")]
        check: Option<PathBuf>,
        /// Write the table to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
