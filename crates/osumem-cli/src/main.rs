mod cli;
mod commands;
mod input;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over the defaults
    let default_filter = if args.verbose {
        "osumem=debug,osumem_core=debug"
    } else {
        "osumem=info,osumem_core=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let options = commands::Options::from_args(&args);
    match args.command {
        Some(Command::Watch { json }) => commands::watch::run(&options, json),
        Some(Command::Snapshot { json }) => commands::snapshot::run(&options, json),
        Some(Command::Scan { pattern, cap }) => commands::scan::run(&options, &pattern, cap),
        Some(Command::Table { check, output }) => {
            commands::table::run(check.as_deref(), output.as_deref())
        }
        None => commands::watch::run(&options, false),
    }
}
