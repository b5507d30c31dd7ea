//! Watch mode: follow the game and print each newly selected beatmap.

use std::sync::Arc;

use anyhow::{Result, bail};
use osumem_core::export::{format_beatmap_console, format_beatmap_summary, format_game_state};
use osumem_core::{Error, LoopEvent, PollLoop, ShutdownSignal, SnapshotRecord, SystemProvider};
use serde_json::json;
use tracing::{debug, info, warn};

use super::Options;
use crate::input;

/// Run the watch command until Ctrl+C, Esc or q.
pub fn run(options: &Options, json: bool) -> Result<()> {
    let shutdown = setup_shutdown_handler()?;
    let config = options.loop_config()?;
    let registry = options.registry()?;

    if !json {
        println!("osumem v{}", env!("CARGO_PKG_VERSION"));
        println!("Waiting for {}... (Press Esc or q to quit)", config.selector());
    }

    let mut poll_loop = PollLoop::new(SystemProvider, registry, config)?;
    let mut printer = Printer::new(json);
    let result = poll_loop.run(&shutdown, &mut |event| printer.handle(event));

    // Release the keyboard monitor if the loop ended on its own
    shutdown.trigger();

    if let Err(e) = result {
        bail!("Watch stopped: {}", e);
    }
    if !json {
        println!("Shutdown complete.");
    }
    Ok(())
}

/// Ctrl+C plus the keyboard monitor, both feeding one signal.
fn setup_shutdown_handler() -> Result<Arc<ShutdownSignal>> {
    let shutdown = Arc::new(ShutdownSignal::new());

    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let _keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&shutdown))?;
    Ok(shutdown)
}

/// Turns loop events into output, printing a beatmap only when it changes.
struct Printer {
    json: bool,
    last: Option<SnapshotRecord>,
}

impl Printer {
    fn new(json: bool) -> Self {
        Self { json, last: None }
    }

    fn handle(&mut self, event: &LoopEvent<'_>) {
        match event {
            LoopEvent::Attached {
                reattached: true, ..
            } => {}
            LoopEvent::Attached { target, family, .. } => {
                info!("Attached to PID {} using table '{}'", target.pid, family);
                if !self.json {
                    println!("Found {} (PID {})", target.name, target.pid);
                }
            }
            LoopEvent::Snapshot(record) => {
                if !record.is_new_beatmap(self.last.as_ref()) {
                    return;
                }
                info!("Beatmap: {}", format_beatmap_summary(&record.info));
                self.print_record(record);
                self.last = Some((*record).clone());
            }
            LoopEvent::GameState(state) => {
                if self.json {
                    println!("{}", json!({ "game_state": state }));
                } else {
                    println!("State: {}", format_game_state(*state));
                }
            }
            LoopEvent::Error(e) => {
                if e.is_process_exited() {
                    info!("Game exited");
                } else if matches!(e, Error::Snapshot(_)) {
                    // No beatmap loaded yet
                    debug!("{}", e);
                } else {
                    warn!("{}", e);
                }
            }
            LoopEvent::Detached { pid, exited: true } => {
                if !self.json {
                    println!("Lost PID {}, waiting for the game...", pid);
                }
            }
            LoopEvent::Detached { .. } => {}
        }
    }

    fn print_record(&self, record: &SnapshotRecord) {
        if self.json {
            match serde_json::to_string(record) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize snapshot: {}", e),
            }
        } else {
            println!("{}", format_beatmap_console(&record.info));
        }
    }
}
