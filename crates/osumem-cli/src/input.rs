//! Keyboard shortcuts for stopping `watch`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use osumem_core::ShutdownSignal;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Watch the terminal for Esc, q/Q or Ctrl+C and trigger `shutdown`.
///
/// The thread exits on its own once `shutdown` fires from anywhere else.
pub fn spawn_keyboard_monitor(shutdown: Arc<ShutdownSignal>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("osumem-keys".to_string())
        .spawn(move || {
            debug!("Keyboard monitor started");

            while !shutdown.is_shutdown() {
                if !event::poll(POLL_INTERVAL).unwrap_or(false) {
                    continue;
                }
                if let Ok(Event::Key(key)) = event::read() {
                    if is_quit_key(&key) {
                        debug!("Quit key pressed: {:?}", key.code);
                        shutdown.trigger();
                    }
                }
            }

            debug!("Keyboard monitor stopped");
        })
}

fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
