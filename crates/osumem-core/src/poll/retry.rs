//! Retry policy for attaching to the game.

use std::time::Duration;

use crate::config::LoopConfig;

use super::shutdown::ShutdownSignal;

/// How many attempts to make and how long to wait between them.
pub trait RetryStrategy {
    fn max_attempts(&self) -> u32;

    /// Delay after the given failed attempt (0-indexed).
    fn delay_for_attempt(&self, attempt: u32) -> Duration;

    /// Call `f` up to `max_attempts()` times, waiting on `shutdown` between
    /// failures.
    ///
    /// `f` receives the attempt index. Returns `None` as soon as shutdown is
    /// triggered, otherwise the first success or the last error.
    fn execute_until<T, E, F>(&self, shutdown: &ShutdownSignal, mut f: F) -> Option<Result<T, E>>
    where
        F: FnMut(u32) -> Result<T, E>,
    {
        let max = self.max_attempts().max(1);
        let mut attempt = 0;
        loop {
            if shutdown.is_shutdown() {
                return None;
            }
            match f(attempt) {
                Ok(value) => return Some(Ok(value)),
                Err(e) if attempt + 1 >= max => return Some(Err(e)),
                Err(_) => {
                    if shutdown.wait(self.delay_for_attempt(attempt)) {
                        return None;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// The loop's attach schedule, bounded to `init_attempts` tries.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachBackoff {
    config: LoopConfig,
}

impl AttachBackoff {
    pub fn from_config(config: &LoopConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl RetryStrategy for AttachBackoff {
    fn max_attempts(&self) -> u32 {
        self.config.init_attempts
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.config.backoff_for(attempt)
    }
}
