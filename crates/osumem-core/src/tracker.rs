//! Background tracking: the initialization and snapshot query calls.
//!
//! [`init_loop`] attaches to the game (with bounded retries), then keeps a
//! [`PollLoop`] running on a worker thread. [`get_beatmap_info`] reads the
//! latest published snapshot without touching the process.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::beatmap::{BeatmapInfo, NoRatings, RatingSource, SnapshotRecord};
use crate::config::LoopConfig;
use crate::error::{Error, Result};
use crate::offset::OffsetRegistry;
use crate::poll::{AttachBackoff, LoopEvent, PollLoop, ShutdownSignal, SnapshotCell};
use crate::process::{ProcessProvider, ProcessTarget, SystemProvider};

const WORKER_NAME: &str = "osumem-poll";

/// Handle to a running poll loop.
///
/// Dropping the tracker stops the loop and waits for the worker, which
/// closes the process handle.
pub struct Tracker {
    cell: Arc<SnapshotCell>,
    shutdown: Arc<ShutdownSignal>,
    /// PID the worker is attached to, 0 while it is not attached.
    attached_pid: Arc<AtomicU32>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl Tracker {
    /// Move an attached loop onto a worker thread.
    ///
    /// `on_event` runs on the worker for every loop event.
    pub fn spawn<P, F>(mut poll_loop: PollLoop<P>, mut on_event: F) -> Result<Self>
    where
        P: ProcessProvider + Send + 'static,
        F: FnMut(&LoopEvent<'_>) + Send + 'static,
    {
        let cell = Arc::clone(poll_loop.cell());
        let shutdown = Arc::new(ShutdownSignal::new());
        let attached_pid = Arc::new(AtomicU32::new(
            poll_loop.target().map_or(0, |t| t.pid),
        ));

        let worker_shutdown = Arc::clone(&shutdown);
        let worker_pid = Arc::clone(&attached_pid);
        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let result = poll_loop.run(&worker_shutdown, &mut |event| {
                    match event {
                        LoopEvent::Attached { target, .. } => {
                            worker_pid.store(target.pid, Ordering::SeqCst)
                        }
                        LoopEvent::Detached { exited: true, .. } => {
                            worker_pid.store(0, Ordering::SeqCst)
                        }
                        LoopEvent::Error(e) => debug!("Poll loop: {}", e),
                        _ => {}
                    }
                    on_event(event);
                });
                worker_pid.store(0, Ordering::SeqCst);
                if let Err(e) = &result {
                    error!("Poll loop terminated: {}", e);
                }
                result
            })?;

        Ok(Self {
            cell,
            shutdown,
            attached_pid,
            worker: Some(worker),
        })
    }

    pub fn latest(&self) -> Option<Arc<SnapshotRecord>> {
        self.cell.latest()
    }

    /// PID of the process currently attached, if any.
    pub fn attached_pid(&self) -> Option<u32> {
        match self.attached_pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    pub fn shutdown_signal(&self) -> &Arc<ShutdownSignal> {
        &self.shutdown
    }

    /// Stop the loop and return how it ended.
    pub fn stop(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        self.shutdown.trigger();
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .unwrap_or_else(|_| Err(Error::Terminal("poll worker panicked".to_string()))),
            None => Ok(()),
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            debug!("Poll loop ended with error: {}", e);
        }
    }
}

/// Attach to the game through the operating system and start polling every
/// `interval_ms` milliseconds with the built-in offset tables.
pub fn init_loop(interval_ms: u64) -> Result<(Tracker, ProcessTarget)> {
    let config = LoopConfig::from_interval_ms(interval_ms)?;
    init_loop_with(
        SystemProvider,
        Arc::new(OffsetRegistry::builtin()),
        config,
        Arc::new(NoRatings),
    )
}

/// [`init_loop`] with every collaborator supplied by the caller.
///
/// Fails with the last attach error when no matching process shows up
/// within `config.init_attempts` attempts.
pub fn init_loop_with<P>(
    provider: P,
    registry: Arc<OffsetRegistry>,
    config: LoopConfig,
    ratings: Arc<dyn RatingSource>,
) -> Result<(Tracker, ProcessTarget)>
where
    P: ProcessProvider + Send + 'static,
{
    let backoff = AttachBackoff::from_config(&config);
    let mut poll_loop = PollLoop::new(provider, registry, config)?.with_ratings(ratings);

    // Attach retries only need a signal to wait on; nothing can trigger it
    // before the tracker exists.
    let target = poll_loop.attach_with(&backoff, &ShutdownSignal::new())?;
    info!("Tracking PID {}", target.pid);

    let tracker = Tracker::spawn(poll_loop, |_| {})?;
    Ok((tracker, target))
}

/// Latest beatmap of `target`.
///
/// Fails with [`Error::NoSnapshot`] until the loop has published a snapshot
/// and with [`Error::StaleTarget`] when the latest snapshot came from a
/// different process.
pub fn get_beatmap_info(tracker: &Tracker, target: &ProcessTarget) -> Result<BeatmapInfo> {
    let record = tracker.latest().ok_or(Error::NoSnapshot)?;
    if record.pid != target.pid {
        return Err(Error::StaleTarget {
            requested: target.pid,
            current: tracker.attached_pid().or(Some(record.pid)),
        });
    }
    Ok(record.info.clone())
}
