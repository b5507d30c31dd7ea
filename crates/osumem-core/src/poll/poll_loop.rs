use std::sync::Arc;
use std::time::Duration;

use strum::{Display, IntoStaticStr};
use tracing::{debug, info, warn};

use crate::beatmap::{BeatmapAssembler, GameState, NoRatings, RatingSource, SnapshotRecord};
use crate::config::LoopConfig;
use crate::error::{AttachError, Error, Result, SnapshotError};
use crate::offset::{AnchorCache, OffsetRegistry, detect_table};
use crate::process::{ProcessInfo, ProcessProvider, ProcessTarget};
use crate::scan::SignatureScanner;

use super::publish::SnapshotCell;
use super::retry::RetryStrategy;
use super::shutdown::ShutdownSignal;

/// Where the loop is in its lifecycle.
///
/// ```text
/// Idle -> Attaching -> Polling -> (process lost / snapshot failed) -> Attaching
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum LoopState {
    Idle,
    Attaching,
    Polling,
}

/// Something the loop wants its owner to know about.
#[derive(Debug)]
pub enum LoopEvent<'a> {
    Attached {
        target: &'a ProcessTarget,
        family: &'a str,
        /// Same process as the previous session.
        reattached: bool,
    },
    Snapshot(&'a SnapshotRecord),
    /// The game switched screens.
    GameState(GameState),
    /// A recoverable failure; the loop keeps going.
    Error(&'a Error),
    Detached {
        pid: u32,
        /// The process is gone, not just unreadable for now.
        exited: bool,
    },
}

struct Session<T> {
    process: T,
    target: ProcessTarget,
    assembler: BeatmapAssembler,
    reattached: bool,
}

/// Attach / poll / re-attach state machine.
///
/// Each [`tick`](Self::tick) does one step and returns how long to wait
/// before the next one. [`run`](Self::run) drives ticks until shutdown.
pub struct PollLoop<P: ProcessProvider> {
    provider: P,
    registry: Arc<OffsetRegistry>,
    config: LoopConfig,
    ratings: Arc<dyn RatingSource>,
    cell: Arc<SnapshotCell>,
    state: LoopState,
    session: Option<Session<P::Process>>,
    /// Anchors of a process we detached from while it was still running.
    retained_anchors: Option<(u32, AnchorCache)>,
    attach_attempt: u32,
    permission_failures: u32,
    cycle: u64,
    last_game_state: Option<GameState>,
}

impl<P: ProcessProvider> PollLoop<P> {
    pub fn new(provider: P, registry: Arc<OffsetRegistry>, config: LoopConfig) -> Result<Self> {
        config.validate()?;
        if registry.is_empty() {
            return Err(Error::invalid_config("no offset tables registered"));
        }
        Ok(Self {
            provider,
            registry,
            config,
            ratings: Arc::new(NoRatings),
            cell: Arc::new(SnapshotCell::new()),
            state: LoopState::Idle,
            session: None,
            retained_anchors: None,
            attach_attempt: 0,
            permission_failures: 0,
            cycle: 0,
            last_game_state: None,
        })
    }

    pub fn with_ratings(mut self, ratings: Arc<dyn RatingSource>) -> Self {
        self.ratings = ratings;
        self
    }

    /// Publish into an existing cell instead of a private one.
    pub fn with_cell(mut self, cell: Arc<SnapshotCell>) -> Self {
        self.cell = cell;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn cell(&self) -> &Arc<SnapshotCell> {
        &self.cell
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Process the loop is attached to.
    pub fn target(&self) -> Option<&ProcessTarget> {
        self.session.as_ref().map(|s| &s.target)
    }

    /// Try to attach once: open the process and pick its offset table.
    pub fn attach_once(&mut self) -> Result<&ProcessTarget> {
        self.state = LoopState::Attaching;
        self.session = None;

        let process = self.provider.attach(&self.config.selector())?;
        let target = process.target().clone();

        let scanner = SignatureScanner::new(self.config.scan_cap);
        let (mut anchors, reattached) = match self.retained_anchors.take() {
            Some((pid, cache)) if pid == target.pid => (cache, true),
            _ => (
                AnchorCache::new().with_rescan_after(self.config.anchor_rescan),
                false,
            ),
        };
        let table = detect_table(&process, &self.registry, &scanner, &mut anchors, target.pid)?;

        let mut assembler = BeatmapAssembler::new(Arc::clone(&table))
            .with_scanner(scanner)
            .with_ratings(Arc::clone(&self.ratings));
        assembler.reset_for(&target);
        let assembler = assembler.with_anchors(anchors);

        if reattached {
            debug!("Re-attached to PID {}", target.pid);
        } else {
            info!(
                "Attached to {} (PID {}, {}-bit, base {:#x}, table '{}')",
                target.name,
                target.pid,
                target.pointer_width.bits(),
                target.base_address,
                table.family
            );
            self.last_game_state = None;
        }

        self.attach_attempt = 0;
        self.permission_failures = 0;
        self.state = LoopState::Polling;
        let session = self.session.insert(Session {
            process,
            target,
            assembler,
            reattached,
        });
        Ok(&session.target)
    }

    /// Attach with retries, giving up after the strategy's attempts or when
    /// `shutdown` fires.
    pub fn attach_with<S: RetryStrategy>(
        &mut self,
        strategy: &S,
        shutdown: &ShutdownSignal,
    ) -> Result<ProcessTarget> {
        let result = strategy.execute_until(shutdown, |attempt| {
            debug!("Attach attempt {}/{}", attempt + 1, strategy.max_attempts());
            self.attach_once().cloned()
        });
        match result {
            Some(Ok(target)) => Ok(target),
            Some(Err(e)) => {
                self.state = LoopState::Idle;
                Err(e)
            }
            None => {
                self.state = LoopState::Idle;
                Err(Error::Terminal("shutdown requested while attaching".to_string()))
            }
        }
    }

    /// Do one step of the state machine.
    ///
    /// Returns the delay before the next tick. Only unrecoverable conditions
    /// are returned as errors; everything else is reported through
    /// `on_event` and retried.
    pub fn tick(&mut self, on_event: &mut dyn FnMut(&LoopEvent<'_>)) -> Result<Duration> {
        match self.session.take() {
            Some(session) => Ok(self.poll(session, on_event)),
            None => self.try_attach(on_event),
        }
    }

    /// Tick until `shutdown` fires or a terminal error occurs. The process
    /// handle is closed before returning.
    pub fn run(
        &mut self,
        shutdown: &ShutdownSignal,
        on_event: &mut dyn FnMut(&LoopEvent<'_>),
    ) -> Result<()> {
        info!(
            "Poll loop started (interval {}ms)",
            self.config.interval.as_millis()
        );

        let result = loop {
            if shutdown.is_shutdown() {
                break Ok(());
            }
            match self.tick(on_event) {
                Ok(wait) => {
                    if !wait.is_zero() && shutdown.wait(wait) {
                        break Ok(());
                    }
                }
                Err(e) => break Err(e),
            }
        };

        if let Some(session) = self.session.take() {
            debug!("Closing process {}", session.target.pid);
        }
        self.state = LoopState::Idle;
        info!("Poll loop stopped");
        result
    }

    fn try_attach(&mut self, on_event: &mut dyn FnMut(&LoopEvent<'_>)) -> Result<Duration> {
        match self.attach_once().map(|_| ()) {
            Ok(()) => {
                if let Some(session) = &self.session {
                    on_event(&LoopEvent::Attached {
                        target: &session.target,
                        family: &session.assembler.table().family,
                        reattached: session.reattached,
                    });
                }
                Ok(Duration::ZERO)
            }
            Err(e) => {
                let delay = self.config.backoff_for(self.attach_attempt);
                self.attach_attempt = self.attach_attempt.saturating_add(1);

                match &e {
                    Error::Attach(AttachError::PermissionDenied { pid }) => {
                        self.permission_failures += 1;
                        warn!(
                            "Permission denied opening process {} ({}/{})",
                            pid, self.permission_failures, self.config.permission_failure_budget
                        );
                        if self.permission_failures >= self.config.permission_failure_budget {
                            self.state = LoopState::Idle;
                            return Err(Error::Terminal(format!(
                                "permission denied opening process {} {} times",
                                pid, self.permission_failures
                            )));
                        }
                    }
                    Error::Attach(AttachError::UnsupportedPlatform) => {
                        self.state = LoopState::Idle;
                        return Err(Error::Terminal(e.to_string()));
                    }
                    Error::Attach(AttachError::NotFound(_)) => {
                        self.permission_failures = 0;
                        debug!("{}; retrying in {}ms", e, delay.as_millis());
                    }
                    _ => {
                        self.permission_failures = 0;
                        warn!("Attach failed: {}; retrying in {}ms", e, delay.as_millis());
                    }
                }

                on_event(&LoopEvent::Error(&e));
                Ok(delay)
            }
        }
    }

    fn poll(
        &mut self,
        mut session: Session<P::Process>,
        on_event: &mut dyn FnMut(&LoopEvent<'_>),
    ) -> Duration {
        match session.assembler.game_state(&session.process) {
            Ok(state) => {
                if self.last_game_state != Some(state) {
                    debug!("Game state: {}", state);
                    self.last_game_state = Some(state);
                    on_event(&LoopEvent::GameState(state));
                }
            }
            Err(e) => return self.detach(session, e, on_event),
        }

        match session.assembler.snapshot(&session.process) {
            Ok(info) => {
                self.cycle += 1;
                let record = self.cell.publish(SnapshotRecord::new(
                    session.target.pid,
                    session.assembler.table().family.clone(),
                    self.cycle,
                    info,
                ));
                on_event(&LoopEvent::Snapshot(&record));
                self.session = Some(session);
                self.config.interval
            }
            Err(e) => self.detach(session, e, on_event),
        }
    }

    /// Drop the session after a failed poll and go back to attaching.
    fn detach(
        &mut self,
        session: Session<P::Process>,
        error: Error,
        on_event: &mut dyn FnMut(&LoopEvent<'_>),
    ) -> Duration {
        let pid = session.target.pid;
        let exited = error.is_process_exited() || !session.process.is_alive();

        if exited {
            info!("Process {} exited", pid);
            self.retained_anchors = None;
            self.last_game_state = None;
        } else {
            match &error {
                Error::Snapshot(SnapshotError::IncompleteState { .. }) => {
                    debug!("Snapshot of PID {} incomplete: {}", pid, error)
                }
                _ => warn!("Polling PID {} failed: {}", pid, error),
            }
            self.retained_anchors = Some((pid, session.assembler.into_anchors()));
        }

        self.state = LoopState::Attaching;
        on_event(&LoopEvent::Error(&error));
        on_event(&LoopEvent::Detached { pid, exited });
        self.config.min_retry_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::fixture::SimulatedStable;
    use crate::process::MockProcessProvider;

    fn config() -> LoopConfig {
        LoopConfig::builder()
            .interval(Duration::from_millis(10))
            .min_retry_interval(Duration::from_millis(10))
            .attach_backoff(vec![Duration::from_millis(10)])
            .permission_failure_budget(3)
            .build()
            .unwrap()
    }

    fn poll_loop(provider: MockProcessProvider) -> PollLoop<MockProcessProvider> {
        PollLoop::new(provider, Arc::new(OffsetRegistry::builtin()), config()).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let lp = poll_loop(MockProcessProvider::default());
        assert_eq!(lp.state(), LoopState::Idle);
        assert!(lp.target().is_none());
        assert!(lp.cell().latest().is_none());
    }

    #[test]
    fn test_attach_then_publish() {
        let provider = MockProcessProvider::new(SimulatedStable::new().build());
        let mut lp = poll_loop(provider);
        let mut events = Vec::new();
        let mut record = |e: &LoopEvent<'_>| events.push(format!("{:?}", e));

        assert_eq!(lp.tick(&mut record).unwrap(), Duration::ZERO);
        assert_eq!(lp.state(), LoopState::Polling);

        assert_eq!(lp.tick(&mut record).unwrap(), Duration::from_millis(10));
        let latest = lp.cell().latest().unwrap();
        assert_eq!(latest.pid, 4242);
        assert_eq!(latest.cycle, 1);
        assert_eq!(latest.info.location.folder, "songs/123");

        assert!(events[0].starts_with("Attached"));
        assert!(events.iter().any(|e| e.starts_with("GameState(SongSelect)")));
        assert!(events.iter().any(|e| e.starts_with("Snapshot")));
    }

    #[test]
    fn test_not_found_backs_off() {
        let mut lp = poll_loop(MockProcessProvider::default());
        let mut errors = 0;
        let wait = lp
            .tick(&mut |e| {
                if matches!(e, LoopEvent::Error(_)) {
                    errors += 1;
                }
            })
            .unwrap();

        assert_eq!(wait, Duration::from_millis(10));
        assert_eq!(lp.state(), LoopState::Attaching);
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_permission_budget_is_terminal() {
        let provider = MockProcessProvider::new(SimulatedStable::new().build());
        provider.deny_permission(true);
        let mut lp = poll_loop(provider);

        assert!(lp.tick(&mut |_| {}).is_ok());
        assert!(lp.tick(&mut |_| {}).is_ok());
        let err = lp.tick(&mut |_| {}).unwrap_err();
        assert!(err.is_terminal());
        assert_eq!(lp.state(), LoopState::Idle);
    }

    #[test]
    fn test_incomplete_snapshot_reattaches_with_cached_anchors() {
        let provider = MockProcessProvider::new(SimulatedStable::new().no_beatmap().build());
        let mut lp = poll_loop(provider);

        lp.tick(&mut |_| {}).unwrap();
        let wait = lp.tick(&mut |_| {}).unwrap();
        assert_eq!(wait, Duration::from_millis(10));
        assert_eq!(lp.state(), LoopState::Attaching);
        assert!(lp.cell().latest().is_none());
        assert!(lp.retained_anchors.is_some());

        let mut reattached = None;
        lp.tick(&mut |e| {
            if let LoopEvent::Attached { reattached: flag, .. } = e {
                reattached = Some(*flag);
            }
        })
        .unwrap();
        assert_eq!(lp.state(), LoopState::Polling);
        assert!(lp.retained_anchors.is_none());
        assert_eq!(reattached, Some(true));
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let provider = MockProcessProvider::new(SimulatedStable::new().build());
        let mut lp = poll_loop(provider);
        let shutdown = ShutdownSignal::new();

        let mut snapshots = 0;
        lp.run(&shutdown, &mut |e| {
            if matches!(e, LoopEvent::Snapshot(_)) {
                snapshots += 1;
                if snapshots == 3 {
                    shutdown.trigger();
                }
            }
        })
        .unwrap();

        assert_eq!(snapshots, 3);
        assert_eq!(lp.state(), LoopState::Idle);
        assert!(lp.target().is_none());
        assert_eq!(lp.cell().latest().unwrap().cycle, 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LoopConfig {
            interval: Duration::ZERO,
            ..LoopConfig::default()
        };
        let result = PollLoop::new(
            MockProcessProvider::default(),
            Arc::new(OffsetRegistry::builtin()),
            config,
        );
        assert!(result.is_err());
    }
}
