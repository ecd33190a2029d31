/*!
 * Search coordinator
 *
 * Runs the stages of a pipeline strictly in order. Each stage is fanned out
 * to its workers by one generic routine: materialized lists are split into
 * strided partitions up front, generative sources are shared and pulled on
 * demand. Workers race to claim the session's found flag; the first claim
 * wins and every other worker stops at its next checkpoint.
 *
 * Workers are plain threads reporting back over a channel. The coordinator
 * waits for all of them before the next stage starts, but gives up on
 * workers that stay silent for `wait_timeout` while no attempts are being
 * made. Claims from abandoned workers are refused.
 */

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::candidates::{CandidateSource, Generator, Partition};
use crate::oracle::Oracle;
use crate::pipeline::{Pipeline, Stage};
use crate::progress::ProgressSnapshot;
use crate::session::{Outcome, Session};

const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events observed while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    StageStarted {
        stage: String,
        workers: usize,
        candidates: Option<u64>,
    },
    StageFinished {
        stage: String,
        attempts: u64,
        abandoned: usize,
    },
    Progress(ProgressSnapshot),
    /// Always the last event of a session.
    Finished(Outcome),
}

/// Summary of one stage run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: String,
    pub workers: usize,
    pub attempts: u64,
    /// Workers that never reported back within the stall timeout.
    pub abandoned: usize,
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    wait_timeout: Duration,
    events: Option<Sender<SearchEvent>>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            events: None,
        }
    }

    /// How long a stage may go without any worker report or new attempt
    /// before its remaining workers are abandoned.
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn with_events(mut self, events: Sender<SearchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: SearchEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Run every stage in order until one finds a candidate, the session is
    /// cancelled or its deadline passes.
    pub fn run(&self, session: &Arc<Session>, pipeline: &Pipeline, oracle: Arc<dyn Oracle>) -> Outcome {
        info!(
            target_identity = session.target(),
            stages = pipeline.len(),
            "search started"
        );

        for stage in pipeline.stages() {
            if let Some(outcome) = session.settled() {
                return self.conclude(session, outcome);
            }
            self.run_stage(session, stage, &oracle);
        }

        let outcome = session.settled().unwrap_or(Outcome::NotFound);
        self.conclude(session, outcome)
    }

    fn conclude(&self, session: &Session, outcome: Outcome) -> Outcome {
        info!(
            attempts = session.attempts(),
            elapsed_secs = session.started().elapsed().as_secs_f64(),
            %outcome,
            "search finished"
        );
        outcome
    }

    /// Fan one stage out to its workers and wait for them.
    pub fn run_stage(&self, session: &Arc<Session>, stage: &Stage, oracle: &Arc<dyn Oracle>) -> StageReport {
        let size = stage.source().size_hint();
        let workers = match size {
            Some(n) => stage.workers().min(usize::try_from(n).unwrap_or(usize::MAX)),
            None => stage.workers(),
        };

        if workers == 0 {
            debug!(stage = stage.name(), "stage has no candidates, skipping");
            return StageReport {
                stage: stage.name().to_string(),
                workers: 0,
                attempts: 0,
                abandoned: 0,
            };
        }

        let feeds: Vec<Feed> = match stage.source() {
            CandidateSource::Materialized(_) => stage
                .source()
                .partitions(workers)
                .unwrap_or_default()
                .into_iter()
                .map(Feed::Partition)
                .collect(),
            CandidateSource::Generative(generator) => {
                let generator = generator.fork();
                (0..workers)
                    .map(|_| Feed::Shared(Arc::clone(&generator)))
                    .collect()
            }
        };

        info!(stage = stage.name(), workers, candidates = ?size, "stage started");
        self.emit(SearchEvent::StageStarted {
            stage: stage.name().to_string(),
            workers,
            candidates: size,
        });

        let gate = Arc::new(StageGate::new(
            stage.name(),
            stage.budget().map(|budget| Instant::now() + budget),
        ));
        let (tx, rx) = crossbeam_channel::bounded(feeds.len());

        let mut spawned = 0;
        for (index, feed) in feeds.into_iter().enumerate() {
            let tx = tx.clone();
            let session = Arc::clone(session);
            let gate = Arc::clone(&gate);
            let oracle = Arc::clone(oracle);

            let result = thread::Builder::new()
                .name(format!("{}-{}", stage.name(), index))
                .spawn(move || {
                    let exit = work(&session, &gate, oracle.as_ref(), feed);
                    let _ = tx.send(exit);
                });

            match result {
                Ok(_) => spawned += 1,
                Err(e) => warn!(stage = stage.name(), error = %e, "failed to spawn worker"),
            }
        }
        drop(tx);

        let mut pending = spawned;
        let mut seen_attempts = gate.attempts();
        let mut last_progress = Instant::now();
        let poll = self.wait_timeout.min(POLL_INTERVAL);

        while pending > 0 {
            match rx.recv_timeout(poll) {
                Ok(exit) => {
                    pending -= 1;
                    last_progress = Instant::now();
                    debug!(stage = stage.name(), ?exit, pending, "worker finished");
                }
                Err(RecvTimeoutError::Timeout) => {
                    let attempts = gate.attempts();
                    if attempts != seen_attempts {
                        seen_attempts = attempts;
                        last_progress = Instant::now();
                    } else if last_progress.elapsed() >= self.wait_timeout {
                        warn!(
                            stage = stage.name(),
                            abandoned = pending,
                            "workers stalled, moving on without them"
                        );
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(stage = stage.name(), lost = pending, "workers exited without reporting");
                    break;
                }
            }
        }
        gate.close();

        let report = StageReport {
            stage: stage.name().to_string(),
            workers: spawned,
            attempts: gate.attempts(),
            abandoned: pending,
        };
        info!(
            stage = stage.name(),
            attempts = report.attempts,
            abandoned = report.abandoned,
            "stage finished"
        );
        self.emit(SearchEvent::StageFinished {
            stage: report.stage.clone(),
            attempts: report.attempts,
            abandoned: report.abandoned,
        });
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerExit {
    Won,
    Exhausted,
    Stopped,
}

/// A worker's candidate supply.
enum Feed {
    Partition(Partition),
    Shared(Arc<dyn Generator>),
}

impl Feed {
    fn pull(&mut self) -> Option<String> {
        match self {
            Feed::Partition(partition) => partition.next(),
            Feed::Shared(generator) => generator.next_candidate(),
        }
    }
}

/// Per-stage stop conditions and the gate through which claims pass.
struct StageGate {
    name: String,
    deadline: Option<Instant>,
    attempts: AtomicU64,
    closed: AtomicBool,
    claim_lock: Mutex<()>,
}

impl StageGate {
    fn new(name: &str, deadline: Option<Instant>) -> Self {
        Self {
            name: name.to_string(),
            deadline,
            attempts: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            claim_lock: Mutex::new(()),
        }
    }

    fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    fn should_stop(&self, session: &Session) -> bool {
        self.closed.load(Ordering::Acquire)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
            || session.should_stop()
    }

    /// Claims only go through while the coordinator still waits on the stage.
    fn claim(&self, session: &Session, candidate: &str) -> bool {
        let _guard = self.claim_lock.lock();
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        session.claim(candidate, &self.name)
    }

    fn close(&self) {
        let _guard = self.claim_lock.lock();
        self.closed.store(true, Ordering::Release);
    }
}

fn work(session: &Session, gate: &StageGate, oracle: &dyn Oracle, mut feed: Feed) -> WorkerExit {
    loop {
        if gate.should_stop(session) {
            return WorkerExit::Stopped;
        }
        let Some(candidate) = feed.pull() else {
            return WorkerExit::Exhausted;
        };

        session.record_attempt();
        gate.attempts.fetch_add(1, Ordering::Relaxed);

        if check(oracle, session.target(), &candidate) {
            if gate.claim(session, &candidate) {
                debug!(stage = %gate.name, "candidate accepted");
                return WorkerExit::Won;
            }
            return WorkerExit::Stopped;
        }
    }
}

/// Ask the oracle; errors and panics count as a rejection.
fn check(oracle: &dyn Oracle, target: &str, candidate: &str) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| oracle.test(target, candidate))) {
        Ok(Ok(accepted)) => accepted,
        Ok(Err(e)) => {
            debug!(error = %e, "oracle error, counted as rejection");
            false
        }
        Err(_) => {
            warn!("oracle panicked, counted as rejection");
            false
        }
    }
}
