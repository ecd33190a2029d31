/*!
 * Search engine
 *
 * Starts sessions in the background and hands back a `SessionHandle`.
 * Three threads serve a session: the coordinator running the pipeline, a
 * progress ticker and, when a deadline is set, a watchdog that expires the
 * session when it passes.
 */

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, RecvTimeoutError};
use tracing::{debug, error};

use crate::config::SearchConfig;
use crate::coordinator::{Coordinator, SearchEvent};
use crate::error::Result;
use crate::oracle::Oracle;
use crate::pipeline::Pipeline;
use crate::progress::{ProgressSnapshot, ProgressTracker};
use crate::session::{Outcome, Session};

pub struct Engine {
    config: SearchConfig,
    oracle: Arc<dyn Oracle>,
    progress_interval: Duration,
}

impl Engine {
    pub fn new(config: SearchConfig, oracle: Arc<dyn Oracle>) -> Self {
        let progress_interval = config.progress_interval();
        Self {
            config,
            oracle,
            progress_interval,
        }
    }

    /// Override the configured progress interval.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Build the standard pipeline for `target` and start searching it.
    pub fn start(
        &self,
        target: &str,
        secondary: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<SessionHandle> {
        let pipeline = Pipeline::standard(target, secondary, &self.config)?;

        let mut session = Session::new(target);
        if let Some(secondary) = secondary {
            session = session.with_secondary(secondary);
        }
        if let Some(deadline) = deadline {
            session = session.with_deadline(deadline);
        }
        self.start_with(session, pipeline)
    }

    /// Start a session over a caller-built pipeline.
    pub fn start_with(&self, session: Session, pipeline: Pipeline) -> Result<SessionHandle> {
        let session = Arc::new(session);
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded(1);
        // Dropped by the coordinator thread once the pipeline is done.
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);

        if let Some(deadline) = session.deadline() {
            let session = Arc::clone(&session);
            let done = done_rx.clone();
            thread::Builder::new()
                .name("watchdog".into())
                .spawn(move || {
                    select! {
                        recv(crossbeam_channel::at(deadline)) -> _ => {
                            debug!("session deadline reached");
                            session.expire();
                        }
                        recv(done) -> _ => {}
                    }
                })?;
        }

        let ticker = {
            let session = Arc::clone(&session);
            let events = event_tx.clone();
            let tick = crossbeam_channel::tick(self.progress_interval);
            thread::Builder::new()
                .name("progress".into())
                .spawn(move || loop {
                    select! {
                        recv(tick) -> _ => {
                            let snapshot = session.snapshot();
                            debug!(%snapshot, "progress");
                            let _ = events.send(SearchEvent::Progress(snapshot));
                        }
                        recv(done_rx) -> _ => break,
                    }
                })?
        };

        let coordinator = Coordinator::new()
            .with_wait_timeout(self.config.wait_timeout())
            .with_events(event_tx.clone());
        let oracle = Arc::clone(&self.oracle);
        {
            let session = Arc::clone(&session);
            thread::Builder::new()
                .name("coordinator".into())
                .spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        coordinator.run(&session, &pipeline, oracle)
                    }))
                    .unwrap_or_else(|_| {
                        error!("coordinator panicked, cancelling session");
                        session.cancel();
                        session.settled().unwrap_or(Outcome::Cancelled)
                    });

                    drop(done_tx);
                    let _ = ticker.join();
                    let _ = event_tx.send(SearchEvent::Finished(outcome.clone()));
                    let _ = outcome_tx.send(outcome);
                })?;
        }

        Ok(SessionHandle {
            session,
            events: event_rx,
            outcome: outcome_rx,
            finished: None,
        })
    }
}

/// Control over a running session. Dropping an unfinished handle cancels it.
pub struct SessionHandle {
    session: Arc<Session>,
    events: Receiver<SearchEvent>,
    outcome: Receiver<Outcome>,
    finished: Option<Outcome>,
}

impl SessionHandle {
    /// Request cancellation; the outcome is `Cancelled` unless a candidate
    /// was already claimed.
    pub fn cancel(&self) {
        self.session.cancel();
    }

    /// Block until the session ends.
    pub fn wait(mut self) -> Outcome {
        if let Some(outcome) = self.finished.take() {
            return outcome;
        }
        match self.outcome.recv() {
            Ok(outcome) => {
                self.finished = Some(outcome.clone());
                outcome
            }
            Err(_) => {
                error!("coordinator exited without an outcome");
                self.session.settled().unwrap_or(Outcome::Cancelled)
            }
        }
    }

    /// Wait up to `timeout`; `None` if the session is still running.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Outcome> {
        if let Some(outcome) = &self.finished {
            return Some(outcome.clone());
        }
        match self.outcome.recv_timeout(timeout) {
            Ok(outcome) => {
                self.finished = Some(outcome.clone());
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                let outcome = self.session.settled().unwrap_or(Outcome::Cancelled);
                self.finished = Some(outcome.clone());
                Some(outcome)
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some() || !self.outcome.is_empty()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.session.snapshot()
    }

    pub fn tracker(&self) -> ProgressTracker {
        ProgressTracker::new(Arc::clone(&self.session))
    }

    /// Stage, progress and completion events. `Finished` is always last.
    pub fn events(&self) -> Receiver<SearchEvent> {
        self.events.clone()
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.finished.is_none() {
            self.session.cancel();
        }
    }
}
