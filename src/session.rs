/*!
 * Search session state
 *
 * One `Session` holds everything the workers of a run share: the attempt
 * counter, the found flag with its winning candidate, the cancellation and
 * expiry flags, and the optional deadline. There is no other shared state.
 */

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::progress::ProgressSnapshot;

/// The candidate that won the found-flag claim, and the stage it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Winner {
    pub candidate: String,
    pub stage: String,
}

/// Terminal result of a session. Exactly one is produced per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Found { candidate: String, stage: String },
    NotFound,
    Cancelled,
    /// The session deadline passed before a candidate was found.
    TimedOut,
}

impl Outcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found { .. })
    }

    pub fn candidate(&self) -> Option<&str> {
        match self {
            Outcome::Found { candidate, .. } => Some(candidate),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Found { candidate, stage } => {
                write!(f, "found '{}' in stage {}", candidate, stage)
            }
            Outcome::NotFound => write!(f, "not found"),
            Outcome::Cancelled => write!(f, "cancelled"),
            Outcome::TimedOut => write!(f, "deadline exceeded"),
        }
    }
}

pub struct Session {
    target: String,
    secondary: Option<String>,
    attempts: AtomicU64,
    found: AtomicBool,
    winner: Mutex<Option<Winner>>,
    cancelled: AtomicBool,
    expired: AtomicBool,
    deadline: Option<Instant>,
    started: Instant,
}

impl Session {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            secondary: None,
            attempts: AtomicU64::new(0),
            found: AtomicBool::new(false),
            winner: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            expired: AtomicBool::new(false),
            deadline: None,
            started: Instant::now(),
        }
    }

    /// Secondary identity (e.g. hardware address) used for derived candidates.
    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to the session start.
    pub fn with_budget(self, budget: Duration) -> Self {
        let deadline = self.started + budget;
        self.with_deadline(deadline)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn secondary(&self) -> Option<&str> {
        self.secondary.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    #[inline]
    pub fn record_attempt(&self) -> u64 {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Request cancellation. Workers stop at their next checkpoint.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Mark the deadline as passed. Called by the watchdog.
    pub fn expire(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }

    /// True once the deadline has passed; latches the expiry flag.
    pub fn is_expired(&self) -> bool {
        if self.expired.load(Ordering::Acquire) {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.expire();
                true
            }
            _ => false,
        }
    }

    pub fn is_found(&self) -> bool {
        self.found.load(Ordering::Acquire)
    }

    /// Cooperative checkpoint: true when workers must stop pulling candidates.
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.is_found() || self.is_cancelled() || self.is_expired()
    }

    /// Try to claim the found flag for `candidate`.
    ///
    /// Exactly one claim per session succeeds; every later claim returns false
    /// and its candidate is discarded.
    pub fn claim(&self, candidate: &str, stage: &str) -> bool {
        if self
            .found
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let previous = self.winner.lock().replace(Winner {
            candidate: candidate.to_string(),
            stage: stage.to_string(),
        });
        assert!(previous.is_none(), "found flag claimed twice");
        true
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner.lock().clone()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.attempts(), self.started.elapsed())
    }

    /// Session-level outcome if the run must end now, `None` to keep going.
    pub(crate) fn settled(&self) -> Option<Outcome> {
        if let Some(winner) = self.winner() {
            return Some(Outcome::Found {
                candidate: winner.candidate,
                stage: winner.stage,
            });
        }
        if self.is_cancelled() {
            return Some(Outcome::Cancelled);
        }
        if self.is_expired() {
            return Some(Outcome::TimedOut);
        }
        None
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.target)
            .field("secondary", &self.secondary)
            .field("attempts", &self.attempts())
            .field("found", &self.is_found())
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_single_claim_wins() {
        let session = Session::new("net");
        assert!(session.claim("first", "stage-a"));
        assert!(!session.claim("second", "stage-b"));
        assert_eq!(
            session.winner(),
            Some(Winner {
                candidate: "first".into(),
                stage: "stage-a".into()
            })
        );
        assert!(session.should_stop());
    }

    #[test]
    fn test_concurrent_claims() {
        let session = Arc::new(Session::new("net"));
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let session = Arc::clone(&session);
                thread::spawn(move || session.claim(&i.to_string(), "race"))
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert!(session.winner().is_some());
    }

    #[test]
    fn test_counter_under_contention() {
        let session = Arc::new(Session::new("net"));
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        session.record_attempt();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(session.attempts(), 100_000);
    }

    #[test]
    fn test_past_deadline_is_expired() {
        let session = Session::new("net").with_deadline(Instant::now());
        assert!(session.is_expired());
        assert!(session.should_stop());
        assert_eq!(session.settled(), Some(Outcome::TimedOut));
    }

    #[test]
    fn test_settled_priority() {
        let session = Session::new("net");
        assert_eq!(session.settled(), None);
        session.cancel();
        assert_eq!(session.settled(), Some(Outcome::Cancelled));
        session.claim("pw", "common");
        assert!(session.settled().unwrap().is_found());
    }

    #[test]
    fn test_outcome_json() {
        let outcome = Outcome::Found {
            candidate: "12342".into(),
            stage: "checksum-pins".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(
            json,
            r#"{"outcome":"found","candidate":"12342","stage":"checksum-pins"}"#
        );
        assert_eq!(
            serde_json::to_string(&Outcome::TimedOut).unwrap(),
            r#"{"outcome":"timed_out"}"#
        );
    }
}
