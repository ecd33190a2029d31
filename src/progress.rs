/*!
 * Progress tracking
 *
 * Snapshots are plain reads of the shared attempt counter and the session
 * clock. Taking one never blocks a worker and never changes the counter.
 */

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::session::Session;

/// Point-in-time view of a session's throughput.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub attempts: u64,
    pub elapsed_secs: f64,
    /// Attempts per second, over at least one second.
    pub rate: f64,
}

impl ProgressSnapshot {
    pub fn new(attempts: u64, elapsed: Duration) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        Self {
            attempts,
            elapsed_secs,
            rate: attempts as f64 / elapsed_secs.max(1.0),
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Attempts: {} | Rate: {} | Elapsed: {}s",
            format_number(self.attempts),
            format_rate(self.rate),
            self.elapsed_secs as u64
        )
    }
}

/// Samples a session from any thread.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    session: Arc<Session>,
}

impl ProgressTracker {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn sample(&self) -> ProgressSnapshot {
        self.session.snapshot()
    }
}

/// Format number with thousands separator (1234567 -> "1,234,567")
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut out = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format attempt rate (/s, K/s, M/s)
pub fn format_rate(rate: f64) -> String {
    if rate >= 1_000_000.0 {
        format!("{:.2} M/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.2} K/s", rate / 1_000.0)
    } else {
        format!("{:.0}/s", rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_rate_uses_at_least_one_second() {
        let snapshot = ProgressSnapshot::new(500, Duration::from_millis(200));
        assert_eq!(snapshot.rate, 500.0);

        let snapshot = ProgressSnapshot::new(500, Duration::from_secs(10));
        assert_eq!(snapshot.rate, 50.0);
    }

    #[test]
    fn test_sample_reads_counter() {
        let session = Arc::new(Session::new("net"));
        let tracker = ProgressTracker::new(Arc::clone(&session));
        assert_eq!(tracker.sample().attempts, 0);

        session.record_attempt();
        session.record_attempt();
        assert_eq!(tracker.sample().attempts, 2);
        // Sampling does not touch the counter.
        assert_eq!(session.attempts(), 2);
    }

    #[test]
    fn test_sample_while_writers_run() {
        let session = Arc::new(Session::new("net"));
        let tracker = ProgressTracker::new(Arc::clone(&session));
        let writer = {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for _ in 0..50_000 {
                    session.record_attempt();
                }
            })
        };

        let mut last = 0;
        while !writer.is_finished() {
            let attempts = tracker.sample().attempts;
            assert!(attempts >= last);
            last = attempts;
        }
        writer.join().unwrap();
        assert_eq!(tracker.sample().attempts, 50_000);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(12.4), "12/s");
        assert_eq!(format_rate(1_500.0), "1.50 K/s");
        assert_eq!(format_rate(2_000_000.0), "2.00 M/s");
    }
}
