/*!
 * Pass/fail oracles
 *
 * The engine only ever asks one question: does this candidate work for this
 * target? How that is answered is up to the oracle. A wrong candidate is
 * `Ok(false)`; an `Err` is treated exactly like `Ok(false)` by the workers.
 */

use std::collections::HashSet;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

pub trait Oracle: Send + Sync {
    /// Test `candidate` against `target`. May block.
    fn test(&self, target: &str, candidate: &str) -> Result<bool>;
}

impl<F> Oracle for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn test(&self, target: &str, candidate: &str) -> Result<bool> {
        Ok(self(target, candidate))
    }
}

/// Accepts a fixed set of candidates, optionally after a simulated delay.
#[derive(Debug, Clone, Default)]
pub struct SetOracle {
    accepted: HashSet<String>,
    delay: Option<Duration>,
}

impl SetOracle {
    pub fn new<I, S>(accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted: accepted.into_iter().map(Into::into).collect(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Oracle for SetOracle {
    fn test(&self, _target: &str, candidate: &str) -> Result<bool> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        Ok(self.accepted.contains(candidate))
    }
}

const TARGET_PLACEHOLDER: &str = "{target}";
const CANDIDATE_PLACEHOLDER: &str = "{candidate}";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs an external program per candidate; exit status 0 means success.
///
/// `{target}` and `{candidate}` in the arguments are substituted. When no
/// argument mentions `{candidate}`, the target and candidate are appended as
/// the last two arguments. A run exceeding `timeout` is killed and counts as
/// a failure.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandOracle {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    fn build_args(&self, target: &str, candidate: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace(TARGET_PLACEHOLDER, target)
                    .replace(CANDIDATE_PLACEHOLDER, candidate)
            })
            .collect();

        if !self.args.iter().any(|arg| arg.contains(CANDIDATE_PLACEHOLDER)) {
            args.push(target.to_string());
            args.push(candidate.to_string());
        }
        args
    }
}

impl Oracle for CommandOracle {
    fn test(&self, target: &str, candidate: &str) -> Result<bool> {
        let mut child = Command::new(&self.program)
            .args(self.build_args(target, candidate))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to run {}", self.program))?;

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().context("Failed to poll oracle process")? {
                return Ok(status.success());
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
