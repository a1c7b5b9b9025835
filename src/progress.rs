use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// How often the extract and load phases emit a progress log line.
pub(crate) const PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Caller-supplied hook rendering extra diagnostic detail for progress logs.
pub type LogDetails = fn(key: &[u8], value: &[u8]) -> String;

/// Shared one-shot stop signal, polled cooperatively once per extracted
/// entry. Cloning yields another handle to the same signal.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Interval gate for periodic progress logging. Owned by the phase that polls
/// it and dropped when the phase returns.
pub(crate) struct Ticker {
    every: Duration,
    last: Instant,
}

impl Ticker {
    pub fn new(every: Duration) -> Self {
        Self {
            every,
            last: Instant::now(),
        }
    }

    /// Returns true at most once per interval.
    pub fn tick(&mut self) -> bool {
        if self.last.elapsed() < self.every {
            return false;
        }
        self.last = Instant::now();
        true
    }
}
