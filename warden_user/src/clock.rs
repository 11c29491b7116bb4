use crate::misc::truncate_to_seconds;
use chrono::{Duration, Local, NaiveDateTime};
use warden_io::Mutex;

/// The source of "now" for every expiration computation
pub trait Clock: Send + Sync {
    /// The current naive local time, truncated to whole seconds
    fn now(&self) -> NaiveDateTime;
}

/// Reads the local wall clock
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        truncate_to_seconds(Local::now().naive_local())
    }
}

/// A clock that only moves when told to. Used by tests and dry runs
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(truncate_to_seconds(start)),
        }
    }

    /// Moves the clock forward (or backward, for negative durations)
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.now.lock() = truncate_to_seconds(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}
