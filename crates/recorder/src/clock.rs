use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{NaiveTime, Timelike};

/// Source of the wall-clock time stamped on log lines.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// Local time of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicU32,
}

impl ManualClock {
    pub fn new(time: NaiveTime) -> Self {
        Self {
            seconds: AtomicU32::new(time.num_seconds_from_midnight()),
        }
    }

    pub fn set(&self, time: NaiveTime) {
        self.seconds
            .store(time.num_seconds_from_midnight(), Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveTime {
        let seconds = self.seconds.load(Ordering::Relaxed);
        NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or_default()
    }
}
