//! Wall-clock access for conversion provenance.

use chrono::{Local, NaiveDateTime};

/// Source of the current local time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock in local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
