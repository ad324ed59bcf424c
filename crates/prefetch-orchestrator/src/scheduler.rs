use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};

/// Time-of-day exclusion window plus a minimum interval between runs.
///
/// `[start, end]` is the window during which the scheduler must NOT run
/// (e.g. working hours); outside it, a run is due once `interval` has
/// elapsed since `last_run`. Ported from the reference `scheduler` struct's
/// `shouldRun`/`sleepTime` methods, replacing its local-time-pinned-to-year-0
/// trick with `chrono::NaiveTime` comparisons.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    start: NaiveTime,
    end: NaiveTime,
    last_run: Option<DateTime<Utc>>,
}

impl Scheduler {
    pub fn new(interval: Duration, start: NaiveTime, end: NaiveTime) -> Self {
        Self { interval, start, end, last_run: None }
    }

    fn outside_window(&self, now: NaiveTime) -> bool {
        now < self.start || now > self.end
    }

    /// True if a tick is due right now.
    pub fn should_run(&self, now: NaiveTime, wall_clock_now: DateTime<Utc>) -> bool {
        if !self.outside_window(now) {
            return false;
        }
        match self.last_run {
            None => true,
            Some(last_run) => (wall_clock_now - last_run).to_std().unwrap_or(Duration::ZERO) >= self.interval,
        }
    }

    /// How long to sleep before the next `should_run` check is worth making.
    /// Never negative: this is the max of "time left in the exclusion
    /// window" (if currently inside it) and "time until the interval next
    /// elapses", clamped to zero (the reference returns a signed duration
    /// and lets the caller skip sleeping when it's not positive; here the
    /// clamp does that job).
    pub fn sleep_time(&self, now: NaiveTime, wall_clock_now: DateTime<Utc>) -> Duration {
        let mut sleep_duration = Duration::ZERO;
        if now > self.start && now < self.end {
            if let Some(remaining) = (self.end - now).to_std().ok() {
                sleep_duration = remaining;
            }
        }

        let interval = chrono::Duration::from_std(self.interval).unwrap_or(chrono::Duration::zero());
        let next_run = self.last_run.unwrap_or(wall_clock_now) + interval;
        if let Ok(until_next) = (next_run - wall_clock_now).to_std() {
            if until_next > sleep_duration {
                sleep_duration = until_next;
            }
        }
        sleep_duration
    }

    pub fn record_run(&mut self, at: DateTime<Utc>) {
        self.last_run = Some(at);
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }
}
