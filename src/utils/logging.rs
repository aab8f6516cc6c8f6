use log::{Level, log_enabled, warn};
use std::time::{Duration, Instant};

/// Scoped timer for the phases of a simulation tick. Reports at trace level.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            log::trace!("end {} ({} µs)", self.label, self.start.elapsed().as_micros());
        }
    }
}

/// Warns when advancing `simulated` seconds took longer than that in wall time.
pub fn warn_if_behind_real_time(elapsed: Duration, simulated: f32) {
    let wall = elapsed.as_secs_f32();
    if simulated > 0.0 && wall > simulated {
        warn!(
            "simulation behind real time: {:.2} ms for {:.2} ms of motion",
            wall * 1000.0,
            simulated * 1000.0
        );
    }
}
