use std::thread;
use std::time::{Duration, Instant};

use super::{frame_interval, Clock, Scheduler, Tick};

/// Wall-clock timestamps in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now_ms(&self) -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1000.0
    }
}

/// Real-time scheduler aligned on display frames.
///
/// Frame boundaries are counted from `start()`; `asap` and `tick` block the
/// thread until the next one.
pub struct FrameScheduler {
    interval: f64,
    origin: Instant,
    last_tick: Option<f64>,
}

impl FrameScheduler {
    pub fn new(refresh_rate: f64) -> Self {
        Self {
            interval: frame_interval(refresh_rate),
            origin: Instant::now(),
            last_tick: None,
        }
    }

    fn next_boundary(&self) -> f64 {
        if self.interval <= 0.0 {
            return self.now_ms();
        }
        let frame = (self.now_ms() / self.interval).floor() + 1.0;
        frame * self.interval
    }

    fn sleep_until(&self, deadline: f64) {
        let remaining = deadline - self.now_ms();
        if remaining > 0.0 {
            thread::sleep(Duration::from_secs_f64(remaining / 1000.0));
        }
    }
}

impl Scheduler for FrameScheduler {
    fn start(&mut self) {
        self.origin = Instant::now();
        self.last_tick = None;
    }

    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn sleep(&mut self, ms: f64) {
        if ms > 0.0 {
            thread::sleep(Duration::from_secs_f64(ms / 1000.0));
        }
    }

    fn asap(&mut self, callback: &mut dyn FnMut()) {
        let boundary = self.next_boundary();
        self.sleep_until(boundary);
        callback();
    }

    fn tick(&mut self) -> Tick {
        let scheduled = self.next_boundary();
        self.sleep_until(scheduled);
        let called = self.now_ms();
        let elapsed = match self.last_tick {
            Some(previous) => called - previous,
            None => self.interval,
        };
        self.last_tick = Some(called);

        Tick {
            scheduled,
            called,
            elapsed,
            fps: if elapsed > 0.0 { 1000.0 / elapsed } else { 0.0 },
        }
    }

    fn clock(&self) -> Box<dyn Clock> {
        Box::new(WallClock)
    }
}
