use std::cell::Cell;
use std::rc::Rc;

use super::{frame_interval, Clock, Scheduler, Tick};

/// Simulated time shared between a `VirtualScheduler` and the sinks that
/// timestamp its events.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<f64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_to(&self, ms: f64) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

struct Alarm {
    at: f64,
    callback: Box<dyn FnMut()>,
}

/// Scheduler that never blocks: sleeping only moves the simulated clock.
///
/// Alarms registered with `at` fire, in deadline order, when a sleep or
/// tick carries the clock across their deadline. This is how tests inject
/// operator actions into the middle of a session.
pub struct VirtualScheduler {
    clock: VirtualClock,
    interval: f64,
    alarms: Vec<Alarm>,
    last_tick: Option<f64>,
    sleeps: usize,
}

impl VirtualScheduler {
    pub fn new(refresh_rate: f64) -> Self {
        Self {
            clock: VirtualClock::new(),
            interval: frame_interval(refresh_rate),
            alarms: Vec::new(),
            last_tick: None,
            sleeps: 0,
        }
    }

    /// Handle on the simulated time, for timestamping sinks.
    pub fn virtual_clock(&self) -> VirtualClock {
        self.clock.clone()
    }

    pub fn at(&mut self, ms: f64, callback: impl FnMut() + 'static) {
        self.alarms.push(Alarm {
            at: ms,
            callback: Box::new(callback),
        });
        self.alarms
            .sort_by(|a, b| a.at.partial_cmp(&b.at).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Number of `sleep` calls so far.
    pub fn sleeps(&self) -> usize {
        self.sleeps
    }

    fn advance(&mut self, target: f64) {
        while let Some(alarm) = self.alarms.first() {
            if alarm.at > target {
                break;
            }
            let mut alarm = self.alarms.remove(0);
            self.clock.advance_to(alarm.at);
            (alarm.callback)();
        }
        self.clock.advance_to(target);
    }
}

impl Scheduler for VirtualScheduler {
    fn start(&mut self) {
        self.last_tick = None;
    }

    fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    fn sleep(&mut self, ms: f64) {
        self.sleeps += 1;
        let target = self.clock.now_ms() + ms.max(0.0);
        self.advance(target);
    }

    fn asap(&mut self, callback: &mut dyn FnMut()) {
        callback();
    }

    fn tick(&mut self) -> Tick {
        let scheduled = self.clock.now_ms() + self.interval;
        self.advance(scheduled);
        let elapsed = match self.last_tick {
            Some(previous) => scheduled - previous,
            None => self.interval,
        };
        self.last_tick = Some(scheduled);

        Tick {
            scheduled,
            called: scheduled,
            elapsed,
            fps: if elapsed > 0.0 { 1000.0 / elapsed } else { 0.0 },
        }
    }

    fn clock(&self) -> Box<dyn Clock> {
        Box::new(self.clock.clone())
    }
}
