// src/scheduler/mod.rs

pub mod realtime;
pub mod virtual_clock;

pub use realtime::{FrameScheduler, WallClock};
pub use virtual_clock::{VirtualClock, VirtualScheduler};

/// Source of millisecond timestamps for emitted events.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Timing information handed to frame callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Frame boundary the tick was scheduled for (ms).
    pub scheduled: f64,
    /// Time the tick was actually delivered (ms).
    pub called: f64,
    /// Time since the previous tick (ms).
    pub elapsed: f64,
    pub fps: f64,
}

// SCHEDULER COMPONENT ---------------------------------------------------------

/// The cooperative timing surface every stimulator runs on.
///
/// All suspension points in a session go through one of these methods, so a
/// single thread of control drives the whole experiment.
pub trait Scheduler {
    fn start(&mut self);

    fn now_ms(&self) -> f64;

    /// Suspend the caller for `ms` milliseconds.
    fn sleep(&mut self, ms: f64);

    /// Run `callback` on the next frame boundary. Visual mutations and the
    /// event describing them are issued from the same callback so that they
    /// land on the same frame.
    fn asap(&mut self, callback: &mut dyn FnMut());

    /// Wait for the next frame boundary.
    fn tick(&mut self) -> Tick;

    /// A clock reading the same time base as this scheduler.
    fn clock(&self) -> Box<dyn Clock>;
}

pub(crate) fn frame_interval(refresh_rate: f64) -> f64 {
    if refresh_rate > 0.0 {
        1000.0 / refresh_rate
    } else {
        0.0
    }
}
