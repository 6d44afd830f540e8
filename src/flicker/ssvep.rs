use tracing::warn;

use super::Paradigm;
use crate::config::FlickerConfig;
use crate::scheduler::Tick;
use crate::surface::Surface;

struct Target {
    id: String,
    /// Half a stimulation period (ms): one colour change per half period.
    interval: f64,
    next: f64,
    lit: bool,
}

/// Steady-state visual evoked potentials: every target with a positive
/// frequency alternates between two colours at that frequency.
pub struct Ssvep {
    targets: Vec<Target>,
    color_on: String,
    color_off: String,
    running: bool,
}

impl Ssvep {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            color_on: String::new(),
            color_off: String::new(),
            running: false,
        }
    }
}

impl Default for Ssvep {
    fn default() -> Self {
        Self::new()
    }
}

impl Paradigm for Ssvep {
    fn init(&mut self, config: &FlickerConfig, _ids: &[String]) {
        self.color_on = config.color_on.clone();
        self.color_off = config.color_off.clone();
        self.targets = config
            .targets
            .iter()
            .filter(|(_, frequency)| **frequency > 0.0)
            .map(|(id, &frequency)| {
                if frequency * 2.0 > config.refresh_rate {
                    warn!(id = %id, frequency, refresh_rate = config.refresh_rate,
                        "Frequency above half the refresh rate, it will alias");
                }
                Target {
                    id: id.clone(),
                    interval: 1000.0 / (frequency * 2.0),
                    next: 0.0,
                    lit: false,
                }
            })
            .collect();
    }

    fn start(&mut self, now: f64) {
        for target in &mut self.targets {
            target.next = now;
            target.lit = false;
        }
        self.running = true;
    }

    fn stop(&mut self, surface: &mut dyn Surface) {
        self.running = false;
        for target in &mut self.targets {
            target.lit = false;
            surface.set_background(&target.id, None);
        }
    }

    fn on_tick(&mut self, tick: &Tick, surface: &mut dyn Surface) {
        if !self.running {
            return;
        }
        for target in &mut self.targets {
            if tick.called + 1e-9 < target.next {
                continue;
            }
            target.lit = !target.lit;
            let color = if target.lit { &self.color_on } else { &self.color_off };
            surface.set_background(&target.id, Some(color.as_str()));

            target.next += target.interval;
            if target.next <= tick.called {
                // Fell behind by more than a half period; resync.
                target.next = tick.called + target.interval;
            }
        }
    }

    fn name(&self) -> &'static str {
        "ssvep"
    }
}
