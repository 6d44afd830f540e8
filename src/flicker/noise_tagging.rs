use super::Paradigm;
use crate::config::FlickerConfig;
use crate::scheduler::Tick;
use crate::surface::Surface;

/// Code-modulated stimulation: element `i` shows `codes[i][frame]`, the
/// frame index advancing with elapsed display frames and wrapping at the end
/// of the code.
pub struct NoiseTagging {
    ids: Vec<String>,
    codes: Vec<Vec<u8>>,
    color_on: String,
    color_off: String,
    interval: f64,
    max: usize,
    frame: usize,
    running: bool,
}

impl NoiseTagging {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            codes: Vec::new(),
            color_on: String::new(),
            color_off: String::new(),
            interval: 0.0,
            max: 0,
            frame: 0,
            running: false,
        }
    }

    pub fn frame(&self) -> usize {
        self.frame
    }
}

impl Default for NoiseTagging {
    fn default() -> Self {
        Self::new()
    }
}

impl Paradigm for NoiseTagging {
    fn init(&mut self, config: &FlickerConfig, ids: &[String]) {
        self.ids = ids.to_vec();
        self.codes = config.codes.clone();
        self.color_on = config.color_on.clone();
        self.color_off = config.color_off.clone();
        self.interval = 1000.0 / config.refresh_rate;
        self.max = self
            .codes
            .first()
            .map(|row| row.len().saturating_sub(1))
            .unwrap_or(0);
    }

    fn start(&mut self, _now: f64) {
        self.frame = 0;
        self.running = true;
    }

    fn stop(&mut self, surface: &mut dyn Surface) {
        self.running = false;
        for id in &self.ids {
            surface.set_background(id, None);
        }
    }

    fn on_tick(&mut self, tick: &Tick, surface: &mut dyn Surface) {
        if !self.running || self.codes.is_empty() {
            return;
        }
        let advance = if self.interval > 0.0 {
            (tick.elapsed / self.interval).round().max(0.0) as usize
        } else {
            1
        };
        self.frame = (self.frame + advance) % (self.max + 1);

        for (id, code) in self.ids.iter().zip(&self.codes) {
            let color = match code.get(self.frame) {
                Some(0) => &self.color_on,
                _ => &self.color_off,
            };
            surface.set_background(id, Some(color.as_str()));
        }
    }

    fn name(&self) -> &'static str {
        "noise_tagging"
    }
}
