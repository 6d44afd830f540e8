// src/flicker/mod.rs

pub mod noise_tagging;
pub mod ssvep;

use rand::RngCore;
use serde_json::json;
use tracing::{debug, info};

use crate::config::{FlickerConfig, ParadigmKind};
use crate::error::Result;
use crate::io::{EventChannel, EventSink};
use crate::scheduler::{Scheduler, Tick};
use crate::speller::timing;
use crate::surface::Surface;

use noise_tagging::NoiseTagging;
use ssvep::Ssvep;

const HIGHLIGHT_CLASS: &str = "highlight";

// PARADIGM COMPONENT ----------------------------------------------------------

/// Stimulation strategy driven frame by frame by a [`Flicker`].
pub trait Paradigm {
    /// Called once at construction with the grid element ids in layout order.
    fn init(&mut self, config: &FlickerConfig, ids: &[String]);

    fn start(&mut self, now: f64);

    /// Halts stimulation and clears every element it painted.
    fn stop(&mut self, surface: &mut dyn Surface);

    fn on_tick(&mut self, tick: &Tick, surface: &mut dyn Surface);

    fn name(&self) -> &'static str;
}

pub fn make_paradigm(kind: ParadigmKind) -> Box<dyn Paradigm> {
    match kind {
        ParadigmKind::Ssvep => Box::new(Ssvep::new()),
        ParadigmKind::NoiseTagging => Box::new(NoiseTagging::new()),
    }
}

/// Ids of the flicker grid cells, row by row.
pub fn cell_ids(rows: usize, columns: usize) -> Vec<String> {
    (0..rows)
        .flat_map(|row| (0..columns).map(move |column| format!("cell_{}_{}", row, column)))
        .collect()
}

// -----------------------------------------------------------------------------
// FLICKER STIMULATOR
// -----------------------------------------------------------------------------

/// Visual flicker stimulation (SSVEP or noise tagging) with a guided
/// calibration sequence.
pub struct Flicker {
    config: FlickerConfig,
    paradigm: Box<dyn Paradigm>,
    io: EventChannel,
    scheduler: Box<dyn Scheduler>,
    surface: Box<dyn Surface>,
    rng: Box<dyn RngCore>,
    running: bool,
}

impl Flicker {
    pub fn new(
        config: &FlickerConfig,
        mut scheduler: Box<dyn Scheduler>,
        surface: Box<dyn Surface>,
        rng: Box<dyn RngCore>,
    ) -> Result<Self> {
        config.validate()?;

        let mut paradigm = make_paradigm(config.paradigm);
        paradigm.init(config, &cell_ids(config.rows, config.columns));
        info!(paradigm = paradigm.name(), "Flicker initialised");

        scheduler.start();
        let io = EventChannel::new(scheduler.clock());
        Ok(Self {
            config: config.clone(),
            paradigm,
            io,
            scheduler,
            surface,
            rng,
            running: false,
        })
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.io.add_sink(sink);
    }

    pub fn connect(&mut self) {
        self.io.connect();
    }

    pub fn paradigm(&self) -> &'static str {
        self.paradigm.name()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        let now = self.scheduler.now_ms();
        self.paradigm.start(now);
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.paradigm.stop(&mut *self.surface);
        self.running = false;
    }

    /// Drives the paradigm for `duration` ms, one tick per frame.
    pub fn run_for(&mut self, duration: f64) {
        let end = self.scheduler.now_ms() + duration;
        while self.scheduler.now_ms() < end {
            let tick = self.scheduler.tick();
            if self.running {
                self.paradigm.on_tick(&tick, &mut *self.surface);
            }
        }
    }

    /// Pauses stimulation and highlights `id` so the subject knows where to
    /// look, then resumes.
    pub fn highlight(&mut self, id: &str) {
        self.stop();
        self.surface.add_class(id, HIGHLIGHT_CLASS);
        self.scheduler.sleep(self.config.highlight_duration);
        self.surface.remove_class(id, HIGHLIGHT_CLASS);
        self.start();
    }

    /// Baseline, then every target in random order for each round.
    pub fn calibrate(&mut self) {
        let calibration = self.config.calibration.clone();
        info!(rounds = calibration.rounds, "Flicker calibration begins");

        self.io.event("calibration_starts", None);
        self.io.event("calibration-baseline_starts", None);
        self.scheduler.sleep(calibration.baseline_duration);
        self.io.event("calibration-baseline_stops", None);

        let mut ids: Vec<String> = self.config.targets.keys().cloned().collect();
        for round in 0..calibration.rounds {
            timing::shuffle(&mut *self.rng, &mut ids);
            debug!(round, order = ?ids, "Calibration round");
            for id in &ids {
                let frequency = self.config.targets.get(id).copied().unwrap_or(0.0);
                let meta = json!({ "id": id, "frequency": frequency });
                self.highlight(id);
                self.io.event("calibration-focus_starts", Some(meta.clone()));
                self.run_for(calibration.focus_duration);
                self.io.event("calibration-focus_stops", Some(meta));
            }
        }

        self.io.event("calibration_stops", None);
        self.stop();
        info!("Flicker calibration ends");
    }

    pub fn close(&mut self) {
        self.stop();
        self.io.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::EventRecorder;
    use crate::scheduler::VirtualScheduler;
    use crate::surface::ElementSurface;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn flicker(config: &FlickerConfig) -> (Flicker, EventRecorder, ElementSurface) {
        let surface = ElementSurface::flicker_grid(config.rows, config.columns, &config.class);
        let mut flicker = Flicker::new(
            config,
            Box::new(VirtualScheduler::new(config.refresh_rate)),
            Box::new(surface.clone()),
            Box::new(StdRng::seed_from_u64(1)),
        )
        .unwrap();
        let recorder = EventRecorder::new();
        flicker.add_sink(Box::new(recorder.clone()));
        (flicker, recorder, surface)
    }

    #[test]
    fn cell_ids_are_row_major() {
        assert_eq!(
            cell_ids(2, 2),
            vec!["cell_0_0", "cell_0_1", "cell_1_0", "cell_1_1"]
        );
    }

    #[test]
    fn paradigm_is_selected_from_config() {
        assert_eq!(make_paradigm(ParadigmKind::Ssvep).name(), "ssvep");
        assert_eq!(make_paradigm(ParadigmKind::NoiseTagging).name(), "noise_tagging");
    }

    #[test]
    fn no_ticks_reach_the_paradigm_until_started() {
        let config = FlickerConfig::default();
        let (mut flicker, _, surface) = flicker(&config);
        flicker.run_for(200.0);
        assert!(surface.changes().is_empty());

        flicker.start();
        flicker.run_for(200.0);
        assert!(!surface.changes().is_empty());

        flicker.stop();
        for id in surface.ids() {
            assert_eq!(surface.background(&id), None);
        }
    }

    #[test]
    fn highlight_pauses_stimulation() {
        let config = FlickerConfig::default();
        let (mut flicker, _, surface) = flicker(&config);
        flicker.highlight("cell_1_1");
        assert!(flicker.is_running());
        assert!(!surface.has_class("cell_1_1", "highlight"));
        assert!(surface.changes().contains(&crate::surface::Change::AddClass {
            id: "cell_1_1".into(),
            class: "highlight".into()
        }));
    }

    #[test]
    fn calibration_visits_every_target_each_round() {
        let mut config = FlickerConfig::default();
        config.calibration.focus_duration = 500.0;
        config.calibration.rounds = 2;
        config.highlight_duration = 100.0;
        let (mut flicker, recorder, _) = flicker(&config);

        flicker.calibrate();

        let labels = recorder.labels();
        assert_eq!(labels[0], "calibration_starts");
        assert_eq!(labels[1], "calibration-baseline_starts");
        assert_eq!(labels[2], "calibration-baseline_stops");
        assert_eq!(labels.last().unwrap(), "calibration_stops");
        assert_eq!(recorder.count("calibration-focus_starts"), 10);
        assert_eq!(recorder.count("calibration-focus_stops"), 10);
        assert!(!flicker.is_running());

        let events = recorder.events();
        let mut first_round: Vec<String> = events
            .iter()
            .filter(|e| e.label == "calibration-focus_starts")
            .take(5)
            .map(|e| e.field("id").unwrap().as_str().unwrap().to_string())
            .collect();
        first_round.sort();
        let mut expected: Vec<String> = config.targets.keys().cloned().collect();
        expected.sort();
        assert_eq!(first_round, expected);

        let focus = events
            .iter()
            .find(|e| e.label == "calibration-focus_starts")
            .unwrap();
        let id = focus.field("id").unwrap().as_str().unwrap();
        assert_eq!(
            focus.field("frequency").unwrap().as_f64().unwrap(),
            config.targets[id]
        );
    }
}
