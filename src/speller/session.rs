use rand::RngCore;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::groups::{partition, GroupAssignment};
use super::sequencer::TrialSequencer;
use crate::config::SpellerConfig;
use crate::error::{EngineError, Result};
use crate::io::{EventChannel, EventSink};
use crate::scheduler::Scheduler;
use crate::surface::Surface;

// -----------------------------------------------------------------------------
// SESSION STATUS
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Ready,
    Calibrating,
    Testing,
    Idle,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Ready => "ready",
            SessionStatus::Calibrating => "calibrating",
            SessionStatus::Testing => "testing",
            SessionStatus::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// Shared session status. The sequencer polls it at round and block
/// boundaries; a `StopHandle` flips it from another thread.
#[derive(Debug, Clone)]
pub(crate) struct StatusCell(Arc<Mutex<SessionStatus>>);

impl StatusCell {
    pub(crate) fn new(status: SessionStatus) -> Self {
        Self(Arc::new(Mutex::new(status)))
    }

    pub(crate) fn get(&self) -> SessionStatus {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set(&self, status: SessionStatus) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// Testing -> Idle. Any other status is left alone.
    fn stop(&self) -> bool {
        let mut status = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if *status == SessionStatus::Testing {
            *status = SessionStatus::Idle;
            true
        } else {
            false
        }
    }
}

/// Cancellation token for a running test session.
///
/// Stopping is cooperative: the flash and round in progress finish, then
/// the block and the test loop wind down, emitting their closing events.
#[derive(Debug, Clone)]
pub struct StopHandle {
    status: StatusCell,
}

impl StopHandle {
    /// Returns true if a test session was running.
    pub fn stop(&self) -> bool {
        self.status.stop()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.get()
    }
}

type Listener = Box<dyn FnMut(Option<char>)>;

// -----------------------------------------------------------------------------
// SPELLER (SESSION CONTROLLER)
// -----------------------------------------------------------------------------

/// P300 speller: calibration (training) and free spelling (testing) sessions
/// on top of a [`TrialSequencer`].
///
/// `train` and `test` must not run at the same time; the status field is the
/// only guard.
pub struct Speller {
    sequencer: TrialSequencer,
    columns: usize,
    repetitions: usize,
    default_targets: String,
    listeners: Vec<(String, Listener)>,
}

impl Speller {
    /// Validates `config` and draws the flash groups.
    pub fn new(
        config: &SpellerConfig,
        scheduler: Box<dyn Scheduler>,
        surface: Box<dyn Surface>,
        mut rng: Box<dyn RngCore>,
    ) -> Result<Self> {
        config.validate()?;
        let symbols = config.symbol_chars();
        let groups = partition(
            &mut *rng,
            symbols.len(),
            config.groups,
            config.partition_attempts,
        )?;
        Ok(Self::with_assignment(config, groups, scheduler, surface, rng))
    }

    /// Builds a speller around an existing group layout.
    pub fn with_assignment(
        config: &SpellerConfig,
        groups: GroupAssignment,
        mut scheduler: Box<dyn Scheduler>,
        surface: Box<dyn Surface>,
        rng: Box<dyn RngCore>,
    ) -> Self {
        scheduler.start();
        let io = EventChannel::new(scheduler.clock());
        let sequencer = TrialSequencer::new(
            config.symbol_chars(),
            groups,
            config.classes.clone(),
            config.durations.clone(),
            io,
            scheduler,
            surface,
            rng,
        );

        Self {
            sequencer,
            columns: config.columns,
            repetitions: config.repetitions,
            default_targets: config.targets.clone(),
            listeners: Vec::new(),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sequencer.io.add_sink(sink);
    }

    pub fn status(&self) -> SessionStatus {
        self.sequencer.status()
    }

    /// Current training target, if any. Always `None` while testing.
    pub fn target(&self) -> Option<char> {
        self.sequencer
            .target()
            .and_then(|index| self.sequencer.symbols().get(index).copied())
    }

    pub fn groups(&self) -> &GroupAssignment {
        self.sequencer.groups()
    }

    pub fn sequencer_mut(&mut self) -> &mut TrialSequencer {
        &mut self.sequencer
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            status: self.sequencer.status_cell(),
        }
    }

    // LOCAL TRIGGERS --------------------------------------------------------

    /// Registers a local listener for `label`. Listeners receive the target
    /// symbol when there is one (`focus_begins`). The `cue` label fires
    /// before each baseline, each training target and each test block.
    pub fn on(&mut self, label: &str, listener: impl FnMut(Option<char>) + 'static) {
        self.listeners.push((label.to_string(), Box::new(listener)));
    }

    fn trigger(&mut self, label: &str, symbol: Option<char>) {
        for (name, listener) in &mut self.listeners {
            if name.as_str() == label {
                listener(symbol);
            }
        }
    }

    // LIFECYCLE -------------------------------------------------------------

    /// Connects the event channel and announces the session layout.
    pub fn connect(&mut self) {
        if !self.sequencer.io.connect() {
            return;
        }
        let symbols: String = self.sequencer.symbols().iter().collect();
        let groups = self.sequencer.groups().groups().to_vec();
        let data = json!({
            "symbols": symbols,
            "columns": self.columns,
            "groups": groups,
            "repetitions": self.repetitions,
        });
        self.sequencer.event("session_begins", Some(data));
    }

    pub fn close(&mut self) {
        self.sequencer.event("session_ends", None);
        self.sequencer.io.flush();
    }

    // TRAINING --------------------------------------------------------------

    /// Calibration run: two baselines, then one focus cue and one block per
    /// target character. Defaults to the configured training string.
    pub fn train(&mut self, targets: Option<&str>) -> Result<()> {
        let targets = targets
            .unwrap_or(&self.default_targets)
            .to_uppercase();
        let indices = targets
            .chars()
            .map(|c| {
                self.sequencer
                    .symbol_index(c)
                    .ok_or(EngineError::UnknownTarget(c))
            })
            .collect::<Result<Vec<usize>>>()?;

        if matches!(
            self.status(),
            SessionStatus::Calibrating | SessionStatus::Testing
        ) {
            warn!(status = %self.status(), "Training started while another session is active");
        }

        info!(targets = %targets, "Calibration begins");
        self.sequencer.event("calibration_begins", None);
        self.sequencer.set_status(SessionStatus::Calibrating);

        let durations = self.sequencer.durations().clone();
        self.baseline("baseline-eyes-open", durations.baseline_eyes_open);
        self.baseline("baseline-eyes-closed", durations.baseline_eyes_closed);

        self.sequencer
            .event("training_begins", Some(json!({ "targets": targets })));
        for (symbol, index) in targets.chars().zip(indices) {
            self.sequencer.set_target(Some(index));
            self.trigger("cue", Some(symbol));
            self.trigger("focus_begins", Some(symbol));
            self.sequencer
                .event("focus_begins", Some(json!({ "target": index })));
            self.sequencer.focus(index, durations.focus);
            self.sequencer.event("focus_ends", None);

            self.sequencer.sleep(durations.inter_block);
            self.sequencer
                .event("block_begins", Some(json!({ "target": index })));
            self.sequencer.block(self.repetitions);
            self.sequencer.event("block_ends", None);
        }
        self.sequencer.set_target(None);

        self.trigger("training_ends", None);
        self.sequencer.event("training_ends", None);
        self.sequencer.set_status(SessionStatus::Idle);
        self.sequencer.event("calibration_ends", None);
        info!("Calibration ends");
        Ok(())
    }

    fn baseline(&mut self, phase: &str, duration: f64) {
        let begins = format!("{}_begins", phase);
        self.trigger("cue", None);
        self.trigger(&begins, None);
        self.sequencer.event(&begins, None);
        info!(phase, duration, "Baseline");
        self.sequencer.sleep(duration);
        self.sequencer.event(&format!("{}_ends", phase), None);
    }

    // TESTING ---------------------------------------------------------------

    /// Free spelling: blocks with no target until [`StopHandle::stop`] (or
    /// [`Speller::stop`]) moves the status away from `Testing`.
    pub fn test(&mut self) {
        if self.status() == SessionStatus::Calibrating {
            warn!("Testing started while calibration is active");
        }

        info!("Testing begins");
        self.sequencer.event("testing_begins", None);
        self.sequencer.set_target(None);
        self.sequencer.set_status(SessionStatus::Testing);

        let inter_block = self.sequencer.durations().inter_block;
        while self.status() == SessionStatus::Testing {
            self.trigger("cue", None);
            self.sequencer.sleep(inter_block);
            if self.status() != SessionStatus::Testing {
                break;
            }
            self.sequencer
                .event("block_begins", Some(json!({ "target": null })));
            self.sequencer.block(self.repetitions);
            self.sequencer.event("block_ends", None);
        }

        self.sequencer.event("testing_ends", None);
        info!("Testing ends");
    }

    /// Ends a test session after the round in progress.
    pub fn stop(&mut self) -> bool {
        self.stop_handle().stop()
    }
}
