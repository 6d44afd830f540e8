use rand::RngCore;
use serde_json::{json, Value};
use tracing::{debug, info, trace};

use super::groups::GroupAssignment;
use super::session::{SessionStatus, StatusCell};
use super::timing;
use crate::config::{ClassesConfig, DurationsConfig};
use crate::io::EventChannel;
use crate::scheduler::Scheduler;
use crate::surface::{symbol_id, Surface};

// -----------------------------------------------------------------------------
// TRIAL SEQUENCER
// -----------------------------------------------------------------------------

/// Runs focus cues, flashes, rounds and blocks on the speller grid.
///
/// Owns the session status and the current target. Every wait goes through
/// the scheduler, so a flash is never interrupted once it has begun.
pub struct TrialSequencer {
    symbols: Vec<char>,
    groups: GroupAssignment,
    classes: ClassesConfig,
    durations: DurationsConfig,
    status: StatusCell,
    target: Option<usize>,
    pub(crate) io: EventChannel,
    pub(crate) scheduler: Box<dyn Scheduler>,
    surface: Box<dyn Surface>,
    rng: Box<dyn RngCore>,
}

impl TrialSequencer {
    pub fn new(
        symbols: Vec<char>,
        groups: GroupAssignment,
        classes: ClassesConfig,
        durations: DurationsConfig,
        io: EventChannel,
        scheduler: Box<dyn Scheduler>,
        surface: Box<dyn Surface>,
        rng: Box<dyn RngCore>,
    ) -> Self {
        Self {
            symbols,
            groups,
            classes,
            durations,
            status: StatusCell::new(SessionStatus::Ready),
            target: None,
            io,
            scheduler,
            surface,
            rng,
        }
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn groups(&self) -> &GroupAssignment {
        &self.groups
    }

    pub fn durations(&self) -> &DurationsConfig {
        &self.durations
    }

    pub fn status(&self) -> SessionStatus {
        self.status.get()
    }

    pub fn set_status(&mut self, status: SessionStatus) {
        debug!(from = %self.status.get(), to = %status, "Session status change");
        self.status.set(status);
    }

    pub(crate) fn status_cell(&self) -> StatusCell {
        self.status.clone()
    }

    pub fn target(&self) -> Option<usize> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<usize>) {
        self.target = target;
    }

    /// Index of `symbol` in the symbol set.
    pub fn symbol_index(&self, symbol: char) -> Option<usize> {
        self.symbols.iter().position(|&s| s == symbol)
    }

    pub fn event(&mut self, label: &str, data: Option<Value>) {
        self.io.event(label, data);
    }

    pub fn sleep(&mut self, ms: f64) {
        self.scheduler.sleep(ms);
    }

    // FOCUS ---------------------------------------------------------------

    /// Marks `symbol` as focused for `duration` ms. Emits nothing; the
    /// caller brackets it with focus events.
    pub fn focus(&mut self, symbol: usize, duration: f64) {
        let id = symbol_id(&self.classes.symbol, symbol);
        self.surface.add_class(&id, &self.classes.focus);
        self.scheduler.sleep(duration);
        self.surface.remove_class(&id, &self.classes.focus);
    }

    // FLASH ---------------------------------------------------------------

    /// Flashes every symbol of `group` for `duration` ms.
    ///
    /// The class change and `flash_begins` happen in the same scheduler
    /// callback. `includes_target` is null while testing since the target is
    /// unknown to the classifier.
    pub fn flash(&mut self, group: usize, duration: f64) {
        let includes_target = match self.status.get() {
            SessionStatus::Testing => Value::Null,
            _ => Value::Bool(
                self.target
                    .map_or(false, |target| self.groups.contains(group, target)),
            ),
        };
        let ids: Vec<String> = self
            .groups
            .group(group)
            .iter()
            .map(|&symbol| symbol_id(&self.classes.symbol, symbol))
            .collect();

        trace!(group, duration, "flash");
        {
            let Self {
                scheduler,
                surface,
                io,
                classes,
                ..
            } = self;
            scheduler.asap(&mut || {
                for id in &ids {
                    surface.add_class(id, &classes.flash);
                }
                io.event(
                    "flash_begins",
                    Some(json!({ "group": group, "includes_target": includes_target })),
                );
            });
        }

        self.scheduler.sleep(duration);
        for id in &ids {
            self.surface.remove_class(id, &self.classes.flash);
        }
        self.io.event("flash_ends", None);
    }

    // ROUND ---------------------------------------------------------------

    /// Flashes every group once in random order. Each flash is followed by
    /// an inter-flash gap, the last one included.
    pub fn round(&mut self) {
        let mut order: Vec<usize> = (0..self.groups.len()).collect();
        timing::shuffle(&mut *self.rng, &mut order);

        self.io.event("round_begins", None);
        for group in order {
            let flash = timing::sample(&mut *self.rng, &self.durations.flash);
            self.flash(group, flash);
            let gap = timing::sample(&mut *self.rng, &self.durations.inter_flash);
            trace!(gap, "inter-flash gap");
            self.scheduler.sleep(gap);
        }
        self.io.event("round_ends", None);
    }

    // BLOCK ---------------------------------------------------------------

    /// Runs `repetitions` rounds back to back and returns how many ran.
    ///
    /// A block started while testing stops at the next round boundary once
    /// the status leaves `Testing`; the round in flight always completes.
    pub fn block(&mut self, repetitions: usize) -> usize {
        let cancellable = self.status.get() == SessionStatus::Testing;
        let mut completed = 0;
        for _ in 0..repetitions {
            self.round();
            completed += 1;
            if cancellable && self.status.get() != SessionStatus::Testing {
                info!(completed, repetitions, "Stop requested, ending block early");
                break;
            }
        }
        completed
    }
}
