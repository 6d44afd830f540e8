// src/speller/mod.rs

pub mod groups;
pub mod sequencer;
pub mod session;
pub mod timing;

pub use groups::{partition, GroupAssignment};
pub use sequencer::TrialSequencer;
pub use session::{SessionStatus, Speller, StopHandle};
