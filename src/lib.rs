//! Stimulus presentation for BCI experiments: a P300 speller trial engine and
//! SSVEP / noise-tagging flicker, driven by a cooperative frame scheduler and
//! reporting timestamped events.

pub mod config;
pub mod error;
pub mod flicker;
pub mod io;
pub mod scheduler;
pub mod speller;
pub mod surface;
pub mod utils;

pub use config::{load_config, save_config, Config};
pub use error::{ConfigError, EngineError};
pub use flicker::Flicker;
pub use speller::{SessionStatus, Speller, StopHandle};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Session RNG: seeded when a seed is configured, from entropy otherwise.
pub fn session_rng(seed: Option<u64>) -> Box<dyn RngCore> {
    match seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(StdRng::from_entropy()),
    }
}
