// src/io/mod.rs

pub mod sinks;

pub use sinks::{ConsoleEvents, CsvEventLog, EventRecorder};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::scheduler::Clock;

/// A timestamped experiment event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub timestamp: f64,
    pub label: String,
    pub data: Option<Value>,
}

impl Event {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(key))
    }
}

// SINK COMPONENT --------------------------------------------------------------

/// Destination for emitted events (a transport, a file, the console...).
pub trait EventSink {
    /// Called once when the channel connects.
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, event: &Event) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// CHANNEL COMPONENT -----------------------------------------------------------

/// Fire-and-forget event channel.
///
/// Stamps every event with its clock and forwards it to all sinks. A failing
/// sink is logged and skipped; it never interrupts the caller.
pub struct EventChannel {
    clock: Box<dyn Clock>,
    sinks: Vec<Box<dyn EventSink>>,
    connected: bool,
}

impl EventChannel {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            sinks: Vec::new(),
            connected: false,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.add_sink(Box::new(sink));
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Connect every sink. Returns false if the channel was already connected.
    pub fn connect(&mut self) -> bool {
        if self.connected {
            return false;
        }
        for sink in &mut self.sinks {
            if let Err(e) = sink.connect() {
                warn!("Event sink failed to connect: {}", e);
            }
        }
        self.connected = true;
        true
    }

    pub fn event(&mut self, label: &str, data: Option<Value>) {
        let event = Event {
            timestamp: self.clock.now_ms(),
            label: label.to_string(),
            data,
        };
        debug!(label = %event.label, timestamp = event.timestamp, "event");

        for sink in &mut self.sinks {
            if let Err(e) = sink.write(&event) {
                warn!("Event sink dropped {}: {}", event.label, e);
            }
        }
    }

    pub fn flush(&mut self) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                warn!("Event sink failed to flush: {}", e);
            }
        }
    }
}
