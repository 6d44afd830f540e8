use colored::Colorize;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::rc::Rc;

use super::{Event, EventSink};
use crate::error::Result;

// RECORDER --------------------------------------------------------------------

/// In-memory event log. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|event| event.label.clone())
            .collect()
    }

    pub fn count(&self, label: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.label == label)
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for EventRecorder {
    fn write(&mut self, event: &Event) -> Result<()> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}

// CSV LOG ---------------------------------------------------------------------

/// Appends events to a CSV file as `timestamp,label,data`.
///
/// The header row is only written when the file is new or empty.
pub struct CsvEventLog {
    writer: csv::Writer<File>,
}

impl CsvEventLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(["timestamp", "label", "data"])?;
        }

        Ok(Self { writer })
    }
}

impl EventSink for CsvEventLog {
    fn write(&mut self, event: &Event) -> Result<()> {
        let data = event
            .data
            .as_ref()
            .map(|value| value.to_string())
            .unwrap_or_default();
        self.writer.write_record([
            format!("{:.3}", event.timestamp),
            event.label.clone(),
            data,
        ])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for CsvEventLog {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

// CONSOLE ---------------------------------------------------------------------

/// Prints one coloured line per event.
#[derive(Debug, Default)]
pub struct ConsoleEvents;

impl EventSink for ConsoleEvents {
    fn write(&mut self, event: &Event) -> Result<()> {
        let label = if event.label.ends_with("_begins") || event.label.ends_with("_starts") {
            event.label.green()
        } else if event.label.ends_with("_ends") || event.label.ends_with("_stops") {
            event.label.red()
        } else {
            event.label.white()
        };

        match &event.data {
            Some(data) => println!("{:>12.1}  {} {}", event.timestamp, label, data.to_string().dimmed()),
            None => println!("{:>12.1}  {}", event.timestamp, label),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(timestamp: f64, label: &str, data: Option<serde_json::Value>) -> Event {
        Event {
            timestamp,
            label: label.to_string(),
            data,
        }
    }

    #[test]
    fn recorder_clones_share_storage() {
        let recorder = EventRecorder::new();
        let mut sink = recorder.clone();
        sink.write(&event(1.0, "focus_begins", None)).unwrap();
        sink.write(&event(2.0, "focus_ends", None)).unwrap();

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.count("focus_ends"), 1);
        recorder.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn csv_log_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("events.csv");

        {
            let mut log = CsvEventLog::open(&path).unwrap();
            log.write(&event(10.0, "flash_begins", Some(json!({ "group": 1 }))))
                .unwrap();
            log.flush().unwrap();
        }
        {
            let mut log = CsvEventLog::open(&path).unwrap();
            log.write(&event(20.5, "flash_ends", None)).unwrap();
        }

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "flash_begins");
        assert_eq!(&rows[0][2], r#"{"group":1}"#);
        assert_eq!(&rows[1][0], "20.500");
        assert_eq!(&rows[1][2], "");
    }
}
