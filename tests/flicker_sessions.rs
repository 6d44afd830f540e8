//! Flicker stimulation driven from a YAML configuration.

use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;
use stimulus_engine::config::{load_config, FlickerConfig};
use stimulus_engine::error::ConfigError;
use stimulus_engine::flicker::Flicker;
use stimulus_engine::io::EventRecorder;
use stimulus_engine::scheduler::VirtualScheduler;
use stimulus_engine::surface::{Change, ElementSurface};

fn flicker(config: &FlickerConfig) -> (Flicker, EventRecorder, ElementSurface) {
    let surface = ElementSurface::flicker_grid(config.rows, config.columns, &config.class);
    let mut flicker = Flicker::new(
        config,
        Box::new(VirtualScheduler::new(config.refresh_rate)),
        Box::new(surface.clone()),
        Box::new(StdRng::seed_from_u64(0)),
    )
    .unwrap();
    let recorder = EventRecorder::new();
    flicker.add_sink(Box::new(recorder.clone()));
    (flicker, recorder, surface)
}

fn backgrounds(surface: &ElementSurface, cell: &str) -> Vec<Option<String>> {
    surface
        .changes()
        .into_iter()
        .filter_map(|change| match change {
            Change::Background { id, color } if id == cell => Some(color),
            _ => None,
        })
        .collect()
}

#[test]
fn noise_tagging_runs_from_a_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flicker.yaml");
    fs::write(
        &path,
        "
flicker:
  paradigm: noise_tagging
  rows: 1
  columns: 2
  refresh_rate: 100
  color_on: red
  color_off: blue
  codes:
    - [0, 1, 1, 0]
    - [1, 1, 0, 0]
",
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    let (mut flicker, _, surface) = flicker(&config.flicker);
    assert_eq!(flicker.paradigm(), "noise_tagging");

    flicker.start();
    flicker.run_for(40.0);

    // Four 10 ms frames: the code index goes 1, 2, 3, 0.
    assert_eq!(
        backgrounds(&surface, "cell_0_0"),
        vec![
            Some("blue".to_string()),
            Some("blue".to_string()),
            Some("red".to_string()),
            Some("red".to_string()),
        ]
    );
    assert_eq!(surface.background("cell_0_1").as_deref(), Some("blue"));

    flicker.close();
    assert!(!flicker.is_running());
    assert_eq!(surface.background("cell_0_0"), None);
    assert_eq!(surface.background("cell_0_1"), None);
}

#[test]
fn ssvep_target_toggles_at_twice_its_frequency() {
    let config = FlickerConfig {
        refresh_rate: 60.0,
        targets: [("cell_0_0".to_string(), 10.0), ("cell_1_1".to_string(), 0.0)]
            .into_iter()
            .collect(),
        ..FlickerConfig::default()
    };
    let (mut flicker, _, surface) = flicker(&config);

    flicker.start();
    flicker.run_for(1000.0);

    let toggles = backgrounds(&surface, "cell_0_0").len();
    assert!((19..=21).contains(&toggles), "{} toggles in one second", toggles);
    assert!(backgrounds(&surface, "cell_1_1").is_empty());
}

#[test]
fn calibration_events_carry_target_frequencies() {
    let mut config = FlickerConfig::default();
    config.calibration.baseline_duration = 1000.0;
    config.calibration.focus_duration = 300.0;
    config.highlight_duration = 200.0;
    let (mut flicker, recorder, _) = flicker(&config);
    flicker.connect();

    flicker.calibrate();

    let events = recorder.events();
    let baseline = &events[1..3];
    assert_eq!(baseline[1].timestamp - baseline[0].timestamp, 1000.0);

    for pair in events
        .iter()
        .filter(|e| e.label.starts_with("calibration-focus"))
        .collect::<Vec<_>>()
        .chunks(2)
    {
        assert_eq!(pair[0].label, "calibration-focus_starts");
        assert_eq!(pair[1].label, "calibration-focus_stops");
        assert_eq!(pair[0].data, pair[1].data);
        let id = pair[0].field("id").and_then(|v| v.as_str()).unwrap();
        let frequency = pair[0].field("frequency").and_then(|v| v.as_f64()).unwrap();
        assert_eq!(frequency, config.targets[id]);
        assert!(pair[1].timestamp - pair[0].timestamp >= 300.0);
    }
}

#[test]
fn invalid_config_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");

    fs::write(&path, "speller: { groups: 1 }").unwrap();
    assert!(matches!(
        load_config(&path),
        Err(ConfigError::Invalid { field: "speller.groups", .. })
    ));

    fs::write(&path, "flicker: { paradigm: noise_tagging }").unwrap();
    assert!(matches!(
        load_config(&path),
        Err(ConfigError::Invalid { field: "flicker.codes", .. })
    ));

    fs::write(&path, "speller: [not, a, map]").unwrap();
    assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));

    assert!(matches!(
        load_config(dir.path().join("missing.yaml")),
        Err(ConfigError::Read { .. })
    ));
}
