use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::thread;

use colored::Colorize;
use stimulus_engine::config::{load_config, Config};
use stimulus_engine::error::Result;
use stimulus_engine::flicker::Flicker;
use stimulus_engine::io::{ConsoleEvents, EventRecorder};
use stimulus_engine::scheduler::{Clock, FrameScheduler, Scheduler, VirtualScheduler};
use stimulus_engine::speller::Speller;
use stimulus_engine::surface::ElementSurface;
use stimulus_engine::session_rng;
use stimulus_engine::utils::log::{event_log, init_logging};

const USAGE: &str = "usage: stimulus-engine <config.yaml> \
<train [TARGETS] | test | dry-run [TARGETS] | flicker-calibrate | flicker SECONDS>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    }

    let config = match load_config(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging.level);

    let extra = args.get(3).map(String::as_str);
    let result = match args[2].as_str() {
        "train" => train(&config, extra),
        "test" => test(&config),
        "dry-run" => dry_run(&config, extra),
        "flicker-calibrate" => flicker_calibrate(&config),
        "flicker" => match extra.and_then(|s| s.parse::<f64>().ok()) {
            Some(seconds) => flicker(&config, seconds),
            None => {
                eprintln!("{}", USAGE);
                return ExitCode::FAILURE;
            }
        },
        _ => {
            eprintln!("Invalid command {:?}\n{}", args[2], USAGE);
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

// -----------------------------------------------------------------------------
// SPELLER
// -----------------------------------------------------------------------------

fn build_speller(config: &Config, scheduler: Box<dyn Scheduler>) -> Result<Speller> {
    let speller_config = &config.speller;
    let surface = ElementSurface::speller_grid(
        &speller_config.symbol_chars(),
        speller_config.columns,
        &speller_config.classes,
    );
    surface.set_live(config.logging.render);

    let mut speller = Speller::new(
        speller_config,
        scheduler,
        Box::new(surface),
        session_rng(config.seed),
    )?;
    if let Some(log) = event_log(&config.logging)? {
        speller.add_sink(log);
    }
    if !config.logging.render {
        speller.add_sink(Box::new(ConsoleEvents));
    }
    speller.on("cue", |_| {
        let _ = ring_bell(&mut std::io::stdout().lock());
    });
    Ok(speller)
}

/// Audible cue. Flushed at once since the terminal may be line-buffered.
fn ring_bell(out: &mut impl Write) -> std::io::Result<()> {
    out.write_all(b"\x07")?;
    out.flush()
}

fn train(config: &Config, targets: Option<&str>) -> Result<()> {
    let scheduler = FrameScheduler::new(config.speller.refresh_rate);
    let mut speller = build_speller(config, Box::new(scheduler))?;
    speller.connect();
    speller.train(targets)?;
    speller.close();
    Ok(())
}

fn test(config: &Config) -> Result<()> {
    let scheduler = FrameScheduler::new(config.speller.refresh_rate);
    let mut speller = build_speller(config, Box::new(scheduler))?;
    speller.connect();

    let handle = speller.stop_handle();
    println!("{}", "Press Enter to stop after the current round.".yellow());
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        handle.stop();
    });

    speller.test();
    speller.close();
    Ok(())
}

/// Runs a training session on simulated time and reports what it emitted.
fn dry_run(config: &Config, targets: Option<&str>) -> Result<()> {
    let mut config = config.clone();
    config.logging.render = false;

    let scheduler = VirtualScheduler::new(config.speller.refresh_rate);
    let clock = scheduler.virtual_clock();
    let surface = ElementSurface::speller_grid(
        &config.speller.symbol_chars(),
        config.speller.columns,
        &config.speller.classes,
    );
    let mut speller = Speller::new(
        &config.speller,
        Box::new(scheduler),
        Box::new(surface),
        session_rng(config.seed),
    )?;
    let recorder = EventRecorder::new();
    speller.add_sink(Box::new(recorder.clone()));
    if let Some(log) = event_log(&config.logging)? {
        speller.add_sink(log);
    }

    speller.connect();
    speller.train(targets)?;
    speller.close();

    println!(
        "{} events, {} flashes, {:.1} s of simulated time",
        recorder.len().to_string().green(),
        recorder.count("flash_begins").to_string().green(),
        clock.now_ms() / 1000.0
    );
    Ok(())
}

// -----------------------------------------------------------------------------
// FLICKER
// -----------------------------------------------------------------------------

fn build_flicker(config: &Config) -> Result<Flicker> {
    let flicker_config = &config.flicker;
    let surface = ElementSurface::flicker_grid(
        flicker_config.rows,
        flicker_config.columns,
        &flicker_config.class,
    );
    surface.set_live(config.logging.render);

    let mut flicker = Flicker::new(
        flicker_config,
        Box::new(FrameScheduler::new(flicker_config.refresh_rate)),
        Box::new(surface),
        session_rng(config.seed),
    )?;
    if let Some(log) = event_log(&config.logging)? {
        flicker.add_sink(log);
    }
    if !config.logging.render {
        flicker.add_sink(Box::new(ConsoleEvents));
    }
    flicker.connect();
    Ok(flicker)
}

fn flicker_calibrate(config: &Config) -> Result<()> {
    let mut flicker = build_flicker(config)?;
    flicker.calibrate();
    flicker.close();
    Ok(())
}

fn flicker(config: &Config, seconds: f64) -> Result<()> {
    let mut flicker = build_flicker(config)?;
    flicker.start();
    flicker.run_for(seconds * 1000.0);
    flicker.close();
    Ok(())
}
