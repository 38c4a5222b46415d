//! Prints gesture changes without opening a window.
//!
//! Usage: landmark_probe [config.json|-] [recording.jsonl]
//! `-` or no config path uses the defaults. With a recording the frames are
//! replayed once, otherwise frames are read live from the configured broker.

use anyhow::{Context, Result};
use log::*;
use pose_navigator::config::NavigatorConfig;
use pose_navigator::controller::ControllerEvent;
use pose_navigator::gesture::GrabVector;
use pose_navigator::session::{Session, Step};
use pose_navigator::source::{LandmarkSource, MqttLandmarkSource, ReplaySource};
use simplelog::{Config, LevelFilter, TermLogger, TerminalMode};
use std::thread::sleep;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(30);

fn report(step: &Step) {
    if let Some(symbol) = step.symbol_changed {
        println!("symbol: {}", symbol);
    }
    if let Some(movement) = step.movement_changed {
        println!("movement: {}", movement);
    }
    for event in &step.events {
        if let ControllerEvent::ModeChanged(mode) = event {
            println!("mode: {}", mode);
        }
    }
}

fn start<S: LandmarkSource>(source: S, config: &NavigatorConfig) -> Result<Session<S>> {
    Ok(Session::new(
        source,
        config.gesture.clone(),
        config.controller.clone(),
        Vec::new(),
    )?)
}

fn main() -> Result<()> {
    TermLogger::init(LevelFilter::Info, Config::default(), TerminalMode::Mixed)?;
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) if path != "-" => NavigatorConfig::load(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        _ => NavigatorConfig::default(),
    };

    if let Some(path) = args.next() {
        let source = ReplaySource::open(&path)
            .with_context(|| format!("Failed to open recording {}", path))?;
        let frames = source.remaining();
        let mut session = start(source, &config)?;
        for _ in 0..frames {
            report(&session.step(GrabVector::default(), TICK));
        }
        session.stop();
        info!("Replayed {} frames from {}", frames, path);
        return Ok(());
    }

    let source = MqttLandmarkSource::connect(&config.mqtt)?;
    let mut session = start(source, &config)?;
    loop {
        sleep(TICK);
        report(&session.step(GrabVector::default(), TICK));
    }
}
