// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` loop preview - headless runner for loop timelines
//!
//! Loads a timeline document, plays it through a [`PlaybackDriver`] at a
//! fixed frame rate and reports every clip action that fired. Pause clips
//! are released automatically after a configurable hold.
//!
//! ```text
//! ordoplay_loop_preview <timeline.ron> [--settings <file>] [--seconds <n>]
//!     [--fps <n>] [--hold <frames>] [--shared-clock] [--report <file>]
//! ```

use ordoplay_timeline_loop::{
    ConfigError, GameTimeClock, LoopSettings, PlaybackDriver, Timeline, TimelineError, Trigger,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "ordoplay_timeline_loop=debug,ordoplay_loop_preview=info";

/// Errors raised by the preview runner
#[derive(Debug, Error)]
enum PreviewError {
    #[error("Usage: {0}")]
    Usage(String),

    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Settings error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] ron::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
struct Options {
    timeline: PathBuf,
    settings: Option<PathBuf>,
    seconds: f64,
    fps: f64,
    hold_frames: usize,
    shared_clock: bool,
    report: Option<PathBuf>,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, PreviewError> {
        let mut options = Self {
            timeline: PathBuf::new(),
            settings: None,
            seconds: 30.0,
            fps: 60.0,
            hold_frames: 30,
            shared_clock: false,
            report: None,
        };
        let mut timeline = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => options.settings = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--report" => options.report = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--seconds" => options.seconds = number(&mut args, &arg)?,
                "--fps" => options.fps = number(&mut args, &arg)?,
                "--hold" => options.hold_frames = number::<usize>(&mut args, &arg)?,
                "--shared-clock" => options.shared_clock = true,
                other if other.starts_with("--") => {
                    return Err(PreviewError::Usage(format!("unknown option {other}")));
                }
                path => timeline = Some(PathBuf::from(path)),
            }
        }

        options.timeline =
            timeline.ok_or_else(|| PreviewError::Usage("missing timeline path".to_string()))?;
        if !(options.fps > 0.0 && options.fps.is_finite()) {
            return Err(PreviewError::Usage(format!("invalid frame rate {}", options.fps)));
        }
        if !(options.seconds >= 0.0 && options.seconds.is_finite()) {
            return Err(PreviewError::Usage(format!("invalid duration {}", options.seconds)));
        }
        Ok(options)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, PreviewError> {
    args.next()
        .ok_or_else(|| PreviewError::Usage(format!("{flag} expects a value")))
}

fn number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<T, PreviewError> {
    let raw = value(args, flag)?;
    raw.parse()
        .map_err(|_| PreviewError::Usage(format!("{flag} expects a number, got {raw}")))
}

/// One clip action observed during the run
#[derive(Debug, Serialize)]
struct PreviewEvent {
    frame: usize,
    time: f64,
    clip: usize,
    action: String,
    revived: usize,
}

impl PreviewEvent {
    fn new(frame: usize, time: f64, trigger: &Trigger) -> Self {
        Self {
            frame,
            time,
            clip: trigger.clip.value(),
            action: trigger.control.name().to_string(),
            revived: trigger.revived,
        }
    }
}

/// Summary of a preview run
#[derive(Debug, Serialize)]
struct PreviewReport {
    timeline: String,
    frames: usize,
    resumes: usize,
    final_time: f64,
    final_state: String,
    played: Vec<bool>,
    events: Vec<PreviewEvent>,
}

fn run(options: &Options) -> Result<PreviewReport, PreviewError> {
    let timeline = Timeline::load(&options.timeline)?;
    let settings = match &options.settings {
        Some(path) => LoopSettings::load(path)?,
        None => LoopSettings::default(),
    };
    let name = timeline.name.clone();
    tracing::info!(
        timeline = %name,
        duration = timeline.duration,
        tracks = timeline.track_count(),
        "Loaded timeline"
    );

    let clock = options.shared_clock.then(GameTimeClock::shared);
    let driver = match &clock {
        Some(clock) => PlaybackDriver::with_clock(timeline, &settings, clock.clone()),
        None => PlaybackDriver::new(timeline, &settings),
    };
    if !driver.enable() {
        driver.play();
    }

    let delta = 1.0 / options.fps;
    let total_frames = (options.seconds * options.fps).ceil() as usize;
    let mut events = Vec::new();
    let mut resumes = 0;
    let mut held = 0;
    let mut frames = 0;

    while frames < total_frames && driver.is_playing() {
        frames += 1;
        match &clock {
            Some(clock) => clock.tick(delta),
            None => {
                driver.update(delta);
            }
        }

        if let Some(trigger) = driver.take_last_trigger() {
            tracing::info!(
                frame = frames,
                clip = trigger.clip.value(),
                action = trigger.control.name(),
                "Clip action"
            );
            events.push(PreviewEvent::new(frames, driver.current_time(), &trigger));
        }

        if driver.state().is_paused() {
            held += 1;
            if held >= options.hold_frames && driver.resume() {
                held = 0;
                resumes += 1;
            }
        }
    }

    let report = PreviewReport {
        timeline: name,
        frames,
        resumes,
        final_time: driver.current_time(),
        final_state: format!("{:?}", driver.state()),
        played: driver.played_flags(),
        events,
    };
    driver.stop();
    Ok(report)
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OrdoPlay loop preview v{}", env!("CARGO_PKG_VERSION"));

    let result = Options::parse(std::env::args().skip(1)).and_then(|options| {
        let report = run(&options)?;
        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let text = ron::ser::to_string_pretty(&report, config)?;
        match &options.report {
            Some(path) => {
                std::fs::write(path, text)?;
                tracing::info!(path = %path.display(), "Report written");
            }
            None => println!("{text}"),
        }
        Ok(())
    });

    if let Err(e) = result {
        tracing::error!("Preview failed: {e}");
        std::process::exit(1);
    }
}
