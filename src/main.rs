//! airkeys - play a plucked-string keyboard in the air

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use airkeys::config::{self, EXAMPLE_CONFIG};
use airkeys::engine::{default_device_name, list_output_devices, KeyboardController, Player, Recorder};
use airkeys::mapping::ScaleName;
use airkeys::sensor::{demo_session, run_poll_loop, HandTracker, SensorListener, SimulatedTracker};

mod cli;

use cli::{Cli, Commands};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airkeys=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(feature = "leap")]
fn open_tracker(simulate: bool) -> Result<Box<dyn HandTracker>> {
    if simulate {
        return Ok(Box::new(SimulatedTracker::looping(demo_session())));
    }
    let tracker = airkeys::sensor::LeapTracker::open().context("failed to open hand tracker")?;
    Ok(Box::new(tracker))
}

#[cfg(not(feature = "leap"))]
fn open_tracker(simulate: bool) -> Result<Box<dyn HandTracker>> {
    if !simulate {
        warn!("built without the `leap` feature, playing the scripted session");
    }
    Ok(Box::new(SimulatedTracker::looping(demo_session())))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config: config_path,
            simulate,
            device,
            scale,
        } => {
            let mut cfg = config::load_or_default(&config_path)?;
            if device.is_some() {
                cfg.audio.device = device;
            }
            if let Some(scale) = scale {
                cfg.controller.scale = scale;
            }

            let player = Player::open(cfg.audio.device.as_deref(), cfg.audio.buffer_size)
                .context("failed to open audio output")?;
            if player.sample_rate() != cfg.audio.sample_rate {
                info!(
                    configured = cfg.audio.sample_rate,
                    device = player.sample_rate(),
                    "using the device sample rate"
                );
                cfg.audio.sample_rate = player.sample_rate();
            }

            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))
                .context("failed to install Ctrl+C handler")?;

            let mut tracker = open_tracker(simulate)?;
            let mut controller = KeyboardController::new(&cfg).with_output(Box::new(player));

            println!("Playing in {} (Ctrl+C to stop)...", cfg.controller.scale);
            run_poll_loop(
                tracker.as_mut(),
                &mut controller,
                Duration::from_millis(cfg.controller.poll_interval_ms),
                &running,
            )?;
        }

        Commands::Record {
            config: config_path,
            output,
            duration,
            scale,
        } => {
            let mut cfg = config::load_or_default(&config_path)?;
            if let Some(scale) = scale {
                cfg.controller.scale = scale;
            }
            println!("Recording {} seconds to {:?}...", duration, output);

            let mut controller = KeyboardController::new(&cfg);
            let mut renderer = controller
                .take_renderer()
                .context("renderer already in use")?;
            let mut tracker = SimulatedTracker::new(demo_session());

            let sample_rate = cfg.audio.sample_rate;
            let total_samples = u64::from(sample_rate) * duration;
            let per_poll = (u64::from(sample_rate) * cfg.controller.poll_interval_ms / 1000).max(1);

            let mut recorder = Recorder::new(&output, sample_rate)?;
            controller.on_init(&tracker)?;

            let mut next_report = 0;
            while recorder.samples_written() < total_samples {
                if let Err(e) = tracker.poll() {
                    warn!("tracker poll failed: {}", e);
                }
                controller.on_frame(&tracker);

                let n = per_poll.min(total_samples - recorder.samples_written());
                recorder.write_from(&mut renderer, n as usize)?;

                // Progress update every second
                if recorder.samples_written() >= next_report {
                    print!(
                        "\r  Progress: {}s / {}s",
                        recorder.samples_written() / u64::from(sample_rate),
                        duration
                    );
                    std::io::stdout().flush()?;
                    next_report += u64::from(sample_rate);
                }
            }

            controller.on_exit(&tracker);
            let peak = recorder.peak();
            recorder.finalize()?;
            println!("\nRecorded to {:?} (peak {:.3})", output, peak);
        }

        Commands::Devices => {
            println!("Available audio output devices:\n");

            if let Some(name) = default_device_name() {
                println!("Default output: {}\n", name);
            }

            let devices = list_output_devices();
            if devices.is_empty() {
                println!("  (none found)");
            }
            for (name, config) in devices {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }
        }

        Commands::Scales => {
            for name in ScaleName::ALL {
                let scale = name.scale();
                println!(
                    "{} ({} notes, {:.2} - {:.2} Hz)",
                    name,
                    scale.len(),
                    scale.lowest(),
                    scale.highest()
                );
                let notes: Vec<String> = scale.notes().iter().map(|f| format!("{:.2}", f)).collect();
                println!("  {}", notes.join(" "));
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Buffer size: {}", cfg.audio.buffer_size);
                    println!("  Master volume: {:.0}%", cfg.audio.master_volume * 100.0);
                    println!(
                        "  Envelope: {} ms attack, {} ms release, level {}",
                        cfg.voice.attack_ms, cfg.voice.release_ms, cfg.voice.level
                    );
                    println!("  Max voices: {}", cfg.voice.max_voices);
                    println!("  Scale: {}", cfg.controller.scale);
                    println!("  Poll interval: {} ms", cfg.controller.poll_interval_ms);
                    println!("  Twist axis: {:?}", cfg.octave.axis);
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let path = Path::new("airkeys.yaml");
            if path.exists() {
                println!("airkeys.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, EXAMPLE_CONFIG)?;
                println!("Created airkeys.yaml with example configuration.");
            }
        }
    }

    Ok(())
}
