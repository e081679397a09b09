//! CLI interface for airkeys

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use airkeys::mapping::ScaleName;

/// Play a plucked-string keyboard in the air with hand tracking
#[derive(Parser)]
#[command(name = "airkeys")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play live from the hand tracker
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "airkeys.yaml")]
        config: PathBuf,

        /// Use the built-in scripted performance instead of a sensor
        #[arg(short, long)]
        simulate: bool,

        /// Output device name (overrides the config)
        #[arg(short, long)]
        device: Option<String>,

        /// Scale to play in (overrides the config)
        #[arg(long)]
        scale: Option<ScaleName>,
    },

    /// Render the scripted performance to a WAV file
    Record {
        /// Configuration file path
        #[arg(short, long, default_value = "airkeys.yaml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        /// Scale to play in (overrides the config)
        #[arg(long)]
        scale: Option<ScaleName>,
    },

    /// List available audio output devices
    Devices,

    /// List the built-in scales
    Scales,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "airkeys.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
