//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Transport to use, as name[:key=value,...] [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "rmiflash")]
#[command(author, version, about = "Synaptics RMI touch controller firmware updater", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Firmware images for one update
#[derive(clap::Args, Debug, Clone)]
pub struct ImageArgs {
    /// Application firmware image
    #[arg(long)]
    pub ui: PathBuf,

    /// Application configuration image
    #[arg(long)]
    pub config: PathBuf,

    /// Flash configuration image (v8 bootloaders only)
    #[arg(long)]
    pub flash_config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the functions and bootloader of a device
    Info {
        /// Transport to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Erase the device and write new firmware
    Update {
        /// Transport to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        #[command(flatten)]
        images: ImageArgs,

        /// Leave the device in bootloader mode afterwards
        #[arg(long)]
        no_reset: bool,
    },

    /// List available transports
    ListProgrammers,
}
