//! rmiflash - Firmware updater for Synaptics RMI touch controllers
//!
//! Flashes new firmware onto touchpads and touchscreens that expose the RMI
//! flash function (F34), for both the legacy (v5/v6) and the partition
//! (v7/v8) bootloaders.
//!
//! # Architecture
//!
//! All protocol logic lives in `rmiflash-core` and talks to the device
//! through the `RmiTransport` trait. The binary only:
//! - picks a transport backend from the `--programmer` string
//! - loads the image files named on the command line
//! - drives the update and renders progress

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use programmers::open_transport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Info { programmer } => {
            let mut transport = open_transport(&programmer)?;
            commands::run_info(&mut transport)
        }
        Commands::Update {
            programmer,
            images,
            no_reset,
        } => {
            // Load everything before touching the device
            let images = commands::load_images(&images)?;
            let mut transport = open_transport(&programmer)?;
            commands::run_update(&mut transport, &images, !no_reset)
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    }
}
