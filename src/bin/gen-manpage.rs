//! Man page generator for rmiflash
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::PathBuf;

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;
#[path = "../programmers.rs"]
#[allow(dead_code)]
mod programmers;

fn main() -> std::io::Result<()> {
    // Default to ./man directory
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let mut buffer = Vec::new();
    clap_mangen::Man::new(cli::Cli::command()).render(&mut buffer)?;

    // One page per subcommand
    let output_path = output_dir.join("rmiflash.1");
    fs::write(&output_path, buffer)?;
    for sub in cli::Cli::command().get_subcommands() {
        let name = format!("rmiflash-{}", sub.get_name());
        let mut page = Vec::new();
        clap_mangen::Man::new(sub.clone()).render(&mut page)?;
        fs::write(output_dir.join(format!("{}.1", name)), page)?;
    }

    println!("Man pages generated in: {}", output_dir.display());
    println!("\nTo view the main page:");
    println!("  man -l {}", output_path.display());
    Ok(())
}
