//! Firmware update command

use indicatif::{ProgressBar, ProgressStyle};
use rmiflash_core::image::{ImageSet, IMAGE_CONFIG, IMAGE_FLASH_CONFIG, IMAGE_UI};
use rmiflash_core::session::Session;
use rmiflash_core::transport::{RmiTransport, UpdateProgress, UpdateStatus};
use rmiflash_core::update;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cli::ImageArgs;

/// Read file contents into a Vec
fn read_file(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let data = fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    println!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}

/// Load the images named on the command line
pub fn load_images(args: &ImageArgs) -> Result<ImageSet, Box<dyn std::error::Error>> {
    let mut images = ImageSet::new();
    images.insert(IMAGE_UI, read_file(&args.ui)?);
    images.insert(IMAGE_CONFIG, read_file(&args.config)?);
    if let Some(path) = &args.flash_config {
        images.insert(IMAGE_FLASH_CONFIG, read_file(path)?);
    }
    Ok(images)
}

/// Create a block progress bar style
fn create_progress_bar_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} blocks ({eta})")?
        .progress_chars("#>-"))
}

/// Create a standard spinner style
fn create_spinner_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?)
}

// =============================================================================
// Progress reporting
// =============================================================================

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self { current_bar: None }
    }

    fn create_spinner(&mut self, message: &str) {
        self.finish(None);
        let pb = ProgressBar::new_spinner();
        pb.set_style(create_spinner_style().unwrap_or_else(|_| ProgressStyle::default_spinner()));
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }

    fn create_bar(&mut self, total: u64) {
        self.finish(None);
        let pb = ProgressBar::new(total);
        if let Ok(style) = create_progress_bar_style() {
            pb.set_style(style);
        }
        self.current_bar = Some(pb);
    }

    /// Spinners have no length, so the first block always replaces them
    fn needs_bar(&self, total: usize) -> bool {
        self.current_bar.as_ref().and_then(ProgressBar::length) != Some(total as u64)
    }

    fn finish(&mut self, message: Option<&str>) {
        if let Some(pb) = self.current_bar.take() {
            match message {
                Some(msg) => pb.finish_with_message(msg.to_string()),
                None => pb.finish_and_clear(),
            }
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateProgress for IndicatifProgress {
    fn set_status(&mut self, status: UpdateStatus) {
        match status {
            UpdateStatus::Restarting => self.create_spinner("Restarting into bootloader..."),
            UpdateStatus::Erasing => self.create_spinner("Erasing..."),
            // The bar is created on the first block, once the total is known
            UpdateStatus::Writing => self.finish(None),
        }
    }

    fn set_progress(&mut self, current: usize, total: usize) {
        if self.needs_bar(total) {
            self.create_bar(total as u64);
        }
        if let Some(pb) = &self.current_bar {
            pb.set_position(current as u64);
        }
        if current == total {
            self.finish(Some("Write complete"));
        }
    }
}

/// Run a complete update: detach, write, and optionally reset
pub fn run_update<T: RmiTransport>(
    transport: &mut T,
    images: &ImageSet,
    reset: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::new();

    let session = Session::query(transport)?;
    let bootloader = session.bootloader()?;
    println!(
        "Found {} bootloader (id {:02X} {:02X}), {}-byte blocks",
        bootloader,
        session.bootloader_id()[0],
        session.bootloader_id()[1],
        session.block_size()
    );

    update::detach(transport, &session, &mut progress)?;

    // The device re-enumerates in bootloader mode
    let session = Session::query(transport)?;
    let result = update::write_firmware(transport, &session, images, &mut progress);
    progress.finish(None);
    if let Err(e) = result {
        log::error!("{}", e);
        return Err(format!(
            "update failed ({}); the device may be left in bootloader mode and require recovery",
            e
        )
        .into());
    }

    if reset {
        update::attach(transport, &session)?;
        println!("Update complete, device reset");
    } else {
        println!("Update complete, device left in bootloader mode");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_bar_replaces_spinner() {
        let mut progress = IndicatifProgress::new();
        assert!(progress.needs_bar(4));

        progress.set_status(UpdateStatus::Erasing);
        assert!(progress.needs_bar(4));

        progress.set_progress(1, 4);
        assert!(!progress.needs_bar(4));
        assert_eq!(progress.current_bar.as_ref().map(ProgressBar::position), Some(1));

        progress.set_progress(4, 4);
        assert!(progress.current_bar.is_none());
    }
}
