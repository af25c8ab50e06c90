//! Bootloader protocol sequencers
//!
//! Three incompatible bootloader generations are found in the field:
//!
//! - **v5/v6** (F34 function version 0 or 1): one erase-all command, a single
//!   block data register, separate firmware and configuration block commands
//! - **v7** (F34 version 2, bootloader minor 7): partition oriented erase and
//!   write; core code and core config are erased separately
//! - **v8** (F34 version 2, bootloader minor 8): like v7, with a single
//!   erase-application command and an extra flash configuration partition
//!
//! Each generation is a [`Sequencer`]: a table of plain functions for the
//! detach, erase and program steps. [`Bootloader::sequencer`] picks the table.

pub mod v5;
pub mod v7;

use core::fmt;

use crate::error::{Error, Result};
use crate::image::{ImageSet, IMAGE_CONFIG, IMAGE_UI};
use crate::session::Session;
use crate::transport::{RmiTransport, UpdateProgress};

/// Bootloader generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bootloader {
    /// Legacy bootloader (F34 v0/v1)
    V5,
    /// Partition bootloader, minor version 7
    V7,
    /// Partition bootloader, minor version 8
    V8,
}

/// Enter bootloader mode
pub type DetachFn =
    fn(&mut dyn RmiTransport, &Session, &mut dyn UpdateProgress) -> Result<()>;
/// Erase the images that are about to be written
pub type EraseFn = fn(&mut dyn RmiTransport, &Session) -> Result<()>;
/// Write every image of the update
pub type ProgramFn =
    fn(&mut dyn RmiTransport, &Session, &ImageSet, &mut dyn UpdateProgress) -> Result<()>;

/// The steps of one bootloader generation
pub struct Sequencer {
    /// Enter bootloader mode
    pub detach: DetachFn,
    /// Erase existing firmware and configuration
    pub erase_all: EraseFn,
    /// Write the new images
    pub program: ProgramFn,
    /// Images that must be present before anything is erased
    pub required_images: &'static [&'static str],
}

static V5_SEQUENCER: Sequencer = Sequencer {
    detach: v5::detach,
    erase_all: v5::erase_all,
    program: v5::program,
    required_images: &[IMAGE_UI, IMAGE_CONFIG],
};

static V7_SEQUENCER: Sequencer = Sequencer {
    detach: v7::detach,
    erase_all: v7::erase_all,
    program: v7::program,
    required_images: &[IMAGE_UI, IMAGE_CONFIG],
};

impl Bootloader {
    /// Identify the generation from the F34 version and bootloader ID
    ///
    /// F34 versions 0 and 1 speak the legacy protocol, with bootloader
    /// minor 5 or 6 in byte 1 of the ID. Version 2 is split by that minor
    /// into 7 and 8. Any other combination is refused rather than guessed.
    pub fn detect(function_version: u8, bootloader_id: [u8; 2]) -> Result<Self> {
        match (function_version, bootloader_id[1]) {
            (0 | 1, 5 | 6) => Ok(Self::V5),
            (2, 7) => Ok(Self::V7),
            (2, 8) => Ok(Self::V8),
            _ => Err(Error::UnsupportedBootloaderVersion {
                function_version,
                id0: bootloader_id[0],
                id1: bootloader_id[1],
            }),
        }
    }

    /// Step table for this generation
    pub fn sequencer(self) -> &'static Sequencer {
        match self {
            Self::V5 => &V5_SEQUENCER,
            Self::V7 | Self::V8 => &V7_SEQUENCER,
        }
    }
}

impl fmt::Display for Bootloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V5 => write!(f, "v5"),
            Self::V7 => write!(f, "v7"),
            Self::V8 => write!(f, "v8"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(Bootloader::detect(0, [0x4C, 0x05]).unwrap(), Bootloader::V5);
        assert_eq!(Bootloader::detect(1, [0x4C, 0x06]).unwrap(), Bootloader::V5);
        assert_eq!(Bootloader::detect(2, [0x00, 0x07]).unwrap(), Bootloader::V7);
        assert_eq!(Bootloader::detect(2, [0x00, 0x08]).unwrap(), Bootloader::V8);
    }

    #[test]
    fn test_detect_unsupported() {
        for (version, id) in [
            (0, [0x00, 0x09]),
            (0, [0x4C, 0x00]),
            (1, [0x00, 0x07]),
            (1, [0x4C, 0x08]),
            (2, [0x00, 0x05]),
            (2, [0x00, 0x06]),
            (2, [0x00, 0x09]),
            (3, [0x00, 0x08]),
        ] {
            assert!(matches!(
                Bootloader::detect(version, id),
                Err(Error::UnsupportedBootloaderVersion { .. })
            ));
        }
    }

    #[test]
    fn test_v7_and_v8_share_a_sequencer() {
        assert!(core::ptr::eq(
            Bootloader::V7.sequencer(),
            Bootloader::V8.sequencer()
        ));
        assert!(!core::ptr::eq(
            Bootloader::V5.sequencer(),
            Bootloader::V8.sequencer()
        ));
    }
}
