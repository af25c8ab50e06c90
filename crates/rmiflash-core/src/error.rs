//! Error types for rmiflash-core
//!
//! Failures deep inside a sequence are wrapped in [`Error::Phase`] on the way
//! out, so a caller sees e.g. `erase all: wait for idle: timed out ...` and
//! can still reach the underlying cause with [`Error::root`].

use core::fmt;
use thiserror::Error;

use crate::transport::TransportError;

/// Step of an update sequence, used to annotate errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Scanning the Page Description Table
    ScanFunctions,
    /// Reading the F34 query registers
    QueryFlash,
    /// Disabling device interrupts
    DisableIrqs,
    /// Turning off power saving
    DisableSleep,
    /// Writing the bootloader unlock ID
    WriteBootloaderId,
    /// Switching the device into bootloader mode
    EnableProgramming,
    /// Reattaching the OS driver
    RebindDriver,
    /// Erasing the existing images
    EraseAll,
    /// Sending an erase command
    UnlockErase,
    /// Erasing the core configuration partition
    EraseCoreConfig,
    /// Waiting for the device to report idle
    WaitIdle,
    /// Waiting for the flash result attention
    FlashSuccess,
    /// Resetting the block pointer
    WriteInitialZero,
    /// Selecting a partition for programming
    SelectPartition,
    /// Writing one block at the given register address
    WriteBlock(u16),
    /// Waiting for idle after a block at the given register address
    WaitIdleBlock(u16),
    /// Resetting the device
    Reset,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScanFunctions => write!(f, "scan functions"),
            Self::QueryFlash => write!(f, "query flash"),
            Self::DisableIrqs => write!(f, "disable interrupts"),
            Self::DisableSleep => write!(f, "disable sleep"),
            Self::WriteBootloaderId => write!(f, "write bootloader id"),
            Self::EnableProgramming => write!(f, "enable programming"),
            Self::RebindDriver => write!(f, "rebind driver"),
            Self::EraseAll => write!(f, "erase all"),
            Self::UnlockErase => write!(f, "unlock erasing"),
            Self::EraseCoreConfig => write!(f, "erase core config"),
            Self::WaitIdle => write!(f, "wait for idle"),
            Self::FlashSuccess => write!(f, "get flash success"),
            Self::WriteInitialZero => write!(f, "write initial zero"),
            Self::SelectPartition => write!(f, "select partition"),
            Self::WriteBlock(addr) => write!(f, "write block @0x{:04X}", addr),
            Self::WaitIdleBlock(addr) => write!(f, "wait for idle @0x{:04X}", addr),
            Self::Reset => write!(f, "reset"),
        }
    }
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Register read failed at the bus level
    #[error("register read @0x{addr:04X} failed: {source}")]
    Read {
        /// Register address
        addr: u16,
        /// Transport failure
        #[source]
        source: TransportError,
    },

    /// Register write failed at the bus level
    #[error("register write @0x{addr:04X} failed: {source}")]
    Write {
        /// Register address
        addr: u16,
        /// Transport failure
        #[source]
        source: TransportError,
    },

    /// Attention check failed at the bus level
    #[error("attention check failed: {0}")]
    Attention(#[source] TransportError),

    /// The OS driver could not be reattached
    #[error("driver rebind failed: {0}")]
    Rebind(#[source] TransportError),

    /// The F34 status register stayed busy
    #[error("timed out after {timeout_ms} ms waiting for idle (status 0x{status:02X} @0x{addr:04X})")]
    Timeout {
        /// Status register address
        addr: u16,
        /// Last status value read
        status: u8,
        /// Bound that was exceeded
        timeout_ms: u32,
    },

    /// No attention event arrived in time
    #[error("timed out after {0} ms waiting for attention")]
    AttentionTimeout(u32),

    /// The device reported a flash error code
    #[error("flash operation failed with status 0x{0:02X}")]
    FlashStatus(u8),

    /// A required RMI function is not exposed by the device
    #[error("RMI function 0x{0:02X} not found")]
    MissingFunction(u8),

    /// A required image is absent from the image set
    #[error("firmware image '{0}' not found")]
    MissingImage(String),

    /// The bootloader generation is not handled
    #[error("unsupported bootloader version (F34 v{function_version}, id {id0:02X} {id1:02X})")]
    UnsupportedBootloaderVersion {
        /// F34 function version
        function_version: u8,
        /// Bootloader ID byte 0
        id0: u8,
        /// Bootloader ID byte 1 (minor version)
        id1: u8,
    },

    /// The device reported a block size of zero
    #[error("invalid block size {0}")]
    InvalidBlockSize(u16),

    /// The device returned malformed data
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// An error annotated with the step that failed
    #[error("{phase}: {source}")]
    Phase {
        /// Step that failed
        phase: Phase,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the step it occurred in
    pub fn in_phase(self, phase: Phase) -> Self {
        Error::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping every phase annotation
    pub fn root(&self) -> &Error {
        let mut err = self;
        while let Error::Phase { source, .. } = err {
            err = source;
        }
        err
    }

    /// Outermost phase annotation, if any
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Attach a [`Phase`] to the error of a result
pub trait ResultExt<T> {
    /// Annotate an error with the step that failed
    fn phase(self, phase: Phase) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn phase(self, phase: Phase) -> Result<T> {
        self.map_err(|e| e.in_phase(phase))
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display_chain() {
        let err = Error::Timeout {
            addr: 0x0012,
            status: 0x02,
            timeout_ms: 500,
        }
        .in_phase(Phase::WaitIdleBlock(0x0002))
        .in_phase(Phase::EraseAll);

        assert_eq!(
            err.to_string(),
            "erase all: wait for idle @0x0002: timed out after 500 ms waiting for idle (status 0x02 @0x0012)"
        );
        assert_eq!(err.phase(), Some(Phase::EraseAll));
        assert!(matches!(err.root(), Error::Timeout { .. }));
    }

    #[test]
    fn test_root_of_plain_error() {
        let err = Error::MissingFunction(0x34);
        assert!(matches!(err.root(), Error::MissingFunction(0x34)));
        assert_eq!(err.phase(), None);
    }
}
