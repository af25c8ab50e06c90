//! Transport trait definitions

use crate::error::{Error, Result};
use thiserror::Error;

/// Failure reported by a transport implementation
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error on the underlying device node
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device answered with fewer bytes than requested
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Requested length
        expected: usize,
        /// Received length
        actual: usize,
    },

    /// The device is gone (unplugged, or rebinding in progress)
    #[error("device disconnected")]
    Disconnected,

    /// Anything else
    #[error("{0}")]
    Other(String),
}

/// Register transport to an RMI device
///
/// Every method is a blocking round-trip. The protocol is half-duplex, so
/// implementations never see overlapping calls; the `&mut self` receivers
/// make that hold by construction.
///
/// The trait is object safe so sequencers can be dispatched through a table
/// of plain functions taking `&mut dyn RmiTransport`.
///
/// ## Example: HID backend
///
/// ```ignore
/// impl RmiTransport for HidRmi {
///     fn read(&mut self, addr: u16, len: usize) -> Result<Vec<u8>, TransportError> {
///         self.send_report(&read_request(addr, len))?;
///         self.wait_for_read_report(len)
///     }
///
///     fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), TransportError> {
///         self.send_report(&write_request(addr, data))
///     }
///
///     fn take_attention(&mut self) -> Result<bool, TransportError> {
///         Ok(self.poll_attention_report()?.is_some())
///     }
///
///     fn delay_ms(&mut self, ms: u32) {
///         std::thread::sleep(std::time::Duration::from_millis(ms.into()));
///     }
/// }
/// ```
pub trait RmiTransport {
    /// Read `len` bytes starting at register `addr`
    fn read(&mut self, addr: u16, len: usize) -> core::result::Result<Vec<u8>, TransportError>;

    /// Write `data` starting at register `addr`
    fn write(&mut self, addr: u16, data: &[u8]) -> core::result::Result<(), TransportError>;

    /// Consume one latched attention event
    ///
    /// Returns `true` if the device raised attention since the last call.
    /// Attention is edge triggered and distinct from the busy bits of the
    /// F34 status register.
    fn take_attention(&mut self) -> core::result::Result<bool, TransportError>;

    /// Block for the given number of milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Reattach the OS driver after the device switched modes
    fn rebind_driver(&mut self) -> core::result::Result<(), TransportError> {
        Ok(())
    }
}

// Boxed transports let the CLI pick a backend at runtime
impl RmiTransport for Box<dyn RmiTransport + Send> {
    fn read(&mut self, addr: u16, len: usize) -> core::result::Result<Vec<u8>, TransportError> {
        (**self).read(addr, len)
    }

    fn write(&mut self, addr: u16, data: &[u8]) -> core::result::Result<(), TransportError> {
        (**self).write(addr, data)
    }

    fn take_attention(&mut self) -> core::result::Result<bool, TransportError> {
        (**self).take_attention()
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn rebind_driver(&mut self) -> core::result::Result<(), TransportError> {
        (**self).rebind_driver()
    }
}

/// Read a block of registers, checking the returned length
pub(crate) fn read_exact<T: RmiTransport + ?Sized>(
    transport: &mut T,
    addr: u16,
    len: usize,
) -> Result<Vec<u8>> {
    let data = transport
        .read(addr, len)
        .map_err(|source| Error::Read { addr, source })?;
    if data.len() < len {
        return Err(Error::Read {
            addr,
            source: TransportError::ShortRead {
                expected: len,
                actual: data.len(),
            },
        });
    }
    Ok(data)
}

/// Write a block of registers
pub(crate) fn write<T: RmiTransport + ?Sized>(transport: &mut T, addr: u16, data: &[u8]) -> Result<()> {
    log::trace!("write @0x{:04X}: {:02X?}", addr, data);
    transport
        .write(addr, data)
        .map_err(|source| Error::Write { addr, source })
}

/// Read a single register
pub fn read_u8<T: RmiTransport + ?Sized>(transport: &mut T, addr: u16) -> Result<u8> {
    Ok(read_exact(transport, addr, 1)?[0])
}

/// Read a little-endian 16-bit register pair
pub fn read_u16_le<T: RmiTransport + ?Sized>(transport: &mut T, addr: u16) -> Result<u16> {
    let buf = read_exact(transport, addr, 2)?;
    Ok(u16::from_le_bytes([buf[0], buf[1]]))
}

/// Device status reported during an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The device is switching modes
    Restarting,
    /// Existing images are being erased
    Erasing,
    /// New images are being written
    Writing,
}

/// Progress reporting for update operations
///
/// Purely informational; nothing in the protocol depends on it.
pub trait UpdateProgress {
    /// Called when the device enters a new state
    fn set_status(&mut self, status: UpdateStatus);

    /// Called after each block with the cumulative count across all images
    fn set_progress(&mut self, current: usize, total: usize);
}

/// A no-op progress reporter
pub struct NoProgress;

impl UpdateProgress for NoProgress {
    fn set_status(&mut self, _status: UpdateStatus) {}
    fn set_progress(&mut self, _current: usize, _total: usize) {}
}
