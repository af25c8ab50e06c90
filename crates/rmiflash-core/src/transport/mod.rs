//! Transport traits and abstractions
//!
//! This module defines the seam between the protocol engine and whatever
//! carries register accesses to the device (HID reports, PS/2 backdoor,
//! an emulator in tests).

mod traits;

pub use traits::{
    read_u16_le, read_u8, NoProgress, RmiTransport, TransportError, UpdateProgress, UpdateStatus,
};
pub(crate) use traits::{read_exact, write};
