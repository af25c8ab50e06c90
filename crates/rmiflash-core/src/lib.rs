//! rmiflash-core - Core library for RMI touch controller firmware updates
//!
//! This crate implements the host side of the Synaptics RMI flash update
//! protocol (function 0x34). It covers everything between a raw register
//! transport and a finished update:
//!
//! - discovering the functions a device exposes (Page Description Table scan)
//! - querying the bootloader ID, block size and F34 status register
//! - entering the bootloader, erasing, and block-programming images for the
//!   v5 (legacy) and v7/v8 (partition based) bootloader generations
//!
//! The physical transport (HID, PS/2, serio) is supplied by the caller through
//! the [`transport::RmiTransport`] trait.
//!
//! # Example
//!
//! ```ignore
//! use rmiflash_core::{image::ImageSet, session::Session, transport::NoProgress, update};
//!
//! fn flash<T: RmiTransport>(transport: &mut T, images: &ImageSet) -> rmiflash_core::Result<()> {
//!     let session = Session::query(transport)?;
//!     update::detach(transport, &session, &mut NoProgress)?;
//!     let session = Session::query(transport)?;
//!     update::write_firmware(transport, &session, images, &mut NoProgress)?;
//!     update::attach(transport, &session)
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod f01;
pub mod flash;
pub mod function;
pub mod image;
pub mod protocol;
pub mod regs;
pub mod session;
pub mod transport;
pub mod update;

#[cfg(test)]
pub(crate) mod mock;

pub use error::{Error, Phase, Result};
