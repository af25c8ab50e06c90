//! Per-device update session
//!
//! A [`Session`] holds what was learned about the device when it was opened:
//! the function directory, the flash block size, the bootloader ID and the
//! address of the F34 status register. It is read-only once built and is
//! passed by reference into every protocol operation.

use crate::error::{Error, Phase, Result, ResultExt};
use crate::function::{self, register, FunctionDescriptor, FunctionDirectory};
use crate::protocol::{v5, Bootloader};
use crate::regs::{
    F34_QUERY_BLOCK_SIZE_OFFSET, F34_QUERY_BLOCK_SIZE_V1_OFFSET,
    F34_QUERY_BOOTLOADER_ID_OFFSET, F34_V7_FLASH_COMMAND_OFFSET,
    F34_V7_QUERY_BLOCK_SIZE_OFFSET, F34_V7_QUERY_BOOTLOADER_ID_OFFSET, FUNCTION_DEVICE_CONTROL,
    FUNCTION_FLASH,
};
use crate::transport::{self, RmiTransport};

/// State of one device for the duration of an update
#[derive(Debug, Clone)]
pub struct Session {
    directory: FunctionDirectory,
    block_size: u16,
    bootloader_id: [u8; 2],
    f34_status_addr: u16,
}

impl Session {
    /// Create a session from already discovered values
    pub fn new(
        directory: FunctionDirectory,
        block_size: u16,
        bootloader_id: [u8; 2],
        f34_status_addr: u16,
    ) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidBlockSize(block_size));
        }
        Ok(Self {
            directory,
            block_size,
            bootloader_id,
            f34_status_addr,
        })
    }

    /// Discover functions and read the F34 query registers
    pub fn query<T: RmiTransport + ?Sized>(transport: &mut T) -> Result<Self> {
        let directory = function::scan(transport).phase(Phase::ScanFunctions)?;
        let f34 = *directory.require(FUNCTION_FLASH)?;

        let (bootloader_id, block_size, status_addr) =
            query_flash(transport, &f34).phase(Phase::QueryFlash)?;

        log::info!(
            "F34 v{}: bootloader id {:02X} {:02X}, block size {}, status @0x{:04X}",
            f34.version,
            bootloader_id[0],
            bootloader_id[1],
            block_size,
            status_addr
        );

        Self::new(directory, block_size, bootloader_id, status_addr)
    }

    /// Discovered functions
    pub fn directory(&self) -> &FunctionDirectory {
        &self.directory
    }

    /// Flash block size in bytes
    pub fn block_size(&self) -> u16 {
        self.block_size
    }

    /// Bootloader ID; byte 1 is the minor version on v7/v8 bootloaders
    pub fn bootloader_id(&self) -> [u8; 2] {
        self.bootloader_id
    }

    /// Address polled by the idle wait
    pub fn f34_status_addr(&self) -> u16 {
        self.f34_status_addr
    }

    /// The flash function
    pub fn f34(&self) -> Result<&FunctionDescriptor> {
        self.directory.require(FUNCTION_FLASH)
    }

    /// The device control function
    pub fn f01(&self) -> Result<&FunctionDescriptor> {
        self.directory.require(FUNCTION_DEVICE_CONTROL)
    }

    /// Bootloader generation of this device
    pub fn bootloader(&self) -> Result<Bootloader> {
        let f34 = self.f34()?;
        Bootloader::detect(f34.version, self.bootloader_id)
    }
}

fn query_flash<T: RmiTransport + ?Sized>(
    transport: &mut T,
    f34: &FunctionDescriptor,
) -> Result<([u8; 2], u16, u16)> {
    match f34.version {
        0 | 1 => {
            let id =
                transport::read_exact(transport, f34.query_reg(F34_QUERY_BOOTLOADER_ID_OFFSET)?, 2)?;
            let size_offset = if f34.version == 1 {
                F34_QUERY_BLOCK_SIZE_V1_OFFSET
            } else {
                F34_QUERY_BLOCK_SIZE_OFFSET
            };
            let block_size = transport::read_u16_le(transport, f34.query_reg(size_offset)?)?;
            // The command byte trails the block data
            let status_addr = register(v5::block_data_addr(f34)?, block_size)
                .map_err(|_| Error::InvalidBlockSize(block_size))?;
            Ok(([id[0], id[1]], block_size, status_addr))
        }
        _ => {
            let id = transport::read_exact(
                transport,
                f34.query_reg(F34_V7_QUERY_BOOTLOADER_ID_OFFSET)?,
                2,
            )?;
            let block_size =
                transport::read_u16_le(transport, f34.query_reg(F34_V7_QUERY_BLOCK_SIZE_OFFSET)?)?;
            let status_addr = f34.data_reg(F34_V7_FLASH_COMMAND_OFFSET)?;
            Ok(([id[0], id[1]], block_size, status_addr))
        }
    }
}
