//! Page Description Table scanning
//!
//! Each register page lists its functions as 6-byte entries growing down
//! from 0x00E9. An entry with function number 0 terminates the page, and the
//! first page without any entry terminates the scan.

use zerocopy::{FromBytes, Immutable, KnownLayout};

use super::{FunctionDescriptor, FunctionDirectory};
use crate::error::{Error, Result};
use crate::regs::{
    MAX_PAGE, PAGE_SCAN_END, PAGE_SCAN_START, PAGE_SELECT_REGISTER, PAGE_SIZE,
    PDT_ENTRY_SIZE, PDT_FUNCTION_VERSION_MASK, PDT_FUNCTION_VERSION_SHIFT,
    PDT_INTERRUPT_COUNT_MASK,
};
use crate::transport::{self, RmiTransport};

/// Raw PDT entry as stored on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct PdtEntry {
    /// Query base, relative to the page
    pub query_base: u8,
    /// Command base, relative to the page
    pub command_base: u8,
    /// Control base, relative to the page
    pub control_base: u8,
    /// Data base, relative to the page
    pub data_base: u8,
    /// Interrupt source count (bits 0..=2) and function version (bits 5..=6)
    pub info: u8,
    /// Function number, 0 marks the end of the page
    pub function_number: u8,
}

impl PdtEntry {
    /// Parse an entry from the bytes read at a PDT address
    pub fn parse(data: &[u8]) -> Result<Self> {
        let raw = data
            .get(..PDT_ENTRY_SIZE as usize)
            .ok_or_else(|| Error::InvalidResponse(format!("PDT entry of {} bytes", data.len())))?;
        Self::read_from_bytes(raw)
            .map_err(|_| Error::InvalidResponse("malformed PDT entry".into()))
    }

    /// Whether this entry terminates the page
    pub fn is_end(&self) -> bool {
        self.function_number == 0
    }

    /// Number of interrupt sources
    pub fn interrupt_source_count(&self) -> u8 {
        self.info & PDT_INTERRUPT_COUNT_MASK
    }

    /// Function version
    pub fn function_version(&self) -> u8 {
        (self.info >> PDT_FUNCTION_VERSION_SHIFT) & PDT_FUNCTION_VERSION_MASK
    }

    /// Convert to a descriptor with absolute addresses
    ///
    /// `interrupt_count` is the number of interrupt sources claimed by the
    /// functions found before this one.
    pub fn to_descriptor(&self, page_base: u16, interrupt_count: u32) -> FunctionDescriptor {
        let sources = self.interrupt_source_count();
        let mask = ((1u32 << sources) - 1) << (interrupt_count % 8);
        FunctionDescriptor {
            number: self.function_number,
            version: self.function_version(),
            query_base: page_base + u16::from(self.query_base),
            command_base: page_base + u16::from(self.command_base),
            control_base: page_base + u16::from(self.control_base),
            data_base: page_base + u16::from(self.data_base),
            interrupt_source_count: sources,
            interrupt_reg_num: (interrupt_count / 8) as u8,
            interrupt_mask: mask,
        }
    }
}

/// Scan the Page Description Table and build the function directory
pub fn scan<T: RmiTransport + ?Sized>(transport: &mut T) -> Result<FunctionDirectory> {
    let mut functions = Vec::new();
    let mut interrupt_count = 0u32;

    for page in 0..=MAX_PAGE {
        let page_base = u16::from(page) * PAGE_SIZE;
        transport::write(transport, page_base + PAGE_SELECT_REGISTER, &[page])?;

        let mut found = false;
        let mut addr = PAGE_SCAN_START;
        while addr > PAGE_SCAN_END {
            let buf = transport::read_exact(transport, page_base + addr, PDT_ENTRY_SIZE as usize)?;
            let entry = PdtEntry::parse(&buf)?;
            if entry.is_end() {
                break;
            }

            let desc = entry.to_descriptor(page_base, interrupt_count);
            log::debug!(
                "Found F{:02X} v{} @page {}: query 0x{:04X}, command 0x{:04X}, control 0x{:04X}, data 0x{:04X}",
                desc.number,
                desc.version,
                page,
                desc.query_base,
                desc.command_base,
                desc.control_base,
                desc.data_base
            );
            interrupt_count += u32::from(desc.interrupt_source_count);
            functions.push(desc);
            found = true;
            addr -= PDT_ENTRY_SIZE;
        }

        if !found {
            break;
        }
    }

    log::debug!("PDT scan found {} function(s)", functions.len());
    FunctionDirectory::from_descriptors(functions)
}
