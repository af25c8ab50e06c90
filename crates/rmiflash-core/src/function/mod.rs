//! RMI function directory
//!
//! An RMI device exposes its capabilities as numbered functions, each with
//! its own query, command, control and data register blocks. The directory
//! is built once per session (see [`scan`]) and is read-only afterwards.

mod pdt;

pub use pdt::{scan, PdtEntry};

use crate::error::{Error, Result};

/// One RMI function exposed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Function number (e.g. 0x34 for flash)
    pub number: u8,
    /// Function version (0..=3)
    pub version: u8,
    /// Absolute address of the query registers
    pub query_base: u16,
    /// Absolute address of the command registers
    pub command_base: u16,
    /// Absolute address of the control registers
    pub control_base: u16,
    /// Absolute address of the data registers
    pub data_base: u16,
    /// Number of interrupt sources owned by this function
    pub interrupt_source_count: u8,
    /// Index of the interrupt status register holding this function's first bit
    pub interrupt_reg_num: u8,
    /// Bits owned by this function, counted from bit 0 of that register
    ///
    /// Sources may run past bit 7 into the following register.
    pub interrupt_mask: u32,
}

impl FunctionDescriptor {
    /// Create a descriptor with the given number, version and data base
    ///
    /// Other base addresses default to the data base; interrupt information
    /// is left empty.
    pub fn new(number: u8, version: u8, data_base: u16) -> Self {
        Self {
            number,
            version: version & crate::regs::PDT_FUNCTION_VERSION_MASK,
            query_base: data_base,
            command_base: data_base,
            control_base: data_base,
            data_base,
            interrupt_source_count: 0,
            interrupt_reg_num: 0,
            interrupt_mask: 0,
        }
    }

    /// Set the command base address
    pub fn with_command_base(mut self, addr: u16) -> Self {
        self.command_base = addr;
        self
    }

    /// Set the control base address
    pub fn with_control_base(mut self, addr: u16) -> Self {
        self.control_base = addr;
        self
    }

    /// Query register at `offset`
    pub fn query_reg(&self, offset: u16) -> Result<u16> {
        register(self.query_base, offset)
    }

    /// Control register at `offset`
    pub fn control_reg(&self, offset: u16) -> Result<u16> {
        register(self.control_base, offset)
    }

    /// Data register at `offset`
    pub fn data_reg(&self, offset: u16) -> Result<u16> {
        register(self.data_base, offset)
    }
}

/// Address `offset` bytes past `base`
///
/// Bases and sizes come from the device, so the sum may fall outside the
/// 16-bit register space.
pub fn register(base: u16, offset: u16) -> Result<u16> {
    base.checked_add(offset).ok_or_else(|| {
        Error::InvalidResponse(format!(
            "register 0x{:04X} + 0x{:04X} is out of range",
            base, offset
        ))
    })
}

/// Functions discovered on a device, looked up by number
#[derive(Debug, Clone, Default)]
pub struct FunctionDirectory {
    functions: Vec<FunctionDescriptor>,
}

impl FunctionDirectory {
    /// Build a directory from descriptors
    ///
    /// Fails if the same function number appears twice.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = FunctionDescriptor>,
    ) -> Result<Self> {
        let mut functions: Vec<FunctionDescriptor> = Vec::new();
        for desc in descriptors {
            if functions.iter().any(|f| f.number == desc.number) {
                return Err(Error::InvalidResponse(format!(
                    "function 0x{:02X} listed twice",
                    desc.number
                )));
            }
            functions.push(desc);
        }
        Ok(Self { functions })
    }

    /// Look up a function by number
    pub fn get(&self, number: u8) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| f.number == number)
    }

    /// Look up a function that must be present
    pub fn require(&self, number: u8) -> Result<&FunctionDescriptor> {
        self.get(number).ok_or(Error::MissingFunction(number))
    }

    /// Iterate over all functions in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.iter()
    }

    /// Number of functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no functions were found
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
