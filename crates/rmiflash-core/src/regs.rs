//! RMI register map and F34 command definitions
//!
//! Register offsets, opcodes, partition IDs and timing constants used by the
//! flash update protocol. Offsets are relative to the base addresses found in
//! the Page Description Table unless stated otherwise.

use bitflags::bitflags;

// ============================================================================
// Page Description Table
// ============================================================================

/// Page select register, present at offset 0xFF of every page
pub const PAGE_SELECT_REGISTER: u16 = 0xFF;
/// Highest register page that may be scanned
pub const MAX_PAGE: u8 = 0xFF;
/// Size of one register page
pub const PAGE_SIZE: u16 = 0x100;
/// First (highest) PDT entry address within a page
pub const PAGE_SCAN_START: u16 = 0x00E9;
/// The PDT scan stops once the entry address drops to this value
pub const PAGE_SCAN_END: u16 = 0x0005;
/// Size of one PDT entry in bytes
pub const PDT_ENTRY_SIZE: u16 = 6;

/// Interrupt source count bits of the PDT info byte
pub const PDT_INTERRUPT_COUNT_MASK: u8 = 0x07;
/// Function version bits of the PDT info byte (after shifting)
pub const PDT_FUNCTION_VERSION_MASK: u8 = 0x03;
/// Shift of the function version inside the PDT info byte
pub const PDT_FUNCTION_VERSION_SHIFT: u8 = 5;

// ============================================================================
// Function numbers
// ============================================================================

/// Device control function
pub const FUNCTION_DEVICE_CONTROL: u8 = 0x01;
/// Flash memory management (firmware update) function
pub const FUNCTION_FLASH: u8 = 0x34;

// ============================================================================
// F01 - device control
// ============================================================================

/// F01 command: reset the device
pub const F01_CMD_DEVICE_RESET: u8 = 0x01;
/// Offset of the interrupt enable register from the F01 control base
pub const F01_INTERRUPT_ENABLE_OFFSET: u16 = 1;

bitflags! {
    /// F01 device control register 0
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct F01Control0: u8 {
        /// Sleep mode field, bit 0
        const SLEEP_MODE_0 = 1 << 0;
        /// Sleep mode field, bit 1
        const SLEEP_MODE_1 = 1 << 1;
        /// Keep the sensor out of its low power states
        const NO_SLEEP     = 1 << 2;
        /// Both sleep mode bits
        const SLEEP_MODE = Self::SLEEP_MODE_0.bits() | Self::SLEEP_MODE_1.bits();
    }
}

// ============================================================================
// F34 - flash, bootloader v5/v6 layout
// ============================================================================

/// Block data offset from the F34 data base for function version 0
pub const F34_BLOCK_DATA_OFFSET: u16 = 2;
/// Block data offset from the F34 data base for function version 1
pub const F34_BLOCK_DATA_V1_OFFSET: u16 = 1;

/// Offset of the bootloader ID in the F34 query registers (v0/v1)
pub const F34_QUERY_BOOTLOADER_ID_OFFSET: u16 = 0;
/// Offset of the block size in the F34 query registers, version 0
pub const F34_QUERY_BLOCK_SIZE_OFFSET: u16 = 3;
/// Offset of the block size in the F34 query registers, version 1
pub const F34_QUERY_BLOCK_SIZE_V1_OFFSET: u16 = 2;

/// Write one firmware block
pub const F34_WRITE_FW_BLOCK: u8 = 0x02;
/// Erase firmware and configuration
pub const F34_ERASE_ALL: u8 = 0x03;
/// Write one configuration block
pub const F34_WRITE_CONFIG_BLOCK: u8 = 0x06;
/// Enable flash programming (enter bootloader)
pub const F34_ENABLE_FLASH_PROG: u8 = 0x0F;

/// Command bits of the F34 status register, version 0
pub const F34_COMMAND_MASK: u8 = 0x0F;
/// Status field of the F34 status register, version 0 (after shifting)
pub const F34_STATUS_MASK: u8 = 0x07;
/// Shift of the status field, version 0
pub const F34_STATUS_SHIFT: u8 = 4;
/// Command bits of the F34 status register, version 1 and later
pub const F34_COMMAND_V1_MASK: u8 = 0x3F;
/// Programming enabled bit, all versions
pub const F34_ENABLED_MASK: u8 = 0x80;

// ============================================================================
// F34 - flash, bootloader v7/v8 layout
// ============================================================================

/// Offset of the bootloader ID in the F34 v2 query registers
pub const F34_V7_QUERY_BOOTLOADER_ID_OFFSET: u16 = 1;
/// Offset of the block size in the F34 v2 query registers
pub const F34_V7_QUERY_BLOCK_SIZE_OFFSET: u16 = 8;

/// Flash status register (read) / partition select (write)
pub const F34_V7_PARTITION_ID_OFFSET: u16 = 0;
/// Command packet register
pub const F34_V7_COMMAND_OFFSET: u16 = 1;
/// Block offset register (u16 LE)
pub const F34_V7_BLOCK_OFFSET_OFFSET: u16 = 2;
/// Block payload register
pub const F34_V7_PAYLOAD_OFFSET: u16 = 5;
/// Opcode byte of the command packet, reads back non-zero while busy
pub const F34_V7_FLASH_COMMAND_OFFSET: u16 = 6;
/// Error code bits of the v7 flash status register
pub const F34_V7_FLASH_STATUS_MASK: u8 = 0x1F;

/// v7 command: enter bootloader
pub const CMD_V7_ENTER_BL: u8 = 0x01;
/// v7 command: erase partition
pub const CMD_V7_ERASE: u8 = 0x04;
/// v7 command: erase application (bootloader v8)
pub const CMD_V7_ERASE_AP: u8 = 0x05;

/// Partition identifiers of the v7/v8 bootloader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Partition {
    /// The bootloader itself
    Bootloader = 0x01,
    /// Device configuration
    DeviceConfig = 0x02,
    /// Flash configuration (bootloader v8)
    FlashConfig = 0x03,
    /// Manufacturing block
    ManufacturingBlock = 0x04,
    /// Guest serialization
    GuestSerialization = 0x05,
    /// Global parameters
    GlobalParameters = 0x06,
    /// Application firmware
    CoreCode = 0x07,
    /// Application configuration
    CoreConfig = 0x08,
    /// Guest code
    GuestCode = 0x09,
    /// Display configuration
    DisplayConfig = 0x0A,
}

impl Partition {
    /// Partition ID as sent on the wire
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Decode a partition ID
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0x01 => Self::Bootloader,
            0x02 => Self::DeviceConfig,
            0x03 => Self::FlashConfig,
            0x04 => Self::ManufacturingBlock,
            0x05 => Self::GuestSerialization,
            0x06 => Self::GlobalParameters,
            0x07 => Self::CoreCode,
            0x08 => Self::CoreConfig,
            0x09 => Self::GuestCode,
            0x0A => Self::DisplayConfig,
            _ => return None,
        })
    }
}

// ============================================================================
// Timing (milliseconds)
// ============================================================================

/// Settle time after enabling flash programming or erasing (v5)
pub const F34_ENABLE_WAIT_MS: u32 = 300;
/// Idle wait bound after each block write
pub const F34_IDLE_WAIT_MS: u32 = 500;
/// Idle wait bound after a v8 erase
pub const F34_ERASE_V8_WAIT_MS: u32 = 10_000;
/// Pause before a v8 erase so the previous attention is consumed
pub const F34_V8_ERASE_HOLDOFF_MS: u32 = 1_000;
/// Pause between v7 erase steps
pub const F34_V7_ERASE_SETTLE_MS: u32 = 100;
/// Settle time after a device reset
pub const RESET_WAIT_MS: u32 = 100;

/// Delay between status register polls in the idle wait
pub const IDLE_POLL_INTERVAL_MS: u32 = 5;
/// Delay between attention checks
pub const ATTENTION_POLL_INTERVAL_MS: u32 = 20;
/// Upper bound for an attention wait
pub const ATTENTION_WAIT_MS: u32 = 10_000;
