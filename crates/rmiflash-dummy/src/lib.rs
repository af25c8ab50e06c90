//! rmiflash-dummy - In-memory RMI device emulator for testing
//!
//! This crate provides a dummy RMI transport that emulates a touch controller
//! with an F01 device control function and an F34 flash function. It speaks
//! the legacy (v5/v6) or the partition (v7/v8) bootloader protocol and keeps
//! the programmed images in memory, so a full update can run without
//! hardware.
//!
//! Register layout (page 0):
//!
//! | Function | Query | Command | Control | Data |
//! |----------|-------|---------|---------|------|
//! | F34      | 0xA0  | 0xA1    | 0xA2    | 0x00 |
//! | F01      | 0xB0  | 0xB1    | 0xB2    | 0xB4 |
//!
//! Block and command writes are consumed by the emulated bootloader rather
//! than stored, the way a real device treats its block data register.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use rmiflash_core::regs::{
    Partition, CMD_V7_ENTER_BL, CMD_V7_ERASE, CMD_V7_ERASE_AP, F01_CMD_DEVICE_RESET,
    F34_BLOCK_DATA_OFFSET, F34_BLOCK_DATA_V1_OFFSET, F34_ENABLED_MASK, F34_ENABLE_FLASH_PROG,
    F34_ERASE_ALL, F34_QUERY_BLOCK_SIZE_OFFSET, F34_QUERY_BLOCK_SIZE_V1_OFFSET,
    F34_QUERY_BOOTLOADER_ID_OFFSET, F34_V7_BLOCK_OFFSET_OFFSET, F34_V7_COMMAND_OFFSET,
    F34_V7_FLASH_COMMAND_OFFSET, F34_V7_PARTITION_ID_OFFSET, F34_V7_PAYLOAD_OFFSET,
    F34_V7_QUERY_BLOCK_SIZE_OFFSET, F34_V7_QUERY_BOOTLOADER_ID_OFFSET, F34_WRITE_CONFIG_BLOCK,
    F34_WRITE_FW_BLOCK, FUNCTION_DEVICE_CONTROL, FUNCTION_FLASH, PAGE_SCAN_START, PDT_ENTRY_SIZE,
};
use rmiflash_core::transport::{RmiTransport, TransportError};
use thiserror::Error;

const REGISTER_SPACE: usize = 0x1_0000;

const F34_QUERY: u16 = 0xA0;
const F34_COMMAND: u16 = 0xA1;
const F34_CONTROL: u16 = 0xA2;
const F34_DATA: u16 = 0x00;

const F01_QUERY: u16 = 0xB0;
const F01_COMMAND: u16 = 0xB1;
const F01_CONTROL: u16 = 0xB2;
const F01_DATA: u16 = 0xB4;

/// Largest block size that keeps the v5 status register below the query
/// registers
pub const MAX_BLOCK_SIZE: u16 = 0x80;

/// Flash status: the bootloader ID in a command packet did not match
pub const FLASH_STATUS_BAD_ID: u8 = 0x0B;
/// Flash status: the command is not known to this bootloader
pub const FLASH_STATUS_BAD_COMMAND: u8 = 0x03;

/// Errors returned by the emulated device
#[derive(Debug, Error)]
pub enum DummyError {
    /// Access beyond the 16-bit register space
    #[error("register access out of range: {len} bytes @0x{addr:04X}")]
    OutOfRange {
        /// Start address
        addr: u16,
        /// Access length
        len: usize,
    },

    /// A bootloader command was sent in application mode
    #[error("device is not in bootloader mode")]
    NotInBootloader,

    /// Flash programming was enabled without writing the bootloader ID
    #[error("flash programming is locked")]
    Locked,

    /// A block was written to flash that has not been erased
    #[error("{0:?} has not been erased")]
    NotErased(Partition),

    /// A block was written before a partition was selected
    #[error("no partition selected")]
    NoPartition,

    /// Unknown partition ID
    #[error("unknown partition 0x{0:02X}")]
    UnknownPartition(u8),

    /// Unknown command byte
    #[error("unknown command 0x{0:02X}")]
    UnknownCommand(u8),

    /// A write that does not fit the register it targets
    #[error("malformed write of {len} bytes @0x{addr:04X}")]
    Malformed {
        /// Start address
        addr: u16,
        /// Write length
        len: usize,
    },

    /// Block size outside the supported range
    #[error("invalid block size {0} (must be 1..={max})", max = MAX_BLOCK_SIZE)]
    InvalidBlockSize(u16),

    /// Unknown bootloader name
    #[error("unknown bootloader '{0}' (expected v5, v5.1, v7 or v8)")]
    UnknownBootloader(String),
}

impl From<DummyError> for TransportError {
    fn from(err: DummyError) -> Self {
        TransportError::Other(err.to_string())
    }
}

/// Bootloader generation emulated by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyBootloader {
    /// Legacy bootloader on F34 version 0
    V5,
    /// Legacy bootloader on F34 version 1
    V5_1,
    /// Partition bootloader, minor version 7
    V7,
    /// Partition bootloader, minor version 8
    V8,
}

impl DummyBootloader {
    /// F34 function version reported in the PDT
    pub fn function_version(self) -> u8 {
        match self {
            Self::V5 => 0,
            Self::V5_1 => 1,
            Self::V7 | Self::V8 => 2,
        }
    }

    /// Bootloader ID reported in the F34 query registers
    pub fn bootloader_id(self) -> [u8; 2] {
        match self {
            Self::V5 => [0x4C, 0x05],
            Self::V5_1 => [0x4C, 0x06],
            Self::V7 => [0x31, 0x07],
            Self::V8 => [0x31, 0x08],
        }
    }

    fn is_partitioned(self) -> bool {
        matches!(self, Self::V7 | Self::V8)
    }
}

impl FromStr for DummyBootloader {
    type Err = DummyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v5" | "5" => Ok(Self::V5),
            "v5.1" | "v6" | "6" => Ok(Self::V5_1),
            "v7" | "7" => Ok(Self::V7),
            "v8" | "8" => Ok(Self::V8),
            _ => Err(DummyError::UnknownBootloader(s.to_string())),
        }
    }
}

impl fmt::Display for DummyBootloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V5 => write!(f, "v5"),
            Self::V5_1 => write!(f, "v5.1"),
            Self::V7 => write!(f, "v7"),
            Self::V8 => write!(f, "v8"),
        }
    }
}

/// Configuration for the dummy device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Bootloader generation
    pub bootloader: DummyBootloader,
    /// Flash block size in bytes
    pub block_size: u16,
    /// Number of status reads that report busy after each command
    pub busy_polls: usize,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            bootloader: DummyBootloader::V7,
            block_size: 16,
            busy_polls: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Application,
    Bootloader,
}

/// Dummy RMI device
///
/// Emulates the register file, the bootloader state machine and the flash
/// contents of a touch controller.
pub struct DummyRmi {
    config: DummyConfig,
    regs: Vec<u8>,
    mode: Mode,
    unlocked: bool,
    erased: HashSet<Partition>,
    flash: HashMap<Partition, Vec<u8>>,
    selected: Option<Partition>,
    pending_cmd: u8,
    busy_remaining: usize,
    attention: bool,
    flash_status: u8,
    resets: usize,
    rebinds: usize,
    elapsed_ms: u64,
}

impl DummyRmi {
    /// Create a new dummy device with the given configuration
    pub fn new(config: DummyConfig) -> Result<Self, DummyError> {
        if config.block_size == 0 || config.block_size > MAX_BLOCK_SIZE {
            return Err(DummyError::InvalidBlockSize(config.block_size));
        }
        Ok(Self::build(config))
    }

    /// Create a new dummy device with default configuration (v7, 16-byte blocks)
    pub fn new_default() -> Self {
        Self::build(DummyConfig::default())
    }

    fn build(config: DummyConfig) -> Self {
        let mut dev = Self {
            config,
            regs: vec![0; REGISTER_SPACE],
            mode: Mode::Application,
            unlocked: false,
            erased: HashSet::new(),
            flash: HashMap::new(),
            selected: None,
            pending_cmd: 0,
            busy_remaining: 0,
            attention: false,
            flash_status: 0,
            resets: 0,
            rebinds: 0,
            elapsed_ms: 0,
        };
        dev.populate();
        dev
    }

    /// Fill in the PDT, query registers and F01 control
    fn populate(&mut self) {
        let bl = self.config.bootloader;
        let f34_info = 0x01 | (bl.function_version() << 5);

        let f01 = [F01_QUERY, F01_COMMAND, F01_CONTROL, F01_DATA];
        let f34 = [F34_QUERY, F34_COMMAND, F34_CONTROL, F34_DATA];
        let mut entry = PAGE_SCAN_START;
        for (bases, info, number) in [
            (f01, 0x01, FUNCTION_DEVICE_CONTROL),
            (f34, f34_info, FUNCTION_FLASH),
        ] {
            let mut raw = bases.map(|b| b as u8).to_vec();
            raw.extend_from_slice(&[info, number]);
            self.store(entry, &raw);
            entry -= PDT_ENTRY_SIZE;
        }

        let id = bl.bootloader_id();
        let block_size = self.config.block_size.to_le_bytes();
        match bl {
            DummyBootloader::V5 => {
                self.store(F34_QUERY + F34_QUERY_BOOTLOADER_ID_OFFSET, &id);
                self.store(F34_QUERY + F34_QUERY_BLOCK_SIZE_OFFSET, &block_size);
            }
            DummyBootloader::V5_1 => {
                self.store(F34_QUERY + F34_QUERY_BOOTLOADER_ID_OFFSET, &id);
                self.store(F34_QUERY + F34_QUERY_BLOCK_SIZE_V1_OFFSET, &block_size);
            }
            DummyBootloader::V7 | DummyBootloader::V8 => {
                self.store(F34_QUERY + F34_V7_QUERY_BOOTLOADER_ID_OFFSET, &id);
                self.store(F34_QUERY + F34_V7_QUERY_BLOCK_SIZE_OFFSET, &block_size);
            }
        }

        // Sleep mode 1, as left by a typical driver
        self.store(F01_CONTROL, &[0x01]);
    }

    fn store(&mut self, addr: u16, data: &[u8]) {
        let start = usize::from(addr);
        let end = (start + data.len()).min(REGISTER_SPACE);
        self.regs[start..end].copy_from_slice(&data[..end - start]);
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Contents of one emulated flash partition
    ///
    /// The legacy bootloader keeps firmware in [`Partition::CoreCode`] and
    /// configuration in [`Partition::CoreConfig`].
    pub fn partition(&self, partition: Partition) -> &[u8] {
        self.flash.get(&partition).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Application firmware currently in flash
    pub fn firmware(&self) -> &[u8] {
        self.partition(Partition::CoreCode)
    }

    /// Application configuration currently in flash
    pub fn configuration(&self) -> &[u8] {
        self.partition(Partition::CoreConfig)
    }

    /// Flash configuration currently in flash (v8)
    pub fn flash_config(&self) -> &[u8] {
        self.partition(Partition::FlashConfig)
    }

    /// Whether the device is running its bootloader
    pub fn in_bootloader(&self) -> bool {
        self.mode == Mode::Bootloader
    }

    /// Number of device resets
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Number of driver rebinds requested
    pub fn rebinds(&self) -> usize {
        self.rebinds
    }

    /// Total time spent in `delay_ms`
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Read a plain register
    pub fn register(&self, addr: u16) -> u8 {
        self.regs[usize::from(addr)]
    }

    /// Make the next flash operation report `status`
    pub fn inject_flash_status(&mut self, status: u8) {
        self.flash_status = status;
    }

    fn block_data_addr(&self) -> u16 {
        match self.config.bootloader {
            DummyBootloader::V5_1 => F34_DATA + F34_BLOCK_DATA_V1_OFFSET,
            _ => F34_DATA + F34_BLOCK_DATA_OFFSET,
        }
    }

    fn status_addr(&self) -> u16 {
        if self.config.bootloader.is_partitioned() {
            F34_DATA + F34_V7_FLASH_COMMAND_OFFSET
        } else {
            self.block_data_addr() + self.config.block_size
        }
    }

    fn start_command(&mut self, cmd: u8) {
        self.pending_cmd = cmd;
        self.busy_remaining = self.config.busy_polls;
    }

    fn require_bootloader(&self) -> Result<(), DummyError> {
        if self.mode == Mode::Bootloader {
            Ok(())
        } else {
            Err(DummyError::NotInBootloader)
        }
    }

    fn program(&mut self, partition: Partition, data: &[u8]) -> Result<(), DummyError> {
        if !self.erased.contains(&partition) {
            return Err(DummyError::NotErased(partition));
        }
        self.flash.entry(partition).or_default().extend_from_slice(data);
        Ok(())
    }

    fn erase(&mut self, partition: Partition) {
        log::debug!("dummy: erase {:?}", partition);
        self.flash.remove(&partition);
        self.erased.insert(partition);
    }

    fn reset(&mut self) {
        log::debug!("dummy: reset");
        self.mode = Mode::Application;
        self.unlocked = false;
        self.selected = None;
        self.busy_remaining = 0;
        self.resets += 1;
    }

    fn handle_write(&mut self, addr: u16, data: &[u8]) -> Result<(), DummyError> {
        if usize::from(addr) + data.len() > REGISTER_SPACE {
            return Err(DummyError::OutOfRange {
                addr,
                len: data.len(),
            });
        }

        if addr == F01_COMMAND {
            if data.first() == Some(&F01_CMD_DEVICE_RESET) {
                self.reset();
            }
            return Ok(());
        }

        if self.config.bootloader.is_partitioned() {
            self.handle_v7_write(addr, data)
        } else {
            self.handle_v5_write(addr, data)
        }
    }

    fn handle_v5_write(&mut self, addr: u16, data: &[u8]) -> Result<(), DummyError> {
        let block_addr = self.block_data_addr();
        let status_addr = self.status_addr();

        if addr == block_addr {
            match (self.mode, data) {
                (Mode::Application, [id0, id1]) => {
                    self.unlocked = [*id0, *id1] == self.config.bootloader.bootloader_id();
                    Ok(())
                }
                (Mode::Application, _) => Err(DummyError::Malformed {
                    addr,
                    len: data.len(),
                }),
                // Block pointer reset
                (Mode::Bootloader, [0, 0]) => Ok(()),
                (Mode::Bootloader, [payload @ .., cmd]) => {
                    if payload.len() > usize::from(self.config.block_size) {
                        return Err(DummyError::Malformed {
                            addr,
                            len: data.len(),
                        });
                    }
                    let partition = match *cmd {
                        F34_WRITE_FW_BLOCK => Partition::CoreCode,
                        F34_WRITE_CONFIG_BLOCK => Partition::CoreConfig,
                        other => return Err(DummyError::UnknownCommand(other)),
                    };
                    self.program(partition, payload)?;
                    self.start_command(*cmd);
                    Ok(())
                }
                (Mode::Bootloader, []) => Err(DummyError::Malformed { addr, len: 0 }),
            }
        } else if addr == status_addr && data.len() == 1 {
            match data[0] {
                F34_ENABLE_FLASH_PROG => {
                    if !self.unlocked {
                        return Err(DummyError::Locked);
                    }
                    log::debug!("dummy: entering bootloader");
                    self.mode = Mode::Bootloader;
                }
                F34_ERASE_ALL => {
                    self.require_bootloader()?;
                    self.erase(Partition::CoreCode);
                    self.erase(Partition::CoreConfig);
                }
                other => return Err(DummyError::UnknownCommand(other)),
            }
            self.start_command(data[0]);
            Ok(())
        } else {
            self.store(addr, data);
            Ok(())
        }
    }

    fn handle_v7_write(&mut self, addr: u16, data: &[u8]) -> Result<(), DummyError> {
        match addr.wrapping_sub(F34_DATA) {
            F34_V7_PARTITION_ID_OFFSET if data.len() == 1 => {
                let partition =
                    Partition::from_id(data[0]).ok_or(DummyError::UnknownPartition(data[0]))?;
                self.selected = Some(partition);
                Ok(())
            }
            F34_V7_BLOCK_OFFSET_OFFSET if data.len() == 2 => {
                if data != [0, 0] {
                    log::warn!("dummy: ignoring non-zero block offset {:02X?}", data);
                }
                Ok(())
            }
            F34_V7_COMMAND_OFFSET => self.handle_v7_command(addr, data),
            F34_V7_PAYLOAD_OFFSET => {
                self.require_bootloader()?;
                let (cmd, payload) = data.split_last().ok_or(DummyError::Malformed { addr, len: 0 })?;
                if payload.len() > usize::from(self.config.block_size) {
                    return Err(DummyError::Malformed {
                        addr,
                        len: data.len(),
                    });
                }
                if *cmd != F34_WRITE_FW_BLOCK && *cmd != F34_WRITE_CONFIG_BLOCK {
                    return Err(DummyError::UnknownCommand(*cmd));
                }
                let partition = self.selected.ok_or(DummyError::NoPartition)?;
                self.program(partition, payload)?;
                self.start_command(*cmd);
                Ok(())
            }
            _ => {
                self.store(addr, data);
                Ok(())
            }
        }
    }

    fn handle_v7_command(&mut self, addr: u16, packet: &[u8]) -> Result<(), DummyError> {
        if packet.len() < 6 {
            return Err(DummyError::Malformed {
                addr,
                len: packet.len(),
            });
        }
        let partition =
            Partition::from_id(packet[0]).ok_or(DummyError::UnknownPartition(packet[0]))?;
        let opcode = packet[5];
        let id_ok = match packet.get(6..8) {
            Some(id) => id == self.config.bootloader.bootloader_id(),
            // Only the core config erase is sent without an ID
            None => partition == Partition::CoreConfig && opcode == CMD_V7_ERASE,
        };

        log::debug!("dummy: {:?} command 0x{:02X}", partition, opcode);
        self.start_command(opcode);

        if !id_ok {
            self.flash_status = FLASH_STATUS_BAD_ID;
            self.attention = true;
            return Ok(());
        }

        match (opcode, partition) {
            (CMD_V7_ENTER_BL, Partition::Bootloader) => {
                self.mode = Mode::Bootloader;
            }
            (CMD_V7_ERASE, Partition::CoreCode | Partition::CoreConfig | Partition::FlashConfig) => {
                self.require_bootloader()?;
                self.erase(partition);
                self.attention = true;
            }
            (CMD_V7_ERASE_AP, Partition::CoreCode) => {
                self.require_bootloader()?;
                if self.config.bootloader == DummyBootloader::V8 {
                    self.erase(Partition::CoreCode);
                    self.erase(Partition::CoreConfig);
                    self.erase(Partition::FlashConfig);
                } else {
                    self.flash_status = FLASH_STATUS_BAD_COMMAND;
                }
                self.attention = true;
            }
            (other, _) => return Err(DummyError::UnknownCommand(other)),
        }
        Ok(())
    }

    fn read_status(&mut self) -> u8 {
        let busy = if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            true
        } else {
            false
        };

        if self.config.bootloader.is_partitioned() {
            if busy {
                self.pending_cmd
            } else {
                0
            }
        } else {
            let enabled = if self.mode == Mode::Bootloader {
                F34_ENABLED_MASK
            } else {
                0
            };
            if busy {
                enabled | (self.pending_cmd & 0x0F).max(1)
            } else {
                enabled
            }
        }
    }
}

impl RmiTransport for DummyRmi {
    fn read(&mut self, addr: u16, len: usize) -> Result<Vec<u8>, TransportError> {
        let start = usize::from(addr);
        if start + len > REGISTER_SPACE {
            return Err(DummyError::OutOfRange { addr, len }.into());
        }

        if len == 1 && addr == self.status_addr() {
            return Ok(vec![self.read_status()]);
        }
        if len == 1 && self.config.bootloader.is_partitioned() && addr == F34_DATA {
            return Ok(vec![std::mem::take(&mut self.flash_status)]);
        }

        Ok(self.regs[start..start + len].to_vec())
    }

    fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), TransportError> {
        Ok(self.handle_write(addr, data)?)
    }

    fn take_attention(&mut self) -> Result<bool, TransportError> {
        Ok(std::mem::take(&mut self.attention))
    }

    fn delay_ms(&mut self, ms: u32) {
        // No delay needed for an in-memory device
        self.elapsed_ms += u64::from(ms);
    }

    fn rebind_driver(&mut self) -> Result<(), TransportError> {
        self.rebinds += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmiflash_core::image::{ImageSet, IMAGE_CONFIG, IMAGE_FLASH_CONFIG, IMAGE_UI};
    use rmiflash_core::protocol::Bootloader;
    use rmiflash_core::session::Session;
    use rmiflash_core::transport::NoProgress;
    use rmiflash_core::{update, Error, Phase};

    fn device(bootloader: DummyBootloader, block_size: u16) -> DummyRmi {
        DummyRmi::new(DummyConfig {
            bootloader,
            block_size,
            busy_polls: 3,
        })
        .unwrap()
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(7) ^ seed).collect()
    }

    fn images() -> ImageSet {
        ImageSet::new()
            .with(IMAGE_UI, pattern(300, 0x11))
            .with(IMAGE_CONFIG, pattern(70, 0x22))
    }

    fn full_update(dev: &mut DummyRmi, images: &ImageSet) -> rmiflash_core::Result<()> {
        let session = Session::query(dev)?;
        update::detach(dev, &session, &mut NoProgress)?;
        let session = Session::query(dev)?;
        update::write_firmware(dev, &session, images, &mut NoProgress)?;
        update::attach(dev, &session)
    }

    #[test]
    fn test_scan_finds_functions() {
        let mut dev = device(DummyBootloader::V5_1, 32);
        let session = Session::query(&mut dev).unwrap();

        let f01 = session.f01().unwrap();
        assert_eq!(f01.control_base, F01_CONTROL);
        assert_eq!(f01.command_base, F01_COMMAND);
        let f34 = session.f34().unwrap();
        assert_eq!(f34.version, 1);
        assert_eq!(f34.query_base, F34_QUERY);
        assert_eq!(session.block_size(), 32);
        assert_eq!(session.bootloader().unwrap(), Bootloader::V5);
        assert_eq!(session.directory().len(), 2);
    }

    #[test]
    fn test_full_update_v5() {
        let mut dev = device(DummyBootloader::V5, 16);
        let images = images();
        full_update(&mut dev, &images).unwrap();

        assert_eq!(dev.firmware(), images.get(IMAGE_UI).unwrap());
        assert_eq!(dev.configuration(), images.get(IMAGE_CONFIG).unwrap());
        assert!(!dev.in_bootloader());
        assert_eq!(dev.resets(), 1);
        assert_eq!(dev.rebinds(), 2);
        // sleep disabled
        assert_eq!(dev.register(F01_CONTROL), 0x04);
    }

    #[test]
    fn test_full_update_v5_1() {
        let mut dev = device(DummyBootloader::V5_1, 64);
        let images = images();
        full_update(&mut dev, &images).unwrap();

        assert_eq!(dev.firmware(), images.get(IMAGE_UI).unwrap());
        assert_eq!(dev.configuration(), images.get(IMAGE_CONFIG).unwrap());
    }

    #[test]
    fn test_full_update_v7() {
        let mut dev = device(DummyBootloader::V7, 16);
        let images = images();
        full_update(&mut dev, &images).unwrap();

        assert_eq!(dev.firmware(), images.get(IMAGE_UI).unwrap());
        assert_eq!(dev.configuration(), images.get(IMAGE_CONFIG).unwrap());
        assert!(dev.flash_config().is_empty());
        assert!(!dev.in_bootloader());
    }

    #[test]
    fn test_full_update_v8_with_flash_config() {
        let mut dev = device(DummyBootloader::V8, 32);
        let images = images().with(IMAGE_FLASH_CONFIG, pattern(40, 0x33));
        full_update(&mut dev, &images).unwrap();

        assert_eq!(dev.firmware(), images.get(IMAGE_UI).unwrap());
        assert_eq!(dev.configuration(), images.get(IMAGE_CONFIG).unwrap());
        assert_eq!(dev.flash_config(), images.get(IMAGE_FLASH_CONFIG).unwrap());
        // erase holdoff, settle, enable wait and reset delays all went through the device
        assert!(dev.elapsed_ms() >= 1_000);
    }

    #[test]
    fn test_write_without_detach_fails_with_phase() {
        let mut dev = device(DummyBootloader::V5, 16);
        let session = Session::query(&mut dev).unwrap();
        let err =
            update::write_firmware(&mut dev, &session, &images(), &mut NoProgress).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::EraseAll));
        assert!(matches!(err.root(), Error::Write { .. }));
        assert!(dev.firmware().is_empty());
    }

    #[test]
    fn test_v7_erase_error_is_reported() {
        let mut dev = device(DummyBootloader::V7, 16);
        let session = Session::query(&mut dev).unwrap();
        update::detach(&mut dev, &session, &mut NoProgress).unwrap();
        dev.inject_flash_status(0x05);

        let err =
            update::write_firmware(&mut dev, &session, &images(), &mut NoProgress).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::EraseAll));
        assert!(matches!(err.root(), Error::FlashStatus(0x05)));
    }

    #[test]
    fn test_enable_without_unlock_is_refused() {
        let mut dev = device(DummyBootloader::V5, 16);
        let status = dev.status_addr();
        assert!(dev.write(status, &[F34_ENABLE_FLASH_PROG]).is_err());
        dev.write(dev.block_data_addr(), &[0x00, 0x00]).unwrap();
        assert!(dev.write(status, &[F34_ENABLE_FLASH_PROG]).is_err());
        assert!(!dev.in_bootloader());
    }

    #[test]
    fn test_bootloader_names() {
        assert_eq!("v5".parse::<DummyBootloader>().unwrap(), DummyBootloader::V5);
        assert_eq!("V5.1".parse::<DummyBootloader>().unwrap(), DummyBootloader::V5_1);
        assert_eq!("v8".parse::<DummyBootloader>().unwrap(), DummyBootloader::V8);
        assert!("v9".parse::<DummyBootloader>().is_err());
    }

    #[test]
    fn test_invalid_block_size() {
        let config = DummyConfig {
            block_size: 0,
            ..DummyConfig::default()
        };
        assert!(matches!(
            DummyRmi::new(config),
            Err(DummyError::InvalidBlockSize(0))
        ));
    }
}
