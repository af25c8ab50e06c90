//! Legacy (v5/v6) bootloader sequence
//!
//! The legacy bootloader has a single block data register. The bootloader ID
//! is written there to unlock the device, and firmware and configuration
//! blocks are streamed through it with different trailing commands. Erase has
//! no completion signal; the sequence sleeps a fixed time instead.

use crate::error::{Error, Phase, Result, ResultExt};
use crate::f01;
use crate::flash::{block_count, program_image, BlockCounter};
use crate::function::FunctionDescriptor;
use crate::image::{ImageSet, IMAGE_CONFIG, IMAGE_UI};
use crate::regs::{
    F34_BLOCK_DATA_OFFSET, F34_BLOCK_DATA_V1_OFFSET, F34_ENABLE_FLASH_PROG, F34_ENABLE_WAIT_MS,
    F34_ERASE_ALL, F34_WRITE_CONFIG_BLOCK, F34_WRITE_FW_BLOCK,
};
use crate::session::Session;
use crate::transport::{self, RmiTransport, UpdateProgress, UpdateStatus};

/// Block data register for the given F34 function
pub fn block_data_addr(f34: &FunctionDescriptor) -> Result<u16> {
    if f34.version == 1 {
        f34.data_reg(F34_BLOCK_DATA_V1_OFFSET)
    } else {
        f34.data_reg(F34_BLOCK_DATA_OFFSET)
    }
}

/// Unlock the bootloader by writing its ID to the block data register
pub fn write_bootloader_id(transport: &mut dyn RmiTransport, session: &Session) -> Result<()> {
    let f34 = session.f34()?;
    transport::write(transport, block_data_addr(f34)?, &session.bootloader_id())
}

/// Enter bootloader mode
pub fn detach(
    transport: &mut dyn RmiTransport,
    session: &Session,
    progress: &mut dyn UpdateProgress,
) -> Result<()> {
    session.f34()?;
    session.f01()?;

    f01::disable_irqs(transport, session).phase(Phase::DisableIrqs)?;
    write_bootloader_id(transport, session).phase(Phase::WriteBootloaderId)?;
    transport::write(transport, session.f34_status_addr(), &[F34_ENABLE_FLASH_PROG])
        .phase(Phase::EnableProgramming)?;

    progress.set_status(UpdateStatus::Restarting);
    transport.delay_ms(F34_ENABLE_WAIT_MS);

    transport
        .rebind_driver()
        .map_err(Error::Rebind)
        .phase(Phase::RebindDriver)
}

/// Erase firmware and configuration
pub fn erase_all(transport: &mut dyn RmiTransport, session: &Session) -> Result<()> {
    session.f34()?;
    log::debug!("erase all @0x{:04X}", session.f34_status_addr());
    transport::write(transport, session.f34_status_addr(), &[F34_ERASE_ALL])
        .phase(Phase::UnlockErase)?;
    // No completion signal on this generation
    transport.delay_ms(F34_ENABLE_WAIT_MS);
    Ok(())
}

/// Write the firmware image, then the configuration image
pub fn program(
    transport: &mut dyn RmiTransport,
    session: &Session,
    images: &ImageSet,
    progress: &mut dyn UpdateProgress,
) -> Result<()> {
    let f34 = session.f34()?;
    let ui = images.get(IMAGE_UI)?;
    let config = images.get(IMAGE_CONFIG)?;
    let addr = block_data_addr(f34)?;

    transport::write(transport, addr, &0u16.to_le_bytes()).phase(Phase::WriteInitialZero)?;

    progress.set_status(UpdateStatus::Writing);
    let block_size = usize::from(session.block_size());
    let mut counter = BlockCounter::new(
        block_count(ui.len(), block_size) + block_count(config.len(), block_size),
    );
    log::info!(
        "writing {} firmware and configuration blocks",
        counter.total()
    );

    program_image(
        transport,
        session,
        progress,
        &mut counter,
        F34_WRITE_FW_BLOCK,
        addr,
        ui,
    )?;
    program_image(
        transport,
        session,
        progress,
        &mut counter,
        F34_WRITE_CONFIG_BLOCK,
        addr,
        config,
    )
}
