//! F01 device control operations

use crate::error::Result;
use crate::regs::{F01Control0, F01_CMD_DEVICE_RESET, F01_INTERRUPT_ENABLE_OFFSET, RESET_WAIT_MS};
use crate::session::Session;
use crate::transport::{self, RmiTransport};

/// Mask every interrupt source
pub fn disable_irqs<T: RmiTransport + ?Sized>(transport: &mut T, session: &Session) -> Result<()> {
    let f01 = session.f01()?;
    transport::write(
        transport,
        f01.control_reg(F01_INTERRUPT_ENABLE_OFFSET)?,
        &[0x00],
    )
}

/// Keep the sensor out of its low power states
pub fn disable_sleep<T: RmiTransport + ?Sized>(transport: &mut T, session: &Session) -> Result<()> {
    let f01 = session.f01()?;
    let current = F01Control0::from_bits_retain(transport::read_u8(transport, f01.control_base)?);
    let wanted = (current | F01Control0::NO_SLEEP) - F01Control0::SLEEP_MODE;
    log::debug!(
        "F01 control0: 0x{:02X} -> 0x{:02X}",
        current.bits(),
        wanted.bits()
    );
    transport::write(transport, f01.control_base, &[wanted.bits()])
}

/// Reset the device and give it time to come back
pub fn reset<T: RmiTransport + ?Sized>(transport: &mut T, session: &Session) -> Result<()> {
    let f01 = session.f01()?;
    transport::write(transport, f01.command_base, &[F01_CMD_DEVICE_RESET])?;
    transport.delay_ms(RESET_WAIT_MS);
    Ok(())
}
