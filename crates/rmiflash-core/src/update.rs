//! Update orchestration
//!
//! A full update is three calls:
//!
//! 1. [`detach`] switches the device into bootloader mode. The device
//!    re-enumerates, so the caller queries a fresh [`Session`] afterwards.
//! 2. [`write_firmware`] erases and programs every image.
//! 3. [`attach`] resets the device back into the new firmware.
//!
//! Every check that can fail without touching the device (missing functions,
//! unsupported bootloader, missing images) runs before the first register
//! write of a step.

use crate::error::{Error, Phase, Result, ResultExt};
use crate::f01;
use crate::image::ImageSet;
use crate::protocol::Bootloader;
use crate::session::Session;
use crate::transport::{RmiTransport, UpdateProgress, UpdateStatus};

fn preflight(session: &Session) -> Result<Bootloader> {
    session.f34()?;
    session.f01()?;
    session.bootloader()
}

/// Switch the device into bootloader mode
pub fn detach<T, P>(transport: &mut T, session: &Session, progress: &mut P) -> Result<()>
where
    T: RmiTransport,
    P: UpdateProgress,
{
    let bootloader = preflight(session)?;
    log::info!("entering {} bootloader", bootloader);
    (bootloader.sequencer().detach)(transport, session, progress)
}

/// Erase the device and write `images`
///
/// The session must have been queried with the device in bootloader mode.
/// Once erasing has started a failure leaves the device without valid
/// firmware; nothing is retried.
pub fn write_firmware<T, P>(
    transport: &mut T,
    session: &Session,
    images: &ImageSet,
    progress: &mut P,
) -> Result<()>
where
    T: RmiTransport,
    P: UpdateProgress,
{
    let bootloader = preflight(session)?;
    let sequencer = bootloader.sequencer();
    for name in sequencer.required_images {
        if !images.contains(name) {
            return Err(Error::MissingImage(name.to_string()));
        }
    }

    f01::disable_sleep(transport, session).phase(Phase::DisableSleep)?;

    log::info!("erasing ({} bootloader)", bootloader);
    progress.set_status(UpdateStatus::Erasing);
    (sequencer.erase_all)(transport, session).phase(Phase::EraseAll)?;

    (sequencer.program)(transport, session, images, progress)?;
    log::info!("firmware written");
    Ok(())
}

/// Reset the device out of bootloader mode
pub fn attach<T: RmiTransport>(transport: &mut T, session: &Session) -> Result<()> {
    f01::reset(transport, session).phase(Phase::Reset)?;
    transport
        .rebind_driver()
        .map_err(Error::Rebind)
        .phase(Phase::RebindDriver)
}
