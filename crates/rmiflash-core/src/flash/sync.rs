//! Idle and attention waits
//!
//! Two different device signals gate the update sequence:
//!
//! - **idle**: the command bits of the F34 status register read back as zero
//!   once the controller has finished the last command. Polled continuously.
//! - **attention**: an edge triggered event the bootloader raises when a flash
//!   operation result is available (v7/v8 erase). Consumed once.
//!
//! A device can report idle before an erase has really finished, so the
//! v7/v8 erase sequence waits for both.
//!
//! Both waits are bounded by a poll count derived from the timeout and the
//! poll interval. Delays between polls go through the transport so tests can
//! run them without sleeping.

use crate::error::{Error, Result};
use crate::regs::{
    ATTENTION_POLL_INTERVAL_MS, ATTENTION_WAIT_MS, F34_COMMAND_MASK, F34_COMMAND_V1_MASK,
    F34_STATUS_MASK, F34_STATUS_SHIFT, F34_V7_FLASH_STATUS_MASK, IDLE_POLL_INTERVAL_MS,
};
use crate::session::Session;
use crate::transport::{self, RmiTransport};

/// Wait until the F34 status register reports idle
///
/// Polls every [`IDLE_POLL_INTERVAL_MS`] until the command bits clear.
///
/// # Errors
/// * `Timeout` - the command bits were still set after `timeout_ms`
/// * `FlashStatus` - the device went idle but reported an error (F34 v0)
/// * `MissingFunction` - the device has no F34
pub fn wait_for_idle<T: RmiTransport + ?Sized>(
    transport: &mut T,
    session: &Session,
    timeout_ms: u32,
) -> Result<()> {
    let f34 = session.f34()?;
    let addr = session.f34_status_addr();
    let command_mask = if f34.version == 0 {
        F34_COMMAND_MASK
    } else {
        F34_COMMAND_V1_MASK
    };

    let max_polls = (timeout_ms / IDLE_POLL_INTERVAL_MS).max(1);
    let mut status = 0;
    for _ in 0..max_polls {
        status = transport::read_u8(transport, addr)?;
        if status & command_mask == 0 {
            if f34.version == 0 {
                let code = (status >> F34_STATUS_SHIFT) & F34_STATUS_MASK;
                if code != 0 {
                    return Err(Error::FlashStatus(code));
                }
            }
            return Ok(());
        }
        transport.delay_ms(IDLE_POLL_INTERVAL_MS);
    }

    log::warn!(
        "F34 still busy after {} ms (status 0x{:02X})",
        timeout_ms,
        status
    );
    Err(Error::Timeout {
        addr,
        status,
        timeout_ms,
    })
}

/// Wait for the attention event that follows a flash operation
///
/// Once attention arrives the flash status register is read; a non-zero
/// error code fails the wait.
///
/// # Errors
/// * `AttentionTimeout` - no attention within [`ATTENTION_WAIT_MS`]
/// * `FlashStatus` - the device reported a flash error
pub fn poll_wait<T: RmiTransport + ?Sized>(transport: &mut T, session: &Session) -> Result<()> {
    let f34 = session.f34()?;
    let max_polls = ATTENTION_WAIT_MS / ATTENTION_POLL_INTERVAL_MS;

    for _ in 0..max_polls {
        if transport.take_attention().map_err(Error::Attention)? {
            let status = transport::read_u8(transport, f34.data_base)? & F34_V7_FLASH_STATUS_MASK;
            if status != 0 {
                return Err(Error::FlashStatus(status));
            }
            return Ok(());
        }
        transport.delay_ms(ATTENTION_POLL_INTERVAL_MS);
    }

    Err(Error::AttentionTimeout(ATTENTION_WAIT_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{FunctionDescriptor, FunctionDirectory};
    use crate::mock::{Event, MockTransport};

    fn session(f34_version: u8) -> Session {
        let dir = FunctionDirectory::from_descriptors([FunctionDescriptor::new(
            0x34,
            f34_version,
            0x0010,
        )])
        .unwrap();
        Session::new(dir, 16, [0x00, 0x07], 0x0022).unwrap()
    }

    fn mock() -> MockTransport {
        let mut mock = MockTransport::new();
        mock.status_addr = Some(0x0022);
        mock
    }

    #[test]
    fn test_idle_immediately() {
        let mut mock = mock();
        wait_for_idle(&mut mock, &session(0), 500).unwrap();
        assert_eq!(mock.events, vec![Event::Read(0x0022, 1)]);
    }

    #[test]
    fn test_idle_after_busy_polls() {
        let mut mock = mock();
        mock.busy_reads = 3;
        mock.write(0x0000, &[0]).unwrap();
        mock.events.clear();

        wait_for_idle(&mut mock, &session(1), 500).unwrap();
        assert_eq!(mock.count(|e| matches!(e, Event::Read(0x0022, 1))), 4);
        assert_eq!(
            mock.count(|e| *e == Event::Delay(IDLE_POLL_INTERVAL_MS)),
            3
        );
    }

    #[test]
    fn test_idle_timeout_does_not_hang() {
        let mut mock = mock();
        mock.stuck_busy = true;

        let err = wait_for_idle(&mut mock, &session(0), 500).unwrap_err();
        match err {
            Error::Timeout {
                addr,
                status,
                timeout_ms,
            } => {
                assert_eq!(addr, 0x0022);
                assert_eq!(status, 0x82);
                assert_eq!(timeout_ms, 500);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            mock.count(|e| matches!(e, Event::Read(..))),
            (500 / IDLE_POLL_INTERVAL_MS) as usize
        );
    }

    #[test]
    fn test_idle_reports_flash_error_v0() {
        let mut mock = mock();
        // command clear, status field 3
        mock.status_value = 0x80 | (3 << 4);
        let err = wait_for_idle(&mut mock, &session(0), 500).unwrap_err();
        assert!(matches!(err, Error::FlashStatus(3)));
    }

    #[test]
    fn test_idle_requires_flash_function() {
        let session = Session::new(FunctionDirectory::default(), 16, [0, 0], 0x22).unwrap();
        let mut mock = mock();
        let err = wait_for_idle(&mut mock, &session, 500).unwrap_err();
        assert!(matches!(err, Error::MissingFunction(0x34)));
        assert!(mock.events.is_empty());
    }

    #[test]
    fn test_poll_wait_success() {
        let mut mock = mock();
        poll_wait(&mut mock, &session(2)).unwrap();
        assert_eq!(
            mock.events,
            vec![Event::Attention(true), Event::Read(0x0010, 1)]
        );
    }

    #[test]
    fn test_poll_wait_flash_error() {
        let mut mock = mock();
        mock.load(0x0010, &[0x05]);
        let err = poll_wait(&mut mock, &session(2)).unwrap_err();
        assert!(matches!(err, Error::FlashStatus(0x05)));
    }

    #[test]
    fn test_poll_wait_timeout() {
        let mut mock = mock();
        mock.attention = false;
        let err = poll_wait(&mut mock, &session(2)).unwrap_err();
        assert!(matches!(err, Error::AttentionTimeout(ATTENTION_WAIT_MS)));
        assert_eq!(
            mock.count(|e| matches!(e, Event::Attention(false))),
            (ATTENTION_WAIT_MS / ATTENTION_POLL_INTERVAL_MS) as usize
        );
    }
}
