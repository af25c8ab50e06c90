//! Block programming
//!
//! Every bootloader generation writes flash the same way: one register write
//! carrying the block data followed by a command byte, then an idle wait
//! before anything else is sent. Only the command byte and the target
//! register differ.

use super::chunk::chunks;
use super::sync::wait_for_idle;
use crate::error::{Phase, Result, ResultExt};
use crate::regs::F34_IDLE_WAIT_MS;
use crate::session::Session;
use crate::transport::{self, RmiTransport, UpdateProgress};

/// Cumulative block count across all images of one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCounter {
    done: usize,
    total: usize,
}

impl BlockCounter {
    /// Start counting towards `total` blocks
    pub fn new(total: usize) -> Self {
        Self { done: 0, total }
    }

    /// Blocks written so far
    pub fn done(&self) -> usize {
        self.done
    }

    /// Blocks in the whole update
    pub fn total(&self) -> usize {
        self.total
    }

    fn advance(&mut self, progress: &mut dyn UpdateProgress) {
        self.done += 1;
        progress.set_progress(self.done, self.total);
    }
}

/// Write one block followed by `cmd` to `addr` and wait for idle
///
/// # Errors
/// Failures are annotated with [`Phase::WriteBlock`] or
/// [`Phase::WaitIdleBlock`] carrying `addr`.
pub fn write_block<T: RmiTransport + ?Sized>(
    transport: &mut T,
    session: &Session,
    cmd: u8,
    addr: u16,
    data: &[u8],
) -> Result<()> {
    let mut req = Vec::with_capacity(data.len() + 1);
    req.extend_from_slice(data);
    req.push(cmd);

    transport::write(transport, addr, &req).phase(Phase::WriteBlock(addr))?;
    wait_for_idle(transport, session, F34_IDLE_WAIT_MS).phase(Phase::WaitIdleBlock(addr))
}

/// Write a whole image block by block
///
/// Blocks go out strictly in order, one at a time; progress is reported
/// after each one through `counter`.
pub fn program_image<T: RmiTransport + ?Sized>(
    transport: &mut T,
    session: &Session,
    progress: &mut dyn UpdateProgress,
    counter: &mut BlockCounter,
    cmd: u8,
    addr: u16,
    image: &[u8],
) -> Result<()> {
    for block in chunks(image, usize::from(session.block_size())) {
        log::trace!(
            "block @{:#06X} ({} bytes) cmd 0x{:02X} -> 0x{:04X}",
            block.offset,
            block.data.len(),
            cmd,
            addr
        );
        write_block(transport, session, cmd, addr, block.data)?;
        counter.advance(progress);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::function::{FunctionDescriptor, FunctionDirectory};
    use crate::mock::{Event, MockTransport};
    use crate::regs::F34_WRITE_FW_BLOCK;
    use crate::transport::UpdateStatus;

    struct Recorder(Vec<(usize, usize)>);

    impl UpdateProgress for Recorder {
        fn set_status(&mut self, _status: UpdateStatus) {}
        fn set_progress(&mut self, current: usize, total: usize) {
            self.0.push((current, total));
        }
    }

    fn session(block_size: u16) -> Session {
        let dir =
            FunctionDirectory::from_descriptors([FunctionDescriptor::new(0x34, 0, 0x0000)]).unwrap();
        Session::new(dir, block_size, [0, 0], 0x0002 + block_size).unwrap()
    }

    #[test]
    fn test_write_block_payload_then_idle() {
        let session = session(4);
        let mut mock = MockTransport::new();
        mock.status_addr = Some(0x0006);

        write_block(&mut mock, &session, F34_WRITE_FW_BLOCK, 0x0002, &[1, 2, 3, 4]).unwrap();
        assert_eq!(
            mock.events,
            vec![
                Event::Write(0x0002, vec![1, 2, 3, 4, F34_WRITE_FW_BLOCK]),
                Event::Read(0x0006, 1),
            ]
        );
    }

    #[test]
    fn test_write_block_failure_names_address() {
        let session = session(4);
        let mut mock = MockTransport::new();
        mock.fail_write_at = Some(0x0002);

        let err = write_block(&mut mock, &session, F34_WRITE_FW_BLOCK, 0x0002, &[0; 4]).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::WriteBlock(0x0002)));
        assert!(matches!(err.root(), Error::Write { addr: 0x0002, .. }));
        assert!(err.to_string().starts_with("write block @0x0002"));
        // nothing after the failed write
        assert_eq!(mock.events.len(), 1);
    }

    #[test]
    fn test_write_block_idle_timeout_names_address() {
        let session = session(4);
        let mut mock = MockTransport::new();
        mock.status_addr = Some(0x0006);
        mock.stuck_busy = true;

        let err = write_block(&mut mock, &session, F34_WRITE_FW_BLOCK, 0x0002, &[0; 4]).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::WaitIdleBlock(0x0002)));
        assert!(matches!(err.root(), Error::Timeout { .. }));
    }

    #[test]
    fn test_program_256_bytes_in_64_byte_blocks() {
        let session = session(64);
        let mut mock = MockTransport::new();
        mock.status_addr = Some(0x0042);
        let image: Vec<u8> = (0..=255).collect();
        let mut progress = Recorder(Vec::new());
        let mut counter = BlockCounter::new(4);

        program_image(
            &mut mock,
            &session,
            &mut progress,
            &mut counter,
            F34_WRITE_FW_BLOCK,
            0x0002,
            &image,
        )
        .unwrap();

        let writes = mock.writes_to(0x0002);
        assert_eq!(writes.len(), 4);
        for (i, w) in writes.iter().enumerate() {
            assert_eq!(w.len(), 65);
            assert_eq!(w[0], (i * 64) as u8);
            assert_eq!(w[64], F34_WRITE_FW_BLOCK);
        }

        // every write is followed by a status read
        for (i, e) in mock.events.iter().enumerate() {
            if matches!(e, Event::Write(..)) {
                assert_eq!(mock.events[i + 1], Event::Read(0x0042, 1));
            }
        }

        assert_eq!(progress.0, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        assert_eq!(counter.done(), 4);
    }
}
