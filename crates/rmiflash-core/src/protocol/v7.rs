//! Partition (v7/v8) bootloader sequence
//!
//! Commands are packets written to `data_base + 1`:
//!
//! ```text
//! [partition, offset (u32 LE), opcode, bootloader id 0, bootloader id 1]
//! ```
//!
//! Block writes select a partition at `data_base`, reset the block offset at
//! `data_base + 2` and stream payloads to `data_base + 5`.
//!
//! The two minor versions differ in how the application is erased. v8 has a
//! single erase-application command but needs a pause first so the previous
//! attention is consumed. v7 erases core code and core config one after the
//! other, waiting for the attention of the first before sending the second.

use crate::error::{Error, Phase, Result, ResultExt};
use crate::f01;
use crate::flash::{block_count, poll_wait, program_image, wait_for_idle, BlockCounter};
use crate::function::FunctionDescriptor;
use crate::image::{ImageSet, IMAGE_CONFIG, IMAGE_FLASH_CONFIG, IMAGE_UI};
use crate::protocol::Bootloader;
use crate::regs::{
    Partition, CMD_V7_ENTER_BL, CMD_V7_ERASE, CMD_V7_ERASE_AP, F34_ENABLE_WAIT_MS,
    F34_ERASE_V8_WAIT_MS, F34_V7_BLOCK_OFFSET_OFFSET, F34_V7_COMMAND_OFFSET,
    F34_V7_ERASE_SETTLE_MS, F34_V7_PARTITION_ID_OFFSET, F34_V7_PAYLOAD_OFFSET,
    F34_V8_ERASE_HOLDOFF_MS, F34_WRITE_CONFIG_BLOCK, F34_WRITE_FW_BLOCK,
};
use crate::session::Session;
use crate::transport::{self, RmiTransport, UpdateProgress, UpdateStatus};

/// Build a command packet without the bootloader ID
pub fn command(partition: Partition, opcode: u8) -> Vec<u8> {
    let mut packet = Vec::with_capacity(8);
    packet.push(partition.id());
    packet.extend_from_slice(&0u32.to_le_bytes());
    packet.push(opcode);
    packet
}

/// Build a command packet carrying the bootloader ID
pub fn command_with_id(partition: Partition, opcode: u8, bootloader_id: [u8; 2]) -> Vec<u8> {
    let mut packet = command(partition, opcode);
    packet.extend_from_slice(&bootloader_id);
    packet
}

fn is_v8(session: &Session) -> Result<bool> {
    match session.bootloader()? {
        Bootloader::V8 => Ok(true),
        Bootloader::V7 => Ok(false),
        Bootloader::V5 => {
            let id = session.bootloader_id();
            Err(Error::UnsupportedBootloaderVersion {
                function_version: session.f34()?.version,
                id0: id[0],
                id1: id[1],
            })
        }
    }
}

fn send_command(
    transport: &mut dyn RmiTransport,
    f34: &FunctionDescriptor,
    packet: &[u8],
) -> Result<()> {
    log::debug!("F34 command {:02X?}", packet);
    transport::write(transport, f34.data_reg(F34_V7_COMMAND_OFFSET)?, packet)
}

/// Enter bootloader mode
pub fn detach(
    transport: &mut dyn RmiTransport,
    session: &Session,
    progress: &mut dyn UpdateProgress,
) -> Result<()> {
    let f34 = *session.f34()?;
    session.f01()?;

    f01::disable_irqs(transport, session).phase(Phase::DisableIrqs)?;
    let packet = command_with_id(
        Partition::Bootloader,
        CMD_V7_ENTER_BL,
        session.bootloader_id(),
    );
    send_command(transport, &f34, &packet).phase(Phase::EnableProgramming)?;

    progress.set_status(UpdateStatus::Restarting);
    transport.delay_ms(F34_ENABLE_WAIT_MS);

    transport
        .rebind_driver()
        .map_err(Error::Rebind)
        .phase(Phase::RebindDriver)
}

/// Erase core code and core config
pub fn erase_all(transport: &mut dyn RmiTransport, session: &Session) -> Result<()> {
    let f34 = *session.f34()?;
    let v8 = is_v8(session)?;
    let id = session.bootloader_id();

    if v8 {
        // Let the bootloader drop the attention raised by the mode switch
        transport.delay_ms(F34_V8_ERASE_HOLDOFF_MS);
        let packet = command_with_id(Partition::CoreCode, CMD_V7_ERASE_AP, id);
        send_command(transport, &f34, &packet).phase(Phase::UnlockErase)?;
        transport.delay_ms(F34_V7_ERASE_SETTLE_MS);
        wait_for_idle(transport, session, F34_ERASE_V8_WAIT_MS).phase(Phase::WaitIdle)?;
        poll_wait(transport, session).phase(Phase::FlashSuccess)
    } else {
        let packet = command_with_id(Partition::CoreCode, CMD_V7_ERASE, id);
        send_command(transport, &f34, &packet).phase(Phase::UnlockErase)?;
        transport.delay_ms(F34_V7_ERASE_SETTLE_MS);
        poll_wait(transport, session).phase(Phase::FlashSuccess)?;

        let packet = command(Partition::CoreConfig, CMD_V7_ERASE);
        send_command(transport, &f34, &packet).phase(Phase::EraseCoreConfig)?;
        transport.delay_ms(F34_V7_ERASE_SETTLE_MS);
        wait_for_idle(transport, session, F34_ERASE_V8_WAIT_MS).phase(Phase::WaitIdle)?;
        poll_wait(transport, session).phase(Phase::FlashSuccess)
    }
}

/// Point the block offset at the start of `partition`
pub fn select_partition(
    transport: &mut dyn RmiTransport,
    f34: &FunctionDescriptor,
    partition: Partition,
) -> Result<()> {
    transport::write(
        transport,
        f34.data_reg(F34_V7_PARTITION_ID_OFFSET)?,
        &[partition.id()],
    )
    .phase(Phase::SelectPartition)?;
    transport::write(
        transport,
        f34.data_reg(F34_V7_BLOCK_OFFSET_OFFSET)?,
        &0u16.to_le_bytes(),
    )
    .phase(Phase::WriteInitialZero)
}

/// Write flash config (v8, optional), core code and core config
pub fn program(
    transport: &mut dyn RmiTransport,
    session: &Session,
    images: &ImageSet,
    progress: &mut dyn UpdateProgress,
) -> Result<()> {
    let f34 = *session.f34()?;
    let v8 = is_v8(session)?;
    let ui = images.get(IMAGE_UI)?;
    let config = images.get(IMAGE_CONFIG)?;
    let flash_config = images.get_optional(IMAGE_FLASH_CONFIG);

    let mut steps = Vec::with_capacity(3);
    match flash_config {
        Some(image) if v8 => steps.push((Partition::FlashConfig, F34_WRITE_FW_BLOCK, image)),
        Some(_) => log::warn!("ignoring flash-config image, bootloader v7 has no such partition"),
        None => {}
    }
    steps.push((Partition::CoreCode, F34_WRITE_FW_BLOCK, ui));
    steps.push((Partition::CoreConfig, F34_WRITE_CONFIG_BLOCK, config));

    let block_size = usize::from(session.block_size());
    let mut counter = BlockCounter::new(
        steps
            .iter()
            .map(|(_, _, image)| block_count(image.len(), block_size))
            .sum(),
    );

    progress.set_status(UpdateStatus::Writing);
    let addr = f34.data_reg(F34_V7_PAYLOAD_OFFSET)?;
    for (partition, cmd, image) in steps {
        log::info!(
            "writing {:?} partition ({} bytes)",
            partition,
            image.len()
        );
        select_partition(transport, &f34, partition)?;
        program_image(transport, session, progress, &mut counter, cmd, addr, image)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionDirectory;
    use crate::mock::{Event, MockTransport};
    use crate::regs::F34_V7_FLASH_COMMAND_OFFSET;
    use crate::transport::NoProgress;

    const DATA: u16 = 0x0010;
    const STATUS: u16 = DATA + F34_V7_FLASH_COMMAND_OFFSET;

    fn session(minor: u8) -> Session {
        let f01 = FunctionDescriptor::new(0x01, 0, 0x0030).with_control_base(0x0020);
        let f34 = FunctionDescriptor::new(0x34, 2, DATA);
        let dir = FunctionDirectory::from_descriptors([f01, f34]).unwrap();
        Session::new(dir, 16, [0x11, minor], STATUS).unwrap()
    }

    fn mock() -> MockTransport {
        let mut mock = MockTransport::new();
        mock.status_addr = Some(STATUS);
        mock
    }

    fn is_erase(e: &Event) -> bool {
        matches!(e, Event::Write(addr, p) if *addr == DATA + 1 && p.len() >= 6 && (p[5] == CMD_V7_ERASE || p[5] == CMD_V7_ERASE_AP))
    }

    #[test]
    fn test_command_packet_layout() {
        assert_eq!(
            command_with_id(Partition::CoreCode, CMD_V7_ERASE, [0xAB, 0x07]),
            vec![0x07, 0, 0, 0, 0, CMD_V7_ERASE, 0xAB, 0x07]
        );
        assert_eq!(
            command(Partition::CoreConfig, CMD_V7_ERASE),
            vec![0x08, 0, 0, 0, 0, CMD_V7_ERASE]
        );
    }

    #[test]
    fn test_detach_enters_bootloader() {
        let mut mock = mock();
        detach(&mut mock, &session(7), &mut NoProgress).unwrap();
        assert_eq!(
            mock.events,
            vec![
                Event::Write(0x0021, vec![0x00]),
                Event::Write(DATA + 1, vec![0x01, 0, 0, 0, 0, CMD_V7_ENTER_BL, 0x11, 0x07]),
                Event::Delay(F34_ENABLE_WAIT_MS),
                Event::Rebind,
            ]
        );
    }

    #[test]
    fn test_erase_v7_two_partitions_two_attentions() {
        let mut mock = mock();
        erase_all(&mut mock, &session(7)).unwrap();

        let erases: Vec<_> = mock.writes_to(DATA + 1);
        assert_eq!(erases.len(), 2);
        assert_eq!(erases[0][0], Partition::CoreCode.id());
        assert_eq!(erases[0][5], CMD_V7_ERASE);
        assert_eq!(erases[1], command(Partition::CoreConfig, CMD_V7_ERASE));
        assert_eq!(mock.count(|e| matches!(e, Event::Attention(_))), 2);

        // second erase only after the first attention
        let first_attention = mock.position(|e| matches!(e, Event::Attention(_))).unwrap();
        let second_erase = mock
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| is_erase(e))
            .nth(1)
            .map(|(i, _)| i)
            .unwrap();
        assert!(first_attention < second_erase);
    }

    #[test]
    fn test_erase_v8_idle_before_attention() {
        let mut mock = mock();
        erase_all(&mut mock, &session(8)).unwrap();

        assert_eq!(mock.events[0], Event::Delay(F34_V8_ERASE_HOLDOFF_MS));
        let erases = mock.writes_to(DATA + 1);
        assert_eq!(erases.len(), 1);
        assert_eq!(erases[0][5], CMD_V7_ERASE_AP);

        let idle = mock.position(|e| *e == Event::Read(STATUS, 1)).unwrap();
        let attention = mock.position(|e| matches!(e, Event::Attention(_))).unwrap();
        assert!(idle < attention);
        assert_eq!(mock.count(|e| matches!(e, Event::Attention(_))), 1);
    }

    #[test]
    fn test_erase_v7_attention_timeout_stops_before_core_config() {
        let mut mock = mock();
        mock.attention = false;
        let err = erase_all(&mut mock, &session(7)).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::FlashSuccess));
        assert!(matches!(err.root(), Error::AttentionTimeout(_)));
        assert_eq!(mock.writes_to(DATA + 1).len(), 1);
    }

    #[test]
    fn test_program_v8_flash_config_first() {
        let mut mock = mock();
        let images = ImageSet::new()
            .with(IMAGE_FLASH_CONFIG, vec![0xF0; 20])
            .with(IMAGE_UI, vec![0xAA; 32])
            .with(IMAGE_CONFIG, vec![0xCC; 16]);

        program(&mut mock, &session(8), &images, &mut NoProgress).unwrap();

        let writes = mock.writes();
        assert_eq!(writes[0], (DATA, vec![Partition::FlashConfig.id()]));
        assert_eq!(writes[1], (DATA + 2, vec![0x00, 0x00]));
        assert_eq!(writes[2].0, DATA + 5);
        assert_eq!(writes[2].1[..16], [0xF0; 16]);
        assert_eq!(writes[3].1[..4], [0xF0; 4]);
        assert_eq!(writes[4], (DATA, vec![Partition::CoreCode.id()]));

        let selected: Vec<u8> = mock.writes_to(DATA).iter().map(|w| w[0]).collect();
        assert_eq!(
            selected,
            vec![
                Partition::FlashConfig.id(),
                Partition::CoreCode.id(),
                Partition::CoreConfig.id()
            ]
        );
        // 2 + 2 + 1 payload writes
        assert_eq!(mock.writes_to(DATA + 5).len(), 5);
        assert_eq!(
            mock.writes_to(DATA + 5).last().and_then(|w| w.last()),
            Some(&F34_WRITE_CONFIG_BLOCK)
        );
    }

    #[test]
    fn test_program_v8_without_flash_config() {
        let mut mock = mock();
        let images = ImageSet::new()
            .with(IMAGE_UI, vec![0xAA; 16])
            .with(IMAGE_CONFIG, vec![0xCC; 16]);

        program(&mut mock, &session(8), &images, &mut NoProgress).unwrap();
        assert_eq!(mock.writes()[0], (DATA, vec![Partition::CoreCode.id()]));
    }

    #[test]
    fn test_program_v7_ignores_flash_config() {
        let mut mock = mock();
        let images = ImageSet::new()
            .with(IMAGE_FLASH_CONFIG, vec![0xF0; 16])
            .with(IMAGE_UI, vec![0xAA; 16])
            .with(IMAGE_CONFIG, vec![0xCC; 16]);

        program(&mut mock, &session(7), &images, &mut NoProgress).unwrap();
        assert!(!mock
            .writes_to(DATA)
            .contains(&vec![Partition::FlashConfig.id()]));
    }

    #[test]
    fn test_unsupported_minor_touches_nothing() {
        let mut mock = mock();
        assert!(matches!(
            erase_all(&mut mock, &session(6)),
            Err(Error::UnsupportedBootloaderVersion { id1: 6, .. })
        ));
        assert!(mock.events.is_empty());
    }
}
