//! Shared device mock for integration tests.
//!
//! `MockBus` behaves like the codec's control port: register writes land in
//! a register file, register reads answer from it, bulk downloads are
//! recorded frame by frame, and the CRC read-back command answers with the
//! CRC16 of the last bulk payload (or a scripted override, for fault
//! injection).

#![allow(dead_code)] // not every test binary uses every helper
#![allow(clippy::indexing_slicing)]
#![allow(clippy::arithmetic_side_effects)]

use ak7738::crc16_ccitt;
use ak7738::transport::{
    BusError, CommandBus, CMD_READ_CRC, CMD_READ_REG, CMD_WRITE_CRAM, CMD_WRITE_PRAM,
    CMD_WRITE_REG,
};
use ak7738::registers::REGISTER_COUNT;

/// Scripted control-port double.
#[derive(Default)]
pub struct MockBus {
    /// The device's register file.
    pub regs: [u8; REGISTER_COUNT],
    /// Every frame transmitted, in order (header and payload joined).
    pub frames: Vec<Vec<u8>>,
    /// Payload of the most recent bulk download, feeding the CRC answer.
    pub last_bulk_payload: Vec<u8>,
    /// Scripted CRC answers, consumed front-first before falling back to
    /// the computed CRC. Lets a test report a corrupted transfer.
    pub crc_overrides: Vec<u16>,
    /// Fail this many upcoming writes with a bus fault.
    pub fail_writes: usize,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bulk download frames (PRAM or CRAM) seen so far.
    pub fn bulk_frames(&self) -> usize {
        self.frames
            .iter()
            .filter(|f| matches!(f.first(), Some(&CMD_WRITE_PRAM | &CMD_WRITE_CRAM)))
            .count()
    }

    /// Sequence of values written to a given register, in order.
    pub fn writes_to(&self, addr: u8) -> Vec<u8> {
        self.frames
            .iter()
            .filter(|f| f.first() == Some(&CMD_WRITE_REG) && f.get(1) == Some(&addr))
            .filter_map(|f| f.get(2).copied())
            .collect()
    }

    fn record(&mut self, frame: Vec<u8>) -> Result<(), BusError> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(BusError::Write);
        }
        if frame.first() == Some(&CMD_WRITE_REG) {
            self.regs[usize::from(frame[1])] = frame[2];
        }
        if matches!(frame.first(), Some(&CMD_WRITE_PRAM | &CMD_WRITE_CRAM)) {
            self.last_bulk_payload = frame[3..].to_vec();
        }
        self.frames.push(frame);
        Ok(())
    }
}

impl CommandBus for MockBus {
    fn write(&mut self, frame: &[u8]) -> Result<(), BusError> {
        self.record(frame.to_vec())
    }

    fn write_split(&mut self, header: &[u8], payload: &[u8]) -> Result<(), BusError> {
        let mut frame = header.to_vec();
        frame.extend_from_slice(payload);
        self.record(frame)
    }

    fn write_then_read(&mut self, frame: &[u8], read: &mut [u8]) -> Result<(), BusError> {
        match frame.first() {
            Some(&CMD_READ_REG) => {
                read[0] = self.regs[usize::from(frame[1])];
            }
            Some(&CMD_READ_CRC) => {
                let crc = if self.crc_overrides.is_empty() {
                    crc16_ccitt(&self.last_bulk_payload)
                } else {
                    self.crc_overrides.remove(0)
                };
                read.copy_from_slice(&crc.to_be_bytes());
            }
            _ => {}
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }
}

/// Delay provider that just counts; tests never need real time.
#[derive(Default)]
pub struct MockDelay;

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
