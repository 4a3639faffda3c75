//! Command-bus transport layer.
//!
//! The AK7738 control port speaks the same byte-oriented command protocol
//! over either I2C or SPI: every exchange starts with a command byte,
//! optionally followed by a big-endian memory address and a payload.
//! [`CommandBus`] abstracts the two physical buses behind that framing so
//! the rest of the driver never needs to know which one is wired up.
//!
//! Bulk PRAM images run to ~20 KiB; [`CommandBus::write_split`] exists so a
//! command header and a caller-owned payload can go out as one bus
//! transaction without staging them into a contiguous buffer first.

use embedded_hal::i2c::{I2c, Operation as I2cOperation};
use embedded_hal::spi::{Operation as SpiOperation, SpiDevice};

// ── Command opcodes ──────────────────────────────────────────────────────────

/// Write one control register: `[CMD, addr, value]`.
pub const CMD_WRITE_REG: u8 = 0xC0;
/// Read one control register: `[CMD, addr]`, then read 1 byte.
pub const CMD_READ_REG: u8 = 0x40;
/// Bulk program-memory download: `[CMD, addr_hi, addr_lo, payload…]`.
pub const CMD_WRITE_PRAM: u8 = 0xB8;
/// Bulk coefficient-memory download: `[CMD, addr_hi, addr_lo, payload…]`.
pub const CMD_WRITE_CRAM: u8 = 0xB4;
/// Coefficient-memory read-back: `[CMD, addr_hi, addr_lo]`, then read.
pub const CMD_READ_CRAM: u8 = 0x34;
/// Read the device-computed CRC16 over the last download: `[CMD]`, read 2
/// bytes big-endian.
pub const CMD_READ_CRC: u8 = 0x72;
/// Base opcode for a runtime coefficient write while the DSP is running.
///
/// The word count (1..=24) is encoded in the low bits of the command byte:
/// `0x80 | word_count`.
pub const CMD_RUNTIME_CRAM_BASE: u8 = 0x80;

/// Build the 3-byte command header for an addressed memory operation.
#[must_use]
pub fn command_header(command: u8, addr: u16) -> [u8; 3] {
    let [hi, lo] = addr.to_be_bytes();
    [command, hi, lo]
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Transport-level failure, direction-tagged.
///
/// The underlying HAL error is deliberately not carried: the retry policy
/// upstream treats every bus fault the same way, and `no_std` callers rarely
/// have anywhere better to send the detail than the defmt log of the HAL
/// implementation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// A write (or the write half of a write-then-read) failed.
    Write,
    /// The read half of a write-then-read failed.
    Read,
}

#[cfg(feature = "std")]
impl std::error::Error for BusError {}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Write => write!(f, "bus write failed"),
            Self::Read => write!(f, "bus read failed"),
        }
    }
}

// ── CommandBus ───────────────────────────────────────────────────────────────

/// Byte-frame transport to the device's control port.
///
/// Implementations must issue each method as a single bus transaction; the
/// device treats a start/stop (or chip-select cycle) as a frame boundary.
pub trait CommandBus {
    /// Transmit one command frame.
    fn write(&mut self, frame: &[u8]) -> Result<(), BusError>;

    /// Transmit `header` followed by `payload` as one frame.
    fn write_split(&mut self, header: &[u8], payload: &[u8]) -> Result<(), BusError>;

    /// Transmit `frame`, then read `read.len()` response bytes in the same
    /// transaction (I2C repeated start / continued SPI transfer).
    fn write_then_read(&mut self, frame: &[u8], read: &mut [u8]) -> Result<(), BusError>;
}

/// [`CommandBus`] over a blocking I2C bus at a fixed 7-bit address.
///
/// The AK7738 answers at 0x1C–0x1F depending on the CAD1/CAD0 pin strapping.
pub struct I2cCommandBus<I> {
    i2c: I,
    addr: u8,
}

/// AK7738 7-bit I2C address with CAD1 and CAD0 both strapped low.
pub const AK7738_I2C_ADDR_BASE: u8 = 0x1C;

impl<I: I2c> I2cCommandBus<I> {
    /// Wrap an I2C bus; `addr` is the 7-bit device address.
    pub fn new(i2c: I, addr: u8) -> Self {
        Self { i2c, addr }
    }

    /// Release the underlying bus.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> CommandBus for I2cCommandBus<I> {
    fn write(&mut self, frame: &[u8]) -> Result<(), BusError> {
        self.i2c.write(self.addr, frame).map_err(|_| BusError::Write)
    }

    fn write_split(&mut self, header: &[u8], payload: &[u8]) -> Result<(), BusError> {
        // Two Write operations in one transaction are joined without a
        // repeated start, so the device sees a single contiguous frame.
        self.i2c
            .transaction(
                self.addr,
                &mut [I2cOperation::Write(header), I2cOperation::Write(payload)],
            )
            .map_err(|_| BusError::Write)
    }

    fn write_then_read(&mut self, frame: &[u8], read: &mut [u8]) -> Result<(), BusError> {
        self.i2c
            .write_read(self.addr, frame, read)
            .map_err(|_| BusError::Read)
    }
}

/// [`CommandBus`] over a blocking SPI device (CS handled by the HAL).
pub struct SpiCommandBus<S> {
    spi: S,
}

impl<S: SpiDevice> SpiCommandBus<S> {
    /// Wrap an SPI device. Mode 3, MSB first, per the control-port timing.
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    /// Release the underlying device.
    pub fn release(self) -> S {
        self.spi
    }
}

impl<S: SpiDevice> CommandBus for SpiCommandBus<S> {
    fn write(&mut self, frame: &[u8]) -> Result<(), BusError> {
        self.spi.write(frame).map_err(|_| BusError::Write)
    }

    fn write_split(&mut self, header: &[u8], payload: &[u8]) -> Result<(), BusError> {
        self.spi
            .transaction(&mut [SpiOperation::Write(header), SpiOperation::Write(payload)])
            .map_err(|_| BusError::Write)
    }

    fn write_then_read(&mut self, frame: &[u8], read: &mut [u8]) -> Result<(), BusError> {
        self.spi
            .transaction(&mut [SpiOperation::Write(frame), SpiOperation::Read(read)])
            .map_err(|_| BusError::Read)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockI2c {
        frames: std::vec::Vec<(u8, std::vec::Vec<u8>)>,
        response: std::vec::Vec<u8>,
    }
    impl embedded_hal::i2c::ErrorType for MockI2c {
        type Error = core::convert::Infallible;
    }
    impl embedded_hal::i2c::I2c for MockI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [embedded_hal::i2c::Operation<'_>],
        ) -> Result<(), Self::Error> {
            let mut frame = std::vec::Vec::new();
            for op in operations.iter_mut() {
                match op {
                    embedded_hal::i2c::Operation::Write(data) => frame.extend_from_slice(data),
                    embedded_hal::i2c::Operation::Read(buf) => {
                        for (dst, src) in buf.iter_mut().zip(self.response.iter()) {
                            *dst = *src;
                        }
                    }
                }
            }
            self.frames.push((address, frame));
            Ok(())
        }
    }

    #[test]
    fn command_header_is_big_endian() {
        assert_eq!(command_header(CMD_WRITE_CRAM, 0x0123), [0xB4, 0x01, 0x23]);
    }

    #[test]
    fn runtime_base_does_not_collide_with_bulk_opcodes() {
        for words in 1..=24u8 {
            let cmd = CMD_RUNTIME_CRAM_BASE | words;
            assert_ne!(cmd, CMD_WRITE_PRAM);
            assert_ne!(cmd, CMD_WRITE_CRAM);
            assert_ne!(cmd, CMD_WRITE_REG);
        }
    }

    #[test]
    fn i2c_write_split_is_one_contiguous_frame() {
        let mut bus = I2cCommandBus::new(MockI2c::default(), AK7738_I2C_ADDR_BASE);
        bus.write_split(&[0xB4, 0x00, 0x10], &[1, 2, 3]).unwrap();
        let i2c = bus.release();
        assert_eq!(i2c.frames.len(), 1);
        assert_eq!(i2c.frames[0].0, AK7738_I2C_ADDR_BASE);
        assert_eq!(i2c.frames[0].1, [0xB4, 0x00, 0x10, 1, 2, 3]);
    }

    #[test]
    fn i2c_write_then_read_fills_buffer() {
        let mut i2c = MockI2c::default();
        i2c.response = std::vec![0xAB, 0xCD];
        let mut bus = I2cCommandBus::new(i2c, AK7738_I2C_ADDR_BASE);
        let mut out = [0u8; 2];
        bus.write_then_read(&[CMD_READ_CRC], &mut out).unwrap();
        assert_eq!(out, [0xAB, 0xCD]);
    }
}
