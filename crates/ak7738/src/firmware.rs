//! Firmware image and coefficient-patch framing rules.
//!
//! The DSP's program memory (PRAM) and coefficient memory (CRAM) are loaded
//! as opaque binary blobs through the command protocol. This module holds
//! the pure framing rules — word sizes, per-device capacity limits, the
//! runtime-patch command encoding — so they can be validated without a bus.
//! The transfer sequencing itself (mute, reset snapshot, retry) lives on the
//! device handle.

use crate::error::Error;
use crate::transport::{CMD_RUNTIME_CRAM_BASE, CMD_WRITE_CRAM, CMD_WRITE_PRAM};

/// Bytes of command + big-endian address preceding every bulk payload.
pub const COMMAND_HEADER_BYTES: usize = 3;
/// PRAM word size: 40-bit DSP instructions.
pub const PRAM_WORD_BYTES: usize = 5;
/// CRAM word size: 24-bit coefficients.
pub const CRAM_WORD_BYTES: usize = 3;
/// Maximum CRAM words in one runtime patch; the word count is carried in
/// the low bits of the command byte.
pub const RUNTIME_PATCH_MAX_WORDS: usize = 24;
/// Bulk transfer attempt bound (checksum mismatch or bus fault).
pub const MAX_TRANSFER_ATTEMPTS: u8 = 3;

/// Which DSP memory a transfer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryKind {
    /// Program memory.
    Pram,
    /// Coefficient memory.
    Cram,
}

impl MemoryKind {
    /// Bulk-download command opcode for this memory.
    #[must_use]
    pub fn command(self) -> u8 {
        match self {
            Self::Pram => CMD_WRITE_PRAM,
            Self::Cram => CMD_WRITE_CRAM,
        }
    }

    /// Word size of this memory in bytes.
    #[must_use]
    pub fn word_bytes(self) -> usize {
        match self {
            Self::Pram => PRAM_WORD_BYTES,
            Self::Cram => CRAM_WORD_BYTES,
        }
    }

    /// DOWNLOAD_CONTROL bit that opens this memory for download.
    #[must_use]
    pub fn download_bit(self) -> u8 {
        match self {
            Self::Pram => crate::registers::DOWNLOAD_DLP,
            Self::Cram => crate::registers::DOWNLOAD_DLC,
        }
    }
}

/// Per-device memory capacities, expressed as the maximum total frame
/// (command header + payload) a download may occupy.
///
/// These are device-family constants, not protocol universals; targets
/// other than the AK7738 supply their own values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryLimits {
    /// Maximum PRAM download frame in bytes.
    pub pram_max_frame: usize,
    /// Maximum CRAM download frame in bytes.
    pub cram_max_frame: usize,
}

impl MemoryLimits {
    /// AK7738 capacities: 4096 × 5-byte PRAM words and 6144 × 3-byte CRAM
    /// words, each plus the 3-byte command header.
    pub const AK7738: Self = Self {
        pram_max_frame: 20_483,
        cram_max_frame: 18_435,
    };

    /// Maximum payload (frame minus command header) for `kind`.
    #[must_use]
    pub fn payload_cap(&self, kind: MemoryKind) -> usize {
        let frame = match kind {
            MemoryKind::Pram => self.pram_max_frame,
            MemoryKind::Cram => self.cram_max_frame,
        };
        frame.saturating_sub(COMMAND_HEADER_BYTES)
    }
}

/// An opaque firmware blob bound for one DSP memory.
///
/// Transient request object: constructed by the caller, consumed by a
/// single transfer call.
#[derive(Debug, Clone, Copy)]
pub struct FirmwareImage<'a> {
    /// Target memory.
    pub kind: MemoryKind,
    /// Raw image contents.
    pub bytes: &'a [u8],
}

impl<'a> FirmwareImage<'a> {
    /// Bind `bytes` to a target memory.
    #[must_use]
    pub fn new(kind: MemoryKind, bytes: &'a [u8]) -> Self {
        Self { kind, bytes }
    }

    /// Check the image against the device capacity and word granularity.
    #[allow(clippy::arithmetic_side_effects)] // word sizes are nonzero constants
    pub fn validate(&self, limits: &MemoryLimits) -> Result<(), Error> {
        let cap = limits.payload_cap(self.kind);
        if self.bytes.len() > cap {
            return Err(Error::ImageTooLarge {
                len: self.bytes.len(),
                max: cap,
            });
        }
        let word = self.kind.word_bytes();
        if self.bytes.len() % word != 0 {
            return Err(Error::ImageNotWordAligned {
                len: self.bytes.len(),
                word_bytes: word,
            });
        }
        Ok(())
    }
}

/// Validate a runtime coefficient patch and return its command byte.
///
/// The runtime frame carries the word count in the low bits of the command
/// byte, which caps a single patch at [`RUNTIME_PATCH_MAX_WORDS`] words —
/// far below the bulk path's capacity.
#[allow(clippy::arithmetic_side_effects)] // word size is a nonzero constant
pub fn runtime_patch_command(payload_len: usize) -> Result<u8, Error> {
    if payload_len % CRAM_WORD_BYTES != 0 {
        return Err(Error::ImageNotWordAligned {
            len: payload_len,
            word_bytes: CRAM_WORD_BYTES,
        });
    }
    let words = payload_len / CRAM_WORD_BYTES;
    if words == 0 || words > RUNTIME_PATCH_MAX_WORDS {
        return Err(Error::InvalidOperationForDeviceState);
    }
    #[allow(clippy::cast_possible_truncation)] // words <= 24
    Ok(CMD_RUNTIME_CRAM_BASE | words as u8)
}
