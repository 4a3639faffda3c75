//! Driver error taxonomy.
//!
//! Clock-math failures (`InvalidDivisor`, `InvalidClockSource`,
//! `UnsupportedPllFrequency`) are purely local: the resolver validates the
//! full arithmetic before issuing any register write, so a failed clock call
//! leaves the device exactly as it was. Transfer failures are retried
//! internally up to the attempt bound before surfacing; by the time a
//! transfer error reaches the caller, the reset bits and mute state have
//! been restored to their pre-call values.

use crate::transport::BusError;

/// Errors returned by clock-domain and firmware-transfer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A bit-clock divisor did not come out as an exact nonzero integer.
    ///
    /// The device divides clocks; it never rounds. A source bit clock that
    /// is not an exact integer multiple of the target is a configuration
    /// error, not something to approximate.
    InvalidDivisor,
    /// A clock-source selection the device cannot express: a domain sourcing
    /// its own bit clock, or a BICK reference to a domain without a BICK pin.
    InvalidClockSource,
    /// The PLL reference frequency matched no entry of the input-frequency
    /// table. The PLL locks only to the tabulated frequencies; there is no
    /// nearest-match fallback in hardware.
    UnsupportedPllFrequency {
        /// The unmatched reference frequency in Hz.
        hz: u32,
    },
    /// Transport-level failure.
    Bus(BusError),
    /// The device-reported CRC over a bulk download disagreed with the CRC
    /// computed over the image that was sent.
    ChecksumMismatch {
        /// CRC16-CCITT computed host-side over the transmitted image.
        expected: u16,
        /// CRC16 the device reported for the received range.
        reported: u16,
    },
    /// A transfer kept failing (bus fault or checksum mismatch) until the
    /// attempt bound was exhausted.
    ExhaustedRetries {
        /// Number of attempts performed (always the configured bound).
        attempts: u8,
    },
    /// The requested operation is not legal in the device's current state,
    /// e.g. a runtime coefficient patch larger than the runtime frame format
    /// can carry while the DSP is running.
    InvalidOperationForDeviceState,
    /// A firmware image or patch exceeds the target memory's capacity.
    ImageTooLarge {
        /// Offending payload length in bytes.
        len: usize,
        /// Maximum payload the target memory accepts.
        max: usize,
    },
    /// A firmware payload is not a whole number of memory words.
    ImageNotWordAligned {
        /// Offending payload length in bytes.
        len: usize,
        /// Word size of the target memory in bytes.
        word_bytes: usize,
    },
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidDivisor => write!(f, "bit-clock divisor is not an exact nonzero integer"),
            Self::InvalidClockSource => write!(f, "clock source not expressible by the device"),
            Self::UnsupportedPllFrequency { hz } => {
                write!(f, "PLL reference {hz} Hz matches no input-frequency table entry")
            }
            Self::Bus(e) => write!(f, "bus error: {e}"),
            Self::ChecksumMismatch { expected, reported } => write!(
                f,
                "download CRC mismatch: expected {expected:#06X}, device reported {reported:#06X}"
            ),
            Self::ExhaustedRetries { attempts } => {
                write!(f, "transfer failed after {attempts} attempts")
            }
            Self::InvalidOperationForDeviceState => {
                write!(f, "operation not legal in the current device state")
            }
            Self::ImageTooLarge { len, max } => {
                write!(f, "image of {len} bytes exceeds memory capacity of {max} bytes")
            }
            Self::ImageNotWordAligned { len, word_bytes } => {
                write!(f, "payload of {len} bytes is not a multiple of the {word_bytes}-byte word size")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_error_converts() {
        let e: Error = BusError::Write.into();
        assert_eq!(e, Error::Bus(BusError::Write));
    }

    #[cfg(feature = "std")]
    #[test]
    fn error_types_implement_std_error() {
        fn assert_std_error<E: std::error::Error>() {}
        assert_std_error::<Error>();
        assert_std_error::<BusError>();
    }

    #[test]
    fn checksum_mismatch_display_is_hex() {
        let e = Error::ChecksumMismatch { expected: 0x31C3, reported: 0x0000 };
        let s = std::format!("{e}");
        assert!(s.contains("0x31C3"));
        assert!(s.contains("0x0000"));
    }
}
