//! CRC16-CCITT checksum over bulk memory downloads.
//!
//! The DSP accumulates the same checksum over the payload bytes it receives
//! during a download and reports it via the CRC read command, so this
//! implementation must match the silicon bit-for-bit: polynomial 0x1021,
//! initial value 0x0000, MSB-first, no final XOR (the XMODEM variant).

/// Compute CRC16-CCITT (poly 0x1021, init 0x0000, MSB-first, no final XOR).
///
/// Pure and stateless; the empty input yields 0x0000.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // shift/xor on u16, wrap is the algorithm
pub fn crc16_ccitt(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;
    for byte in bytes {
        crc ^= u16::from(*byte) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc16_ccitt(&[]), 0x0000);
    }

    #[test]
    fn single_byte_vector() {
        // XMODEM CRC of ASCII 'A'.
        assert_eq!(crc16_ccitt(b"A"), 0x58E5);
    }

    #[test]
    fn check_string_vector() {
        // The conventional "123456789" check value for CRC-16/XMODEM.
        assert_eq!(crc16_ccitt(b"123456789"), 0x31C3);
    }

    #[test]
    fn all_zero_bytes_stay_zero() {
        // With init 0x0000 and no final XOR, zero input cannot leave the
        // zero state. This is why the transfer engine skips the device CRC
        // read-back when the expected CRC is zero.
        assert_eq!(crc16_ccitt(&[0x00; 64]), 0x0000);
    }

    #[test]
    fn stable_across_repeated_calls() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x42];
        let first = crc16_ccitt(&data);
        for _ in 0..10 {
            assert_eq!(crc16_ccitt(&data), first);
        }
    }

    #[test]
    fn order_sensitive() {
        assert_ne!(crc16_ccitt(&[0x01, 0x02]), crc16_ccitt(&[0x02, 0x01]));
    }
}
