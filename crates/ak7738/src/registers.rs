//! Control-register map and per-register access properties.
//!
//! Only the registers this driver owns are modelled: system clock / PLL
//! setup, the four sync-domain settings, reset and download control, and the
//! DAC output mute. Power, mic-bias, mixer-routing and I/O-format registers
//! belong to the board/audio-framework glue and are out of scope here.

/// System clock setting 1.
///
/// | Bits | Field   | Meaning                                              |
/// |------|---------|------------------------------------------------------|
/// | 3    | XTLSEL  | Crystal frequency: 0 = 12.288 MHz, 1 = 18.432 MHz    |
/// | 1:0  | PLS     | PLL reference: 0 = XTI, 1–3 = BICK pin of SD1–SD3    |
pub const REG_SYSTEM_CLOCK_1: u8 = 0x00;
/// System clock setting 2: bits 4:0 = PLI, index into the PLL
/// input-frequency table (0–17).
pub const REG_SYSTEM_CLOCK_2: u8 = 0x01;

/// First sync-domain setting register (SD1 setting 1).
///
/// Each domain occupies three consecutive registers starting here: for
/// domain `n`, `0x03 + 3n` is SETTING1, `0x04 + 3n` is SETTING2 and
/// `0x05 + 3n` is the 8-bit BDV bit-clock divider.
///
/// SETTING1 layout:
///
/// | Bits | Field | Meaning                                            |
/// |------|-------|----------------------------------------------------|
/// | 7    | MS    | 1 = this domain masters its bit/frame clocks       |
/// | 6:4  | CKS   | clock source (see `ClockSource::to_bits`)          |
/// | 2:0  | FS    | sampling-frequency class (see `SampleClass`)       |
///
/// SETTING2 layout: bits 2:0 = BCKR, the bit-clock ratio
/// (see `BickRatio::to_bits`).
pub const REG_SYNC_DOMAIN_BASE: u8 = 0x03;

/// Clock/DSP reset control. Volatile: a co-controller may legitimately halt
/// the DSP between our operations, so this is always read from hardware.
pub const REG_RESET_CONTROL: u8 = 0x10;
/// RESET_CONTROL bit 0: clock reset released (1 = clocks running).
pub const RESET_CKRESETN: u8 = 1 << 0;
/// RESET_CONTROL bit 1: DSP core reset released (1 = DSP running).
pub const RESET_DSPRESETN: u8 = 1 << 1;

/// Download-mode control (write-only command register).
pub const REG_DOWNLOAD_CONTROL: u8 = 0x11;
/// DOWNLOAD_CONTROL bit 0: PRAM download mode.
pub const DOWNLOAD_DLP: u8 = 1 << 0;
/// DOWNLOAD_CONTROL bit 1: CRAM download mode.
pub const DOWNLOAD_DLC: u8 = 1 << 1;

/// DAC output soft mute: bit 0 = DAC1, bit 1 = DAC2.
pub const REG_OUTPUT_MUTE: u8 = 0x1A;
/// All output channels muted.
pub const MUTE_ALL: u8 = 0b11;

/// Highest modelled register address.
pub const MAX_REGISTER: u8 = REG_OUTPUT_MUTE;
/// Number of addressable registers in the cache.
pub const REGISTER_COUNT: usize = MAX_REGISTER as usize + 1;

/// SYSTEM_CLOCK_1 crystal-select bit (1 = 18.432 MHz).
pub const SYSCLK1_XTLSEL: u8 = 1 << 3;
/// SYSTEM_CLOCK_1 PLL-reference-select field mask.
pub const SYSCLK1_PLS_MASK: u8 = 0b0000_0011;
/// SYSTEM_CLOCK_2 PLL input-frequency index field mask.
pub const SYSCLK2_PLI_MASK: u8 = 0b0001_1111;

/// SETTING1 master/slave bit.
pub const SETTING1_MASTER: u8 = 1 << 7;
/// SETTING1 clock-source field mask.
pub const SETTING1_SOURCE_MASK: u8 = 0b0111_0000;
/// SETTING1 clock-source field shift.
pub const SETTING1_SOURCE_SHIFT: u8 = 4;
/// SETTING1 sampling-frequency-class field mask.
pub const SETTING1_FS_MASK: u8 = 0b0000_0111;
/// SETTING2 bit-clock-ratio field mask.
pub const SETTING2_RATIO_MASK: u8 = 0b0000_0111;

/// Access properties of one control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterProperties {
    /// Register contents can be read back over the bus.
    pub readable: bool,
    /// Register accepts writes.
    pub writeable: bool,
    /// Contents can change behind the driver's back; reads must go to the
    /// hardware and writes must never be elided.
    pub volatile: bool,
}

/// Look up the access properties of `addr`, or `None` for addresses this
/// driver does not model (reserved, or owned by out-of-scope glue).
#[must_use]
pub fn register_properties(addr: u8) -> Option<RegisterProperties> {
    const CACHED_RW: RegisterProperties = RegisterProperties {
        readable: true,
        writeable: true,
        volatile: false,
    };
    match addr {
        REG_SYSTEM_CLOCK_1 | REG_SYSTEM_CLOCK_2 => Some(CACHED_RW),
        // SD1..SD4 SETTING1/SETTING2/BDV triplets.
        0x03..=0x0E => Some(CACHED_RW),
        REG_RESET_CONTROL => Some(RegisterProperties {
            readable: true,
            writeable: true,
            volatile: true,
        }),
        REG_DOWNLOAD_CONTROL => Some(RegisterProperties {
            readable: false,
            writeable: true,
            volatile: true,
        }),
        REG_OUTPUT_MUTE => Some(CACHED_RW),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn sync_domain_registers_do_not_overlap_neighbours() {
        // SD4's BDV register is the last of the block.
        assert_eq!(REG_SYNC_DOMAIN_BASE + 11, 0x0E);
        assert!(REG_SYNC_DOMAIN_BASE + 11 < REG_RESET_CONTROL);
    }

    #[test]
    fn reset_control_is_volatile() {
        let p = register_properties(REG_RESET_CONTROL).unwrap();
        assert!(p.volatile, "co-controllers may halt the DSP; always read hardware");
        assert!(p.readable);
    }

    #[test]
    fn download_control_is_write_only() {
        let p = register_properties(REG_DOWNLOAD_CONTROL).unwrap();
        assert!(!p.readable);
        assert!(p.writeable);
        assert!(p.volatile, "write-only commands must never be cache-elided");
    }

    #[test]
    fn unmodelled_addresses_have_no_properties() {
        assert_eq!(register_properties(0x02), None);
        assert_eq!(register_properties(0x0F), None);
        assert_eq!(register_properties(0xFF), None);
    }

    #[test]
    fn setting1_fields_do_not_overlap() {
        assert_eq!(SETTING1_MASTER & SETTING1_SOURCE_MASK, 0);
        assert_eq!(SETTING1_MASTER & SETTING1_FS_MASK, 0);
        assert_eq!(SETTING1_SOURCE_MASK & SETTING1_FS_MASK, 0);
    }

    #[test]
    fn register_count_covers_mute_register() {
        assert_eq!(REGISTER_COUNT, 0x1B);
        assert!(register_properties(MAX_REGISTER).is_some());
    }
}
