//! End-to-end clock-domain scenarios against the mocked control port.

#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]

mod common;

use ak7738::registers::{
    REG_SYSTEM_CLOCK_1, REG_SYSTEM_CLOCK_2, SETTING1_MASTER, SYSCLK1_PLS_MASK, SYSCLK2_PLI_MASK,
};
use ak7738::{
    Ak7738, BickRatio, ClockSource, CrystalFrequency, Error, SampleClass, SdId,
};
use common::{MockBus, MockDelay};

fn codec_12288() -> Ak7738<MockBus, MockDelay> {
    Ak7738::new(MockBus::new(), MockDelay, CrystalFrequency::Mhz12_288)
}

#[test]
fn pll_output_source_programs_divider_and_pll() {
    // SD1 at its 48 kHz / 64 fs defaults, sourced from the PLL output:
    // the PLL re-locks onto SD1's own BICK pin at 3.072 MHz (table index 9)
    // and BDV divides the 122.88 MHz VCO by 40.
    let mut codec = codec_12288();
    codec
        .set_domain_clock_source(SdId::Sd1, ClockSource::PllOutput)
        .unwrap();

    let (bus, _) = codec.release();
    assert_eq!(bus.writes_to(SdId::Sd1.bdv_addr()), [40]);
    let clk2 = bus.regs[usize::from(REG_SYSTEM_CLOCK_2)];
    assert_eq!(clk2 & SYSCLK2_PLI_MASK, 9);
    // PLS field selects SD1's BICK pin (encoding 1).
    let clk1 = bus.regs[usize::from(REG_SYSTEM_CLOCK_1)];
    assert_eq!(clk1 & SYSCLK1_PLS_MASK, 1);
}

#[test]
fn configuration_order_does_not_matter() {
    // Rate-then-ratio and ratio-then-rate converge on identical registers.
    let mut a = codec_12288();
    a.set_domain_rate(SdId::Sd2, SampleClass::Khz96).unwrap();
    a.set_domain_ratio(SdId::Sd2, BickRatio::Fs32).unwrap();

    let mut b = codec_12288();
    b.set_domain_ratio(SdId::Sd2, BickRatio::Fs32).unwrap();
    b.set_domain_rate(SdId::Sd2, SampleClass::Khz96).unwrap();

    let (bus_a, _) = a.release();
    let (bus_b, _) = b.release();
    assert_eq!(bus_a.regs, bus_b.regs);
}

#[test]
fn inexact_divisor_writes_nothing() {
    // SD2's 3.072 MHz bit clock cannot be divided down to 2.304 MHz
    // (48 kHz × 48 fs): 3072/2304 is not an integer. The whole change is
    // rejected before any register write.
    let mut codec = codec_12288();
    codec.set_domain_rate(SdId::Sd2, SampleClass::Khz48).unwrap();
    codec
        .set_domain_clock_source(SdId::Sd3, ClockSource::Bick(SdId::Sd2))
        .unwrap();
    let before = *codec.domain(SdId::Sd3);

    let err = codec
        .set_domain_ratio(SdId::Sd3, BickRatio::Fs48)
        .unwrap_err();
    assert_eq!(err, Error::InvalidDivisor);
    assert_eq!(*codec.domain(SdId::Sd3), before);

    // No SETTING2 or BDV write for the failed change.
    let (bus, _) = codec.release();
    assert_eq!(bus.writes_to(SdId::Sd3.setting2_addr()).len(), 1);
    assert_eq!(bus.writes_to(SdId::Sd3.bdv_addr()).len(), 1);
}

#[test]
fn master_toggle_rewrites_setting1_even_when_unchanged_elsewhere() {
    // The device latches the clock-source field only together with the
    // role bit, so SETTING1 must hit the bus on every role toggle even
    // though elision would normally suppress the second identical write.
    let mut codec = codec_12288();
    codec.set_domain_master(SdId::Sd1, true).unwrap();
    codec.set_domain_master(SdId::Sd1, false).unwrap();
    codec.set_domain_master(SdId::Sd1, true).unwrap();

    let (bus, _) = codec.release();
    let writes = bus.writes_to(SdId::Sd1.setting1_addr());
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[0] & SETTING1_MASTER, SETTING1_MASTER);
    assert_eq!(writes[1] & SETTING1_MASTER, 0);
    assert_eq!(writes[2] & SETTING1_MASTER, SETTING1_MASTER);
}

#[test]
fn repeated_identical_rate_is_elided() {
    let mut codec = codec_12288();
    codec.set_domain_rate(SdId::Sd2, SampleClass::Khz96).unwrap();
    codec.set_domain_rate(SdId::Sd2, SampleClass::Khz96).unwrap();
    let (bus, _) = codec.release();
    // The second identical call produced no register traffic.
    assert_eq!(bus.writes_to(SdId::Sd2.setting1_addr()).len(), 1);
    assert_eq!(bus.writes_to(SdId::Sd2.bdv_addr()).len(), 1);
}

#[test]
fn rate_change_on_pll_reference_domain_updates_pli_field() {
    let mut codec = codec_12288();
    codec
        .set_domain_clock_source(SdId::Sd1, ClockSource::PllOutput)
        .unwrap();
    codec.set_domain_rate(SdId::Sd1, SampleClass::Khz96).unwrap();

    let (bus, _) = codec.release();
    // 96 kHz × 64 fs = 6.144 MHz, table index 12.
    assert_eq!(bus.regs[usize::from(REG_SYSTEM_CLOCK_2)] & SYSCLK2_PLI_MASK, 12);
    // New VCO divider: 122.88 MHz / 6.144 MHz = 20.
    assert_eq!(*bus.writes_to(SdId::Sd1.bdv_addr()).last().unwrap(), 20);
}

#[test]
fn failed_pll_resolution_writes_nothing() {
    use ak7738::PllReference;

    // SD1 at 12 kHz / 48 fs has a 576 kHz bit clock, absent from the PLL
    // input table. The reference selection must fail without any traffic.
    let mut codec = Ak7738::new(MockBus::new(), MockDelay, CrystalFrequency::Mhz18_432);
    codec.set_domain_rate(SdId::Sd1, SampleClass::Khz12).unwrap();
    codec.set_domain_ratio(SdId::Sd1, BickRatio::Fs48).unwrap();

    let err = codec
        .resolve_pll(PllReference::BickPin(SdId::Sd1))
        .unwrap_err();
    assert_eq!(err, Error::UnsupportedPllFrequency { hz: 576_000 });

    let (bus, _) = codec.release();
    assert!(bus.writes_to(REG_SYSTEM_CLOCK_1).is_empty());
    assert!(bus.writes_to(REG_SYSTEM_CLOCK_2).is_empty());
}

#[test]
fn crystal_sourced_domain_uses_crystal_divider() {
    let mut codec = codec_12288();
    codec
        .set_domain_clock_source(SdId::Sd2, ClockSource::Crystal)
        .unwrap();
    let (bus, _) = codec.release();
    // 12.288 MHz / 3.072 MHz = 4.
    assert_eq!(bus.writes_to(SdId::Sd2.bdv_addr()), [4]);
}
