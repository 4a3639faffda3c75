//! Clock-domain and PLL resolution.
//!
//! The device groups its audio ports and DSP blocks into four synchronous
//! clock domains (SD1–SD4). Each domain has a master/slave role, a
//! sampling-frequency class, a bit-clock ratio and a clock source; from
//! those the driver derives the domain's bit-clock frequency, its 8-bit BDV
//! divider and, when the domain is the PLL's reference, the PLL
//! input-frequency table index.
//!
//! Everything in this module is pure: a configuration change is first
//! *planned* — all arithmetic validated, every register value computed —
//! and only then applied to the bus by the device handle. A plan that fails
//! validation therefore never causes a partial register write.

use crate::error::Error;
use crate::registers::REG_SYNC_DOMAIN_BASE;

/// PLL output (VCO) frequency when locked: 122.88 MHz.
///
/// Domains sourced from [`ClockSource::PllOutput`] divide this down to
/// their bit clock via BDV.
pub const PLL_VCO_HZ: u32 = 122_880_000;

/// PLL input-frequency table.
///
/// The PLL locks only to these 18 reference frequencies; the matching table
/// index is written to the PLI field. There is no interpolation and no
/// nearest-match fallback — an unlisted reference is a hard configuration
/// error, mirroring the hardware.
pub const PLL_INPUT_FREQ_TABLE: [u32; 18] = [
    256_000,
    384_000,
    512_000,
    768_000,
    1_024_000,
    1_152_000,
    1_536_000,
    2_048_000,
    2_304_000,
    3_072_000,
    4_096_000,
    4_608_000,
    6_144_000,
    8_192_000,
    9_216_000,
    12_288_000,
    18_432_000,
    24_576_000,
];

/// Exact linear search of [`PLL_INPUT_FREQ_TABLE`].
#[must_use]
pub fn pll_table_index(hz: u32) -> Option<u8> {
    PLL_INPUT_FREQ_TABLE
        .iter()
        .position(|&entry| entry == hz)
        .map(|i| i as u8)
}

// ── Field enums ──────────────────────────────────────────────────────────────

/// Sync-domain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SdId {
    /// Sync domain 1.
    Sd1,
    /// Sync domain 2.
    Sd2,
    /// Sync domain 3.
    Sd3,
    /// Sync domain 4 (no BICK pin).
    Sd4,
}

impl SdId {
    /// All domains, in register order.
    pub const ALL: [Self; 4] = [Self::Sd1, Self::Sd2, Self::Sd3, Self::Sd4];

    /// Zero-based index into the domain register block.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Sd1 => 0,
            Self::Sd2 => 1,
            Self::Sd3 => 2,
            Self::Sd4 => 3,
        }
    }

    /// SD1–SD3 have a physical BICK pin; SD4 does not. Only pinned domains
    /// can feed another domain's clock input or the PLL reference mux.
    #[must_use]
    pub fn has_bick_pin(self) -> bool {
        !matches!(self, Self::Sd4)
    }

    /// Address of this domain's SETTING1 register.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // base 0x03 + at most 9
    pub fn setting1_addr(self) -> u8 {
        REG_SYNC_DOMAIN_BASE + 3 * self.index() as u8
    }

    /// Address of this domain's SETTING2 (bit-clock ratio) register.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn setting2_addr(self) -> u8 {
        self.setting1_addr() + 1
    }

    /// Address of this domain's BDV divider register.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)]
    pub fn bdv_addr(self) -> u8 {
        self.setting1_addr() + 2
    }
}

/// Sampling-frequency class of a sync domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleClass {
    /// 8 kHz.
    Khz8,
    /// 12 kHz.
    Khz12,
    /// 16 kHz.
    Khz16,
    /// 24 kHz.
    Khz24,
    /// 32 kHz.
    Khz32,
    /// 48 kHz.
    Khz48,
    /// 96 kHz.
    Khz96,
}

impl SampleClass {
    /// Sample rate in Hz.
    #[must_use]
    pub fn hz(self) -> u32 {
        match self {
            Self::Khz8 => 8_000,
            Self::Khz12 => 12_000,
            Self::Khz16 => 16_000,
            Self::Khz24 => 24_000,
            Self::Khz32 => 32_000,
            Self::Khz48 => 48_000,
            Self::Khz96 => 96_000,
        }
    }

    /// 3-bit FS field encoding.
    #[must_use]
    pub fn to_bits(self) -> u8 {
        match self {
            Self::Khz8 => 0,
            Self::Khz12 => 1,
            Self::Khz16 => 2,
            Self::Khz24 => 3,
            Self::Khz32 => 4,
            Self::Khz48 => 5,
            Self::Khz96 => 6,
        }
    }

    /// Decode the 3-bit FS field; `None` for the unused encoding 7.
    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Khz8),
            1 => Some(Self::Khz12),
            2 => Some(Self::Khz16),
            3 => Some(Self::Khz24),
            4 => Some(Self::Khz32),
            5 => Some(Self::Khz48),
            6 => Some(Self::Khz96),
            _ => None,
        }
    }
}

/// Bit-clock ratio of a sync domain, in bit-clock cycles per sample frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BickRatio {
    /// 32 × fs.
    Fs32,
    /// 48 × fs.
    Fs48,
    /// 64 × fs.
    Fs64,
    /// 128 × fs.
    Fs128,
    /// 256 × fs.
    Fs256,
}

impl BickRatio {
    /// Ratio as a multiplier of the sample rate.
    #[must_use]
    pub fn multiplier(self) -> u32 {
        match self {
            Self::Fs32 => 32,
            Self::Fs48 => 48,
            Self::Fs64 => 64,
            Self::Fs128 => 128,
            Self::Fs256 => 256,
        }
    }

    /// 3-bit BCKR field encoding.
    #[must_use]
    pub fn to_bits(self) -> u8 {
        match self {
            Self::Fs32 => 0,
            Self::Fs48 => 1,
            Self::Fs64 => 2,
            Self::Fs128 => 3,
            Self::Fs256 => 4,
        }
    }

    /// Decode the 3-bit BCKR field; `None` for the unused encodings 5–7.
    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Fs32),
            1 => Some(Self::Fs48),
            2 => Some(Self::Fs64),
            3 => Some(Self::Fs128),
            4 => Some(Self::Fs256),
            _ => None,
        }
    }
}

/// Clock source of a sync domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// Bit clock held low (domain parked; divider still derived from the
    /// crystal so the field encodings stay valid).
    Low,
    /// Divided down from the 122.88 MHz PLL output.
    PllOutput,
    /// Divided down from the crystal oscillator.
    Crystal,
    /// Another domain's bit clock (SD1–SD3 only; never the domain itself).
    Bick(SdId),
}

impl ClockSource {
    /// 3-bit CKS field encoding.
    #[must_use]
    pub fn to_bits(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::PllOutput => 1,
            Self::Crystal => 2,
            Self::Bick(SdId::Sd1) => 3,
            Self::Bick(SdId::Sd2) => 4,
            Self::Bick(SdId::Sd3) => 5,
            // Unreachable for validated configurations; encode as Low.
            Self::Bick(SdId::Sd4) => 0,
        }
    }

    /// Decode the 3-bit CKS field; `None` for the unused encodings 6–7.
    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Low),
            1 => Some(Self::PllOutput),
            2 => Some(Self::Crystal),
            3 => Some(Self::Bick(SdId::Sd1)),
            4 => Some(Self::Bick(SdId::Sd2)),
            5 => Some(Self::Bick(SdId::Sd3)),
            _ => None,
        }
    }
}

/// Crystal oscillator frequency on the XTI pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrystalFrequency {
    /// 12.288 MHz (256 × 48 kHz family).
    Mhz12_288,
    /// 18.432 MHz (384 × 48 kHz family).
    Mhz18_432,
}

impl CrystalFrequency {
    /// Crystal frequency in Hz.
    #[must_use]
    pub fn hz(self) -> u32 {
        match self {
            Self::Mhz12_288 => 12_288_000,
            Self::Mhz18_432 => 18_432_000,
        }
    }
}

/// PLL reference selection (the PLS field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllReference {
    /// Crystal oscillator.
    Crystal,
    /// BICK pin of the given domain (SD1–SD3).
    BickPin(SdId),
}

impl PllReference {
    /// 2-bit PLS field encoding.
    #[must_use]
    pub fn to_bits(self) -> u8 {
        match self {
            Self::Crystal => 0,
            Self::BickPin(SdId::Sd1) => 1,
            Self::BickPin(SdId::Sd2) => 2,
            Self::BickPin(SdId::Sd3) => 3,
            // Unreachable for validated configurations; encode as crystal.
            Self::BickPin(SdId::Sd4) => 0,
        }
    }
}

// ── Domain state ─────────────────────────────────────────────────────────────

/// Logical configuration of one sync domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncDomain {
    /// Domain masters its bit/frame clocks (vs. receiving them).
    pub master: bool,
    /// Sampling-frequency class.
    pub sample_class: SampleClass,
    /// Bit-clock ratio.
    pub ratio: BickRatio,
    /// Clock source.
    pub source: ClockSource,
}

impl SyncDomain {
    /// Resolved bit-clock frequency: ratio × sample rate.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // max 256 × 96 kHz = 24.576 MHz
    pub fn bick_hz(&self) -> u32 {
        self.ratio.multiplier() * self.sample_class.hz()
    }

    /// Encode this domain's SETTING1 register value.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // 3-bit field shifted into bits 6:4
    pub fn setting1_bits(&self) -> u8 {
        let master = if self.master {
            crate::registers::SETTING1_MASTER
        } else {
            0
        };
        master | (self.source.to_bits() << crate::registers::SETTING1_SOURCE_SHIFT)
            | self.sample_class.to_bits()
    }

    /// Encode this domain's SETTING2 register value.
    #[must_use]
    pub fn setting2_bits(&self) -> u8 {
        self.ratio.to_bits()
    }
}

impl Default for SyncDomain {
    /// Power-on defaults: slave, 48 kHz, 64 × fs, bit clock parked low.
    fn default() -> Self {
        Self {
            master: false,
            sample_class: SampleClass::Khz48,
            ratio: BickRatio::Fs64,
            source: ClockSource::Low,
        }
    }
}

// ── Divider math ─────────────────────────────────────────────────────────────

/// Compute the BDV divider for `target_hz` derived from `reference_hz`.
///
/// The division must be exact and nonzero; a quotient above the 8-bit field
/// range is clamped to 255 with a logged warning (the hardware truncates
/// silently, which is worse).
#[allow(clippy::arithmetic_side_effects)] // division guarded by the checks above it
pub fn bick_divider(reference_hz: u32, target_hz: u32) -> Result<u8, Error> {
    if target_hz == 0 || reference_hz < target_hz || reference_hz % target_hz != 0 {
        return Err(Error::InvalidDivisor);
    }
    let quotient = reference_hz / target_hz;
    if quotient > 255 {
        #[cfg(feature = "defmt")]
        defmt::warn!("BDV divisor {} exceeds the 8-bit field, clamping to 255", quotient);
        return Ok(255);
    }
    #[allow(clippy::cast_possible_truncation)] // quotient <= 255 checked above
    Ok(quotient as u8)
}

// ── Plans ────────────────────────────────────────────────────────────────────

/// Fully validated PLL reconfiguration, ready to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PllPlan {
    /// Reference the PLL will lock to.
    pub reference: PllReference,
    /// Reference frequency in Hz (diagnostic).
    pub reference_hz: u32,
    /// Matching index into [`PLL_INPUT_FREQ_TABLE`].
    pub table_index: u8,
}

/// Fully validated single-domain reconfiguration, ready to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainPlan {
    /// Domain being reconfigured.
    pub id: SdId,
    /// New logical state, committed only after the writes succeed.
    pub domain: SyncDomain,
    /// SETTING1 value (role, source, FS class).
    pub setting1: u8,
    /// SETTING2 value (bit-clock ratio).
    pub setting2: u8,
    /// BDV divider value.
    pub bdv: u8,
    /// PLL reconfiguration coupled to this change, if the domain feeds the
    /// PLL (or just started to).
    pub pll: Option<PllPlan>,
}

/// Logical clock configuration of the whole device.
///
/// Pure state: planning methods validate a change and return the register
/// values to write; `commit` mutates the state after the device handle has
/// applied them.
#[derive(Debug, Clone)]
pub struct ClockState {
    domains: [SyncDomain; 4],
    crystal: CrystalFrequency,
    pll_reference: PllReference,
}

impl ClockState {
    /// Power-on logical state with the given crystal.
    #[must_use]
    pub fn new(crystal: CrystalFrequency) -> Self {
        Self {
            domains: [SyncDomain::default(); 4],
            crystal,
            pll_reference: PllReference::Crystal,
        }
    }

    /// Current configuration of `id`.
    #[must_use]
    pub fn domain(&self, id: SdId) -> &SyncDomain {
        // Index is 0..=3 by construction.
        #[allow(clippy::indexing_slicing)]
        &self.domains[id.index()]
    }

    /// Crystal frequency.
    #[must_use]
    pub fn crystal(&self) -> CrystalFrequency {
        self.crystal
    }

    /// Current PLL reference.
    #[must_use]
    pub fn pll_reference(&self) -> PllReference {
        self.pll_reference
    }

    /// Plan a sampling-frequency-class change.
    pub fn plan_rate(&self, id: SdId, sample_class: SampleClass) -> Result<DomainPlan, Error> {
        let mut next = *self.domain(id);
        next.sample_class = sample_class;
        self.plan_domain(id, next)
    }

    /// Plan a bit-clock-ratio change.
    pub fn plan_ratio(&self, id: SdId, ratio: BickRatio) -> Result<DomainPlan, Error> {
        let mut next = *self.domain(id);
        next.ratio = ratio;
        self.plan_domain(id, next)
    }

    /// Plan a clock-source change.
    pub fn plan_source(&self, id: SdId, source: ClockSource) -> Result<DomainPlan, Error> {
        let mut next = *self.domain(id);
        next.source = source;
        self.plan_domain(id, next)
    }

    /// Plan a master/slave role change.
    ///
    /// The frequency fields are untouched, but the device requires the
    /// clock-source field to be physically re-written whenever the role bit
    /// toggles; the device handle applies this plan with a forced SETTING1
    /// write.
    pub fn plan_master(&self, id: SdId, master: bool) -> Result<DomainPlan, Error> {
        let mut next = *self.domain(id);
        next.master = master;
        self.plan_domain(id, next)
    }

    /// Plan a PLL resolution against the current reference.
    pub fn plan_pll(&self) -> Result<PllPlan, Error> {
        self.plan_pll_as(self.pll_reference)
    }

    /// Plan a PLL resolution against an explicitly selected reference.
    pub fn plan_pll_as(&self, reference: PllReference) -> Result<PllPlan, Error> {
        if let PllReference::BickPin(id) = reference {
            if !id.has_bick_pin() {
                return Err(Error::InvalidClockSource);
            }
        }
        let reference_hz = match reference {
            PllReference::Crystal => self.crystal.hz(),
            PllReference::BickPin(id) => self.domain(id).bick_hz(),
        };
        let table_index =
            pll_table_index(reference_hz).ok_or(Error::UnsupportedPllFrequency { hz: reference_hz })?;
        Ok(PllPlan {
            reference,
            reference_hz,
            table_index,
        })
    }

    /// Commit a previously applied plan to the logical state.
    pub fn commit(&mut self, plan: &DomainPlan) {
        #[allow(clippy::indexing_slicing)] // index is 0..=3 by construction
        {
            self.domains[plan.id.index()] = plan.domain;
        }
        if let Some(pll) = &plan.pll {
            self.pll_reference = pll.reference;
        }
    }

    /// Commit a standalone PLL plan.
    pub fn commit_pll(&mut self, plan: &PllPlan) {
        self.pll_reference = plan.reference;
    }

    /// Validate `next` for domain `id` and compute every register value the
    /// change requires, including a coupled PLL recomputation when this
    /// domain feeds (or begins to feed) the PLL.
    fn plan_domain(&self, id: SdId, next: SyncDomain) -> Result<DomainPlan, Error> {
        // Source must be expressible before any arithmetic.
        if let ClockSource::Bick(src) = next.source {
            if src == id || !src.has_bick_pin() {
                return Err(Error::InvalidClockSource);
            }
        }

        let target_hz = next.bick_hz();
        let reference_hz = match next.source {
            ClockSource::Low | ClockSource::Crystal => self.crystal.hz(),
            ClockSource::PllOutput => PLL_VCO_HZ,
            ClockSource::Bick(src) => self.domain(src).bick_hz(),
        };
        let bdv = bick_divider(reference_hz, target_hz)?;

        // PLL coupling. Selecting PllOutput on a pinned domain re-locks the
        // PLL onto that domain's BICK pin; otherwise the PLL is recomputed
        // iff this domain is already the reference and its bit clock moved.
        let mut with_change = self.clone();
        #[allow(clippy::indexing_slicing)] // index is 0..=3 by construction
        {
            with_change.domains[id.index()] = next;
        }
        let pll = if next.source == ClockSource::PllOutput && id.has_bick_pin() {
            with_change.pll_reference = PllReference::BickPin(id);
            Some(with_change.plan_pll()?)
        } else if self.pll_reference == PllReference::BickPin(id)
            && next.bick_hz() != self.domain(id).bick_hz()
        {
            Some(with_change.plan_pll()?)
        } else {
            None
        };

        Ok(DomainPlan {
            id,
            domain: next,
            setting1: next.setting1_bits(),
            setting2: next.setting2_bits(),
            bdv,
            pll,
        })
    }
}
