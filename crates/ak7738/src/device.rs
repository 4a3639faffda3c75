//! The AK7738 device handle.
//!
//! One [`Ak7738`] owns everything needed to talk to one codec: the command
//! bus, a delay provider, the register cache and the logical clock state.
//! All operations take `&mut self`, which is also the concurrency story:
//! the device is a single serial peripheral with no notion of overlapping
//! command frames, so a second transfer cannot even be dispatched while one
//! is outstanding. Separate device instances are independent.
//!
//! Every operation blocks until the transport completes, including retries
//! and settle delays. There is no mid-transfer cancellation: a
//! half-programmed RAM region is worse than a blocked caller.

use embedded_hal::delay::DelayNs;

use crate::clock::{
    BickRatio, ClockSource, ClockState, CrystalFrequency, DomainPlan, PllPlan, PllReference,
    SampleClass, SdId, SyncDomain,
};
use crate::crc::crc16_ccitt;
use crate::error::Error;
use crate::firmware::{
    runtime_patch_command, FirmwareImage, MemoryKind, MemoryLimits, MAX_TRANSFER_ATTEMPTS,
};
use crate::mute::MuteGuard;
use crate::regcache::RegisterCache;
use crate::registers::{
    MUTE_ALL, REG_DOWNLOAD_CONTROL, REG_OUTPUT_MUTE, REG_RESET_CONTROL, REG_SYSTEM_CLOCK_1,
    REG_SYSTEM_CLOCK_2, RESET_CKRESETN, RESET_DSPRESETN, SYSCLK1_PLS_MASK, SYSCLK1_XTLSEL,
    SYSCLK2_PLI_MASK,
};
use crate::transport::{command_header, CommandBus, CMD_READ_CRAM, CMD_READ_CRC};

/// Control-plane handle for one AK7738-class codec.
pub struct Ak7738<B, D> {
    pub(crate) bus: B,
    pub(crate) delay: D,
    pub(crate) cache: RegisterCache,
    pub(crate) clock: ClockState,
    pub(crate) limits: MemoryLimits,
    pub(crate) mute_guard_enabled: bool,
}

impl<B: CommandBus, D: DelayNs> Ak7738<B, D> {
    /// Create a handle for a device clocked by `crystal`.
    ///
    /// No bus traffic is issued here; the register cache starts from the
    /// power-on defaults and the crystal-select bit is written together
    /// with the first PLL configuration.
    pub fn new(bus: B, delay: D, crystal: CrystalFrequency) -> Self {
        Self {
            bus,
            delay,
            cache: RegisterCache::new(),
            clock: ClockState::new(crystal),
            limits: MemoryLimits::AK7738,
            mute_guard_enabled: true,
        }
    }

    /// Override the DSP memory capacities for a different device of the
    /// family.
    #[must_use]
    pub fn with_memory_limits(mut self, limits: MemoryLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Enable or disable the automatic mute guard around bulk transfers.
    ///
    /// Callers that sequence their own muting (or drive a board with no
    /// DACs wired) disable it to skip the settle delays.
    pub fn set_mute_guard(&mut self, enabled: bool) {
        self.mute_guard_enabled = enabled;
    }

    /// Current logical clock configuration.
    #[must_use]
    pub fn clock(&self) -> &ClockState {
        &self.clock
    }

    /// Configured DSP memory capacities.
    #[must_use]
    pub fn memory_limits(&self) -> &MemoryLimits {
        &self.limits
    }

    /// Give back the bus and delay provider.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    // ── Clock-domain operations ──────────────────────────────────────────

    /// Change a domain's sampling-frequency class.
    ///
    /// Recomputes the domain's divider, and the PLL when this domain is its
    /// reference — synchronously, in this call: the device applies register
    /// writes immediately, and a stale PLL divider mutes or distorts audio
    /// without reporting anything.
    pub fn set_domain_rate(&mut self, id: SdId, class: SampleClass) -> Result<(), Error> {
        let plan = self.clock.plan_rate(id, class)?;
        self.apply_domain_plan(&plan, false)
    }

    /// Change a domain's bit-clock ratio. Same recomputation path as
    /// [`set_domain_rate`](Self::set_domain_rate).
    pub fn set_domain_ratio(&mut self, id: SdId, ratio: BickRatio) -> Result<(), Error> {
        let plan = self.clock.plan_ratio(id, ratio)?;
        self.apply_domain_plan(&plan, false)
    }

    /// Change a domain's clock source.
    ///
    /// Sourcing from another domain's bit clock requires an exact integer
    /// divisor; selecting [`ClockSource::PllOutput`] on SD1–SD3 re-locks
    /// the PLL onto that domain's BICK pin.
    pub fn set_domain_clock_source(&mut self, id: SdId, source: ClockSource) -> Result<(), Error> {
        let plan = self.clock.plan_source(id, source)?;
        self.apply_domain_plan(&plan, false)
    }

    /// Toggle a domain's master/slave role.
    ///
    /// Frequency fields are untouched, but the clock-source field is
    /// re-written even when logically unchanged — the device latches it
    /// only together with the role bit.
    pub fn set_domain_master(&mut self, id: SdId, master: bool) -> Result<(), Error> {
        let plan = self.clock.plan_master(id, master)?;
        self.apply_domain_plan(&plan, true)
    }

    /// Resolve the PLL against an explicitly selected reference.
    pub fn resolve_pll(&mut self, reference: PllReference) -> Result<(), Error> {
        let plan = self.clock.plan_pll_as(reference)?;
        self.apply_pll(&plan)?;
        self.clock.commit_pll(&plan);
        Ok(())
    }

    /// Current configuration of one sync domain.
    #[must_use]
    pub fn domain(&self, id: SdId) -> &SyncDomain {
        self.clock.domain(id)
    }

    fn apply_domain_plan(&mut self, plan: &DomainPlan, force_setting1: bool) -> Result<(), Error> {
        if force_setting1 {
            self.cache
                .force_write(&mut self.bus, plan.id.setting1_addr(), plan.setting1)?;
        } else {
            self.cache
                .write(&mut self.bus, plan.id.setting1_addr(), plan.setting1)?;
        }
        self.cache
            .write(&mut self.bus, plan.id.setting2_addr(), plan.setting2)?;
        self.cache
            .write(&mut self.bus, plan.id.bdv_addr(), plan.bdv)?;
        if let Some(pll) = &plan.pll {
            self.apply_pll(pll)?;
        }
        self.clock.commit(plan);
        Ok(())
    }

    fn apply_pll(&mut self, plan: &PllPlan) -> Result<(), Error> {
        let xtl = match self.clock.crystal() {
            CrystalFrequency::Mhz18_432 => SYSCLK1_XTLSEL,
            CrystalFrequency::Mhz12_288 => 0,
        };
        self.cache.update_bits(
            &mut self.bus,
            REG_SYSTEM_CLOCK_1,
            SYSCLK1_XTLSEL | SYSCLK1_PLS_MASK,
            xtl | plan.reference.to_bits(),
        )?;
        self.cache.update_bits(
            &mut self.bus,
            REG_SYSTEM_CLOCK_2,
            SYSCLK2_PLI_MASK,
            plan.table_index,
        )?;
        Ok(())
    }

    // ── Output mute ──────────────────────────────────────────────────────

    /// Mute or unmute all DAC outputs.
    pub fn set_output_mute(&mut self, muted: bool) -> Result<(), Error> {
        let value = if muted { MUTE_ALL } else { 0 };
        self.cache
            .write(&mut self.bus, REG_OUTPUT_MUTE, value)
            .map_err(Error::from)
    }

    // ── Firmware transfer ────────────────────────────────────────────────

    /// Whether the DSP is currently processing audio (clock and DSP resets
    /// both released). Read from hardware: a co-controller may have halted
    /// the core since we last looked.
    pub fn dsp_running(&mut self) -> Result<bool, Error> {
        let reset = self.cache.read(&mut self.bus, REG_RESET_CONTROL)?;
        let running = RESET_CKRESETN | RESET_DSPRESETN;
        Ok(reset & running == running)
    }

    /// Bulk-load a firmware image into PRAM or CRAM.
    ///
    /// Mutes the outputs (unless disabled or already muted), snapshots the
    /// reset bits, holds the relevant core in reset while the image streams
    /// out, verifies the device-computed CRC16, then restores the snapshot
    /// — exactly, not to "running": a DSP a co-controller had halted on
    /// purpose stays halted. Failed attempts (bus fault or CRC mismatch)
    /// are retried up to the attempt bound.
    ///
    /// Idempotent: loading the same image twice leaves the same state as
    /// loading it once, so caller-level retries are safe.
    pub fn bulk_load(&mut self, image: FirmwareImage<'_>) -> Result<(), Error> {
        image.validate(&self.limits)?;
        let expected = crc16_ccitt(image.bytes);
        self.guarded_download_write(image.kind, 0x0000, image.bytes, expected)
    }

    /// Write a coefficient patch, dispatching on observed device state.
    ///
    /// With the DSP running and the payload within the runtime frame
    /// format's capacity, the patch goes out over the glitch-free runtime
    /// path; with the DSP halted, it transparently takes the download-mode
    /// path instead (reset toggling, CRC verification). The dispatch is by
    /// device state, not caller intent.
    pub fn write_coefficient(&mut self, addr: u16, payload: &[u8]) -> Result<(), Error> {
        if self.dsp_running()? {
            self.runtime_patch(addr, payload)
        } else {
            let image = FirmwareImage::new(MemoryKind::Cram, payload);
            image.validate(&self.limits)?;
            let expected = crc16_ccitt(payload);
            self.guarded_download_write(MemoryKind::Cram, addr, payload, expected)
        }
    }

    /// In-place coefficient write while the DSP keeps processing audio.
    ///
    /// No CRC protects this path — the protocol defines none for runtime
    /// writes. That asymmetry is the device's accepted command set;
    /// retrofitting an integrity check the hardware does not expect would
    /// break against real silicon. No internal retry either: coefficient
    /// writes are not assumed commutative, so replaying one after a bus
    /// fault is the caller's judgement call.
    pub fn runtime_patch(&mut self, addr: u16, payload: &[u8]) -> Result<(), Error> {
        if !self.dsp_running()? {
            return Err(Error::InvalidOperationForDeviceState);
        }
        let command = runtime_patch_command(payload.len())?;
        let header = command_header(command, addr);
        self.bus
            .write_split(&header, payload)
            .map_err(Error::from)
    }

    /// Read back `buf.len()` bytes of coefficient memory from `addr`.
    ///
    /// Always uses download-mode framing — the protocol has no runtime
    /// read path — with the same mute/reset-snapshot discipline as
    /// [`bulk_load`](Self::bulk_load). The buffer is held to the same word
    /// granularity and capacity as a CRAM write.
    pub fn read_coefficient(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Error> {
        FirmwareImage::new(MemoryKind::Cram, buf).validate(&self.limits)?;
        let mut guard = MuteGuard::engage(self)?;
        let result = guard.device().download_read_attempts(addr, buf);
        match result {
            Ok(()) => guard.release(),
            Err(e) => {
                // Best-effort mute restore via Drop; the transfer error is
                // the one worth surfacing.
                drop(guard);
                Err(e)
            }
        }
    }

    fn guarded_download_write(
        &mut self,
        kind: MemoryKind,
        addr: u16,
        payload: &[u8],
        expected: u16,
    ) -> Result<(), Error> {
        let mut guard = MuteGuard::engage(self)?;
        let result = guard
            .device()
            .download_write_attempts(kind, addr, payload, expected);
        match result {
            Ok(()) => guard.release(),
            Err(e) => {
                drop(guard);
                Err(e)
            }
        }
    }

    fn download_write_attempts(
        &mut self,
        kind: MemoryKind,
        addr: u16,
        payload: &[u8],
        expected: u16,
    ) -> Result<(), Error> {
        let snapshot = self.cache.read(&mut self.bus, REG_RESET_CONTROL)?;
        for _attempt in 1..=MAX_TRANSFER_ATTEMPTS {
            let transfer = self
                .enter_download(kind, snapshot)
                .and_then(|()| self.transmit_and_verify(kind, addr, payload, expected));
            let exit = self.exit_download(snapshot);
            match transfer.and(exit) {
                Ok(()) => return Ok(()),
                Err(Error::Bus(_) | Error::ChecksumMismatch { .. }) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "download attempt {}/{} failed, retrying",
                        _attempt,
                        MAX_TRANSFER_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::ExhaustedRetries {
            attempts: MAX_TRANSFER_ATTEMPTS,
        })
    }

    fn download_read_attempts(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Error> {
        let snapshot = self.cache.read(&mut self.bus, REG_RESET_CONTROL)?;
        for _attempt in 1..=MAX_TRANSFER_ATTEMPTS {
            let transfer = self.enter_download(MemoryKind::Cram, snapshot).and_then(|()| {
                let header = command_header(CMD_READ_CRAM, addr);
                self.bus.write_then_read(&header, buf).map_err(Error::from)
            });
            let exit = self.exit_download(snapshot);
            match transfer.and(exit) {
                Ok(()) => return Ok(()),
                Err(Error::Bus(_)) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "coefficient read attempt {}/{} failed, retrying",
                        _attempt,
                        MAX_TRANSFER_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::ExhaustedRetries {
            attempts: MAX_TRANSFER_ATTEMPTS,
        })
    }

    /// Hold the appropriate reset(s) and open the target memory for
    /// download. PRAM loads stop the clocks as well; CRAM loads only the
    /// DSP core.
    fn enter_download(&mut self, kind: MemoryKind, snapshot: u8) -> Result<(), Error> {
        let held = match kind {
            MemoryKind::Pram => snapshot & !(RESET_CKRESETN | RESET_DSPRESETN),
            MemoryKind::Cram => snapshot & !RESET_DSPRESETN,
        };
        self.cache
            .force_write(&mut self.bus, REG_RESET_CONTROL, held)?;
        self.cache
            .write(&mut self.bus, REG_DOWNLOAD_CONTROL, kind.download_bit())?;
        Ok(())
    }

    /// Close download mode and restore the reset bits to the pre-call
    /// snapshot — not to "running".
    fn exit_download(&mut self, snapshot: u8) -> Result<(), Error> {
        let close = self.cache.write(&mut self.bus, REG_DOWNLOAD_CONTROL, 0);
        let restore = self
            .cache
            .force_write(&mut self.bus, REG_RESET_CONTROL, snapshot);
        close.and(restore).map_err(Error::from)
    }

    fn transmit_and_verify(
        &mut self,
        kind: MemoryKind,
        addr: u16,
        payload: &[u8],
        expected: u16,
    ) -> Result<(), Error> {
        let header = command_header(kind.command(), addr);
        self.bus.write_split(&header, payload)?;
        // A zero expected CRC is indistinguishable from the accumulator's
        // reset state, so the read-back proves nothing; skip it.
        if expected != 0 {
            let mut crc = [0u8; 2];
            self.bus.write_then_read(&[CMD_READ_CRC], &mut crc)?;
            let reported = u16::from_be_bytes(crc);
            if reported != expected {
                return Err(Error::ChecksumMismatch { expected, reported });
            }
        }
        Ok(())
    }
}
