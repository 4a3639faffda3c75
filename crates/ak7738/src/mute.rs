//! Scoped DAC mute around firmware transfers.
//!
//! Entering download mode halts the DSP core; without a mute ramp first,
//! whatever sample the DACs were holding crackles out of the speakers. The
//! guard asserts soft mute on construction and restores the previous mute
//! register value when it is released — and only if it was the one that
//! asserted it, so a caller that muted beforehand keeps its mute afterward.
//!
//! Every exit path restores: the happy path through [`MuteGuard::release`]
//! (which can report a bus fault), and early-error/panic paths through
//! `Drop` (best effort, errors discarded — there is nowhere to send them
//! from a destructor).

use embedded_hal::delay::DelayNs;

use crate::device::Ak7738;
use crate::error::Error;
use crate::registers::{MUTE_ALL, REG_OUTPUT_MUTE};
use crate::transport::CommandBus;

/// Soft-mute ramp time: the DAC attenuator takes ~1024 sample periods to
/// reach full attenuation (21.3 ms at 48 kHz); rounded up.
pub const MUTE_SETTLE_MS: u32 = 24;

/// RAII guard holding the device's DAC outputs muted.
pub struct MuteGuard<'a, B: CommandBus, D: DelayNs> {
    dev: &'a mut Ak7738<B, D>,
    /// Previous OUTPUT_MUTE value, present only if this guard asserted mute.
    restore: Option<u8>,
}

impl<'a, B: CommandBus, D: DelayNs> MuteGuard<'a, B, D> {
    /// Mute the outputs unless they already are (or the device's mute guard
    /// is disabled), then wait out the attenuator ramp.
    pub fn engage(dev: &'a mut Ak7738<B, D>) -> Result<Self, Error> {
        if !dev.mute_guard_enabled {
            return Ok(Self { dev, restore: None });
        }
        let previous = dev.cache.read(&mut dev.bus, REG_OUTPUT_MUTE)?;
        if previous & MUTE_ALL == MUTE_ALL {
            // Caller already muted; nothing to assert, nothing to restore.
            return Ok(Self { dev, restore: None });
        }
        dev.cache
            .write(&mut dev.bus, REG_OUTPUT_MUTE, previous | MUTE_ALL)?;
        dev.delay.delay_ms(MUTE_SETTLE_MS);
        Ok(Self {
            dev,
            restore: Some(previous),
        })
    }

    /// The guarded device, for performing the protected operation.
    pub fn device(&mut self) -> &mut Ak7738<B, D> {
        self.dev
    }

    /// Restore the pre-guard mute state, reporting any bus fault.
    pub fn release(mut self) -> Result<(), Error> {
        if let Some(previous) = self.restore.take() {
            self.dev.delay.delay_ms(MUTE_SETTLE_MS);
            self.dev
                .cache
                .write(&mut self.dev.bus, REG_OUTPUT_MUTE, previous)?;
        }
        Ok(())
    }
}

impl<B: CommandBus, D: DelayNs> Drop for MuteGuard<'_, B, D> {
    fn drop(&mut self) {
        if let Some(previous) = self.restore.take() {
            self.dev.delay.delay_ms(MUTE_SETTLE_MS);
            let _ = self
                .dev
                .cache
                .write(&mut self.dev.bus, REG_OUTPUT_MUTE, previous);
        }
    }
}
