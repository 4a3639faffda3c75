//! Write-through register cache.
//!
//! The control registers are slow to read over the bus and almost all of
//! them only ever change when this driver writes them. The cache keeps a
//! shadow of every modelled register, elides writes whose value is already
//! current, and serves reads from the shadow — except for volatile
//! registers, which always go to the hardware.
//!
//! One device quirk needs an escape hatch: the clock-source field must be
//! physically re-written whenever the master/slave bit toggles, even when
//! its value is unchanged. [`RegisterCache::force_write`] bypasses the
//! elision for that case.

use crate::registers::{register_properties, REGISTER_COUNT};
use crate::transport::{CommandBus, BusError, CMD_READ_REG, CMD_WRITE_REG};

/// Shadow of the device's control registers with write-through semantics.
#[derive(Debug, Clone)]
pub struct RegisterCache {
    values: [u8; REGISTER_COUNT],
}

impl Default for RegisterCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterCache {
    /// Cache initialised to the device's power-on defaults (all zero: both
    /// resets asserted, outputs unmuted, all clock fields at their lowest
    /// encoding).
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: [0; REGISTER_COUNT],
        }
    }

    /// Write `value` to `addr`, skipping the bus when the cached value
    /// already matches (volatile registers are never elided).
    ///
    /// Writes to unmodelled or read-only addresses are rejected in debug
    /// builds and ignored in release builds.
    pub fn write<B: CommandBus>(
        &mut self,
        bus: &mut B,
        addr: u8,
        value: u8,
    ) -> Result<(), BusError> {
        let Some(props) = register_properties(addr) else {
            debug_assert!(false, "write to unmodelled register");
            return Ok(());
        };
        if !props.writeable {
            debug_assert!(false, "write to read-only register");
            return Ok(());
        }
        if !props.volatile && self.cached(addr) == Some(value) {
            return Ok(());
        }
        self.write_through(bus, addr, value)
    }

    /// Write `value` to `addr` unconditionally, bypassing elision.
    pub fn force_write<B: CommandBus>(
        &mut self,
        bus: &mut B,
        addr: u8,
        value: u8,
    ) -> Result<(), BusError> {
        debug_assert!(
            register_properties(addr).is_some_and(|p| p.writeable),
            "force_write to unwriteable register"
        );
        self.write_through(bus, addr, value)
    }

    /// Read `addr`: from hardware for volatile registers, from the shadow
    /// otherwise.
    pub fn read<B: CommandBus>(&mut self, bus: &mut B, addr: u8) -> Result<u8, BusError> {
        let props = register_properties(addr);
        let volatile_read = props.is_some_and(|p| p.volatile && p.readable);
        if volatile_read {
            let mut value = [0u8];
            bus.write_then_read(&[CMD_READ_REG, addr], &mut value)?;
            self.store(addr, value[0]);
            return Ok(value[0]);
        }
        Ok(self.cached(addr).unwrap_or(0))
    }

    /// Read-modify-write `addr`, changing only the bits under `mask`.
    pub fn update_bits<B: CommandBus>(
        &mut self,
        bus: &mut B,
        addr: u8,
        mask: u8,
        value: u8,
    ) -> Result<(), BusError> {
        let current = self.read(bus, addr)?;
        self.write(bus, addr, (current & !mask) | (value & mask))
    }

    fn write_through<B: CommandBus>(
        &mut self,
        bus: &mut B,
        addr: u8,
        value: u8,
    ) -> Result<(), BusError> {
        bus.write(&[CMD_WRITE_REG, addr, value])?;
        self.store(addr, value);
        Ok(())
    }

    fn cached(&self, addr: u8) -> Option<u8> {
        self.values.get(usize::from(addr)).copied()
    }

    fn store(&mut self, addr: u8, value: u8) {
        if let Some(slot) = self.values.get_mut(usize::from(addr)) {
            *slot = value;
        }
    }
}
