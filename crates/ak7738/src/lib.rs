//! Control driver for the AKM AK7738 audio DSP/codec.
//!
//! The AK7738 is register-programmed over I²C or SPI: the same command
//! protocol carries control-register access, bulk firmware downloads into the
//! DSP's program memory (PRAM) and coefficient memory (CRAM), and glitch-free
//! runtime coefficient patches. This crate covers the control plane only —
//! audio samples never pass through it.
//!
//! # Modules
//!
//! - [`device`] — the [`Ak7738`] handle tying everything together
//! - [`clock`] — pure sync-domain and PLL resolution (plan, then apply)
//! - [`firmware`] — image framing rules and per-device memory limits
//! - [`transport`] — command framing over [`embedded_hal`] I²C or SPI
//! - [`regcache`] — write-through register cache with write elision
//! - [`mute`] — RAII DAC mute around firmware transfers
//! - [`crc`] — CRC16 used by the download read-back verification
//!
//! # Example
//!
//! ```no_run
//! # fn demo<I, D>(i2c: I, delay: D) -> Result<(), ak7738::Error>
//! # where I: embedded_hal::i2c::I2c, D: embedded_hal::delay::DelayNs {
//! use ak7738::{Ak7738, ClockSource, CrystalFrequency, I2cCommandBus, SdId};
//!
//! let bus = I2cCommandBus::new(i2c, ak7738::transport::AK7738_I2C_ADDR_BASE);
//! let mut codec = Ak7738::new(bus, delay, CrystalFrequency::Mhz12_288);
//! codec.set_domain_clock_source(SdId::Sd1, ClockSource::PllOutput)?;
//! codec.set_domain_master(SdId::Sd1, true)?;
//! # Ok(()) }
//! ```
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls (for host-side tooling and tests)
//! - `defmt`: `defmt::Format` derives and transfer/clock diagnostics

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "std")]
extern crate std;

pub mod clock;
pub mod crc;
pub mod device;
pub mod error;
pub mod firmware;
pub mod mute;
pub mod regcache;
pub mod registers;
pub mod transport;

pub use clock::{
    BickRatio, ClockSource, ClockState, CrystalFrequency, PllReference, SampleClass, SdId,
    SyncDomain,
};
pub use crc::crc16_ccitt;
pub use device::Ak7738;
pub use error::Error;
pub use firmware::{FirmwareImage, MemoryKind, MemoryLimits};
pub use mute::MuteGuard;
pub use regcache::RegisterCache;
pub use transport::{BusError, CommandBus, I2cCommandBus, SpiCommandBus};
