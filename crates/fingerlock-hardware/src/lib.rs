//! Hardware device abstraction layer for the fingerprint door lock.
//!
//! This crate provides trait-based abstractions for the two peripherals the
//! lock controller drives: a fingerprint sensor module with its own template
//! database, and a relay output that holds the door latch. The traits enable
//! easy substitution between mock implementations (for development and
//! testing) and real hardware drivers.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Thread-safe**: All traits require `Send + Sync` for use with Tokio.
//! - **Error-aware**: All operations return `Result<T>`; sensor rejections keep
//!   the module's raw confirmation code so callers can branch on it.
//!
//! # Device Traits
//!
//! ## Fingerprint Sensors
//!
//! The [`FingerprintSensor`] trait mirrors the module's instruction set:
//!
//! ```no_run
//! use fingerlock_core::CharBuffer;
//! use fingerlock_hardware::traits::{FingerprintSensor, ImageCapture};
//! use fingerlock_hardware::error::Result;
//!
//! async fn identify<S: FingerprintSensor>(sensor: &mut S, capacity: u16) -> Result<Option<u16>> {
//!     if sensor.capture_image().await? == ImageCapture::NoFinger {
//!         return Ok(None);
//!     }
//!     sensor.image_to_template(CharBuffer::One).await?;
//!     let found = sensor.search(CharBuffer::One, 1, capacity).await?;
//!     Ok(found.map(|m| m.slot.as_u16()))
//! }
//! ```
//!
//! ## Relays
//!
//! The [`RelayDevice`] trait drives a single digital output:
//!
//! ```no_run
//! use fingerlock_core::OutputLevel;
//! use fingerlock_hardware::traits::RelayDevice;
//! use fingerlock_hardware::error::Result;
//!
//! async fn release<R: RelayDevice>(relay: &mut R) -> Result<()> {
//!     relay.set_level(OutputLevel::Low).await
//! }
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides [`MockSensor`](mock::MockSensor) and
//! [`MockRelay`](mock::MockRelay), each paired with a handle that scripts
//! finger placements or inspects relay transitions. Real drivers live in the
//! `fingerlock-biometric` and `fingerlock-relay` crates.
//!
//! [`FingerprintSensor`]: traits::FingerprintSensor
//! [`RelayDevice`]: traits::RelayDevice

pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use traits::{FingerprintSensor, ImageCapture, RelayDevice, SearchMatch};
pub use types::DeviceInfo;
