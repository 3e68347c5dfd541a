//! Relay output drivers for the fingerprint door lock.
//!
//! This crate provides the production [`RelayDevice`] implementation for a
//! relay module wired to a Linux GPIO line. For the mock relay used in
//! development and testing, see `fingerlock_hardware::mock`.
//!
//! [`RelayDevice`]: fingerlock_hardware::RelayDevice

pub mod sysfs;

pub use sysfs::{DEFAULT_SYSFS_ROOT, SysfsRelay};
