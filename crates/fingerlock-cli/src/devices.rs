//! Relay selection.
//!
//! Native `async fn` in traits is not object-safe, so the backend chosen at
//! runtime is wrapped in an enum that forwards to the concrete driver.

use std::path::Path;

use fingerlock_core::{LockState, OutputLevel};
use fingerlock_hardware::{DeviceInfo, RelayDevice, Result};
use fingerlock_relay::{DEFAULT_SYSFS_ROOT, SysfsRelay};
use tracing::info;

use crate::config::{RelayBackend, RelayConfig};

/// Relay that only logs what it would have driven.
#[derive(Debug)]
pub struct DryRunRelay {
    gpio: u32,
    level: Option<OutputLevel>,
}

impl DryRunRelay {
    pub fn new(gpio: u32) -> Self {
        Self { gpio, level: None }
    }
}

impl RelayDevice for DryRunRelay {
    async fn set_level(&mut self, level: OutputLevel) -> Result<()> {
        info!(gpio = self.gpio, %level, "Dry run: relay output");
        self.level = Some(level);
        Ok(())
    }

    fn level(&self) -> Option<OutputLevel> {
        self.level
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(
            format!("gpio{} (dry run)", self.gpio),
            "Dry-run relay",
        ))
    }
}

/// Enum wrapper for relay dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyRelay {
    Sysfs(SysfsRelay),
    DryRun(DryRunRelay),
}

impl AnyRelay {
    /// Open the relay described by `config`, driving the locked level from
    /// the moment the line becomes an output.
    pub async fn open(config: &RelayConfig) -> Result<Self> {
        Self::open_at(config, DEFAULT_SYSFS_ROOT).await
    }

    async fn open_at(config: &RelayConfig, sysfs_root: impl AsRef<Path>) -> Result<Self> {
        match config.backend {
            RelayBackend::Sysfs => {
                let locked = LockState::Locked.output_level(config.active_low);
                let relay = SysfsRelay::open_at(sysfs_root, config.gpio, locked).await?;
                Ok(Self::Sysfs(relay))
            }
            RelayBackend::DryRun => {
                info!(gpio = config.gpio, "Relay in dry-run mode, GPIO untouched");
                Ok(Self::DryRun(DryRunRelay::new(config.gpio)))
            }
        }
    }
}

impl RelayDevice for AnyRelay {
    async fn set_level(&mut self, level: OutputLevel) -> Result<()> {
        match self {
            Self::Sysfs(relay) => relay.set_level(level).await,
            Self::DryRun(relay) => relay.set_level(level).await,
        }
    }

    fn level(&self) -> Option<OutputLevel> {
        match self {
            Self::Sysfs(relay) => relay.level(),
            Self::DryRun(relay) => relay.level(),
        }
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Sysfs(relay) => relay.get_device_info().await,
            Self::DryRun(relay) => relay.get_device_info().await,
        }
    }
}
