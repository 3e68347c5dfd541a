//! Relay driven through the Linux sysfs GPIO interface.
//!
//! Layout under the sysfs root:
//!
//! ```text
//! /sys/class/gpio/export          <- write the line number to export it
//! /sys/class/gpio/gpioN/direction <- "high" or "low": output at that level
//! /sys/class/gpio/gpioN/value     <- "0" or "1"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use fingerlock_core::OutputLevel;
use fingerlock_hardware::{DeviceInfo, HardwareError, RelayDevice, Result};
use tracing::{debug, info};

/// Default sysfs GPIO class directory.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// How long to wait for udev to create the line's directory after export.
const EXPORT_SETTLE_TIMEOUT: Duration = Duration::from_millis(500);
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Relay on a sysfs GPIO line.
///
/// # Examples
///
/// ```no_run
/// use fingerlock_core::OutputLevel;
/// use fingerlock_hardware::RelayDevice;
/// use fingerlock_relay::SysfsRelay;
///
/// # async fn example() -> fingerlock_hardware::Result<()> {
/// let mut relay = SysfsRelay::open(17, OutputLevel::High).await?;
/// relay.set_level(OutputLevel::Low).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SysfsRelay {
    gpio: u32,
    value_path: PathBuf,
    level: Option<OutputLevel>,
}

impl SysfsRelay {
    /// Export `gpio` under `/sys/class/gpio` and configure it as an output
    /// already driven at `initial`.
    ///
    /// The level is set in the same write that switches the direction, so
    /// the line never passes through the kernel's default low.
    pub async fn open(gpio: u32, initial: OutputLevel) -> Result<Self> {
        Self::open_at(DEFAULT_SYSFS_ROOT, gpio, initial).await
    }

    /// Same as [`open`](Self::open) with a different sysfs root.
    pub async fn open_at(root: impl AsRef<Path>, gpio: u32, initial: OutputLevel) -> Result<Self> {
        let root = root.as_ref();
        let line_dir = root.join(format!("gpio{gpio}"));

        if !tokio::fs::try_exists(&line_dir).await? {
            debug!(gpio, "Exporting GPIO line");
            tokio::fs::write(root.join("export"), gpio.to_string())
                .await
                .map_err(|e| {
                    HardwareError::initialization_failed(format!("export gpio{gpio}: {e}"))
                })?;
            wait_for_export(&line_dir).await?;
        }

        tokio::fs::write(line_dir.join("direction"), initial.as_sysfs_direction())
            .await
            .map_err(|e| HardwareError::configuration(format!("gpio{gpio} direction: {e}")))?;

        info!(gpio, level = %initial, "Relay GPIO configured as output");

        Ok(Self {
            gpio,
            value_path: line_dir.join("value"),
            level: Some(initial),
        })
    }

    pub fn gpio(&self) -> u32 {
        self.gpio
    }
}

async fn wait_for_export(line_dir: &Path) -> Result<()> {
    let deadline = tokio::time::Instant::now() + EXPORT_SETTLE_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if tokio::fs::try_exists(line_dir).await? {
            return Ok(());
        }
        tokio::time::sleep(EXPORT_POLL_INTERVAL).await;
    }
    Err(HardwareError::initialization_failed(format!(
        "{} did not appear after export",
        line_dir.display()
    )))
}

impl RelayDevice for SysfsRelay {
    async fn set_level(&mut self, level: OutputLevel) -> Result<()> {
        tokio::fs::write(&self.value_path, level.as_sysfs_value())
            .await
            .map_err(|e| HardwareError::communication(format!("gpio{}: {e}", self.gpio)))?;
        debug!(gpio = self.gpio, %level, "Relay output set");
        self.level = Some(level);
        Ok(())
    }

    fn level(&self) -> Option<OutputLevel> {
        self.level
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(
            format!("gpio{}", self.gpio),
            "sysfs GPIO relay",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_line(root: &Path, gpio: u32) -> PathBuf {
        let dir = root.join(format!("gpio{gpio}"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("direction"), "in").unwrap();
        std::fs::write(dir.join("value"), "0").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_open_configures_output_at_initial_level() {
        let root = tempfile::tempdir().unwrap();
        let dir = fake_line(root.path(), 17);

        let relay = SysfsRelay::open_at(root.path(), 17, OutputLevel::High)
            .await
            .unwrap();
        assert_eq!(relay.gpio(), 17);
        assert_eq!(relay.level(), Some(OutputLevel::High));
        assert_eq!(std::fs::read_to_string(dir.join("direction")).unwrap(), "high");
        // Already present, so nothing was exported.
        assert!(!root.path().join("export").exists());
    }

    #[tokio::test]
    async fn test_open_never_writes_plain_out() {
        let root = tempfile::tempdir().unwrap();
        let dir = fake_line(root.path(), 6);

        let relay = SysfsRelay::open_at(root.path(), 6, OutputLevel::Low)
            .await
            .unwrap();
        assert_eq!(relay.level(), Some(OutputLevel::Low));
        assert_eq!(std::fs::read_to_string(dir.join("direction")).unwrap(), "low");
    }

    #[tokio::test]
    async fn test_set_level_writes_value() {
        let root = tempfile::tempdir().unwrap();
        let dir = fake_line(root.path(), 4);
        let mut relay = SysfsRelay::open_at(root.path(), 4, OutputLevel::Low)
            .await
            .unwrap();

        relay.set_level(OutputLevel::High).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("value")).unwrap(), "1");
        assert_eq!(relay.level(), Some(OutputLevel::High));

        relay.set_level(OutputLevel::Low).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("value")).unwrap(), "0");
        assert_eq!(relay.level(), Some(OutputLevel::Low));
    }

    #[tokio::test]
    async fn test_export_without_line_fails() {
        let root = tempfile::tempdir().unwrap();

        let err = SysfsRelay::open_at(root.path(), 27, OutputLevel::High)
            .await
            .unwrap_err();
        assert!(matches!(err, HardwareError::InitializationFailed { .. }));
        assert_eq!(
            std::fs::read_to_string(root.path().join("export")).unwrap(),
            "27"
        );
    }

    #[tokio::test]
    async fn test_get_device_info() {
        let root = tempfile::tempdir().unwrap();
        fake_line(root.path(), 17);
        let relay = SysfsRelay::open_at(root.path(), 17, OutputLevel::High)
            .await
            .unwrap();

        let info = relay.get_device_info().await.unwrap();
        assert_eq!(info.name, "gpio17");
    }
}
