//! Mock relay output for testing and development.
//!
//! Every level the controller drives is recorded with the (Tokio) instant it
//! happened, so tests running on paused time can assert exact hold durations.

use std::sync::{Arc, Mutex, MutexGuard};

use fingerlock_core::OutputLevel;
use tokio::time::Instant;
use tracing::debug;

use crate::{Result, traits::RelayDevice, types::DeviceInfo};

/// A single recorded output write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub level: OutputLevel,
    pub at: Instant,
}

type History = Arc<Mutex<Vec<LevelChange>>>;

fn lock(history: &History) -> MutexGuard<'_, Vec<LevelChange>> {
    history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock relay that records every write.
///
/// # Examples
///
/// ```
/// use fingerlock_core::OutputLevel;
/// use fingerlock_hardware::mock::MockRelay;
/// use fingerlock_hardware::traits::RelayDevice;
///
/// #[tokio::main]
/// async fn main() -> fingerlock_hardware::Result<()> {
///     let (mut relay, handle) = MockRelay::new();
///
///     relay.set_level(OutputLevel::High).await?;
///     relay.set_level(OutputLevel::Low).await?;
///
///     assert_eq!(handle.current_level(), Some(OutputLevel::Low));
///     assert_eq!(handle.write_count(), 2);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockRelay {
    name: String,
    history: History,
}

impl MockRelay {
    pub fn new() -> (Self, MockRelayHandle) {
        Self::with_name("Mock Relay")
    }

    pub fn with_name(name: impl Into<String>) -> (Self, MockRelayHandle) {
        let history = History::default();
        let relay = Self {
            name: name.into(),
            history: Arc::clone(&history),
        };
        (relay, MockRelayHandle { history })
    }
}

impl Default for MockRelay {
    fn default() -> Self {
        Self::new().0
    }
}

impl RelayDevice for MockRelay {
    async fn set_level(&mut self, level: OutputLevel) -> Result<()> {
        debug!(relay = %self.name, %level, "Mock relay output");
        lock(&self.history).push(LevelChange {
            level,
            at: Instant::now(),
        });
        Ok(())
    }

    fn level(&self) -> Option<OutputLevel> {
        lock(&self.history).last().map(|change| change.level)
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock Relay v1.0"))
    }
}

/// Read-only view of a [`MockRelay`]'s output history.
#[derive(Debug, Clone)]
pub struct MockRelayHandle {
    history: History,
}

impl MockRelayHandle {
    /// Every write so far, oldest first.
    pub fn history(&self) -> Vec<LevelChange> {
        lock(&self.history).clone()
    }

    /// Just the levels, oldest first.
    pub fn levels(&self) -> Vec<OutputLevel> {
        lock(&self.history).iter().map(|change| change.level).collect()
    }

    pub fn current_level(&self) -> Option<OutputLevel> {
        lock(&self.history).last().map(|change| change.level)
    }

    pub fn write_count(&self) -> usize {
        lock(&self.history).len()
    }
}
