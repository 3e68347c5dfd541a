//! Lock actuator: maps lock states onto relay levels.

use std::time::Duration;

use fingerlock_core::LockState;
use fingerlock_hardware::{RelayDevice, Result};
use tracing::info;

use crate::event::{ControllerEvent, EventSink};

/// Drives the door relay.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use fingerlock_controller::{EventSink, LockActuator};
/// use fingerlock_core::{LockState, OutputLevel};
/// use fingerlock_hardware::mock::MockRelay;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> fingerlock_hardware::Result<()> {
///     let (relay, handle) = MockRelay::new();
///     let mut actuator = LockActuator::new(relay, true, EventSink::discard());
///
///     actuator.lock().await?;
///     actuator.unlock_for(Duration::from_secs(10)).await?;
///
///     assert_eq!(actuator.state(), LockState::Locked);
///     assert_eq!(handle.levels(), vec![OutputLevel::High, OutputLevel::Low, OutputLevel::High]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct LockActuator<R> {
    relay: R,
    active_low: bool,
    state: LockState,
    driven: bool,
    events: EventSink,
}

impl<R: RelayDevice> LockActuator<R> {
    /// Wrap `relay`. Nothing is driven until [`lock`](Self::lock) is called.
    pub fn new(relay: R, active_low: bool, events: EventSink) -> Self {
        Self {
            relay,
            active_low,
            state: LockState::Locked,
            driven: false,
            events,
        }
    }

    /// Last state driven onto the relay (`Locked` before anything was driven).
    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Drive the locked level.
    pub async fn lock(&mut self) -> Result<()> {
        self.drive(LockState::Locked).await
    }

    /// Unlock, hold for `hold`, then lock again.
    ///
    /// Nothing else can run on the calling task during the hold.
    pub async fn unlock_for(&mut self, hold: Duration) -> Result<()> {
        self.drive(LockState::Unlocked).await?;
        tokio::time::sleep(hold).await;
        self.drive(LockState::Locked).await
    }

    async fn drive(&mut self, state: LockState) -> Result<()> {
        let level = state.output_level(self.active_low);
        self.relay.set_level(level).await?;

        let changed = !self.driven || self.state != state;
        self.state = state;
        self.driven = true;

        if changed {
            info!(%state, %level, "Lock state changed");
            self.events.emit(ControllerEvent::LockChanged(state));
        }
        Ok(())
    }
}
