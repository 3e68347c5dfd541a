//! The door controller main loop.
//!
//! One task owns the sensor and the relay. Each tick it handles at most one
//! queued command and then scans for a finger once:
//!
//! ```text
//! tick ─┬─ command? ── enroll ─> allocate slot ─> enrollment sequence
//!       │            └ clear ──> erase library
//!       └─ scan ─── match? ──> unlock, hold, relock
//! ```
//!
//! Enrollment and the unlock hold run to completion inside the tick, so
//! nothing else (commands, scans) happens while they are in progress.

use std::future::Future;

use fingerlock_core::{Error, LockState};
use fingerlock_hardware::{FingerprintSensor, RelayDevice};
use tracing::{debug, error, info, warn};

use crate::actuator::LockActuator;
use crate::allocator::next_free_slot;
use crate::command::{Command, CommandReader};
use crate::config::ControllerConfig;
use crate::enrollment::{EnrollmentSequencer, EnrollmentState};
use crate::error::{ControllerError, Result};
use crate::event::{ControllerEvent, EventSink};
use crate::matcher::{MatchSequencer, ScanOutcome};

/// Sensor database figures read at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorStatus {
    pub template_count: u16,
    pub capacity: u16,
}

/// Fingerprint door controller.
///
/// # Examples
///
/// ```
/// use fingerlock_controller::{ControllerConfig, DoorController, EventSink};
/// use fingerlock_hardware::mock::{MockRelay, MockSensor};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (sensor, _finger) = MockSensor::new();
///     let (relay, _relay_handle) = MockRelay::new();
///
///     let mut controller =
///         DoorController::new(sensor, relay, ControllerConfig::default(), EventSink::discard());
///     let status = controller.start().await?;
///     assert_eq!(status.capacity, 50);
///     Ok(())
/// }
/// ```
pub struct DoorController<S, R> {
    sensor: S,
    actuator: LockActuator<R>,
    config: ControllerConfig,
    events: EventSink,
    template_count: u16,
    matcher: MatchSequencer,
}

impl<S, R> DoorController<S, R>
where
    S: FingerprintSensor,
    R: RelayDevice,
{
    pub fn new(sensor: S, relay: R, config: ControllerConfig, events: EventSink) -> Self {
        Self {
            sensor,
            actuator: LockActuator::new(relay, config.active_low, events.clone()),
            config,
            events,
            template_count: 0,
            matcher: MatchSequencer::new(0),
        }
    }

    /// Lock the door and probe the sensor.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Relay`] if the door cannot be locked,
    /// [`ControllerError::SensorNotDetected`] if the sensor does not complete
    /// the handshake or parameter reads. Both are fatal.
    pub async fn start(&mut self) -> Result<SensorStatus> {
        self.actuator.lock().await.map_err(ControllerError::Relay)?;

        self.sensor.verify_password().await.map_err(|e| {
            error!(error = %e, "Fingerprint sensor not detected");
            ControllerError::SensorNotDetected(e)
        })?;

        let parameters = self
            .sensor
            .read_parameters()
            .await
            .map_err(ControllerError::SensorNotDetected)?;
        let template_count = self
            .sensor
            .template_count()
            .await
            .map_err(ControllerError::SensorNotDetected)?;

        let status = SensorStatus {
            template_count,
            capacity: parameters.capacity,
        };
        self.template_count = template_count;
        self.matcher = MatchSequencer::new(parameters.capacity);

        info!(
            template_count,
            capacity = parameters.capacity,
            security_level = parameters.security_level,
            "Fingerprint sensor ready"
        );
        self.events.emit(ControllerEvent::SensorReady {
            template_count,
            capacity: parameters.capacity,
        });

        Ok(status)
    }

    /// Handle one queued command (if any), then scan once.
    pub async fn tick(&mut self, commands: &mut CommandReader) {
        if let Some(command) = commands.try_next() {
            self.handle_command(command).await;
        }
        self.scan().await;
    }

    /// Run ticks until `shutdown` resolves, then lock the door.
    ///
    /// Shutdown interrupts whatever is in progress, including an enrollment
    /// or an unlock hold.
    pub async fn run_until<F>(&mut self, commands: &mut CommandReader, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = self.tick_and_wait(commands) => {}
            }
        }

        self.shutdown().await
    }

    async fn tick_and_wait(&mut self, commands: &mut CommandReader) {
        self.tick(commands).await;
        tokio::time::sleep(self.config.timing.tick).await;
    }

    /// Drive the relay to the locked level.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.actuator.lock().await.map_err(|e| {
            error!(error = %e, "Failed to lock door on shutdown");
            ControllerError::Relay(e)
        })
    }

    /// Act on one parsed control line.
    pub async fn handle_command(&mut self, command: fingerlock_core::Result<Command>) {
        let command = match command {
            Ok(command) => command,
            Err(Error::UnknownCommand(line)) => {
                warn!(line = %line, "Unknown command");
                self.events.emit(ControllerEvent::UnknownCommand(line));
                return;
            }
            Err(other) => {
                warn!(error = %other, "Unreadable command");
                self.events
                    .emit(ControllerEvent::UnknownCommand(other.to_string()));
                return;
            }
        };

        info!(%command, "Command received");
        self.events.emit(ControllerEvent::CommandReceived(command));

        match command {
            Command::Enroll => {
                self.enroll().await;
            }
            Command::Clear => self.clear().await,
        }
    }

    /// Enroll a finger into the next free slot.
    ///
    /// Returns the terminal enrollment state, or `None` when the database is
    /// full and the sensor was not touched.
    pub async fn enroll(&mut self) -> Option<EnrollmentState> {
        let capacity = self.matcher.capacity();
        let slot = match next_free_slot(self.template_count, capacity) {
            Ok(slot) => slot,
            Err(e) => {
                warn!(error = %e, "Enrollment refused");
                self.events.emit(ControllerEvent::DatabaseFull {
                    count: self.template_count,
                    capacity,
                });
                return None;
            }
        };

        let outcome = EnrollmentSequencer::new(&mut self.sensor, &self.config.timing, &self.events)
            .run(slot)
            .await;

        if outcome == EnrollmentState::Done {
            self.template_count = slot.as_u16();
        }
        Some(outcome)
    }

    /// Erase every stored template.
    pub async fn clear(&mut self) {
        match self.sensor.empty_database().await {
            Ok(()) => {
                self.template_count = 0;
                info!("Fingerprint database cleared");
                self.events.emit(ControllerEvent::DatabaseCleared);
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear database");
                self.events.emit(ControllerEvent::ClearFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// One capture and search attempt; unlocks on a match.
    pub async fn scan(&mut self) -> Option<ScanOutcome> {
        let outcome = match self.matcher.scan_once(&mut self.sensor).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Scan failed");
                return None;
            }
        };

        match outcome {
            ScanOutcome::NoFinger => {}
            ScanOutcome::CaptureFailed(code) | ScanOutcome::ConversionFailed(code) => {
                debug!(%code, "Unusable image");
            }
            ScanOutcome::NoMatch => {
                debug!("No matching fingerprint");
                if self.config.report_rejections {
                    self.events.emit(ControllerEvent::Rejected);
                }
            }
            ScanOutcome::Matched(found) => {
                info!(slot = %found.slot, confidence = found.confidence, "Fingerprint matched");
                self.events.emit(ControllerEvent::Matched {
                    slot: found.slot,
                    confidence: found.confidence,
                });
                if let Err(e) = self.actuator.unlock_for(self.config.timing.unlock_hold).await {
                    error!(error = %e, "Relay failure during unlock");
                    // Leave nothing asserted if the relay recovers.
                    if let Err(e) = self.actuator.lock().await {
                        error!(error = %e, "Relay failed to relock");
                    }
                }
            }
        }

        Some(outcome)
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn lock_state(&self) -> LockState {
        self.actuator.state()
    }

    /// Stored template count as tracked by the controller.
    pub fn template_count(&self) -> u16 {
        self.template_count
    }

    pub fn capacity(&self) -> u16 {
        self.matcher.capacity()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}
