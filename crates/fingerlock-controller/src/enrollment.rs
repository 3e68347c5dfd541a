//! Enrollment sequencer.
//!
//! Enrollment is a fixed two-capture procedure driven as an explicit state
//! machine. Each state maps to one sensor step:
//!
//! ```text
//! AwaitFirstCapture → ConvertFirst → AwaitRemoval1
//!     → AwaitSecondCapture → ConvertSecond → AwaitRemoval2
//!     → CreateModel → StoreModel → Done
//! ```
//!
//! Any non-terminal state may move to `Failed` with a [`FailureReason`].
//! Nothing is written to the sensor's library until `StoreModel`, so a failed
//! attempt never consumes a slot.
//!
//! # Examples
//!
//! ```
//! use fingerlock_controller::enrollment::{EnrollmentMachine, EnrollmentState, FailureReason};
//! use fingerlock_core::SlotId;
//!
//! let mut machine = EnrollmentMachine::new(SlotId::new(1).unwrap());
//! machine.transition_to(EnrollmentState::ConvertFirst).unwrap();
//!
//! // Skipping ahead is rejected
//! assert!(machine.transition_to(EnrollmentState::StoreModel).is_err());
//!
//! machine.fail(FailureReason::Mismatch).unwrap();
//! assert!(machine.current_state().is_terminal());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use fingerlock_core::{CharBuffer, Error, Result, SlotId};
use fingerlock_hardware::{FingerprintSensor, HardwareError, ImageCapture};
use fingerlock_protocol::ConfirmationCode;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Timing;
use crate::event::{ControllerEvent, EventSink};

/// Transitions kept per enrollment; a full run takes eight.
const MAX_HISTORY_SIZE: usize = 16;

/// Why an enrollment attempt was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No finger was presented within the capture timeout.
    CaptureTimeout,

    /// The image could not be turned into a template.
    ConversionFailed { code: ConfirmationCode },

    /// The two captures came from different fingers.
    Mismatch,

    /// Model creation failed for a reason other than a mismatch.
    ModelFailed { code: ConfirmationCode },

    /// The sensor refused to store the model.
    StoreFailed { code: ConfirmationCode },

    /// The sensor stopped answering or sent garbage.
    Communication { message: String },
}

impl FailureReason {
    /// Map a sensor error, using `rejected` for explicit module rejections.
    fn from_error(
        error: &HardwareError,
        rejected: impl FnOnce(ConfirmationCode) -> FailureReason,
    ) -> Self {
        match error.confirmation_code() {
            Some(code) => rejected(code),
            None => communication(error),
        }
    }
}

fn communication(error: &HardwareError) -> FailureReason {
    FailureReason::Communication {
        message: error.to_string(),
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::CaptureTimeout => write!(f, "timed out waiting for finger"),
            FailureReason::ConversionFailed { code } => {
                write!(f, "could not process image: {code}")
            }
            FailureReason::Mismatch => write!(f, "fingerprints did not match"),
            FailureReason::ModelFailed { code } => write!(f, "could not create model: {code}"),
            FailureReason::StoreFailed { code } => write!(f, "could not store model: {code}"),
            FailureReason::Communication { message } => {
                write!(f, "sensor communication error: {message}")
            }
        }
    }
}

/// States of one enrollment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    AwaitFirstCapture,
    ConvertFirst,
    AwaitRemoval1,
    AwaitSecondCapture,
    ConvertSecond,
    AwaitRemoval2,
    CreateModel,
    StoreModel,
    Done,
    Failed(FailureReason),
}

impl EnrollmentState {
    /// Check if transition to `target` is valid from this state.
    ///
    /// ```
    /// use fingerlock_controller::enrollment::{EnrollmentState, FailureReason};
    ///
    /// assert!(EnrollmentState::CreateModel.can_transition_to(&EnrollmentState::StoreModel));
    /// assert!(EnrollmentState::CreateModel
    ///     .can_transition_to(&EnrollmentState::Failed(FailureReason::Mismatch)));
    /// assert!(!EnrollmentState::Done.can_transition_to(&EnrollmentState::AwaitFirstCapture));
    /// ```
    pub fn can_transition_to(&self, target: &EnrollmentState) -> bool {
        use EnrollmentState::*;

        if matches!(target, Failed(_)) {
            return !self.is_terminal();
        }

        matches!(
            (self, target),
            (AwaitFirstCapture, ConvertFirst)
                | (ConvertFirst, AwaitRemoval1)
                | (AwaitRemoval1, AwaitSecondCapture)
                | (AwaitSecondCapture, ConvertSecond)
                | (ConvertSecond, AwaitRemoval2)
                | (AwaitRemoval2, CreateModel)
                | (CreateModel, StoreModel)
                | (StoreModel, Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EnrollmentState::Done | EnrollmentState::Failed(_))
    }

    /// Operator prompt shown when this state is entered.
    pub fn prompt(&self) -> &'static str {
        match self {
            EnrollmentState::AwaitFirstCapture => "Place finger on sensor",
            EnrollmentState::ConvertFirst | EnrollmentState::ConvertSecond => "Image taken",
            EnrollmentState::AwaitRemoval1 | EnrollmentState::AwaitRemoval2 => "Remove finger",
            EnrollmentState::AwaitSecondCapture => "Place same finger again",
            EnrollmentState::CreateModel => "Creating model",
            EnrollmentState::StoreModel => "Fingerprint model created",
            EnrollmentState::Done => "Stored",
            EnrollmentState::Failed(_) => "Enrollment failed",
        }
    }
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnrollmentState::AwaitFirstCapture => "AwaitFirstCapture",
            EnrollmentState::ConvertFirst => "ConvertFirst",
            EnrollmentState::AwaitRemoval1 => "AwaitRemoval1",
            EnrollmentState::AwaitSecondCapture => "AwaitSecondCapture",
            EnrollmentState::ConvertSecond => "ConvertSecond",
            EnrollmentState::AwaitRemoval2 => "AwaitRemoval2",
            EnrollmentState::CreateModel => "CreateModel",
            EnrollmentState::StoreModel => "StoreModel",
            EnrollmentState::Done => "Done",
            EnrollmentState::Failed(_) => "Failed",
        };
        f.write_str(name)
    }
}

/// A recorded state change.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: EnrollmentState,
    pub to: EnrollmentState,
    pub timestamp: Instant,
}

/// Transition bookkeeping for one enrollment attempt.
#[derive(Debug)]
pub struct EnrollmentMachine {
    slot: SlotId,
    current_state: EnrollmentState,
    state_entered_at: Instant,
    history: VecDeque<StateTransition>,
}

impl EnrollmentMachine {
    /// Start an attempt for `slot` in `AwaitFirstCapture`.
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            current_state: EnrollmentState::AwaitFirstCapture,
            state_entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn current_state(&self) -> &EnrollmentState {
        &self.current_state
    }

    pub fn time_in_current_state(&self) -> Duration {
        self.state_entered_at.elapsed()
    }

    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Move to `new_state`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] if the move is not allowed;
    /// the machine is left unchanged.
    pub fn transition_to(&mut self, new_state: EnrollmentState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let from = std::mem::replace(&mut self.current_state, new_state.clone());
        self.state_entered_at = Instant::now();

        let transition = StateTransition {
            from,
            to: new_state,
            timestamp: self.state_entered_at,
        };
        self.history.push_back(transition.clone());
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }

        Ok(transition)
    }

    /// Abandon the attempt.
    pub fn fail(&mut self, reason: FailureReason) -> Result<StateTransition> {
        self.transition_to(EnrollmentState::Failed(reason))
    }
}

/// Runs one enrollment attempt against a sensor.
///
/// The sequencer owns the sensor for the whole attempt; nothing else runs
/// until it returns.
pub struct EnrollmentSequencer<'a, S> {
    sensor: &'a mut S,
    timing: &'a Timing,
    events: &'a EventSink,
}

impl<'a, S: FingerprintSensor> EnrollmentSequencer<'a, S> {
    pub fn new(sensor: &'a mut S, timing: &'a Timing, events: &'a EventSink) -> Self {
        Self {
            sensor,
            timing,
            events,
        }
    }

    /// Enroll into `slot`, returning the terminal state.
    ///
    /// Emits `EnrollmentStarted`, one `EnrollmentProgress` per intermediate
    /// state, and finally `Enrolled` or `EnrollmentFailed`.
    pub async fn run(mut self, slot: SlotId) -> EnrollmentState {
        let mut machine = EnrollmentMachine::new(slot);
        info!(%slot, "Enrollment started");
        self.events.emit(ControllerEvent::EnrollmentStarted { slot });
        self.progress(&machine);

        while !machine.current_state().is_terminal() {
            let next = match self.step(machine.current_state(), slot).await {
                Ok(next) => next,
                Err(reason) => EnrollmentState::Failed(reason),
            };

            if let Err(e) = machine.transition_to(next) {
                // Every step returns its successor, so this is a logic error.
                warn!(error = %e, "Enrollment sequencing error");
                let reason = FailureReason::Communication {
                    message: e.to_string(),
                };
                if machine.fail(reason).is_err() {
                    break;
                }
            }

            match machine.current_state() {
                EnrollmentState::Done => {
                    info!(%slot, "Enrollment stored");
                    self.events.emit(ControllerEvent::Enrolled { slot });
                }
                EnrollmentState::Failed(reason) => {
                    warn!(%slot, %reason, "Enrollment failed");
                    self.events.emit(ControllerEvent::EnrollmentFailed {
                        slot,
                        reason: reason.clone(),
                    });
                }
                _ => self.progress(&machine),
            }
        }

        machine.current_state().clone()
    }

    fn progress(&self, machine: &EnrollmentMachine) {
        debug!(slot = %machine.slot(), state = %machine.current_state(), "Enrollment progress");
        self.events.emit(ControllerEvent::EnrollmentProgress {
            slot: machine.slot(),
            state: machine.current_state().clone(),
        });
    }

    /// Perform the work of `state` and return the state that follows it.
    async fn step(
        &mut self,
        state: &EnrollmentState,
        slot: SlotId,
    ) -> std::result::Result<EnrollmentState, FailureReason> {
        use EnrollmentState::*;

        let next = match state {
            AwaitFirstCapture => {
                self.wait_for_finger().await?;
                ConvertFirst
            }
            ConvertFirst => {
                self.convert(CharBuffer::One).await?;
                AwaitRemoval1
            }
            AwaitRemoval1 => {
                self.wait_for_removal().await?;
                AwaitSecondCapture
            }
            AwaitSecondCapture => {
                self.wait_for_finger().await?;
                ConvertSecond
            }
            ConvertSecond => {
                self.convert(CharBuffer::Two).await?;
                AwaitRemoval2
            }
            AwaitRemoval2 => {
                self.wait_for_removal().await?;
                CreateModel
            }
            CreateModel => {
                self.sensor.create_model().await.map_err(|e| {
                    FailureReason::from_error(&e, |code| match code {
                        ConfirmationCode::EnrollMismatch => FailureReason::Mismatch,
                        code => FailureReason::ModelFailed { code },
                    })
                })?;
                StoreModel
            }
            StoreModel => {
                self.sensor
                    .store_model(CharBuffer::One, slot)
                    .await
                    .map_err(|e| {
                        FailureReason::from_error(&e, |code| FailureReason::StoreFailed { code })
                    })?;
                Done
            }
            Done | Failed(_) => state.clone(),
        };

        Ok(next)
    }

    /// Poll for a finger until one is captured or the capture timeout expires.
    ///
    /// Imaging errors reported by the module are logged and polling continues.
    async fn wait_for_finger(&mut self) -> std::result::Result<(), FailureReason> {
        let deadline = Instant::now() + self.timing.capture_timeout;

        loop {
            match self.sensor.capture_image().await {
                Ok(ImageCapture::Captured) => return Ok(()),
                Ok(ImageCapture::NoFinger) => {}
                Err(e) if e.confirmation_code().is_some() => {
                    warn!(error = %e, "Imaging error, retrying");
                }
                Err(e) => return Err(communication(&e)),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(FailureReason::CaptureTimeout);
            }
            tokio::time::sleep(self.timing.capture_poll.min(deadline - now)).await;
        }
    }

    /// Poll until the sensor reports no finger. No timeout.
    async fn wait_for_removal(&mut self) -> std::result::Result<(), FailureReason> {
        loop {
            match self.sensor.capture_image().await {
                Ok(ImageCapture::NoFinger) => return Ok(()),
                Ok(ImageCapture::Captured) => {}
                Err(e) if e.confirmation_code().is_some() => {
                    debug!(error = %e, "Imaging error while waiting for removal");
                }
                Err(e) => return Err(communication(&e)),
            }
            tokio::time::sleep(self.timing.removal_poll).await;
        }
    }

    async fn convert(&mut self, buffer: CharBuffer) -> std::result::Result<(), FailureReason> {
        self.sensor
            .image_to_template(buffer)
            .await
            .map_err(|e| FailureReason::from_error(&e, |code| FailureReason::ConversionFailed { code }))
    }
}
