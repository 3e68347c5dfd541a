//! Door controller for a fingerprint lock.
//!
//! This crate implements the control logic that sits between an operator
//! control channel, a fingerprint sensor module and the door relay:
//!
//! - [`command`]: line-oriented `enroll` / `clear` commands
//! - [`allocator`]: next free template slot
//! - [`enrollment`]: the two-capture enrollment state machine
//! - [`matcher`]: one capture and search attempt per tick
//! - [`actuator`]: relay levels for locked/unlocked and the timed unlock
//! - [`controller`]: the [`DoorController`] main loop tying them together
//!
//! Everything an operator should see is reported as a [`ControllerEvent`]
//! through an [`EventSink`]; diagnostics go through `tracing`.
//!
//! The controller is generic over [`FingerprintSensor`] and [`RelayDevice`],
//! so it runs unchanged against the mock devices in
//! `fingerlock_hardware::mock`.
//!
//! [`FingerprintSensor`]: fingerlock_hardware::FingerprintSensor
//! [`RelayDevice`]: fingerlock_hardware::RelayDevice

pub mod actuator;
pub mod allocator;
pub mod command;
pub mod config;
pub mod controller;
pub mod enrollment;
pub mod error;
pub mod event;
pub mod matcher;

pub use actuator::LockActuator;
pub use command::{Command, CommandReader};
pub use config::{ControllerConfig, Timing};
pub use controller::{DoorController, SensorStatus};
pub use enrollment::{EnrollmentState, FailureReason};
pub use error::{ControllerError, Result};
pub use event::{ControllerEvent, EventSink};
pub use matcher::{MatchSequencer, ScanOutcome};
