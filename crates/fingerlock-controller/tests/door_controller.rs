//! Integration tests for DoorController
//!
//! These tests drive the full controller against the mock sensor and relay,
//! on paused Tokio time so capture timeouts and unlock holds run instantly
//! but with exact durations.

use std::time::Duration;

use tokio::sync::mpsc;

use fingerlock_controller::{
    Command, CommandReader, ControllerConfig, ControllerError, ControllerEvent, DoorController,
    EnrollmentState, EventSink, FailureReason, ScanOutcome,
};
use fingerlock_core::{Error, LockState, OutputLevel, SlotId};
use fingerlock_hardware::mock::{MockRelay, MockRelayHandle, MockSensor, MockSensorHandle};
use fingerlock_protocol::Instruction;

const HOLD: Duration = Duration::from_secs(10);

struct Rig {
    controller: DoorController<MockSensor, MockRelay>,
    finger: MockSensorHandle,
    relay: MockRelayHandle,
    events: mpsc::UnboundedReceiver<ControllerEvent>,
    commands_tx: mpsc::Sender<fingerlock_core::Result<Command>>,
    commands: CommandReader,
}

impl Rig {
    fn new(sensor: (MockSensor, MockSensorHandle)) -> Self {
        Self::with_config(sensor, ControllerConfig::default())
    }

    fn with_config(sensor: (MockSensor, MockSensorHandle), config: ControllerConfig) -> Self {
        let (sensor, finger) = sensor;
        let (relay, relay_handle) = MockRelay::new();
        let (sink, events) = EventSink::channel();
        let (commands_tx, commands_rx) = mpsc::channel(8);

        Self {
            controller: DoorController::new(sensor, relay, config, sink),
            finger,
            relay: relay_handle,
            events,
            commands_tx,
            commands: CommandReader::from_channel(commands_rx),
        }
    }

    async fn started(mut self) -> Self {
        self.controller.start().await.unwrap();
        self.controller.sensor_mut().clear_instructions();
        self.drain();
        self
    }

    fn drain(&mut self) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    fn lines(&mut self) -> Vec<String> {
        self.drain().iter().map(ToString::to_string).collect()
    }
}

fn slot(id: u16) -> SlotId {
    SlotId::new(id).unwrap()
}

#[tokio::test]
async fn test_startup_locks_door_and_reports_sensor() {
    let mut rig = Rig::new(MockSensor::builder().with_stored_templates(3).build());

    let status = rig.controller.start().await.unwrap();
    assert_eq!(status.template_count, 3);
    assert_eq!(status.capacity, 50);

    // Active-low wiring: locked is HIGH.
    assert_eq!(rig.relay.levels(), vec![OutputLevel::High]);
    assert_eq!(rig.controller.lock_state(), LockState::Locked);

    let events = rig.drain();
    assert!(events.contains(&ControllerEvent::SensorReady {
        template_count: 3,
        capacity: 50
    }));
    assert_eq!(
        rig.controller.sensor().instructions(),
        &[
            Instruction::VerifyPassword,
            Instruction::ReadSystemParameters,
            Instruction::TemplateCount
        ]
    );
}

#[tokio::test]
async fn test_missing_sensor_is_fatal() {
    let mut rig = Rig::new(MockSensor::builder().unresponsive().build());

    let err = rig.controller.start().await.unwrap_err();
    assert!(matches!(err, ControllerError::SensorNotDetected(_)));
    // The door was locked before probing.
    assert_eq!(rig.relay.current_level(), Some(OutputLevel::High));
}

#[tokio::test]
async fn test_wrong_password_is_fatal() {
    let mut rig = Rig::new(MockSensor::builder().rejecting_password().build());
    assert!(matches!(
        rig.controller.start().await,
        Err(ControllerError::SensorNotDetected(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_enroll_into_empty_database() {
    let mut rig = Rig::new(MockSensor::new()).started().await;
    rig.finger.tap(vec![0xAB; 8]).await.unwrap();
    rig.finger.tap(vec![0xAB; 8]).await.unwrap();

    rig.controller.handle_command(Ok(Command::Enroll)).await;

    let lines = rig.lines();
    assert!(lines.iter().any(|line| line.contains("model created")));
    assert!(lines.iter().any(|line| line.contains("saved successfully")));
    assert!(lines.contains(&"Enrolling ID #1".to_string()));

    assert_eq!(rig.controller.template_count(), 1);
    assert_eq!(rig.controller.sensor().stored_count(), 1);
    assert!(rig.controller.sensor().stored_template(slot(1)).is_some());

    // The new template is found by presenting the same finger.
    rig.finger.place_finger(vec![0xAB; 8], 90).await.unwrap();
    let outcome = rig.controller.scan().await.unwrap();
    assert!(matches!(outcome, ScanOutcome::Matched(found) if found.slot == slot(1)));
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_enrollments_use_sequential_slots() {
    let mut rig = Rig::new(MockSensor::builder().with_stored_templates(4).build())
        .started()
        .await;

    for template in [vec![0x10], vec![0x20]] {
        rig.finger.tap(template.clone()).await.unwrap();
        rig.finger.tap(template).await.unwrap();
        assert_eq!(rig.controller.enroll().await, Some(EnrollmentState::Done));
    }

    assert_eq!(rig.controller.template_count(), 6);
    assert_eq!(
        rig.controller.sensor().stored_template(slot(5)),
        Some(&[0x10u8][..])
    );
    assert_eq!(
        rig.controller.sensor().stored_template(slot(6)),
        Some(&[0x20u8][..])
    );
}

#[tokio::test]
async fn test_full_database_refuses_without_sensor_interaction() {
    let mut rig = Rig::new(
        MockSensor::builder()
            .with_capacity(50)
            .with_stored_templates(50)
            .build(),
    )
    .started()
    .await;

    assert_eq!(rig.controller.enroll().await, None);

    assert_eq!(
        rig.drain(),
        vec![ControllerEvent::DatabaseFull {
            count: 50,
            capacity: 50
        }]
    );
    assert!(rig.controller.sensor().instructions().is_empty());
    assert_eq!(rig.controller.template_count(), 50);
}

#[tokio::test(start_paused = true)]
async fn test_mismatched_fingers_leave_database_unchanged() {
    let mut rig = Rig::new(MockSensor::new()).started().await;
    rig.finger.tap(vec![1, 1]).await.unwrap();
    rig.finger.tap(vec![2, 2]).await.unwrap();

    let outcome = rig.controller.enroll().await;

    assert_eq!(
        outcome,
        Some(EnrollmentState::Failed(FailureReason::Mismatch))
    );
    assert!(
        rig.lines()
            .iter()
            .any(|line| line.contains("fingerprints did not match"))
    );
    assert_eq!(rig.controller.template_count(), 0);
    assert_eq!(rig.controller.sensor().stored_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_enrollment_does_not_consume_slot() {
    let mut rig = Rig::new(MockSensor::new()).started().await;

    // Nobody presents a finger.
    assert_eq!(
        rig.controller.enroll().await,
        Some(EnrollmentState::Failed(FailureReason::CaptureTimeout))
    );

    rig.finger.tap(vec![7]).await.unwrap();
    rig.finger.tap(vec![7]).await.unwrap();
    rig.controller.enroll().await;

    assert!(rig.controller.sensor().stored_template(slot(1)).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_clear_empties_database_and_restarts_slots() {
    let mut rig = Rig::new(MockSensor::builder().with_stored_templates(12).build())
        .started()
        .await;

    rig.controller.handle_command(Ok(Command::Clear)).await;

    assert!(rig.drain().contains(&ControllerEvent::DatabaseCleared));
    assert_eq!(rig.controller.template_count(), 0);
    assert_eq!(rig.controller.sensor().stored_count(), 0);

    rig.finger.tap(vec![3]).await.unwrap();
    rig.finger.tap(vec![3]).await.unwrap();
    rig.controller.enroll().await;
    assert!(rig.controller.sensor().stored_template(slot(1)).is_some());
}

#[tokio::test]
async fn test_unknown_command_is_reported() {
    let mut rig = Rig::new(MockSensor::new()).started().await;

    rig.controller
        .handle_command(Err(Error::UnknownCommand("open".to_string())))
        .await;

    assert_eq!(
        rig.drain(),
        vec![ControllerEvent::UnknownCommand("open".to_string())]
    );
    assert!(rig.controller.sensor().instructions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_match_unlocks_for_hold_then_relocks() {
    let mut rig = Rig::new(
        MockSensor::builder()
            .with_template(slot(4), vec![4, 4])
            .build(),
    )
    .started()
    .await;
    rig.finger.tap(vec![4, 4]).await.unwrap();

    // A command typed during the hold waits until the hold is over.
    let sender = rig.commands_tx.clone();
    let type_during_hold = async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        sender.send(Ok(Command::Clear)).await.unwrap();
    };
    tokio::join!(rig.controller.tick(&mut rig.commands), type_during_hold);

    let events = rig.drain();
    assert_eq!(
        events,
        vec![
            ControllerEvent::Matched {
                slot: slot(4),
                confidence: 100
            },
            ControllerEvent::LockChanged(LockState::Unlocked),
            ControllerEvent::LockChanged(LockState::Locked),
        ]
    );

    let history = rig.relay.history();
    assert_eq!(
        rig.relay.levels(),
        vec![OutputLevel::High, OutputLevel::Low, OutputLevel::High]
    );
    assert_eq!(history[2].at - history[1].at, HOLD);

    assert!(!rig.controller.sensor().instructions().contains(&Instruction::Empty));
    assert_eq!(rig.commands.try_next().unwrap().unwrap(), Command::Clear);
}

#[tokio::test(start_paused = true)]
async fn test_no_finger_never_unlocks() {
    let mut rig = Rig::new(MockSensor::builder().with_stored_templates(5).build())
        .started()
        .await;

    for _ in 0..20 {
        assert_eq!(rig.controller.scan().await, Some(ScanOutcome::NoFinger));
    }

    assert_eq!(rig.relay.write_count(), 1);
    assert!(rig.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_finger_is_silently_rejected_by_default() {
    let mut rig = Rig::new(MockSensor::builder().with_stored_templates(5).build())
        .started()
        .await;
    rig.finger.place_finger(vec![0xFF, 0xFF, 0xFF], 90).await.unwrap();

    assert_eq!(rig.controller.scan().await, Some(ScanOutcome::NoMatch));
    assert!(rig.drain().is_empty());
    assert_eq!(rig.relay.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejections_reported_when_enabled() {
    let mut rig = Rig::with_config(
        MockSensor::builder().with_stored_templates(5).build(),
        ControllerConfig::default().with_report_rejections(true),
    )
    .started()
    .await;
    rig.finger.place_finger(vec![0xFF, 0xFF, 0xFF], 90).await.unwrap();

    rig.controller.scan().await;
    assert_eq!(rig.drain(), vec![ControllerEvent::Rejected]);
}

#[tokio::test(start_paused = true)]
async fn test_poor_image_never_unlocks() {
    let mut rig = Rig::new(
        MockSensor::builder()
            .with_template(slot(1), vec![1])
            .build(),
    )
    .started()
    .await;
    rig.finger.place_finger(vec![1], 5).await.unwrap();

    assert!(matches!(
        rig.controller.scan().await,
        Some(ScanOutcome::ConversionFailed(_))
    ));
    assert_eq!(rig.relay.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_held_finger_matches_again_after_hold() {
    let mut rig = Rig::new(
        MockSensor::builder()
            .with_template(slot(2), vec![2])
            .build(),
    )
    .started()
    .await;
    rig.finger.place_finger(vec![2], 90).await.unwrap();

    rig.controller.tick(&mut rig.commands).await;
    rig.controller.tick(&mut rig.commands).await;

    let matches = rig
        .drain()
        .into_iter()
        .filter(|event| matches!(event, ControllerEvent::Matched { .. }))
        .count();
    assert_eq!(matches, 2);
    assert_eq!(rig.relay.write_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_tick_handles_command_before_scanning() {
    let mut rig = Rig::new(MockSensor::builder().with_stored_templates(2).build())
        .started()
        .await;
    rig.commands_tx.send(Ok(Command::Clear)).await.unwrap();

    rig.controller.tick(&mut rig.commands).await;

    assert_eq!(
        rig.controller.sensor().instructions(),
        &[Instruction::Empty, Instruction::GenImage]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_hold_relocks() {
    let mut rig = Rig::new(
        MockSensor::builder()
            .with_template(slot(1), vec![1])
            .build(),
    )
    .started()
    .await;
    rig.finger.tap(vec![1]).await.unwrap();

    let started = tokio::time::Instant::now();
    rig.controller
        .run_until(
            &mut rig.commands,
            tokio::time::sleep(Duration::from_secs(3)),
        )
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(
        rig.relay.levels(),
        vec![OutputLevel::High, OutputLevel::Low, OutputLevel::High]
    );
    assert_eq!(rig.controller.lock_state(), LockState::Locked);
}

#[tokio::test(start_paused = true)]
async fn test_run_scans_every_tick() {
    let mut rig = Rig::new(MockSensor::new()).started().await;

    rig.controller
        .run_until(
            &mut rig.commands,
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await
        .unwrap();

    let scans = rig
        .controller
        .sensor()
        .instructions()
        .iter()
        .filter(|instruction| **instruction == Instruction::GenImage)
        .count();
    // One scan per 100ms tick.
    assert!(scans >= 9, "expected about ten scans, got {scans}");
}
