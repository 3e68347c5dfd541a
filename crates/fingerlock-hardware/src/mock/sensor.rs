//! Mock fingerprint sensor for testing and development.
//!
//! The mock models what the controller can observe of a real module: a
//! finger that is either on the glass or not, an image buffer, two character
//! buffers and a template library. Tests script finger placements through a
//! [`MockSensorHandle`]; the sensor applies at most one placement or lift per
//! capture attempt, the way a person moves a finger between polls.

use std::collections::{BTreeMap, VecDeque};

use fingerlock_core::{CharBuffer, SlotId, constants::DEFAULT_SENSOR_ADDRESS};
use fingerlock_protocol::{ConfirmationCode, Instruction, SystemParameters};
use tokio::sync::mpsc;
use tracing::trace;

use crate::{
    HardwareError, Result,
    traits::{FingerprintSensor, ImageCapture, SearchMatch},
    types::DeviceInfo,
};

/// Default minimum image quality for a successful conversion.
pub const DEFAULT_QUALITY_THRESHOLD: u8 = 50;

/// Maximum valid image quality.
pub const MAX_QUALITY_SCORE: u8 = 100;

/// Confidence reported for every mock match.
const MOCK_MATCH_SCORE: u16 = 100;

/// Default library size of the mock.
const DEFAULT_MOCK_CAPACITY: u16 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Finger {
    template: Vec<u8>,
    quality: u8,
}

/// Internal event type for the mock sensor.
#[derive(Debug, Clone)]
enum SensorEvent {
    Place(Finger),
    Lift,
    FailNextStore(ConfirmationCode),
}

/// Mock fingerprint sensor for testing and development.
///
/// # Examples
///
/// ```
/// use fingerlock_core::CharBuffer;
/// use fingerlock_hardware::mock::MockSensor;
/// use fingerlock_hardware::traits::{FingerprintSensor, ImageCapture};
///
/// #[tokio::main]
/// async fn main() -> fingerlock_hardware::Result<()> {
///     let (mut sensor, handle) = MockSensor::new();
///
///     handle.place_finger(vec![1, 2, 3], 80).await?;
///     assert_eq!(sensor.capture_image().await?, ImageCapture::Captured);
///     sensor.image_to_template(CharBuffer::One).await?;
///
///     handle.lift_finger().await?;
///     assert_eq!(sensor.capture_image().await?, ImageCapture::NoFinger);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSensor {
    /// Channel receiver for scripted finger events
    event_rx: mpsc::Receiver<SensorEvent>,

    /// Received events not yet applied
    backlog: VecDeque<SensorEvent>,

    /// Device name
    name: String,

    /// Finger currently on the sensor
    finger: Option<Finger>,

    /// Image buffer (last successful capture)
    image: Option<Finger>,

    /// Character buffers 1 and 2
    buffers: [Option<Vec<u8>>; 2],

    /// Template library (page -> template)
    library: BTreeMap<u16, Vec<u8>>,

    capacity: u16,
    quality_threshold: u8,
    password_accepted: bool,
    responsive: bool,
    fail_next_store: Option<ConfirmationCode>,

    /// Every instruction executed, in order
    instructions: Vec<Instruction>,
}

impl MockSensor {
    /// Create a new mock sensor with default settings (capacity 50, empty library).
    pub fn new() -> (Self, MockSensorHandle) {
        Self::builder().build()
    }

    /// Create a builder for a customised mock sensor.
    pub fn builder() -> MockSensorBuilder {
        MockSensorBuilder::default()
    }

    /// Template stored at `slot`, if any.
    pub fn stored_template(&self, slot: SlotId) -> Option<&[u8]> {
        self.library.get(&slot.as_u16()).map(Vec::as_slice)
    }

    /// Number of templates in the library, without recording an instruction.
    pub fn stored_count(&self) -> usize {
        self.library.len()
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Every instruction executed so far, in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Forget the recorded instruction log.
    pub fn clear_instructions(&mut self) {
        self.instructions.clear();
    }

    fn record(&mut self, instruction: Instruction) -> Result<()> {
        self.instructions.push(instruction);
        trace!(%instruction, sensor = %self.name, "Mock sensor instruction");
        if !self.responsive {
            return Err(HardwareError::timeout(0));
        }
        Ok(())
    }

    fn drain_channel(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.backlog.push_back(event);
        }
    }

    /// Apply queued control events and at most one presence change.
    fn apply_pending_events(&mut self) {
        self.drain_channel();
        while let Some(event) = self.backlog.pop_front() {
            match event {
                SensorEvent::FailNextStore(code) => self.fail_next_store = Some(code),
                SensorEvent::Place(finger) => {
                    self.finger = Some(finger);
                    break;
                }
                SensorEvent::Lift => {
                    self.finger = None;
                    break;
                }
            }
        }
    }

    /// Apply queued control events, leaving presence changes for later captures.
    fn apply_control_events(&mut self) {
        self.drain_channel();
        let mut fail = None;
        self.backlog.retain(|event| match event {
            SensorEvent::FailNextStore(code) => {
                fail = Some(*code);
                false
            }
            _ => true,
        });
        if fail.is_some() {
            self.fail_next_store = fail;
        }
    }

    fn reject(instruction: Instruction, code: ConfirmationCode) -> HardwareError {
        HardwareError::sensor(instruction.name(), code)
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new().0
    }
}

impl FingerprintSensor for MockSensor {
    async fn verify_password(&mut self) -> Result<()> {
        self.record(Instruction::VerifyPassword)?;
        if !self.password_accepted {
            return Err(Self::reject(
                Instruction::VerifyPassword,
                ConfirmationCode::PasswordFail,
            ));
        }
        Ok(())
    }

    async fn read_parameters(&mut self) -> Result<SystemParameters> {
        self.record(Instruction::ReadSystemParameters)?;
        Ok(SystemParameters {
            status_register: 0,
            system_id: 0,
            capacity: self.capacity,
            security_level: 3,
            device_address: DEFAULT_SENSOR_ADDRESS,
            packet_size_code: 2,
            baud_multiplier: 6,
        })
    }

    async fn template_count(&mut self) -> Result<u16> {
        self.record(Instruction::TemplateCount)?;
        Ok(self.library.len() as u16)
    }

    async fn capture_image(&mut self) -> Result<ImageCapture> {
        self.record(Instruction::GenImage)?;
        self.apply_pending_events();

        match &self.finger {
            Some(finger) => {
                self.image = Some(finger.clone());
                Ok(ImageCapture::Captured)
            }
            None => Ok(ImageCapture::NoFinger),
        }
    }

    async fn image_to_template(&mut self, buffer: CharBuffer) -> Result<()> {
        self.record(Instruction::ImageToTemplate)?;

        let image = self.image.as_ref().ok_or_else(|| {
            Self::reject(Instruction::ImageToTemplate, ConfirmationCode::InvalidImage)
        })?;

        if image.quality < self.quality_threshold {
            return Err(Self::reject(
                Instruction::ImageToTemplate,
                ConfirmationCode::ImageMessy,
            ));
        }

        self.buffers[buffer.index()] = Some(image.template.clone());
        Ok(())
    }

    async fn create_model(&mut self) -> Result<()> {
        self.record(Instruction::RegisterModel)?;

        match (&self.buffers[0], &self.buffers[1]) {
            (Some(first), Some(second)) if first == second => Ok(()),
            (Some(_), Some(_)) => Err(Self::reject(
                Instruction::RegisterModel,
                ConfirmationCode::EnrollMismatch,
            )),
            _ => Err(Self::reject(
                Instruction::RegisterModel,
                ConfirmationCode::InvalidImage,
            )),
        }
    }

    async fn store_model(&mut self, buffer: CharBuffer, slot: SlotId) -> Result<()> {
        self.record(Instruction::Store)?;
        self.apply_control_events();

        if let Some(code) = self.fail_next_store.take() {
            return Err(Self::reject(Instruction::Store, code));
        }

        if slot.as_u16() > self.capacity {
            return Err(Self::reject(Instruction::Store, ConfirmationCode::BadLocation));
        }

        let template = self.buffers[buffer.index()].clone().ok_or_else(|| {
            Self::reject(Instruction::Store, ConfirmationCode::InvalidImage)
        })?;

        self.library.insert(slot.as_u16(), template);
        Ok(())
    }

    async fn search(
        &mut self,
        buffer: CharBuffer,
        start_page: u16,
        page_count: u16,
    ) -> Result<Option<SearchMatch>> {
        self.record(Instruction::Search)?;

        let probe = self.buffers[buffer.index()]
            .as_ref()
            .ok_or_else(|| Self::reject(Instruction::Search, ConfirmationCode::InvalidImage))?;

        let end = u32::from(start_page) + u32::from(page_count);
        let found = self
            .library
            .iter()
            .filter(|(page, _)| u32::from(**page) < end && **page >= start_page)
            .find(|(_, template)| *template == probe)
            .map(|(page, _)| *page);

        match found {
            Some(page) => Ok(Some(SearchMatch {
                slot: SlotId::new(page)
                    .map_err(|e| HardwareError::invalid_data(e.to_string()))?,
                confidence: MOCK_MATCH_SCORE,
            })),
            None => Ok(None),
        }
    }

    async fn empty_database(&mut self) -> Result<()> {
        self.record(Instruction::Empty)?;
        self.library.clear();
        Ok(())
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock Fingerprint Sensor v1.0")
            .with_firmware_version("1.0.0"))
    }
}

/// Builder for [`MockSensor`].
#[derive(Debug)]
pub struct MockSensorBuilder {
    name: String,
    capacity: u16,
    quality_threshold: u8,
    password_accepted: bool,
    responsive: bool,
    library: BTreeMap<u16, Vec<u8>>,
}

impl Default for MockSensorBuilder {
    fn default() -> Self {
        Self {
            name: "Mock Fingerprint Sensor".to_string(),
            capacity: DEFAULT_MOCK_CAPACITY,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            password_accepted: true,
            responsive: true,
            library: BTreeMap::new(),
        }
    }
}

impl MockSensorBuilder {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Library size reported by `read_parameters`.
    pub fn with_capacity(mut self, capacity: u16) -> Self {
        self.capacity = capacity;
        self
    }

    /// Minimum quality an image needs to convert.
    pub fn with_quality_threshold(mut self, threshold: u8) -> Self {
        self.quality_threshold = threshold.min(MAX_QUALITY_SCORE);
        self
    }

    /// Pre-populate the library.
    pub fn with_template(mut self, slot: SlotId, template: Vec<u8>) -> Self {
        self.library.insert(slot.as_u16(), template);
        self
    }

    /// Fill slots `1..=count` with distinct templates.
    pub fn with_stored_templates(mut self, count: u16) -> Self {
        for page in 1..=count {
            self.library.insert(page, page.to_be_bytes().to_vec());
        }
        self
    }

    /// Reject the password handshake.
    pub fn rejecting_password(mut self) -> Self {
        self.password_accepted = false;
        self
    }

    /// Time out on every instruction, like a module that is not wired up.
    pub fn unresponsive(mut self) -> Self {
        self.responsive = false;
        self
    }

    pub fn build(self) -> (MockSensor, MockSensorHandle) {
        let (event_tx, event_rx) = mpsc::channel(64);

        let sensor = MockSensor {
            event_rx,
            backlog: VecDeque::new(),
            name: self.name.clone(),
            finger: None,
            image: None,
            buffers: [None, None],
            library: self.library,
            capacity: self.capacity,
            quality_threshold: self.quality_threshold,
            password_accepted: self.password_accepted,
            responsive: self.responsive,
            fail_next_store: None,
            instructions: Vec::new(),
        };

        let handle = MockSensorHandle {
            event_tx,
            name: self.name,
        };

        (sensor, handle)
    }
}

/// Handle for scripting a mock sensor.
///
/// Each placement or lift is observed by exactly one subsequent
/// `capture_image` call, in the order they were queued. A finger that is
/// placed and never lifted stays on the sensor.
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    /// Channel sender for sensor events
    event_tx: mpsc::Sender<SensorEvent>,

    /// Device name
    name: String,
}

impl MockSensorHandle {
    /// Put a finger with the given template and image quality on the sensor.
    ///
    /// # Errors
    ///
    /// Returns an error if quality exceeds [`MAX_QUALITY_SCORE`] or the
    /// sensor has been dropped.
    pub async fn place_finger(&self, template: Vec<u8>, quality: u8) -> Result<()> {
        if quality > MAX_QUALITY_SCORE {
            return Err(HardwareError::invalid_data(format!(
                "Image quality must be 0-{MAX_QUALITY_SCORE}, got {quality}"
            )));
        }
        self.send(SensorEvent::Place(Finger { template, quality }))
            .await
    }

    /// Take the finger off the sensor.
    pub async fn lift_finger(&self) -> Result<()> {
        self.send(SensorEvent::Lift).await
    }

    /// Place a good-quality finger and lift it right after one capture.
    pub async fn tap(&self, template: Vec<u8>) -> Result<()> {
        self.place_finger(template, MAX_QUALITY_SCORE).await?;
        self.lift_finger().await
    }

    /// Make the next `store_model` fail with `code`.
    pub async fn fail_next_store(&self, code: ConfirmationCode) -> Result<()> {
        self.send(SensorEvent::FailNextStore(code)).await
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, event: SensorEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("Mock sensor event channel closed"))
    }
}
