//! Fingerprint module driver over a serial byte stream.
//!
//! Every instruction is one request/acknowledgement exchange:
//!
//! ```text
//! SerialSensor ──(command packet)──> module
//!              <──(ack packet)────── module
//! ```
//!
//! The driver is generic over the stream so it can run against a real UART
//! ([`open`]) or an in-memory pipe in tests.

use std::time::Duration;

use bytes::BytesMut;
use fingerlock_core::{
    CharBuffer, SlotId,
    constants::{DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_SENSOR_ADDRESS, DEFAULT_SENSOR_PASSWORD},
};
use fingerlock_hardware::{
    DeviceInfo, FingerprintSensor, HardwareError, ImageCapture, Result, SearchMatch,
};
use fingerlock_protocol::{
    Acknowledgement, Command, ConfirmationCode, Packet, SensorCodec, SystemParameters,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

#[cfg(unix)]
use crate::stream::SerialStream;

/// Pause before polling again when the port reports no data.
const IDLE_READ_BACKOFF: Duration = Duration::from_millis(5);

/// Link settings for a fingerprint module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSensorConfig {
    /// Module address placed in every packet header.
    pub address: u32,

    /// Handshake password for `VfyPwd`.
    pub password: u32,

    /// How long to wait for an acknowledgement.
    pub response_timeout: Duration,
}

impl Default for SerialSensorConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_SENSOR_ADDRESS,
            password: DEFAULT_SENSOR_PASSWORD,
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
        }
    }
}

/// R30x/ZFM fingerprint module on a byte stream.
///
/// # Examples
///
/// ```no_run
/// use fingerlock_biometric::{SerialSensorConfig, serial};
/// use fingerlock_hardware::FingerprintSensor;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut sensor = serial::open("/dev/ttyS0", 57_600, SerialSensorConfig::default())?;
/// sensor.verify_password().await?;
/// println!("{} templates stored", sensor.template_count().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SerialSensor<T> {
    port: T,
    codec: SensorCodec,
    read_buf: BytesMut,
    write_buf: BytesMut,
    name: String,
    config: SerialSensorConfig,
}

impl<T> SerialSensor<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    pub fn new(port: T, config: SerialSensorConfig) -> Self {
        Self {
            port,
            codec: SensorCodec::new(),
            read_buf: BytesMut::with_capacity(64),
            write_buf: BytesMut::with_capacity(32),
            name: "fingerprint sensor".to_string(),
            config,
        }
    }

    /// Name used in logs and device info (usually the port path).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn config(&self) -> &SerialSensorConfig {
        &self.config
    }

    pub fn into_inner(self) -> T {
        self.port
    }

    /// Send one command and wait for its acknowledgement.
    ///
    /// Bytes left over from an earlier exchange are discarded first so a late
    /// acknowledgement is never paired with the wrong command.
    pub async fn transact(&mut self, command: Command) -> Result<Acknowledgement> {
        trace!(%command, sensor = %self.name, "Sending command");

        self.read_buf.clear();
        self.write_buf.clear();
        self.codec
            .encode(command.to_packet(self.config.address), &mut self.write_buf)?;
        self.port.write_all(&self.write_buf).await?;
        self.port.flush().await?;

        let packet = self.read_packet().await?;
        if packet.address() != self.config.address {
            debug!(
                expected = format_args!("{:#010X}", self.config.address),
                actual = format_args!("{:#010X}", packet.address()),
                "Acknowledgement from unexpected address"
            );
        }

        let ack = Acknowledgement::try_from(packet)?;
        trace!(%command, code = %ack.code(), "Received acknowledgement");
        Ok(ack)
    }

    async fn read_packet(&mut self) -> Result<Packet> {
        let timeout = self.config.response_timeout;
        let deadline = Instant::now() + timeout;

        loop {
            match self.codec.decode(&mut self.read_buf) {
                Ok(Some(packet)) => return Ok(packet),
                Ok(None) => {}
                Err(fingerlock_core::Error::FrameTooLarge { size, .. }) => {
                    warn!(size, "Skipping bogus packet header");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(HardwareError::timeout(timeout.as_millis() as u64));
            }

            match tokio::time::timeout(remaining, self.port.read_buf(&mut self.read_buf)).await {
                Ok(Ok(0)) => tokio::time::sleep(IDLE_READ_BACKOFF.min(remaining)).await,
                Ok(Ok(n)) => trace!(bytes = n, "Read from sensor"),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(HardwareError::timeout(timeout.as_millis() as u64)),
            }
        }
    }

    /// Transact and turn any non-success code into [`HardwareError::Sensor`].
    async fn expect_ok(&mut self, command: Command) -> Result<Acknowledgement> {
        let ack = self.transact(command).await?;
        if !ack.is_ok() {
            return Err(HardwareError::sensor(command.instruction().name(), ack.code()));
        }
        Ok(ack)
    }
}

impl<T> FingerprintSensor for SerialSensor<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    async fn verify_password(&mut self) -> Result<()> {
        self.expect_ok(Command::VerifyPassword(self.config.password))
            .await
            .map(|_| ())
    }

    async fn read_parameters(&mut self) -> Result<SystemParameters> {
        let ack = self.expect_ok(Command::ReadSystemParameters).await?;
        Ok(ack.system_parameters()?)
    }

    async fn template_count(&mut self) -> Result<u16> {
        let ack = self.expect_ok(Command::TemplateCount).await?;
        Ok(ack.template_count()?)
    }

    async fn capture_image(&mut self) -> Result<ImageCapture> {
        let command = Command::GenImage;
        let ack = self.transact(command).await?;
        match ack.code() {
            ConfirmationCode::Ok => Ok(ImageCapture::Captured),
            ConfirmationCode::NoFinger => Ok(ImageCapture::NoFinger),
            code => Err(HardwareError::sensor(command.instruction().name(), code)),
        }
    }

    async fn image_to_template(&mut self, buffer: CharBuffer) -> Result<()> {
        self.expect_ok(Command::ImageToTemplate(buffer))
            .await
            .map(|_| ())
    }

    async fn create_model(&mut self) -> Result<()> {
        self.expect_ok(Command::RegisterModel).await.map(|_| ())
    }

    async fn store_model(&mut self, buffer: CharBuffer, slot: SlotId) -> Result<()> {
        self.expect_ok(Command::Store {
            buffer,
            page: slot.as_u16(),
        })
        .await
        .map(|_| ())
    }

    async fn search(
        &mut self,
        buffer: CharBuffer,
        start_page: u16,
        page_count: u16,
    ) -> Result<Option<SearchMatch>> {
        let command = Command::Search {
            buffer,
            start_page,
            page_count,
        };
        let ack = self.transact(command).await?;
        match ack.code() {
            ConfirmationCode::Ok => {
                let result = ack.search_result()?;
                let slot = SlotId::new(result.page_id).map_err(|_| {
                    HardwareError::invalid_data(format!(
                        "Search matched reserved page {}",
                        result.page_id
                    ))
                })?;
                Ok(Some(SearchMatch {
                    slot,
                    confidence: result.score,
                }))
            }
            ConfirmationCode::NotFound => Ok(None),
            code => Err(HardwareError::sensor(command.instruction().name(), code)),
        }
    }

    async fn empty_database(&mut self) -> Result<()> {
        self.expect_ok(Command::Empty).await.map(|_| ())
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "R30x fingerprint module")
            .with_serial_number(format!("{:08X}", self.config.address)))
    }
}

/// Open a fingerprint module on a serial port.
///
/// The port is configured (8N1, `baud_rate`) through `serialport` and then
/// driven non-blocking by the Tokio reactor. Must be called from within a
/// Tokio runtime.
///
/// # Errors
///
/// Returns [`HardwareError::InitializationFailed`] if the port cannot be
/// opened or configured.
#[cfg(unix)]
pub fn open(
    path: &str,
    baud_rate: u32,
    config: SerialSensorConfig,
) -> Result<SerialSensor<SerialStream>> {
    let port = serialport::new(path, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .open_native()
        .map_err(|e| HardwareError::initialization_failed(format!("{path}: {e}")))?;

    let stream = SerialStream::from_port(port)
        .map_err(|e| HardwareError::initialization_failed(format!("{path}: {e}")))?;
    debug!(path, baud_rate, "Serial port opened");

    Ok(SerialSensor::new(stream, config).with_name(path))
}
