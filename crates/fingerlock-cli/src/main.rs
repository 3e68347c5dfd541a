//! `fingerlock`: fingerprint door lock controller.
//!
//! Reads `enroll` / `clear` lines from stdin, prints status lines to stdout
//! and logs to stderr. The door is locked at startup and again on Ctrl-C.

mod config;
mod devices;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use fingerlock_controller::{CommandReader, DoorController, EventSink};
use fingerlock_hardware::FingerprintSensor;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{Config, RelayBackend};
use crate::devices::AnyRelay;

/// Fingerprint door lock controller
#[derive(Debug, Parser)]
#[command(name = "fingerlock", version, about)]
struct Cli {
    /// Configuration file [default: /etc/fingerlock/config.toml]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial device of the fingerprint sensor
    #[arg(long, value_name = "DEVICE")]
    port: Option<String>,

    /// Sensor baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Log relay changes instead of driving the GPIO
    #[arg(long)]
    dry_run: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.sensor.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.sensor.baud_rate = baud;
        }
        if self.dry_run {
            config.relay.backend = RelayBackend::DryRun;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("fingerlock: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let sensor = fingerlock_biometric::serial::open(
        &config.sensor.port,
        config.sensor.baud_rate,
        config.sensor_config(),
    )
    .with_context(|| format!("opening fingerprint sensor on {}", config.sensor.port))?;
    let relay = AnyRelay::open(&config.relay)
        .await
        .with_context(|| format!("opening relay on gpio{}", config.relay.gpio))?;

    if let Ok(info) = sensor.get_device_info().await {
        info!(sensor = %info.name, baud = config.sensor.baud_rate, "Sensor port open");
    }

    let (events, mut event_rx) = EventSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("{event}");
        }
    });

    let mut controller = DoorController::new(sensor, relay, config.controller_config(), events);
    let result = serve(&mut controller).await;

    // Dropping the controller closes the event channel so the printer drains and exits.
    drop(controller);
    if let Err(e) = printer.await {
        warn!(error = %e, "Status printer stopped abnormally");
    }

    result
}

async fn serve<S>(controller: &mut DoorController<S, AnyRelay>) -> anyhow::Result<()>
where
    S: FingerprintSensor,
{
    controller.start().await?;

    let mut commands = CommandReader::spawn(BufReader::new(tokio::io::stdin()));
    controller.run_until(&mut commands, shutdown_signal()).await?;

    info!("Door locked, exiting");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
}
