//! Serial Capture
//!
//! Timed serial console capture for debugging remote-control devices.
//! The operator starts a capture, triggers the test sequence (a button on
//! the web page, then a button on the physical remote) and watches the
//! device's serial output for correlated messages.
//!
//! # Usage
//!
//! ```bash
//! # List available serial ports
//! serial-capture list
//!
//! # Capture for the default two minutes at 115200 baud
//! serial-capture capture -p /dev/ttyUSB0
//!
//! # Shorter capture, keep invalid bytes visible, prefix timestamps
//! serial-capture capture -p COM7 --duration 30 --decode replace --timestamps
//! ```

mod error;
mod report;
mod serial;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use report::{Reporter, DEFAULT_PROMPT};
use serial::capture::run_session;
use serial::port::{list_ports, DEFAULT_BAUD, DEFAULT_PORT};
use serial::{
    CaptureConfig, DecodePolicy, PortConfig, SerialCapture, SerialConnection, SystemClock,
};

/// Serial Capture
///
/// Capture a device's serial console for a fixed time window
#[derive(Parser)]
#[command(name = "serial-capture")]
#[command(version = "0.1.0")]
#[command(about = "Timed serial console capture for debugging remote-control devices")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture serial output for a fixed duration
    Capture(CaptureArgs),

    /// List available serial ports
    List,
}

#[derive(Args)]
struct CaptureArgs {
    /// Serial port path (e.g., /dev/ttyUSB0, COM7)
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD)]
    baud: u32,

    /// Capture duration in seconds
    #[arg(short, long, default_value_t = 120)]
    duration: u64,

    /// Pause between polls in milliseconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: u64,

    /// Per-read timeout in milliseconds
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    read_timeout: u64,

    /// How to handle bytes that are not valid UTF-8
    #[arg(long, value_enum, default_value_t = DecodePolicy::Drop)]
    decode: DecodePolicy,

    /// Instructions printed before capturing starts
    #[arg(long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Prefix each captured line with the local time
    #[arg(short, long)]
    timestamps: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Capture(args) => handle_capture(args),
        Commands::List => handle_list(),
    }
}

fn handle_capture(args: CaptureArgs) -> Result<()> {
    let port_config = PortConfig::new(&args.port)
        .with_baud_rate(args.baud)
        .with_timeout(Duration::from_millis(args.read_timeout));

    let connection = SerialConnection::open(port_config)
        .with_context(|| format!("Cannot capture from {}", args.port))?;

    let config = CaptureConfig {
        duration: Duration::from_secs(args.duration),
        poll_interval: Duration::from_millis(args.poll_interval),
        read_timeout: Duration::from_millis(args.read_timeout),
        decode: args.decode,
    };

    let mut capture = SerialCapture::new(config, SystemClock);
    install_stop_handler(capture.get_running_flag())?;

    let port = connection.config().clone();
    let mut reporter = Reporter::stdout(args.timestamps);
    run_session(&mut capture, connection, &port, &args.prompt, &mut reporter)?;

    Ok(())
}

fn handle_list() -> Result<()> {
    let ports = list_ports()?;
    Reporter::stdout(false).ports(&ports)?;
    Ok(())
}

/// Clear the running flag on Ctrl+C so the port still gets closed
fn install_stop_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")
}
