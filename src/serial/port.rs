//! Serial port configuration and connection management
//!
//! Opens the device under test, reads newline-terminated chunks with a
//! bounded timeout, and enumerates the ports visible to the host.

use crate::error::{CaptureError, Result};
use crate::serial::capture::LineSource;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

/// Default baud rate of the remote-control firmware console
pub const DEFAULT_BAUD: u32 = 115200;

/// Per-read timeout used when nothing else is configured
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Port used when none is given on the command line
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM7";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Configuration for serial port connection
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Serial port path (e.g., /dev/ttyUSB0, COM7)
    pub port_path: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Upper bound for a single line read
    pub timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_path: String::from(DEFAULT_PORT),
            baud_rate: DEFAULT_BAUD,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl PortConfig {
    /// Create a new 8N1 configuration for the given port
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            ..Default::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An open serial device
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    config: PortConfig,
}

impl SerialConnection {
    /// Open a serial connection with the given configuration
    pub fn open(config: PortConfig) -> Result<Self> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(config.timeout)
            .open()
            .map_err(|source| CaptureError::Open {
                port: config.port_path.clone(),
                baud_rate: config.baud_rate,
                source,
            })?;

        log::debug!(
            "Opened {} at {} baud (read timeout {:?})",
            config.port_path,
            config.baud_rate,
            config.timeout
        );

        Ok(Self::from_port(port, config))
    }

    /// Wrap an already opened port
    pub(crate) fn from_port(port: Box<dyn SerialPort>, config: PortConfig) -> Self {
        Self { port, config }
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    /// Number of received bytes waiting in the driver buffer
    pub fn bytes_to_read(&self) -> Result<u32> {
        Ok(self.port.bytes_to_read()?)
    }

    /// Read up to and including the next `\n`, giving up after `timeout`.
    ///
    /// Bytes received before the timeout are returned even without a
    /// terminator. `None` means nothing arrived at all.
    pub fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        let mut buffer = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.port.set_timeout(remaining)?;

            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    buffer.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if buffer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(buffer))
        }
    }

    /// Release the device. Unread bytes in the driver buffer are discarded.
    pub fn close(self) -> Result<()> {
        log::debug!("Closing {}", self.config.port_path);
        drop(self.port);
        Ok(())
    }
}

impl LineSource for SerialConnection {
    fn bytes_to_read(&mut self) -> Result<usize> {
        SerialConnection::bytes_to_read(self).map(|n| n as usize)
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        SerialConnection::read_line(self, timeout)
    }

    fn close(self) -> Result<()> {
        SerialConnection::close(self)
    }
}

/// Information about a detected serial port
#[derive(Debug, Clone, PartialEq)]
pub struct PortInfo {
    pub path: String,
    pub port_type: PortType,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    UsbSerial,
    PciSerial,
    Bluetooth,
    Unknown,
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortType::UsbSerial => write!(f, "USB Serial"),
            PortType::PciSerial => write!(f, "PCI Serial"),
            PortType::Bluetooth => write!(f, "Bluetooth"),
            PortType::Unknown => write!(f, "Unknown"),
        }
    }
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let mut port = PortInfo {
            path: info.port_name,
            port_type: PortType::Unknown,
            manufacturer: None,
            product: None,
            serial_number: None,
            vid: None,
            pid: None,
        };

        match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                port.port_type = PortType::UsbSerial;
                port.manufacturer = usb.manufacturer;
                port.product = usb.product;
                port.serial_number = usb.serial_number;
                port.vid = Some(usb.vid);
                port.pid = Some(usb.pid);
            }
            serialport::SerialPortType::PciPort => port.port_type = PortType::PciSerial,
            serialport::SerialPortType::BluetoothPort => port.port_type = PortType::Bluetooth,
            serialport::SerialPortType::Unknown => {}
        }

        port
    }
}

/// List all available serial ports, USB adapters first
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .map_err(CaptureError::Enumerate)?
        .into_iter()
        .map(PortInfo::from)
        .collect();

    ports.sort_by(|a, b| {
        (a.port_type != PortType::UsbSerial, &a.path)
            .cmp(&(b.port_type != PortType::UsbSerial, &b.path))
    });

    Ok(ports)
}
