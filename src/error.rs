//! Error types for serial capture

use thiserror::Error;

/// Errors raised while opening, reading or enumerating serial ports
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The device could not be opened (missing, busy, or bad settings)
    #[error("failed to open serial port {port} at {baud_rate} baud")]
    Open {
        port: String,
        baud_rate: u32,
        #[source]
        source: serialport::Error,
    },

    #[error("failed to enumerate serial ports")]
    Enumerate(#[source] serialport::Error),

    #[error("serial port error: {0}")]
    Port(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
