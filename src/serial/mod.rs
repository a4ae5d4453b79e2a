//! Serial capture for remote-control debugging
//!
//! This module provides functionality for:
//! - Opening the device and reading newline-terminated chunks
//! - Decoding chunks into text with an explicit lossy policy
//! - Running the timed capture loop

pub mod capture;
pub mod decode;
pub mod port;

pub use capture::{CaptureConfig, SerialCapture, SystemClock};
pub use decode::DecodePolicy;
pub use port::{PortConfig, SerialConnection};
