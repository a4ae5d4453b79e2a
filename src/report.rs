//! Console reporter
//!
//! Everything the operator sees on stdout goes through here: the connection
//! banner, the instructions for the test sequence, captured lines and the
//! completion banner. Captured text is written uncolored.

use crate::serial::capture::CaptureSummary;
use crate::serial::port::{PortConfig, PortInfo};
use chrono::{DateTime, Local};
use colored::Colorize;
use std::io::{self, Stdout, Write};

/// Width of the `-` separator lines
pub const SEPARATOR_WIDTH: usize = 60;

/// Instructions shown before capturing starts
pub const DEFAULT_PROMPT: &str =
    "Press the 'Detect A-OK' button on the web page, then the button on the remote control";

/// One decoded line as read from the device
#[derive(Debug, Clone)]
pub struct CapturedLine {
    pub text: String,
    /// Length of the chunk before decoding, terminator included
    pub raw_len: usize,
    pub received_at: DateTime<Local>,
}

impl CapturedLine {
    pub fn new(text: String, raw_len: usize) -> Self {
        Self {
            text,
            raw_len,
            received_at: Local::now(),
        }
    }
}

/// Writes human-readable progress markers to a console-like sink
pub struct Reporter<W: Write> {
    out: W,
    timestamps: bool,
}

impl Reporter<Stdout> {
    pub fn stdout(timestamps: bool) -> Self {
        Self::new(io::stdout(), timestamps)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, timestamps: bool) -> Self {
        Self { out, timestamps }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn connected(&mut self, config: &PortConfig) -> io::Result<()> {
        writeln!(
            self.out,
            "{} Connected to {} at {} baud. Waiting for data...",
            "[OK]".green().bold(),
            config.port_path.white().bold(),
            config.baud_rate
        )
    }

    pub fn instructions(&mut self, prompt: &str) -> io::Result<()> {
        writeln!(self.out, "{} {}", "[*]".cyan().bold(), prompt)
    }

    pub fn separator(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "-".repeat(SEPARATOR_WIDTH))
    }

    /// Print one captured line, flushed so it shows up immediately
    pub fn captured(&mut self, line: &CapturedLine) -> io::Result<()> {
        if self.timestamps {
            let timestamp = line.received_at.format("%H:%M:%S%.3f").to_string();
            writeln!(self.out, "{} {}", timestamp.dimmed(), line.text)?;
        } else {
            writeln!(self.out, "{}", line.text)?;
        }
        self.out.flush()
    }

    pub fn finished(&mut self, summary: &CaptureSummary) -> io::Result<()> {
        writeln!(self.out)?;
        self.separator()?;

        if summary.interrupted {
            writeln!(self.out, "{}", "Capture stopped".yellow().bold())?;
        } else {
            writeln!(self.out, "{}", "Capture finished".green().bold())?;
        }

        let errors = if summary.read_errors > 0 {
            summary.read_errors.to_string().red().bold().to_string()
        } else {
            summary.read_errors.to_string()
        };
        writeln!(
            self.out,
            "Lines: {}  Bytes: {}  Blank reads: {}  Read errors: {}  Elapsed: {:.1}s",
            summary.lines,
            summary.bytes,
            summary.blank_reads,
            errors,
            summary.elapsed.as_secs_f64()
        )?;
        self.out.flush()
    }

    pub fn ports(&mut self, ports: &[PortInfo]) -> io::Result<()> {
        if ports.is_empty() {
            writeln!(self.out, "{}", "No serial ports found".yellow())?;
            writeln!(self.out, "\n{}", "Troubleshooting tips:".cyan().bold())?;
            writeln!(self.out, "  1. Connect the remote-control board over USB")?;
            writeln!(self.out, "  2. Check the device node: ls -la /dev/ttyUSB* /dev/ttyACM*")?;
            writeln!(
                self.out,
                "  3. Add your user to the 'dialout' group: sudo usermod -aG dialout $USER"
            )?;
            return Ok(());
        }

        writeln!(self.out, "{}", "Available Serial Ports:".green().bold())?;
        writeln!(self.out, "{}", "=".repeat(SEPARATOR_WIDTH))?;

        for port in ports {
            writeln!(self.out, "\n{}: {}", "Port".cyan(), port.path.white().bold())?;
            writeln!(self.out, "  Type: {}", port.port_type)?;
            if let Some(ref mfg) = port.manufacturer {
                writeln!(self.out, "  Manufacturer: {}", mfg)?;
            }
            if let Some(ref prod) = port.product {
                writeln!(self.out, "  Product: {}", prod)?;
            }
            if let Some(ref sn) = port.serial_number {
                writeln!(self.out, "  Serial: {}", sn)?;
            }
            if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
                writeln!(self.out, "  VID:PID: {:04x}:{:04x}", vid, pid)?;
            }
        }

        writeln!(self.out, "\n{}", "=".repeat(SEPARATOR_WIDTH))?;
        writeln!(
            self.out,
            "{}",
            "Use: serial-capture capture -p <PORT> to start capturing".yellow()
        )
    }
}
