// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

// Intercom panel bridge
mod bridge;
mod codec;
mod codes;
mod logging;
mod protocol;
mod serial;
mod session;

use clap::Parser;
use serialport::{DataBits, Parity, StopBits};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

use bridge::{Bridge, BridgeError};
use codec::Codec;
use codes::CodeTable;
use serial::{LineSettings, RealSerialPort};

#[derive(Parser)]
#[command(name = "intercom-bridge")]
#[command(about = "Answers and unlocks calls from a serial intercom panel", long_about = None)]
struct Cli {
    /// Serial port to use (e.g., /dev/ttyUSB0 or COM4)
    #[arg(short, long)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "9600")]
    baud: u32,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, default_value = "8", value_name = "BITS")]
    data_bits: u8,

    /// Parity (none, odd, or even)
    #[arg(long, default_value = "even")]
    parity: String,

    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1", value_name = "BITS")]
    stop_bits: u8,

    /// JSON table mapping symbolic names to hex codes
    #[arg(long, default_value = "code.json", value_name = "FILE")]
    codes: PathBuf,

    /// Log file, appended to
    #[arg(long, default_value = "log.txt", value_name = "FILE")]
    log_file: PathBuf,

    /// Enable debug output on the console
    #[arg(long)]
    debug: bool,
}

fn parse_data_bits(bits: u8) -> Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

fn parse_parity(parity: &str) -> Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

fn parse_stop_bits(bits: u8) -> Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

fn line_settings(cli: &Cli) -> Result<LineSettings, String> {
    Ok(LineSettings {
        baud_rate: cli.baud,
        data_bits: parse_data_bits(cli.data_bits)?,
        parity: parse_parity(&cli.parity)?,
        stop_bits: parse_stop_bits(cli.stop_bits)?,
    })
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli));
}

/// Everything that owns resources lives here so it is dropped (port closed,
/// log flushed) before the process exits.
fn run(cli: Cli) -> i32 {
    let _guard = match logging::init_logging(&cli.log_file, cli.debug) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return 1;
        }
    };

    let settings = match line_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let table = match CodeTable::load(&cli.codes) {
        Ok(table) => table,
        Err(e) => {
            error!("Failed to load {}: {}", cli.codes.display(), e);
            return 1;
        }
    };
    info!("Loaded {} codes from {}", table.len(), cli.codes.display());

    info!(
        "Opening serial port {}: {} baud, {:?}, {:?}, {:?}",
        cli.port, settings.baud_rate, settings.data_bits, settings.parity, settings.stop_bits
    );
    let serial_port = match RealSerialPort::open(&cli.port, settings) {
        Ok(port) => port,
        Err(e) => {
            error!("Failed to open serial port: {}", e);
            return 1;
        }
    };
    info!("Serial is open");

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        error!("Failed to install interrupt handler: {}", e);
        return 1;
    }

    let mut bridge = Bridge::new(Box::new(serial_port), Codec::new(table), shutdown);
    let err = match bridge.run() {
        Ok(never) => match never {},
        Err(e) => e,
    };
    drop(bridge);

    match err {
        BridgeError::Interrupted => {
            error!("Interrupted, closing");
            0
        }
        e => {
            error!("Link failed: {}", e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_8e1_at_9600() {
        let cli = Cli::parse_from(["intercom-bridge", "--port", "/dev/ttyUSB0"]);
        assert_eq!(line_settings(&cli), Ok(LineSettings::default()));
        assert_eq!(cli.codes, PathBuf::from("code.json"));
        assert_eq!(cli.log_file, PathBuf::from("log.txt"));
    }

    #[test]
    fn test_line_setting_overrides() {
        let cli = Cli::parse_from([
            "intercom-bridge", "-p", "COM4", "-b", "19200",
            "--data-bits", "7", "--parity", "ODD", "--stop-bits", "2",
        ]);
        let settings = line_settings(&cli).unwrap();
        assert_eq!(settings.baud_rate, 19200);
        assert_eq!(settings.data_bits, DataBits::Seven);
        assert_eq!(settings.parity, Parity::Odd);
        assert_eq!(settings.stop_bits, StopBits::Two);
    }

    #[test]
    fn test_invalid_line_settings() {
        assert!(parse_data_bits(9).is_err());
        assert!(parse_parity("mark").is_err());
        assert!(parse_stop_bits(0).is_err());
    }
}
