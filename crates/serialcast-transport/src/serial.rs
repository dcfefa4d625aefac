use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Default line rate of the attached microcontroller.
pub const DEFAULT_BAUD_RATE: u32 = 500_000;

/// Default per-read timeout.
///
/// A blocked read returns `TimedOut` after this long so the caller regains
/// control between records.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Device path used when none is configured.
#[cfg(target_os = "macos")]
pub fn default_device_path() -> PathBuf {
    PathBuf::from("/dev/tty.usbmodem14101")
}

/// Device path used when none is configured.
#[cfg(target_os = "linux")]
pub fn default_device_path() -> PathBuf {
    PathBuf::from("/dev/ttyACM0")
}

/// Device path used when none is configured.
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn default_device_path() -> PathBuf {
    PathBuf::from("COM9")
}

/// Serial link settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyACM0`, `COM9`, ...).
    pub path: PathBuf,
    /// Baud rate. Default: 500000.
    pub baud_rate: u32,
    /// Timeout for a single blocking read.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: default_device_path(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// An open serial device, readable as a byte stream.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    path: PathBuf,
}

/// Open the serial device described by `config` (8N1, no flow control).
pub fn open_serial(config: &SerialConfig) -> Result<SerialLink> {
    let path_str = config.path.to_string_lossy();
    let port = serialport::new(path_str.as_ref(), config.baud_rate)
        .timeout(config.read_timeout)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .flow_control(serialport::FlowControl::None)
        .open()
        .map_err(|source| TransportError::DeviceUnavailable {
            path: config.path.clone(),
            source,
        })?;

    info!(path = ?config.path, baud = config.baud_rate, "opened serial device");

    Ok(SerialLink {
        port,
        path: config.path.clone(),
    })
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        debug!(path = ?self.path, "closing serial device");
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("path", &self.path)
            .finish()
    }
}

/// A serial port discovered on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// OS device name.
    pub name: String,
    /// Short description of the port type.
    pub kind: String,
}

/// Enumerate serial ports present on this host.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            kind: describe_port_type(&port.port_type),
            name: port.port_name,
        })
        .collect())
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => match &usb.product {
            Some(product) => format!("usb {:04x}:{:04x} {product}", usb.vid, usb.pid),
            None => format!("usb {:04x}:{:04x}", usb.vid, usb.pid),
        },
        SerialPortType::PciPort => "pci".to_string(),
        SerialPortType::BluetoothPort => "bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}
