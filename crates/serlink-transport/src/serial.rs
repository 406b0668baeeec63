use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// Configuration for opening a serial line.
///
/// The link protocol is character-oriented 8N1; only the line speed and the
/// blocking-read timeout vary between installations.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line speed in baud. Default: 9600.
    pub baud_rate: u32,
    /// Read/write timeout applied to the port. Default: 500 ms.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout: Duration::from_millis(500),
        }
    }
}

/// A serial device visible on this host.
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// OS path of the device (e.g. `/dev/ttyUSB0`, `COM4`).
    pub name: String,
    /// Port hardware kind.
    pub kind: &'static str,
    /// USB product string, when the port reports one.
    pub product: Option<String>,
}

/// Serial-line transport.
///
/// Opens a physical port in 8N1 mode at the configured speed. There is no
/// listener/acceptor concept: a serial line is point-to-point, and both
/// stations simply open their end.
pub struct SerialLine;

impl SerialLine {
    /// Open the serial device at `path` (blocking operations thereafter).
    pub fn open(path: impl AsRef<Path>, config: &SerialConfig) -> Result<LinkStream> {
        let path = path.as_ref();
        let port = serialport::new(path.to_string_lossy(), config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        info!(?path, baud = config.baud_rate, "opened serial line");

        Ok(LinkStream::from_serial(port))
    }

    /// Enumerate the serial devices visible on this host.
    pub fn enumerate() -> Result<Vec<PortInfo>> {
        let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
        Ok(ports
            .into_iter()
            .map(|port| PortInfo {
                name: port.port_name,
                kind: port_kind(&port.port_type),
                product: port_product(&port.port_type),
            })
            .collect())
    }

    /// Transport name for diagnostics.
    pub fn transport_name() -> &'static str {
        "serial-line"
    }
}

fn port_kind(port_type: &serialport::SerialPortType) -> &'static str {
    match port_type {
        serialport::SerialPortType::UsbPort(_) => "usb",
        serialport::SerialPortType::PciPort => "pci",
        serialport::SerialPortType::BluetoothPort => "bluetooth",
        serialport::SerialPortType::Unknown => "unknown",
    }
}

fn port_product(port_type: &serialport::SerialPortType) -> Option<String> {
    match port_type {
        serialport::SerialPortType::UsbPort(usb) => usb.product.clone(),
        _ => None,
    }
}
