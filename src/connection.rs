//! Opening connections to the instrument.
//!
//! Instruments are addressed with a url: `tcp://host[:port]` for the ethernet
//! interface (port 5000 unless given) or `serial://device` for the RS-232 line.

use crate::error::{Result, UsageError};
use crate::protocol as proto;
#[cfg(feature = "tokio")]
use crate::tokio_transport::TokioTransport;
#[cfg(not(feature = "tokio"))]
use crate::transport::StreamTransport;
use crate::transport::Transport;
use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

/// The parity used for serial communication.
#[cfg(feature = "serial")]
pub const PARITY: &tokio_serial::Parity = &tokio_serial::Parity::None;
/// The number of stop bits used for serial communication.
#[cfg(feature = "serial")]
pub const STOP_BITS: &tokio_serial::StopBits = &tokio_serial::StopBits::One;
/// The number of data bits used for serial communication.
#[cfg(feature = "serial")]
pub const DATA_BITS: &tokio_serial::DataBits = &tokio_serial::DataBits::Eight;

/// Creates a `tokio_serial::SerialPortBuilder` with the instrument's line
/// settings.
///
/// # Arguments
///
/// * `device` - The path to the serial port device (e.g., `/dev/ttyUSB0`).
/// * `baud_rate` - The baud rate for the serial communication.
#[cfg(feature = "serial")]
pub fn serial_port_builder(device: &str, baud_rate: u32) -> tokio_serial::SerialPortBuilder {
    tokio_serial::new(device, baud_rate)
        .parity(*PARITY)
        .stop_bits(*STOP_BITS)
        .data_bits(*DATA_BITS)
        .flow_control(tokio_serial::FlowControl::None)
}

/// Where the instrument is reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum ConnectionUrl {
    Tcp { host: String, port: u16 },
    Serial { device: String },
}

impl FromStr for ConnectionUrl {
    type Err = UsageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let url = s.trim();
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| UsageError::InvalidUrl(s.to_string()))?;
        if rest.is_empty() {
            return Err(UsageError::InvalidUrl(s.to_string()));
        }
        match scheme.to_ascii_lowercase().as_str() {
            "tcp" => {
                let (host, port) = match rest.rsplit_once(':') {
                    // a bare IPv6 address carries colons but no port
                    Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
                        let port = port
                            .parse::<u16>()
                            .map_err(|_| UsageError::InvalidUrl(s.to_string()))?;
                        (host, port)
                    }
                    _ => (rest, proto::DEFAULT_TCP_PORT),
                };
                if host.is_empty() {
                    return Err(UsageError::InvalidUrl(s.to_string()));
                }
                Ok(ConnectionUrl::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
            "serial" => Ok(ConnectionUrl::Serial {
                device: rest.to_string(),
            }),
            _ => Err(UsageError::UnsupportedScheme(url.to_string())),
        }
    }
}

impl TryFrom<String> for ConnectionUrl {
    type Error = UsageError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConnectionUrl> for String {
    fn from(url: ConnectionUrl) -> String {
        url.to_string()
    }
}

impl fmt::Display for ConnectionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionUrl::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            ConnectionUrl::Serial { device } => write!(f, "serial://{device}"),
        }
    }
}

/// Connects to the instrument's ethernet interface.
pub fn connect_tcp(host: &str, port: u16, timeout: Duration) -> std::io::Result<TcpStream> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Cannot resolve '{host}'"),
        )
    }))
}

/// Opens a blocking transport to `url`.
///
/// With the `tokio` feature the connection is driven by a `TokioTransport`,
/// otherwise by a `StreamTransport` over std I/O. `timeout` bounds
/// connecting and every read and write. `baud_rate` only applies to serial
/// lines.
pub fn open(
    url: &ConnectionUrl,
    timeout: Duration,
    baud_rate: u32,
) -> Result<Box<dyn Transport + Send>> {
    match url {
        ConnectionUrl::Tcp { host, port } => {
            log::info!("Connecting to {url}");
            #[cfg(feature = "tokio")]
            let transport = TokioTransport::connect_tcp(host, *port, timeout)?;
            #[cfg(not(feature = "tokio"))]
            let transport = StreamTransport::new(connect_tcp(host, *port, timeout)?);
            Ok(Box::new(transport))
        }
        #[cfg(feature = "serial")]
        ConnectionUrl::Serial { device } => {
            log::info!("Opening {url} at {baud_rate} baud");
            #[cfg(feature = "tokio")]
            let transport = TokioTransport::open_serial(device, baud_rate, timeout)?;
            #[cfg(not(feature = "tokio"))]
            let transport = StreamTransport::new(
                serial_port_builder(device, baud_rate)
                    .timeout(timeout)
                    .open()
                    .map_err(std::io::Error::from)?,
            );
            Ok(Box::new(transport))
        }
        #[cfg(not(feature = "serial"))]
        ConnectionUrl::Serial { .. } => {
            let _ = baud_rate;
            Err(UsageError::UnsupportedScheme(url.to_string()).into())
        }
    }
}
