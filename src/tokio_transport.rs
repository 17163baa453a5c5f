//! Non-blocking backend for the [`Transport`] contract.
//!
//! [`TokioTransport`] drives any tokio `AsyncRead + AsyncWrite` stream on a
//! private current-thread runtime, so the client keeps a single blocking
//! execution model whatever the I/O flavour underneath. Every round trip is
//! bounded by the configured timeout.
//!
//! ```no_run
//! use cryocon_lib::{client::CryoCon, tokio_transport::TokioTransport};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = TokioTransport::connect_tcp("192.168.1.20", 5000, Duration::from_secs(1))?;
//!     let mut ctrl = CryoCon::new(transport);
//!     println!("{}", ctrl.idn()?);
//!     Ok(())
//! }
//! ```

use crate::transport::{decode_line, Transport};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::runtime::{Builder, Runtime};

/// [`Transport`] over a tokio stream.
#[derive(Debug)]
pub struct TokioTransport<S> {
    runtime: Runtime,
    stream: BufReader<S>,
    timeout: Duration,
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "no reply from instrument")
}

fn current_thread_runtime() -> io::Result<Runtime> {
    Builder::new_current_thread().enable_io().enable_time().build()
}

impl<S: AsyncRead + AsyncWrite + Unpin> TokioTransport<S> {
    /// Wraps an already connected stream. The stream must have been created
    /// on `runtime` when it registers with the reactor.
    pub fn with_runtime(runtime: Runtime, stream: S, timeout: Duration) -> Self {
        Self {
            runtime,
            stream: BufReader::new(stream),
            timeout,
        }
    }
}

impl TokioTransport<tokio::net::TcpStream> {
    /// Connects to the instrument's ethernet interface. IPv6 hosts may be
    /// given with or without brackets.
    pub fn connect_tcp(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let runtime = current_thread_runtime()?;
        let stream = runtime.block_on(async {
            let connect = tokio::net::TcpStream::connect((host, port));
            let stream = tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| timed_out())??;
            stream.set_nodelay(true)?;
            Ok::<_, io::Error>(stream)
        })?;
        Ok(Self::with_runtime(runtime, stream, timeout))
    }
}

#[cfg(feature = "serial")]
impl TokioTransport<tokio_serial::SerialStream> {
    /// Opens a serial line with the instrument's line settings.
    pub fn open_serial(device: &str, baud_rate: u32, timeout: Duration) -> io::Result<Self> {
        let runtime = current_thread_runtime()?;
        let stream = {
            let _guard = runtime.enter();
            tokio_serial::SerialStream::open(
                &crate::connection::serial_port_builder(device, baud_rate).timeout(timeout),
            )?
        };
        Ok(Self::with_runtime(runtime, stream, timeout))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Transport for TokioTransport<S> {
    fn write(&mut self, request: &[u8]) -> io::Result<()> {
        let Self {
            runtime,
            stream,
            timeout,
        } = self;
        runtime.block_on(async {
            let stream = stream.get_mut();
            tokio::time::timeout(*timeout, async {
                stream.write_all(request).await?;
                stream.flush().await
            })
            .await
            .map_err(|_| timed_out())?
        })
    }

    fn write_then_read_line(&mut self, request: &[u8]) -> io::Result<String> {
        let Self {
            runtime,
            stream,
            timeout,
        } = self;
        runtime.block_on(async {
            tokio::time::timeout(*timeout, async {
                let stale = stream.buffer().len();
                stream.consume(stale);
                let inner = stream.get_mut();
                inner.write_all(request).await?;
                inner.flush().await?;
                let mut line = Vec::new();
                if stream.read_until(b'\n', &mut line).await? == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed by instrument",
                    ));
                }
                Ok(decode_line(&line))
            })
            .await
            .map_err(|_| timed_out())?
        })
    }

    fn close(&mut self) -> io::Result<()> {
        let Self {
            runtime,
            stream,
            timeout,
        } = self;
        runtime.block_on(async {
            tokio::time::timeout(*timeout, stream.get_mut().shutdown())
                .await
                .map_err(|_| timed_out())?
        })
    }
}
