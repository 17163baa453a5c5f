//! Byte stream transports.
//!
//! The client talks to the instrument through the [`Transport`] trait: a
//! blocking write, a blocking write followed by reading one reply line, and
//! close. [`StreamTransport`] implements it for any `Read + Write` stream,
//! which covers `std::net::TcpStream` and serial ports.

use std::io::{self, BufRead, BufReader, Read, Write};

/// Blocking connection to the instrument.
pub trait Transport {
    /// Sends `request` without waiting for a reply.
    fn write(&mut self, request: &[u8]) -> io::Result<()>;

    /// Sends `request` and blocks until one newline terminated reply line has
    /// been read. The line terminator is not part of the returned text.
    fn write_then_read_line(&mut self, request: &[u8]) -> io::Result<String>;

    /// Releases the connection.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, request: &[u8]) -> io::Result<()> {
        (**self).write(request)
    }

    fn write_then_read_line(&mut self, request: &[u8]) -> io::Result<String> {
        (**self).write_then_read_line(request)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Turns a raw reply line into text.
///
/// Replies are single byte encoded: the unit codes of some models are bytes
/// above `0x7f` that are not valid UTF-8, so every byte maps to the char of
/// the same value. Trailing `\r\n` is removed.
pub fn decode_line(mut line: &[u8]) -> String {
    while let [rest @ .., b'\n' | b'\r'] = line {
        line = rest;
    }
    line.iter().map(|&b| char::from(b)).collect()
}

/// [`Transport`] over any blocking `Read + Write` stream.
#[derive(Debug)]
pub struct StreamTransport<S: Read + Write> {
    stream: BufReader<S>,
}

impl<S: Read + Write> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn write(&mut self, request: &[u8]) -> io::Result<()> {
        let stream = self.stream.get_mut();
        stream.write_all(request)?;
        stream.flush()
    }

    fn write_then_read_line(&mut self, request: &[u8]) -> io::Result<String> {
        // stale bytes of an abandoned round trip would be read as this reply
        self.stream.consume(self.stream.buffer().len());
        Transport::write(self, request)?;
        let mut line = Vec::new();
        if self.stream.read_until(b'\n', &mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by instrument",
            ));
        }
        Ok(decode_line(&line))
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.get_mut().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    /// Reads from a canned reply buffer and records everything written.
    struct Loopback {
        replies: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Loopback {
        fn new(replies: &[u8]) -> Self {
            Self {
                replies: Cursor::new(replies.to_vec()),
                written: Vec::new(),
            }
        }
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.replies.read(buf)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn reads_one_line_per_request() {
        let mut transport = StreamTransport::new(Loopback::new(b"Cryo-con,24C\r\n"));
        let reply = transport.write_then_read_line(b":*IDN?\n").unwrap();
        assert_eq!(reply, "Cryo-con,24C");
        assert_eq!(transport.get_ref().written, b":*IDN?\n");
    }

    #[test]
    fn write_only() {
        let mut transport = StreamTransport::new(Loopback::new(b""));
        transport.write(b"STOP\n").unwrap();
        assert_eq!(transport.into_inner().written, b"STOP\n");
    }

    #[test]
    fn closed_connection() {
        let mut transport = StreamTransport::new(Loopback::new(b""));
        assert_matches!(
            transport.write_then_read_line(b":*IDN?\n"),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof
        );
    }

    #[test]
    fn single_byte_replies() {
        assert_eq!(decode_line(b"\xea\n"), "\u{ea}");
        assert_eq!(decode_line(b"\x07\r\n"), "\u{07}");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn boxed_transport() {
        let mut transport: Box<dyn Transport> =
            Box::new(StreamTransport::new(Loopback::new(b"ON\n")));
        assert_eq!(transport.write_then_read_line(b":CONTROL?\n").unwrap(), "ON");
        assert!(transport.close().is_ok());
    }
}
