//! Scripted transport for client tests.

use crate::transport::Transport;
use std::collections::VecDeque;
use std::io;

/// What the client sent, and whether it waited for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Write(String),
    Ask(String),
}

/// Replies with canned lines in order and records every request. Once the
/// script is exhausted every read times out.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: VecDeque<io::Result<String>>,
    pub requests: Vec<Request>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, line: &str) -> Self {
        self.replies.push_back(Ok(line.to_string()));
        self
    }

    pub fn fail(mut self, kind: io::ErrorKind) -> Self {
        self.replies
            .push_back(Err(io::Error::new(kind, "scripted failure")));
        self
    }

    pub fn asks(&self) -> Vec<&str> {
        self.requests
            .iter()
            .filter_map(|request| match request {
                Request::Ask(text) => Some(text.as_str()),
                Request::Write(_) => None,
            })
            .collect()
    }

    fn text(request: &[u8]) -> String {
        let text = String::from_utf8_lossy(request);
        assert!(text.ends_with('\n'), "unterminated request {text:?}");
        text.trim_end_matches('\n').to_string()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, request: &[u8]) -> io::Result<()> {
        self.requests.push(Request::Write(Self::text(request)));
        Ok(())
    }

    fn write_then_read_line(&mut self, request: &[u8]) -> io::Result<String> {
        self.requests.push(Request::Ask(Self::text(request)));
        self.replies.pop_front().unwrap_or_else(|| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no scripted reply",
            ))
        })
    }
}
