//! Request batching.
//!
//! A [`Batch`] collects sub-commands and packs them into as few lines as the
//! instrument accepts. It performs no I/O itself: the client sends every
//! [`Chunk`] in order and hands the reply lines back to [`Batch::decode`].

use crate::attribute::Attribute;
use crate::codec::{Decoder, Value};
use crate::command::{self, LoopField};
use crate::error::{ProtocolError, Result, UsageError};
use crate::protocol::{MAX_LINE_LENGTH, NACK_REPLIES, SEPARATOR};

/// One line worth of sub-commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    commands: Vec<String>,
    decoders: Vec<Decoder>,
    len: usize,
}

impl Chunk {
    /// The `;` joined request text, without terminator.
    pub fn request(&self) -> String {
        command::join(&self.commands)
    }

    /// Set-only chunks produce no reply line.
    pub fn expects_reply(&self) -> bool {
        !self.decoders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn fits(&self, command: &str) -> bool {
        self.is_empty() || self.len + 1 + command.len() <= MAX_LINE_LENGTH
    }

    fn push(&mut self, command: String, decoder: Option<Decoder>) {
        if !self.is_empty() {
            self.len += 1;
        }
        self.len += command.len();
        self.commands.push(command);
        self.decoders.extend(decoder);
    }

    fn decode(&self, reply: &str, values: &mut Vec<Value>) -> Result<()> {
        let segments: Vec<&str> = reply.split(SEPARATOR).map(str::trim).collect();
        if segments.iter().any(|segment| NACK_REPLIES.contains(segment)) {
            return Err(ProtocolError::Nack {
                command: self.request(),
            }
            .into());
        }
        if segments.len() != self.decoders.len() {
            return Err(ProtocolError::SegmentCount {
                expected: self.decoders.len(),
                received: segments.len(),
            }
            .into());
        }
        for (decoder, segment) in self.decoders.iter().zip(segments) {
            values.push(decoder.decode(segment)?);
        }
        Ok(())
    }
}

/// Pending sub-commands of one batch scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    chunks: Vec<Chunk>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw sub-command. Queries pass the decoder for their reply
    /// segment, sets pass `None`.
    pub fn append(&mut self, command: impl Into<String>, decoder: Option<Decoder>) -> Result<()> {
        let command = command.into();
        if command.len() > MAX_LINE_LENGTH {
            return Err(UsageError::CommandTooLong {
                len: command.len(),
                limit: MAX_LINE_LENGTH,
            }
            .into());
        }
        match self.chunks.last_mut() {
            Some(chunk) if chunk.fits(&command) => chunk.push(command, decoder),
            _ => {
                let mut chunk = Chunk::default();
                chunk.push(command, decoder);
                self.chunks.push(chunk);
            }
        }
        Ok(())
    }

    /// Queues a read of `attribute`.
    pub fn query(&mut self, attribute: Attribute) -> Result<()> {
        self.append(attribute.query_command(), Some(attribute.decoder()))
    }

    /// Queues a plain, unverified write of `attribute`.
    ///
    /// Output power and loop type are refused: output power may only be
    /// written in manual mode and a regulating type needs a managed source,
    /// both of which are only known after a read.
    pub fn set(&mut self, attribute: Attribute, value: &Value) -> Result<()> {
        if let Attribute::Loop(_, LoopField::OutputPower | LoopField::Type) = attribute {
            return Err(UsageError::NotBatchable(attribute).into());
        }
        self.append(attribute.set_command(value)?, None)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of reply lines the chunks produce.
    pub fn expected_replies(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.expects_reply()).count()
    }

    /// Decodes the reply lines of all reply-expecting chunks, in chunk order,
    /// into one value per query. Any failure fails the whole batch.
    pub fn decode(&self, replies: &[String]) -> Result<Vec<Value>> {
        let expected = self.expected_replies();
        if replies.len() != expected {
            return Err(ProtocolError::SegmentCount {
                expected,
                received: replies.len(),
            }
            .into());
        }
        let mut values = Vec::new();
        let chunks = self.chunks.iter().filter(|chunk| chunk.expects_reply());
        for (chunk, reply) in chunks.zip(replies) {
            chunk.decode(reply, &mut values)?;
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ChannelField, Section, SystemField};
    use crate::error::Error;
    use crate::protocol::{ChannelId, LoopId};
    use assert_matches::assert_matches;

    fn temperature(id: ChannelId) -> Attribute {
        Attribute::Channel(id, ChannelField::Temperature)
    }

    fn ten_gets() -> Batch {
        let mut batch = Batch::new();
        for n in 0..10 {
            let field = format!("MEMBER{n:02}:{}", "X".repeat(16));
            batch
                .append(command::query(Section::System, &field), Some(Decoder::Float))
                .unwrap();
        }
        batch
    }

    #[test]
    fn small_batch_is_one_line() {
        let mut batch = Batch::new();
        batch.query(temperature(ChannelId::A)).unwrap();
        batch.query(temperature(ChannelId::B)).unwrap();
        assert_eq!(batch.chunks().len(), 1);
        assert_eq!(
            batch.chunks()[0].request(),
            ":INPUT A:TEMP?;:INPUT B:TEMP?"
        );
        let values = batch
            .decode(&["12.5; ......."].map(String::from))
            .unwrap();
        assert_eq!(values, vec![Value::Float(Some(12.5)), Value::Float(None)]);
    }

    #[test]
    fn long_batch_is_chunked_in_order() {
        let batch = ten_gets();
        let total: usize = batch
            .chunks()
            .iter()
            .map(|chunk| chunk.request().len())
            .sum();
        assert!(total > MAX_LINE_LENGTH);
        assert!(batch.chunks().len() >= 2);
        for chunk in batch.chunks() {
            assert!(chunk.request().len() <= MAX_LINE_LENGTH);
        }

        let mut next = 0;
        let mut replies = Vec::new();
        for chunk in batch.chunks() {
            let mut segments = Vec::new();
            for _ in 0..chunk.len() {
                next += 1;
                segments.push(next.to_string());
            }
            replies.push(segments.join(";"));
        }
        let values = batch.decode(&replies).unwrap();
        let expected: Vec<Value> = (1..=10).map(|n| Value::Float(Some(n as f64))).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn nack_fails_the_batch() {
        let mut batch = Batch::new();
        batch.query(temperature(ChannelId::A)).unwrap();
        assert_matches!(
            batch.decode(&["NACK".to_string()]),
            Err(Error::Protocol(ProtocolError::Nack { .. }))
        );
        assert_matches!(
            batch.decode(&["NAK".to_string()]),
            Err(Error::Protocol(ProtocolError::Nack { .. }))
        );
    }

    #[test]
    fn segment_count_mismatch() {
        let mut batch = Batch::new();
        batch.query(temperature(ChannelId::A)).unwrap();
        batch.query(temperature(ChannelId::B)).unwrap();
        assert_matches!(
            batch.decode(&["1.0".to_string()]),
            Err(Error::Protocol(ProtocolError::SegmentCount {
                expected: 2,
                received: 1
            }))
        );
        assert_matches!(
            batch.decode(&[]),
            Err(Error::Protocol(ProtocolError::SegmentCount { .. }))
        );
    }

    #[test]
    fn sets_produce_no_segments() {
        let mut batch = Batch::new();
        batch
            .set(
                Attribute::System(SystemField::Lockout),
                &Value::Bool(true),
            )
            .unwrap();
        assert!(!batch.chunks()[0].expects_reply());
        assert_eq!(batch.expected_replies(), 0);

        batch.query(Attribute::System(SystemField::Lockout)).unwrap();
        assert_eq!(batch.chunks().len(), 1);
        assert_eq!(
            batch.chunks()[0].request(),
            ":SYSTEM:LOCKOUT ON;:SYSTEM:LOCKOUT?"
        );
        let values = batch.decode(&["ON".to_string()]).unwrap();
        assert_eq!(values, vec![Value::Bool(true)]);
    }

    #[test]
    fn range_set_only_on_loop_1() {
        let mut batch = Batch::new();
        let range = Attribute::Loop(LoopId::try_from(2u8).unwrap(), LoopField::Range);
        assert_matches!(
            batch.set(range, &Value::Text("low".into())),
            Err(Error::Usage(UsageError::RangeNotSupported(..)))
        );
        assert!(batch.is_empty());

        batch
            .set(
                Attribute::Loop(LoopId::RANGED, LoopField::Range),
                &Value::Text("low".into()),
            )
            .unwrap();
        assert_eq!(batch.chunks()[0].request(), ":LOOP 1:RANGE LOW");
    }

    #[test]
    fn output_power_set_is_refused() {
        let mut batch = Batch::new();
        let output = Attribute::Loop(LoopId::RANGED, LoopField::OutputPower);
        assert_matches!(
            batch.set(output, &Value::Float(Some(50.0))),
            Err(Error::Usage(UsageError::NotBatchable(..)))
        );
        assert!(batch.is_empty());
        // reading it is fine
        batch.query(output).unwrap();
        assert_eq!(batch.expected_replies(), 1);
    }

    #[test]
    fn loop_type_set_is_refused() {
        let mut batch = Batch::new();
        let loop_type = Attribute::Loop(LoopId::RANGED, LoopField::Type);
        assert_matches!(
            batch.set(loop_type, &Value::Text("PID".into())),
            Err(Error::Usage(UsageError::NotBatchable(..)))
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn oversized_command_is_refused() {
        let mut batch = Batch::new();
        let command = format!(":SYSTEM:NAME \"{}\"", "x".repeat(MAX_LINE_LENGTH));
        assert_matches!(
            batch.append(command, None),
            Err(Error::Usage(UsageError::CommandTooLong { .. }))
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn unparseable_segment_fails_the_batch() {
        let mut batch = Batch::new();
        batch.query(temperature(ChannelId::A)).unwrap();
        batch.query(temperature(ChannelId::B)).unwrap();
        assert_matches!(
            batch.decode(&["1.0;garbage".to_string()]),
            Err(Error::Protocol(ProtocolError::InvalidNumber(..)))
        );
    }
}
