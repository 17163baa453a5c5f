//! The Cryo-con instrument client.
//!
//! [`CryoCon`] owns one [`Transport`] and serialises every request through it.
//! Members are reached either generically through an [`Attribute`] or with the
//! typed methods of the system, of a [`Channel`] and of a [`Loop`].
//!
//! ## Example
//!
//! ```no_run
//! use cryocon_lib::{
//!     client::CryoCon,
//!     connection::{self, ConnectionUrl},
//!     protocol::{self as proto, ChannelId, LoopId},
//! };
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url: ConnectionUrl = "tcp://192.168.1.20".parse()?;
//!     let transport = connection::open(&url, Duration::from_secs(1), proto::DEFAULT_BAUD_RATE)?;
//!     let mut ctrl = CryoCon::new(transport);
//!
//!     println!("Connected to {}", ctrl.idn()?);
//!     println!("Channel A: {:?}", ctrl.channel(ChannelId::A)?.temperature()?);
//!
//!     let set_point = ctrl.control_loop(LoopId::try_from(1u8)?)?.set_set_point(77.0)?;
//!     println!("Loop 1 set point: {set_point}");
//!     Ok(())
//! }
//! ```

use crate::attribute::Attribute;
use crate::batch::Batch;
use crate::codec::{self, ToOnOff, Value};
use crate::command::{self, ChannelField, LoopField, Section, SystemField};
use crate::error::{Error, ProtocolError, Result, UsageError};
use crate::protocol::{
    self as proto, ChannelId, LoopId, LoopRange, LoopType, Unit, DELTA_RB, DELTA_RB_SETPT,
    NACK_REPLIES, SEPARATOR,
};
use crate::transport::Transport;
use chrono::{NaiveDate, NaiveTime};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long round trips are refused after a transport failure.
pub const DEFAULT_RETRY_SUPPRESSION: Duration = Duration::from_secs(3);

/// Remembers the last transport failure so that a dead instrument is not
/// hammered with requests.
#[derive(Debug)]
struct FailureGate {
    window: Duration,
    last: Option<(Instant, Arc<io::Error>)>,
}

impl FailureGate {
    fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    fn check(&self) -> Result<()> {
        match &self.last {
            Some((at, error)) if at.elapsed() < self.window => {
                log::warn!("Round trip suppressed after recent failure: {error}");
                Err(Error::Transport(error.clone()))
            }
            _ => Ok(()),
        }
    }

    fn record<V>(&mut self, result: io::Result<V>) -> Result<V> {
        match result {
            Ok(value) => {
                self.last = None;
                Ok(value)
            }
            Err(error) => {
                log::error!("Transport failure: {error}");
                let error = Arc::new(error);
                self.last = Some((Instant::now(), error.clone()));
                Err(Error::Transport(error))
            }
        }
    }
}

/// Control and front panel state, read in one round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// The control loops are running.
    pub control: bool,
    /// The front panel keypad is locked.
    pub lockout: bool,
}

fn exceeds_tolerance(written: f64, read_back: f64, tolerance: f64) -> bool {
    let delta = (written - read_back).abs();
    // absorbs the rounding error of the subtraction itself
    let slack = f64::EPSILON * written.abs().max(read_back.abs());
    !delta.is_finite() || delta - tolerance > slack
}

fn verify_f64(command: &str, written: f64, read_back: Option<f64>, tolerance: f64) -> Result<f64> {
    match read_back {
        Some(value) if !exceeds_tolerance(written, value, tolerance) => Ok(value),
        _ => Err(Error::ReadbackMismatch {
            command: command.to_string(),
            written: codec::format_float(written),
            read_back: Value::Float(read_back).to_string(),
        }),
    }
}

fn enum_reply<V>(text: &str, parse: impl FnOnce(&str) -> proto::Result<V>) -> Result<V> {
    parse(text).map_err(|_| ProtocolError::InvalidEnum(text.to_string()).into())
}

/// Client for one Cryo-con temperature controller.
#[derive(Debug)]
pub struct CryoCon<T: Transport> {
    transport: T,
    channels: Vec<ChannelId>,
    loops: Vec<LoopId>,
    gate: FailureGate,
}

impl<T: Transport> CryoCon<T> {
    /// Creates a client managing all channels and loops.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            channels: ChannelId::ALL.to_vec(),
            loops: LoopId::all().collect(),
            gate: FailureGate::new(DEFAULT_RETRY_SUPPRESSION),
        }
    }

    /// Restricts the managed channels.
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = ChannelId>) -> Self {
        self.channels = channels.into_iter().collect();
        self.channels.sort();
        self.channels.dedup();
        self
    }

    /// Restricts the managed loops.
    pub fn with_loops(mut self, loops: impl IntoIterator<Item = LoopId>) -> Self {
        self.loops = loops.into_iter().collect();
        self.loops.sort();
        self.loops.dedup();
        self
    }

    /// Sets how long round trips fail fast after a transport failure. A zero
    /// window disables suppression.
    pub fn with_retry_suppression(mut self, window: Duration) -> Self {
        self.gate = FailureGate::new(window);
        self
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    pub fn loops(&self) -> &[LoopId] {
        &self.loops
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Closes the underlying connection.
    pub fn close(mut self) -> Result<()> {
        Ok(self.transport.close()?)
    }

    fn round_trip(&mut self, request: &str) -> Result<String> {
        self.gate.check()?;
        let line = command::terminate(request);
        log::debug!("REQ: {line:?}");
        let result = self.transport.write_then_read_line(line.as_bytes());
        let reply = self.gate.record(result)?;
        log::debug!("REP: {reply:?}");
        Ok(reply)
    }

    fn send(&mut self, request: &str) -> Result<()> {
        self.gate.check()?;
        let line = command::terminate(request);
        log::debug!("REQ: {line:?}");
        let result = self.transport.write(line.as_bytes());
        self.gate.record(result)
    }

    /// Sends a request with queries and returns one trimmed segment per query.
    fn ask(&mut self, request: &str) -> Result<Vec<String>> {
        let reply = self.round_trip(request)?;
        let segments: Vec<String> = reply
            .split(SEPARATOR)
            .map(|segment| segment.trim().to_string())
            .collect();
        if segments
            .iter()
            .any(|segment| NACK_REPLIES.contains(&segment.as_str()))
        {
            return Err(ProtocolError::Nack {
                command: request.to_string(),
            }
            .into());
        }
        let expected = command::expected_replies(request);
        if segments.len() != expected {
            return Err(ProtocolError::SegmentCount {
                expected,
                received: segments.len(),
            }
            .into());
        }
        Ok(segments)
    }

    /// Sends a request holding exactly one query.
    fn ask_one(&mut self, request: &str) -> Result<String> {
        Ok(self.ask(request)?.into_iter().next().unwrap_or_default())
    }

    fn read_with<V>(
        &mut self,
        attribute: Attribute,
        parse: impl FnOnce(&str) -> Result<V>,
    ) -> Result<V> {
        let reply = self.ask_one(&attribute.query_command())?;
        parse(&reply)
    }

    fn read_f64(&mut self, attribute: Attribute) -> Result<Option<f64>> {
        self.read_with(attribute, |text| Ok(codec::parse_float(text)?))
    }

    fn read_text(&mut self, attribute: Attribute) -> Result<String> {
        self.read_with(attribute, |text| Ok(text.to_string()))
    }

    fn read_on_off(&mut self, attribute: Attribute) -> Result<bool> {
        self.read_with(attribute, |text| Ok(codec::parse_on_off(text)))
    }

    fn write_value(&mut self, attribute: Attribute, value: &Value) -> Result<()> {
        let request = attribute.set_command(value)?;
        self.send(&request)
    }

    /// Set-then-get in one round trip. Returns the request and the reply.
    fn write_verified(&mut self, attribute: Attribute, encoded: &str) -> Result<(String, String)> {
        let request = command::compound(attribute.section(), attribute.mnemonic(), encoded);
        let reply = self.ask_one(&request)?;
        Ok((request, reply))
    }

    fn check_managed(&self, attribute: Attribute) -> Result<()> {
        match attribute {
            Attribute::Channel(id, _) if !self.channels.contains(&id) => {
                Err(UsageError::UnknownChannel(id).into())
            }
            Attribute::Loop(id, _) if !self.loops.contains(&id) => {
                Err(UsageError::UnknownLoop(id).into())
            }
            _ => Ok(()),
        }
    }

    /// Returns the view of a managed input.
    pub fn channel(&mut self, id: ChannelId) -> Result<Channel<'_, T>> {
        if !self.channels.contains(&id) {
            return Err(UsageError::UnknownChannel(id).into());
        }
        Ok(Channel { ctrl: self, id })
    }

    /// Returns the view of a managed control loop.
    pub fn control_loop(&mut self, id: LoopId) -> Result<Loop<'_, T>> {
        if !self.loops.contains(&id) {
            return Err(UsageError::UnknownLoop(id).into());
        }
        Ok(Loop { ctrl: self, id })
    }

    /// Reads one attribute.
    pub fn get(&mut self, attribute: Attribute) -> Result<Value> {
        self.check_managed(attribute)?;
        self.read_with(attribute, |text| Ok(attribute.decoder().decode(text)?))
    }

    /// Writes one attribute.
    ///
    /// Set point, output power and range are written with read back
    /// verification, loop type with its source check. Everything else is a
    /// plain set.
    pub fn set(&mut self, attribute: Attribute, value: &Value) -> Result<()> {
        if !attribute.is_writable() {
            return Err(UsageError::ReadOnly(attribute).into());
        }
        self.check_managed(attribute)?;
        match attribute {
            Attribute::Loop(id, LoopField::SetPoint) => {
                let value = attribute.expect_f64(value)?;
                self.control_loop(id)?.set_set_point(value)?;
            }
            Attribute::Loop(id, LoopField::OutputPower) => {
                let value = attribute.expect_f64(value)?;
                self.control_loop(id)?.set_output_power(value)?;
            }
            Attribute::Loop(id, LoopField::Range) => {
                let range: LoopRange = attribute.expect_text(value)?.parse()?;
                self.control_loop(id)?.set_range(range)?;
            }
            Attribute::Loop(id, LoopField::Type) => {
                let loop_type: LoopType = attribute.expect_text(value)?.parse()?;
                self.control_loop(id)?.set_type(loop_type)?;
            }
            _ => self.write_value(attribute, value)?,
        }
        Ok(())
    }

    /// Collects sub-commands in a [`Batch`] and submits them when `fill`
    /// returns. The values of all queries are returned in the order they were
    /// added.
    ///
    /// ```no_run
    /// # use cryocon_lib::{client::CryoCon, attribute::Attribute, transport::Transport};
    /// # fn poll<T: Transport>(ctrl: &mut CryoCon<T>) -> cryocon_lib::error::Result<()> {
    /// let values = ctrl.batch(|batch| {
    ///     batch.query("channela".parse::<Attribute>()?)?;
    ///     batch.query("loop1setpoint".parse::<Attribute>()?)
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn batch<F>(&mut self, fill: F) -> Result<Vec<Value>>
    where
        F: FnOnce(&mut Batch) -> Result<()>,
    {
        let mut batch = Batch::new();
        fill(&mut batch)?;
        self.submit(&batch)
    }

    /// Sends every chunk of `batch` in order and decodes the replies.
    pub fn submit(&mut self, batch: &Batch) -> Result<Vec<Value>> {
        let mut replies = Vec::with_capacity(batch.expected_replies());
        for chunk in batch.chunks() {
            let request = chunk.request();
            if chunk.expects_reply() {
                replies.push(self.round_trip(&request)?);
            } else {
                self.send(&request)?;
            }
        }
        batch.decode(&replies)
    }

    /// Reads many attributes in as few round trips as possible.
    pub fn read_attributes(&mut self, attributes: &[Attribute]) -> Result<Vec<(Attribute, Value)>> {
        for attribute in attributes {
            self.check_managed(*attribute)?;
        }
        let values = self.batch(|batch| {
            for attribute in attributes {
                batch.query(*attribute)?;
            }
            Ok(())
        })?;
        Ok(attributes.iter().copied().zip(values).collect())
    }

    /// Sends `request` as is. Requests holding a query return the raw reply
    /// line, others are only written and return an empty string.
    pub fn run(&mut self, request: &str) -> Result<String> {
        if command::expected_replies(request) > 0 {
            self.round_trip(request)
        } else {
            self.send(request)?;
            Ok(String::new())
        }
    }

    fn system(field: SystemField) -> Attribute {
        Attribute::System(field)
    }

    /// Identification string of the instrument.
    pub fn idn(&mut self) -> Result<String> {
        self.read_text(Self::system(SystemField::Idn))
    }

    pub fn name(&mut self) -> Result<String> {
        self.read_with(Self::system(SystemField::Name), |text| {
            Ok(codec::parse_quoted(text).to_string())
        })
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.write_value(Self::system(SystemField::Name), &Value::Text(name.to_string()))
    }

    pub fn hw_revision(&mut self) -> Result<String> {
        self.read_text(Self::system(SystemField::HwRevision))
    }

    pub fn fw_revision(&mut self) -> Result<String> {
        self.read_text(Self::system(SystemField::FwRevision))
    }

    /// Whether the control loops are running.
    pub fn control(&mut self) -> Result<bool> {
        self.read_on_off(Self::system(SystemField::Control))
    }

    /// Starts (`CONTROL`) or stops (`STOP`) the control loops.
    pub fn set_control(&mut self, on: bool) -> Result<()> {
        self.write_value(Self::system(SystemField::Control), &Value::Bool(on))
    }

    fn switch_control(&mut self, verb: &str, on: bool) -> Result<()> {
        let query = command::query(Section::System, SystemField::Control.mnemonic());
        let request = command::join([verb, query.as_str()]);
        let reply = self.ask_one(&request)?;
        if codec::parse_on_off(&reply) != on {
            return Err(Error::ReadbackMismatch {
                command: request,
                written: proto::OnOff::from(on).to_string(),
                read_back: reply,
            });
        }
        Ok(())
    }

    /// Starts the control loops and verifies that they run.
    pub fn on(&mut self) -> Result<()> {
        self.switch_control(command::CONTROL_VERB, true)
    }

    /// Stops the control loops and verifies that they stopped.
    pub fn off(&mut self) -> Result<()> {
        self.switch_control(command::STOP_VERB, false)
    }

    /// Control and lockout state in one round trip.
    pub fn status(&mut self) -> Result<Status> {
        let request = command::join([
            Self::system(SystemField::Control).query_command(),
            Self::system(SystemField::Lockout).query_command(),
        ]);
        let segments = self.ask(&request)?;
        Ok(Status {
            control: codec::parse_on_off(&segments[0]),
            lockout: codec::parse_on_off(&segments[1]),
        })
    }

    /// Whether the front panel keypad is locked.
    pub fn lockout(&mut self) -> Result<bool> {
        self.read_on_off(Self::system(SystemField::Lockout))
    }

    /// Locks the front panel. Accepts a `bool` or one of `on`, `ON`, `off`
    /// and `OFF`.
    pub fn set_lockout<V: ToOnOff + ?Sized>(&mut self, value: &V) -> Result<()> {
        let value = codec::format_on_off(value)?;
        self.send(&command::set(
            Section::System,
            SystemField::Lockout.mnemonic(),
            value,
        ))
    }

    /// Whether the remote LED is lit.
    pub fn led(&mut self) -> Result<bool> {
        self.read_on_off(Self::system(SystemField::Led))
    }

    pub fn set_led<V: ToOnOff + ?Sized>(&mut self, value: &V) -> Result<()> {
        let value = codec::format_on_off(value)?;
        self.send(&command::set(
            Section::System,
            SystemField::Led.mnemonic(),
            value,
        ))
    }

    /// Display filter time constant in seconds.
    pub fn display_filter_time(&mut self) -> Result<Option<f64>> {
        self.read_f64(Self::system(SystemField::DisplayFilterTime))
    }

    /// Sets the display filter time constant. Only 0.5, 1, 2, 4, 8, 16, 32
    /// and 64 seconds are accepted, anything else is refused before sending.
    pub fn set_display_filter_time(&mut self, seconds: f64) -> Result<()> {
        self.write_value(
            Self::system(SystemField::DisplayFilterTime),
            &Value::Float(Some(seconds)),
        )
    }

    pub fn date(&mut self) -> Result<NaiveDate> {
        self.read_with(Self::system(SystemField::Date), |text| {
            Ok(codec::parse_date(text)?)
        })
    }

    pub fn set_date(&mut self, date: NaiveDate) -> Result<()> {
        self.write_value(Self::system(SystemField::Date), &Value::Date(date))
    }

    pub fn time(&mut self) -> Result<NaiveTime> {
        self.read_with(Self::system(SystemField::Time), |text| {
            Ok(codec::parse_time(text)?)
        })
    }

    pub fn set_time(&mut self, time: NaiveTime) -> Result<()> {
        self.write_value(Self::system(SystemField::Time), &Value::Time(time))
    }
}

/// One sensor input of a [`CryoCon`].
#[derive(Debug)]
pub struct Channel<'a, T: Transport> {
    ctrl: &'a mut CryoCon<T>,
    id: ChannelId,
}

impl<T: Transport> Channel<'_, T> {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    fn attribute(&self, field: ChannelField) -> Attribute {
        Attribute::Channel(self.id, field)
    }

    /// Temperature in the display unit, `None` while the input has no valid
    /// reading.
    pub fn temperature(&mut self) -> Result<Option<f64>> {
        let attribute = self.attribute(ChannelField::Temperature);
        self.ctrl.read_f64(attribute)
    }

    pub fn unit(&mut self) -> Result<Unit> {
        let attribute = self.attribute(ChannelField::Unit);
        self.ctrl
            .read_with(attribute, |text| enum_reply(text, Unit::decode))
    }

    pub fn set_unit(&mut self, unit: Unit) -> Result<()> {
        let attribute = self.attribute(ChannelField::Unit);
        self.ctrl
            .write_value(attribute, &Value::Text(unit.encode().to_string()))
    }

    pub fn name(&mut self) -> Result<String> {
        let attribute = self.attribute(ChannelField::Name);
        self.ctrl.read_with(attribute, |text| {
            Ok(codec::parse_quoted(text).to_string())
        })
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let attribute = self.attribute(ChannelField::Name);
        self.ctrl
            .write_value(attribute, &Value::Text(name.to_string()))
    }

    pub fn variance(&mut self) -> Result<Option<f64>> {
        let attribute = self.attribute(ChannelField::Variance);
        self.ctrl.read_f64(attribute)
    }

    pub fn slope(&mut self) -> Result<Option<f64>> {
        let attribute = self.attribute(ChannelField::Slope);
        self.ctrl.read_f64(attribute)
    }

    /// Raw alarm status text.
    pub fn alarm(&mut self) -> Result<String> {
        let attribute = self.attribute(ChannelField::Alarm);
        self.ctrl.read_text(attribute)
    }

    pub fn minimum(&mut self) -> Result<Option<f64>> {
        let attribute = self.attribute(ChannelField::Minimum);
        self.ctrl.read_f64(attribute)
    }

    pub fn maximum(&mut self) -> Result<Option<f64>> {
        let attribute = self.attribute(ChannelField::Maximum);
        self.ctrl.read_f64(attribute)
    }
}

/// One control loop of a [`CryoCon`].
#[derive(Debug)]
pub struct Loop<'a, T: Transport> {
    ctrl: &'a mut CryoCon<T>,
    id: LoopId,
}

impl<T: Transport> Loop<'_, T> {
    pub fn id(&self) -> LoopId {
        self.id
    }

    fn attribute(&self, field: LoopField) -> Attribute {
        Attribute::Loop(self.id, field)
    }

    fn read_f64(&mut self, field: LoopField) -> Result<Option<f64>> {
        let attribute = self.attribute(field);
        self.ctrl.read_f64(attribute)
    }

    fn write_f64(&mut self, field: LoopField, value: f64) -> Result<()> {
        let attribute = self.attribute(field);
        self.ctrl.write_value(attribute, &Value::Float(Some(value)))
    }

    /// Input the loop regulates on, `None` when it has none.
    pub fn source(&mut self) -> Result<Option<ChannelId>> {
        let attribute = self.attribute(LoopField::Source);
        self.ctrl.read_with(attribute, |text| {
            Ok(text
                .chars()
                .last()
                .and_then(|c| ChannelId::try_from(c).ok()))
        })
    }

    pub fn set_source(&mut self, channel: ChannelId) -> Result<()> {
        let attribute = self.attribute(LoopField::Source);
        self.ctrl
            .write_value(attribute, &Value::Text(channel.to_string()))
    }

    pub fn loop_type(&mut self) -> Result<LoopType> {
        let attribute = self.attribute(LoopField::Type);
        self.ctrl
            .read_with(attribute, |text| enum_reply(text, str::parse))
    }

    /// Sets the control type. Every type but MAN and OFF regulates on the
    /// source input, which must then be one of the managed channels.
    pub fn set_type(&mut self, loop_type: LoopType) -> Result<()> {
        if !loop_type.is_sourceless() {
            match self.source()? {
                Some(source) if self.ctrl.channels.contains(&source) => {}
                source => {
                    return Err(Error::InvalidState(format!(
                        "Loop {} is sourced from {}, which is not managed; type must be MAN or OFF",
                        self.id,
                        source.map_or_else(|| String::from("no channel"), |c| c.to_string())
                    )));
                }
            }
        }
        let attribute = self.attribute(LoopField::Type);
        self.ctrl
            .write_value(attribute, &Value::Text(loop_type.encode().to_string()))
    }

    /// Set point in the unit of the source input.
    pub fn set_point(&mut self) -> Result<Option<f64>> {
        let attribute = self.attribute(LoopField::SetPoint);
        self.ctrl.read_with(attribute, |text| {
            Ok(codec::parse_float_with_unit_suffix(text)?)
        })
    }

    /// Writes the set point and returns the value read back in the same round
    /// trip. The read back may differ by up to [`DELTA_RB_SETPT`].
    pub fn set_set_point(&mut self, value: f64) -> Result<f64> {
        let value = proto::check_finite(value)?;
        let attribute = self.attribute(LoopField::SetPoint);
        let (request, reply) = self
            .ctrl
            .write_verified(attribute, &codec::format_float(value))?;
        let read_back = codec::parse_float_with_unit_suffix(&reply)?;
        verify_f64(&request, value, read_back, DELTA_RB_SETPT)
    }

    pub fn rate(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::Rate)
    }

    /// Writes the ramp rate. Not verified.
    pub fn set_rate(&mut self, value: f64) -> Result<()> {
        self.write_f64(LoopField::Rate, value)
    }

    /// Output power in percent.
    pub fn output_power(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::OutputPower)
    }

    /// Writes the output power and returns the value read back. The loop
    /// must be in manual mode, otherwise nothing is written.
    pub fn set_output_power(&mut self, value: f64) -> Result<f64> {
        let value = proto::check_finite(value)?;
        let loop_type = self.loop_type()?;
        if loop_type != LoopType::Manual {
            return Err(Error::InvalidState(format!(
                "Loop {} must be in manual mode to set output power, it is {loop_type}",
                self.id
            )));
        }
        let attribute = self.attribute(LoopField::OutputPower);
        let (request, reply) = self
            .ctrl
            .write_verified(attribute, &codec::format_float(value))?;
        let read_back = codec::parse_float(&reply)?;
        verify_f64(&request, value, read_back, DELTA_RB)
    }

    /// Heater range. Only loop 1 has one.
    pub fn range(&mut self) -> Result<LoopRange> {
        let attribute = self.attribute(LoopField::Range);
        self.ctrl
            .read_with(attribute, |text| enum_reply(text, str::parse))
    }

    /// Writes the heater range of loop 1 and verifies the read back.
    pub fn set_range(&mut self, range: LoopRange) -> Result<LoopRange> {
        if self.id != LoopId::RANGED {
            return Err(UsageError::RangeNotSupported(self.id).into());
        }
        let attribute = self.attribute(LoopField::Range);
        let (request, reply) = self.ctrl.write_verified(attribute, range.encode())?;
        if !reply.eq_ignore_ascii_case(range.encode()) {
            return Err(Error::ReadbackMismatch {
                command: request,
                written: range.to_string(),
                read_back: reply,
            });
        }
        Ok(range)
    }

    pub fn proportional_gain(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::ProportionalGain)
    }

    pub fn set_proportional_gain(&mut self, value: f64) -> Result<()> {
        self.write_f64(LoopField::ProportionalGain, value)
    }

    pub fn integrator_gain(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::IntegratorGain)
    }

    pub fn set_integrator_gain(&mut self, value: f64) -> Result<()> {
        self.write_f64(LoopField::IntegratorGain, value)
    }

    pub fn differentiator_gain(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::DifferentiatorGain)
    }

    pub fn set_differentiator_gain(&mut self, value: f64) -> Result<()> {
        self.write_f64(LoopField::DifferentiatorGain, value)
    }

    /// Whether set point ramping is enabled.
    pub fn ramp(&mut self) -> Result<bool> {
        let attribute = self.attribute(LoopField::Ramp);
        self.ctrl.read_on_off(attribute)
    }

    pub fn set_ramp(&mut self, enabled: bool) -> Result<()> {
        let attribute = self.attribute(LoopField::Ramp);
        self.ctrl.write_value(attribute, &Value::Bool(enabled))
    }

    /// Heater load resistance in ohms.
    pub fn load(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::Load)
    }

    pub fn set_load(&mut self, ohms: f64) -> Result<()> {
        self.write_f64(LoopField::Load, ohms)
    }

    pub fn max_output_power(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::MaxOutputPower)
    }

    pub fn set_max_output_power(&mut self, value: f64) -> Result<()> {
        self.write_f64(LoopField::MaxOutputPower, value)
    }

    pub fn max_set_point(&mut self) -> Result<Option<f64>> {
        let attribute = self.attribute(LoopField::MaxSetPoint);
        self.ctrl.read_with(attribute, |text| {
            Ok(codec::parse_float_with_unit_suffix(text)?)
        })
    }

    pub fn set_max_set_point(&mut self, value: f64) -> Result<()> {
        self.write_f64(LoopField::MaxSetPoint, value)
    }

    /// Output power used in manual mode.
    pub fn manual_power(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::ManualPower)
    }

    pub fn set_manual_power(&mut self, value: f64) -> Result<()> {
        self.write_f64(LoopField::ManualPower, value)
    }

    pub fn voltage_sense(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::VoltageSense)
    }

    pub fn current_sense(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::CurrentSense)
    }

    pub fn resistance_sense(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::ResistanceSense)
    }

    pub fn temperature_sense(&mut self) -> Result<Option<f64>> {
        self.read_f64(LoopField::TemperatureSense)
    }

    pub fn autotune_status(&mut self) -> Result<String> {
        let attribute = self.attribute(LoopField::AutotuneStatus);
        self.ctrl.read_text(attribute)
    }
}
