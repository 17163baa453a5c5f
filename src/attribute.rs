//! Fixed enumeration of every instrument member.
//!
//! An [`Attribute`] names one member of one channel, loop or of the system,
//! and knows its query command, whether and how it can be written, and how its
//! reply decodes. Names are the lowercase identifiers used by the polling
//! layer, e.g. `channela`, `channelbunit`, `loop1setpoint` or `idn`.

use crate::codec::{self, Decoder, Value};
use crate::command::{self, ChannelField, LoopField, Section, SystemField};
use crate::error::{Result, UsageError};
use crate::protocol::{self as proto, ChannelId, LoopId, LoopRange, LoopType, OnOff, Unit};
use chrono::{NaiveDate, NaiveTime};
use std::fmt;
use std::str::FromStr;

/// One readable member of the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Channel(ChannelId, ChannelField),
    Loop(LoopId, LoopField),
    System(SystemField),
}

impl ChannelField {
    fn suffix(self) -> &'static str {
        match self {
            ChannelField::Temperature => "",
            ChannelField::Unit => "unit",
            ChannelField::Name => "name",
            ChannelField::Variance => "variance",
            ChannelField::Slope => "slope",
            ChannelField::Alarm => "alarm",
            ChannelField::Minimum => "minimum",
            ChannelField::Maximum => "maximum",
        }
    }
}

impl LoopField {
    fn suffix(self) -> &'static str {
        match self {
            LoopField::Source => "source",
            LoopField::Type => "type",
            LoopField::SetPoint => "setpoint",
            LoopField::Rate => "rate",
            LoopField::OutputPower => "output",
            LoopField::Range => "range",
            LoopField::ProportionalGain => "pgain",
            LoopField::IntegratorGain => "igain",
            LoopField::DifferentiatorGain => "dgain",
            LoopField::Ramp => "ramp",
            LoopField::Load => "load",
            LoopField::MaxOutputPower => "maxpower",
            LoopField::MaxSetPoint => "maxsetpoint",
            LoopField::ManualPower => "manualpower",
            LoopField::VoltageSense => "vsense",
            LoopField::CurrentSense => "isense",
            LoopField::ResistanceSense => "rsense",
            LoopField::TemperatureSense => "tsense",
            LoopField::AutotuneStatus => "autotunestatus",
        }
    }
}

impl SystemField {
    fn name(self) -> &'static str {
        match self {
            SystemField::Idn => "idn",
            SystemField::Name => "name",
            SystemField::HwRevision => "hwrevision",
            SystemField::FwRevision => "fwrevision",
            SystemField::Control => "control",
            SystemField::Lockout => "lockout",
            SystemField::Led => "led",
            SystemField::DisplayFilterTime => "displayfiltertime",
            SystemField::Date => "date",
            SystemField::Time => "time",
        }
    }
}

impl Attribute {
    /// The members read once per polling cycle: every temperature, the main
    /// loop settings and the control state.
    pub fn polled(channels: &[ChannelId], loops: &[LoopId]) -> Vec<Attribute> {
        let mut attributes: Vec<Attribute> = channels
            .iter()
            .map(|id| Attribute::Channel(*id, ChannelField::Temperature))
            .collect();
        for id in loops {
            for field in [
                LoopField::OutputPower,
                LoopField::SetPoint,
                LoopField::Rate,
                LoopField::Type,
            ] {
                attributes.push(Attribute::Loop(*id, field));
            }
            if *id == LoopId::RANGED {
                attributes.push(Attribute::Loop(*id, LoopField::Range));
            }
        }
        attributes.push(Attribute::System(SystemField::Control));
        attributes
    }

    pub fn section(&self) -> Section {
        match self {
            Attribute::Channel(id, _) => Section::Input(*id),
            Attribute::Loop(id, _) => Section::Loop(*id),
            Attribute::System(_) => Section::System,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Attribute::Channel(_, field) => field.mnemonic(),
            Attribute::Loop(_, field) => field.mnemonic(),
            Attribute::System(field) => field.mnemonic(),
        }
    }

    pub fn decoder(&self) -> Decoder {
        match self {
            Attribute::Channel(_, field) => match field {
                ChannelField::Unit | ChannelField::Alarm => Decoder::Text,
                ChannelField::Name => Decoder::Quoted,
                _ => Decoder::Float,
            },
            Attribute::Loop(_, field) => match field {
                LoopField::Source | LoopField::Type | LoopField::Range => Decoder::Text,
                LoopField::AutotuneStatus => Decoder::Text,
                LoopField::SetPoint | LoopField::MaxSetPoint => Decoder::FloatWithUnit,
                LoopField::Ramp => Decoder::OnOff,
                _ => Decoder::Float,
            },
            Attribute::System(field) => match field {
                SystemField::Idn | SystemField::HwRevision | SystemField::FwRevision => {
                    Decoder::Text
                }
                SystemField::Name => Decoder::Quoted,
                SystemField::Control | SystemField::Lockout | SystemField::Led => {
                    Decoder::OnOff
                }
                SystemField::DisplayFilterTime => Decoder::Float,
                SystemField::Date => Decoder::Date,
                SystemField::Time => Decoder::Time,
            },
        }
    }

    pub fn is_writable(&self) -> bool {
        match self {
            Attribute::Channel(_, field) => {
                matches!(field, ChannelField::Unit | ChannelField::Name)
            }
            Attribute::Loop(_, field) => !matches!(
                field,
                LoopField::VoltageSense
                    | LoopField::CurrentSense
                    | LoopField::ResistanceSense
                    | LoopField::TemperatureSense
                    | LoopField::AutotuneStatus
            ),
            Attribute::System(field) => !matches!(
                field,
                SystemField::Idn | SystemField::HwRevision | SystemField::FwRevision
            ),
        }
    }

    pub fn query_command(&self) -> String {
        command::query(self.section(), self.mnemonic())
    }

    /// Builds the plain (unverified) set command for `value`.
    ///
    /// Writing `control` issues `CONTROL` or `STOP` instead of a value.
    pub fn set_command(&self, value: &Value) -> Result<String> {
        if !self.is_writable() {
            return Err(UsageError::ReadOnly(*self).into());
        }
        if let Attribute::Loop(id, LoopField::Range) = *self {
            if id != LoopId::RANGED {
                return Err(UsageError::RangeNotSupported(id).into());
            }
        }
        if *self == Attribute::System(SystemField::Control) {
            let verb = if self.expect_bool(value)? {
                command::CONTROL_VERB
            } else {
                command::STOP_VERB
            };
            return Ok(verb.to_string());
        }
        Ok(command::set(
            self.section(),
            self.mnemonic(),
            &self.encode(value)?,
        ))
    }

    /// Encodes `value` as wire text for this attribute, validating it first.
    pub fn encode(&self, value: &Value) -> proto::Result<String> {
        match self {
            Attribute::Channel(_, ChannelField::Unit) => {
                let unit = Unit::from_str(&self.expect_text(value)?)?;
                Ok(unit.encode().to_string())
            }
            Attribute::Loop(_, LoopField::Type) => {
                let loop_type = LoopType::from_str(&self.expect_text(value)?)?;
                Ok(loop_type.encode().to_string())
            }
            Attribute::Loop(_, LoopField::Range) => {
                let range = LoopRange::from_str(&self.expect_text(value)?)?;
                Ok(range.encode().to_string())
            }
            Attribute::Loop(_, LoopField::Source) => {
                Ok(ChannelId::from_str(&self.expect_text(value)?)?.to_string())
            }
            Attribute::System(SystemField::DisplayFilterTime) => {
                let seconds = proto::check_display_filter_time(self.expect_f64(value)?)?;
                Ok(codec::format_float(seconds))
            }
            _ => match self.decoder() {
                Decoder::Float | Decoder::FloatWithUnit => {
                    let number = proto::check_finite(self.expect_f64(value)?)?;
                    Ok(codec::format_float(number))
                }
                Decoder::OnOff => Ok(OnOff::from(self.expect_bool(value)?).encode().to_string()),
                Decoder::Quoted => {
                    let text = self.expect_text(value)?;
                    Ok(codec::format_quoted(proto::check_name(&text)?))
                }
                Decoder::Text => self.expect_text(value),
                Decoder::Date => match value {
                    Value::Date(date) => Ok(codec::format_date(date)),
                    other => Err(self.invalid(other)),
                },
                Decoder::Time => match value {
                    Value::Time(time) => Ok(codec::format_time(time)),
                    other => Err(self.invalid(other)),
                },
            },
        }
    }

    /// Parses user supplied text into a value of the kind this attribute
    /// holds. Dates are given as `YYYY-MM-DD`, times as `HH:MM:SS`.
    pub fn parse_value(&self, text: &str) -> proto::Result<Value> {
        let text = text.trim();
        let invalid = || proto::Error::InvalidValue {
            attribute: self.to_string(),
            value: text.to_string(),
        };
        Ok(match self.decoder() {
            Decoder::Float | Decoder::FloatWithUnit => {
                let number = text.parse::<f64>().map_err(|_| invalid())?;
                Value::Float(Some(proto::check_finite(number)?))
            }
            Decoder::OnOff => Value::Bool(text.parse::<OnOff>()?.into()),
            Decoder::Quoted | Decoder::Text => Value::Text(text.to_string()),
            Decoder::Date => {
                Value::Date(NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?)
            }
            Decoder::Time => {
                Value::Time(NaiveTime::parse_from_str(text, "%H:%M:%S").map_err(|_| invalid())?)
            }
        })
    }

    fn invalid(&self, value: &Value) -> proto::Error {
        proto::Error::InvalidValue {
            attribute: self.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn expect_f64(&self, value: &Value) -> proto::Result<f64> {
        value.as_f64().ok_or_else(|| self.invalid(value))
    }

    pub(crate) fn expect_bool(&self, value: &Value) -> proto::Result<bool> {
        match value {
            Value::Bool(value) => Ok(*value),
            Value::Text(text) => Ok(text.parse::<OnOff>()?.into()),
            other => Err(self.invalid(other)),
        }
    }

    pub(crate) fn expect_text(&self, value: &Value) -> proto::Result<String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(value))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Channel(id, field) => write!(
                f,
                "channel{}{}",
                id.as_char().to_ascii_lowercase(),
                field.suffix()
            ),
            Attribute::Loop(id, field) => write!(f, "loop{id}{}", field.suffix()),
            Attribute::System(field) => f.write_str(field.name()),
        }
    }
}

impl FromStr for Attribute {
    type Err = UsageError;

    /// Case-insensitive lookup by attribute name.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let unknown = || UsageError::UnknownAttribute(s.to_string());

        if let Some(field) = SystemField::ALL.into_iter().find(|f| f.name() == name) {
            return Ok(Attribute::System(field));
        }
        if let Some(rest) = name.strip_prefix("channel") {
            let mut chars = rest.chars();
            let id = chars
                .next()
                .and_then(|c| ChannelId::try_from(c).ok())
                .ok_or_else(unknown)?;
            let suffix = chars.as_str();
            return ChannelField::ALL
                .into_iter()
                .find(|f| f.suffix() == suffix)
                .map(|field| Attribute::Channel(id, field))
                .ok_or_else(unknown);
        }
        if let Some(rest) = name.strip_prefix("loop") {
            let mut chars = rest.chars();
            let id = chars
                .next()
                .and_then(|c| c.to_digit(10))
                .and_then(|n| LoopId::try_from(n as u8).ok())
                .ok_or_else(unknown)?;
            let suffix = chars.as_str();
            return LoopField::ALL
                .into_iter()
                .find(|f| f.suffix() == suffix)
                .map(|field| Attribute::Loop(id, field))
                .ok_or_else(unknown);
        }
        Err(unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;

    fn loop_(n: u8) -> LoopId {
        LoopId::try_from(n).unwrap()
    }

    #[test]
    fn names_round_trip() {
        let mut all = Vec::new();
        for id in ChannelId::ALL {
            all.extend(ChannelField::ALL.map(|f| Attribute::Channel(id, f)));
        }
        for id in LoopId::all() {
            all.extend(LoopField::ALL.map(|f| Attribute::Loop(id, f)));
        }
        all.extend(SystemField::ALL.map(Attribute::System));

        for attribute in all {
            assert_eq!(attribute.to_string().parse::<Attribute>(), Ok(attribute));
        }
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(
            "ChannelA".parse::<Attribute>(),
            Ok(Attribute::Channel(ChannelId::A, ChannelField::Temperature))
        );
        assert_eq!(
            "LOOP1SETPOINT".parse::<Attribute>(),
            Ok(Attribute::Loop(loop_(1), LoopField::SetPoint))
        );
        assert_eq!(
            "IDN".parse::<Attribute>(),
            Ok(Attribute::System(SystemField::Idn))
        );
        assert_matches!("channele".parse::<Attribute>(), Err(UsageError::UnknownAttribute(..)));
        assert_matches!("loop5rate".parse::<Attribute>(), Err(UsageError::UnknownAttribute(..)));
        assert_matches!("loop1speed".parse::<Attribute>(), Err(UsageError::UnknownAttribute(..)));
    }

    #[test]
    fn query_commands() {
        let attribute: Attribute = "channelc".parse().unwrap();
        assert_eq!(attribute.query_command(), ":INPUT C:TEMP?");
        let attribute: Attribute = "loop2output".parse().unwrap();
        assert_eq!(attribute.query_command(), ":LOOP 2:OUTPWR?");
        let attribute: Attribute = "displayfiltertime".parse().unwrap();
        assert_eq!(attribute.query_command(), ":SYSTEM:DISTC?");
    }

    #[test]
    fn set_commands() {
        let rate = Attribute::Loop(loop_(1), LoopField::Rate);
        assert_eq!(
            rate.set_command(&Value::Float(Some(0.5))).unwrap(),
            ":LOOP 1:RATE 0.5"
        );
        let range = Attribute::Loop(loop_(1), LoopField::Range);
        assert_eq!(
            range.set_command(&Value::Text("low".into())).unwrap(),
            ":LOOP 1:RANGE LOW"
        );
        let name = Attribute::Channel(ChannelId::A, ChannelField::Name);
        assert_eq!(
            name.set_command(&Value::Text("Stage".into())).unwrap(),
            ":INPUT A:NAM \"Stage\""
        );
        let lockout = Attribute::System(SystemField::Lockout);
        assert_eq!(
            lockout.set_command(&Value::Text("on".into())).unwrap(),
            ":SYSTEM:LOCKOUT ON"
        );
    }

    #[test]
    fn control_uses_verbs() {
        let control = Attribute::System(SystemField::Control);
        assert_eq!(control.set_command(&Value::Bool(true)).unwrap(), "CONTROL");
        assert_eq!(control.set_command(&Value::Bool(false)).unwrap(), "STOP");
        assert_eq!(control.set_command(&Value::Text("ON".into())).unwrap(), "CONTROL");
    }

    #[test]
    fn read_only_members_refuse_writes() {
        let temperature = Attribute::Channel(ChannelId::A, ChannelField::Temperature);
        assert_matches!(
            temperature.set_command(&Value::Float(Some(1.0))),
            Err(Error::Usage(UsageError::ReadOnly(..)))
        );
        let idn = Attribute::System(SystemField::Idn);
        assert!(!idn.is_writable());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let filter = Attribute::System(SystemField::DisplayFilterTime);
        assert_matches!(
            filter.set_command(&Value::Float(Some(3.0))),
            Err(Error::Value(proto::Error::InvalidFilterTime(..)))
        );
        let range = Attribute::Loop(loop_(1), LoopField::Range);
        assert_matches!(
            range.set_command(&Value::Text("max".into())),
            Err(Error::Value(proto::Error::InvalidRange(..)))
        );
        let rate = Attribute::Loop(loop_(1), LoopField::Rate);
        assert_matches!(
            rate.set_command(&Value::Text("fast".into())),
            Err(Error::Value(proto::Error::InvalidValue { .. }))
        );
        for number in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_matches!(
                rate.set_command(&Value::Float(Some(number))),
                Err(Error::Value(proto::Error::NotFinite(..)))
            );
        }
    }

    #[test]
    fn range_only_exists_on_loop_1() {
        let range = Attribute::Loop(loop_(2), LoopField::Range);
        assert_matches!(
            range.set_command(&Value::Text("low".into())),
            Err(Error::Usage(UsageError::RangeNotSupported(..)))
        );
        // refused before the value is looked at
        assert_matches!(
            range.set_command(&Value::Text("max".into())),
            Err(Error::Usage(UsageError::RangeNotSupported(..)))
        );
    }

    #[test]
    fn parse_user_values() {
        let setpoint = Attribute::Loop(loop_(1), LoopField::SetPoint);
        assert_eq!(setpoint.parse_value("77"), Ok(Value::Float(Some(77.0))));
        assert_matches!(setpoint.parse_value("cold"), Err(proto::Error::InvalidValue { .. }));
        for text in ["nan", "inf", "-Infinity"] {
            assert_matches!(setpoint.parse_value(text), Err(proto::Error::NotFinite(..)));
        }

        let ramp = Attribute::Loop(loop_(1), LoopField::Ramp);
        assert_eq!(ramp.parse_value("on"), Ok(Value::Bool(true)));

        let date = Attribute::System(SystemField::Date);
        assert_eq!(
            date.parse_value("2026-03-09"),
            Ok(Value::Date(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()))
        );
        assert_eq!(
            date.set_command(&date.parse_value("2026-03-09").unwrap()).unwrap(),
            ":SYSTEM:DATE \"03/09/2026\""
        );
    }

    #[test]
    fn polled_set() {
        let polled = Attribute::polled(&[ChannelId::A, ChannelId::B], &[loop_(1), loop_(2)]);
        assert_eq!(polled.len(), 2 + 4 + 1 + 4 + 1);
        assert_eq!(polled.last(), Some(&Attribute::System(SystemField::Control)));
        assert!(polled.contains(&Attribute::Loop(loop_(1), LoopField::Range)));
        assert!(!polled.contains(&Attribute::Loop(loop_(2), LoopField::Range)));
    }
}
