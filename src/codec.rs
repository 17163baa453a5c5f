//! Conversion between reply text and typed values.
//!
//! Numeric replies can carry sentinels instead of a number: a run of
//! underscores when the sensor voltage is out of range, a run of dots when the
//! reading lies outside the calibrated limits, an empty reply for a disabled
//! input and `N/A` where a value does not apply. All of them decode to `None`.

use crate::error::ProtocolError;
use crate::protocol::{self as proto, OnOff};
use chrono::{NaiveDate, NaiveTime};
use std::fmt;

const DATE_FORMAT: &str = "%m/%d/%Y";
const TIME_FORMAT: &str = "%H:%M:%S";

type Result<T> = std::result::Result<T, ProtocolError>;

/// A decoded reply segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `None` when the instrument sent a sentinel.
    Float(Option<f64>),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => *value,
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(Some(value)) => write!(f, "{value}"),
            Value::Float(None) => write!(f, "NaN"),
            Value::Bool(value) => f.write_str(OnOff::from(*value).encode()),
            Value::Text(value) => f.write_str(value),
            Value::Date(value) => write!(f, "{}", value.format(DATE_FORMAT)),
            Value::Time(value) => write!(f, "{}", value.format(TIME_FORMAT)),
        }
    }
}

/// Selects how a reply segment is turned into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    Float,
    FloatWithUnit,
    OnOff,
    Quoted,
    Text,
    Date,
    Time,
}

impl Decoder {
    pub fn decode(self, text: &str) -> Result<Value> {
        Ok(match self {
            Decoder::Float => Value::Float(parse_float(text)?),
            Decoder::FloatWithUnit => Value::Float(parse_float_with_unit_suffix(text)?),
            Decoder::OnOff => Value::Bool(parse_on_off(text)),
            Decoder::Quoted => Value::Text(parse_quoted(text).to_string()),
            Decoder::Text => Value::Text(text.to_string()),
            Decoder::Date => Value::Date(parse_date(text)?),
            Decoder::Time => Value::Time(parse_time(text)?),
        })
    }
}

fn is_run_of(text: &str, marker: char) -> bool {
    !text.is_empty() && text.chars().all(|c| c == marker)
}

/// Returns `true` for any of the "no valid reading" replies.
pub fn is_sentinel(text: &str) -> bool {
    text == proto::DISABLED
        || text == proto::NOT_AVAILABLE
        || is_run_of(text, proto::OUT_OF_RANGE_MARKER)
        || is_run_of(text, proto::OUT_OF_LIMIT_MARKER)
}

/// Parses a numeric reply, mapping sentinels to `None`.
pub fn parse_float(text: &str) -> Result<Option<f64>> {
    let text = text.trim();
    if is_sentinel(text) {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ProtocolError::InvalidNumber(text.to_string())),
    }
}

/// Parses a numeric reply followed by exactly one unit character, as sent
/// for setpoints.
pub fn parse_float_with_unit_suffix(text: &str) -> Result<Option<f64>> {
    let text = text.trim();
    let value = match text.char_indices().last() {
        Some((index, _)) => &text[..index],
        None => text,
    };
    parse_float(value)
}

/// `ON` in any case is `true`, everything else is `false`.
pub fn parse_on_off(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("ON")
}

/// Something that can be written as `ON` or `OFF`.
pub trait ToOnOff {
    fn to_on_off(&self) -> proto::Result<OnOff>;
}

impl ToOnOff for bool {
    fn to_on_off(&self) -> proto::Result<OnOff> {
        Ok(OnOff::from(*self))
    }
}

impl ToOnOff for OnOff {
    fn to_on_off(&self) -> proto::Result<OnOff> {
        Ok(*self)
    }
}

impl ToOnOff for str {
    fn to_on_off(&self) -> proto::Result<OnOff> {
        self.parse()
    }
}

impl ToOnOff for &str {
    fn to_on_off(&self) -> proto::Result<OnOff> {
        self.parse()
    }
}

/// Encodes a boolean or one of the literals `on`, `ON`, `off`, `OFF`.
pub fn format_on_off<T: ToOnOff + ?Sized>(value: &T) -> proto::Result<&'static str> {
    Ok(value.to_on_off()?.encode())
}

/// Removes one pair of surrounding double quotes, if present.
pub fn parse_quoted(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
}

pub fn format_quoted(text: &str) -> String {
    format!("\"{text}\"")
}

pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(parse_quoted(text), DATE_FORMAT)
        .map_err(|_| ProtocolError::InvalidDate(text.to_string()))
}

pub fn format_date(date: &NaiveDate) -> String {
    format_quoted(&date.format(DATE_FORMAT).to_string())
}

pub fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(parse_quoted(text), TIME_FORMAT)
        .map_err(|_| ProtocolError::InvalidTime(text.to_string()))
}

pub fn format_time(time: &NaiveTime) -> String {
    format_quoted(&time.format(TIME_FORMAT).to_string())
}

/// Formats a number the way the instrument accepts it.
pub fn format_float(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn float_sentinels() {
        for sentinel in ["_______", "_", ".......", "...", "", "N/A"] {
            assert_eq!(parse_float(sentinel), Ok(None), "{sentinel:?}");
        }
        assert_eq!(parse_float("12.456"), Ok(Some(12.456)));
        assert_eq!(parse_float(" -3.5 "), Ok(Some(-3.5)));
        assert_eq!(parse_float("1E-3"), Ok(Some(0.001)));
        assert_matches!(parse_float("abc"), Err(ProtocolError::InvalidNumber(..)));
        assert_matches!(parse_float("._."), Err(ProtocolError::InvalidNumber(..)));
        for garbled in ["inf", "-infinity", "NaN"] {
            assert_matches!(
                parse_float(garbled),
                Err(ProtocolError::InvalidNumber(..)),
                "{garbled:?}"
            );
        }
    }

    #[test]
    fn float_with_unit_suffix() {
        assert_eq!(parse_float_with_unit_suffix("123.456K"), Ok(Some(123.456)));
        assert_eq!(parse_float_with_unit_suffix("123.456C"), Ok(Some(123.456)));
        assert_eq!(parse_float_with_unit_suffix("77.01F"), Ok(Some(77.01)));
        assert_eq!(parse_float_with_unit_suffix("5.5\u{ea}"), Ok(Some(5.5)));
        assert_eq!(parse_float_with_unit_suffix(".......K"), Ok(None));
        // exactly one character is stripped
        assert_matches!(
            parse_float_with_unit_suffix("1.0KK"),
            Err(ProtocolError::InvalidNumber(..))
        );
    }

    #[test]
    fn on_off() {
        assert!(parse_on_off("ON"));
        assert!(parse_on_off("on"));
        assert!(!parse_on_off("OFF"));
        // garbled replies read as off
        assert!(!parse_on_off("O?"));
        assert!(!parse_on_off(""));

        assert_eq!(format_on_off(&true), Ok("ON"));
        assert_eq!(format_on_off(&false), Ok("OFF"));
        assert_eq!(format_on_off("off"), Ok("OFF"));
        assert_eq!(format_on_off("ON"), Ok("ON"));
        assert_matches!(format_on_off("maybe"), Err(proto::Error::InvalidOnOff(..)));
    }

    #[test]
    fn quoted() {
        assert_eq!(parse_quoted("\"Cold head\""), "Cold head");
        assert_eq!(parse_quoted("Cryocon simulator"), "Cryocon simulator");
        assert_eq!(format_quoted("Cold head"), "\"Cold head\"");
    }

    #[test]
    fn date_and_time() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(format_date(&date), "\"03/09/2026\"");
        assert_eq!(parse_date("\"03/09/2026\""), Ok(date));
        assert_matches!(parse_date("\"2026-03-09\""), Err(ProtocolError::InvalidDate(..)));

        let time = NaiveTime::from_hms_opt(7, 5, 30).unwrap();
        assert_eq!(format_time(&time), "\"07:05:30\"");
        assert_eq!(parse_time("\"07:05:30\""), Ok(time));
        assert_matches!(parse_time("\"7h05\""), Err(ProtocolError::InvalidTime(..)));
    }

    #[test]
    fn decoder() {
        assert_eq!(Decoder::Float.decode("......."), Ok(Value::Float(None)));
        assert_eq!(Decoder::FloatWithUnit.decode("4.2K"), Ok(Value::Float(Some(4.2))));
        assert_eq!(Decoder::OnOff.decode("ON"), Ok(Value::Bool(true)));
        assert_eq!(Decoder::Quoted.decode("\"A\""), Ok(Value::Text("A".into())));
        assert_eq!(Decoder::Text.decode("--"), Ok(Value::Text("--".into())));
        assert_eq!(Value::Float(None).to_string(), "NaN");
        assert_eq!(Value::Bool(true).to_string(), "ON");
    }
}
