//! Domain types and constants of the Cryo-con temperature controller protocol.
//!
//! Everything in here is pure: identifiers for inputs and loops, the enumerated
//! settings the instrument understands, and the reserved strings and tolerances
//! used when talking to it.

use std::fmt;
use std::str::FromStr;

/// Errors raised when a value cannot be represented in the instrument protocol.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The channel identifier is not one of `A` to `D`.
    #[error("Invalid channel '{0}', valid channels are A, B, C and D")]
    InvalidChannel(String),

    /// The loop number is outside `1..=4`.
    #[error("Invalid loop {0}, valid loops are 1 to {max}", max = NUMBER_OF_LOOPS)]
    InvalidLoop(u8),

    /// The unit is not one of `K`, `C`, `F` or `S`.
    #[error("Invalid unit '{0}', valid units are K, C, F and S")]
    InvalidUnit(String),

    /// The loop control type is unknown.
    #[error("Invalid loop type '{0}', valid types are OFF, PID, MAN, TABLE, RAMPP and RAMPT")]
    InvalidLoopType(String),

    /// The loop range is unknown.
    #[error("Invalid loop range '{0}', valid ranges are HI, MID and LOW")]
    InvalidRange(String),

    /// Only `on`, `ON`, `off` and `OFF` are accepted as switch literals.
    #[error("Invalid on/off value '{0}'")]
    InvalidOnOff(String),

    /// The display filter time constant is not one the instrument supports.
    #[error("Invalid display filter time {0}, valid values are 0.5, 1, 2, 4, 8, 16, 32 and 64 seconds")]
    InvalidFilterTime(f64),

    /// A name would break the wire framing.
    #[error("Invalid name '{0}', names must not contain quotes, semicolons or line breaks")]
    InvalidName(String),

    /// NaN and infinities cannot be written to the instrument.
    #[error("Invalid number {0}, only finite values can be written")]
    NotFinite(f64),

    /// Free-form text could not be turned into a value for an attribute.
    #[error("Invalid value '{value}' for {attribute}")]
    InvalidValue { attribute: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Default TCP port of the instrument's ethernet interface.
pub const DEFAULT_TCP_PORT: u16 = 5000;
/// Default serial line speed.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Maximum length of command text sent in a single line.
pub const MAX_LINE_LENGTH: usize = 250;

/// Separator between sub-commands of a request and between segments of a reply.
pub const SEPARATOR: char = ';';

/// Reply of an input whose sensor voltage is out of range.
pub const OUT_OF_RANGE_MARKER: char = '_';
/// Reply of an input that is in range but outside the calibrated limits.
pub const OUT_OF_LIMIT_MARKER: char = '.';
/// Reply of a disabled input.
pub const DISABLED: &str = "";
/// Reply of a value that does not apply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Negative acknowledgements. Either spelling has been seen in the field.
pub const NACK_REPLIES: [&str; 2] = ["NACK", "NAK"];

/// Read back tolerance for output power writes (6 decimals precision).
pub const DELTA_RB: f64 = 0.000_000_1;
/// Read back tolerance for setpoint writes. Setpoints are quantised when the
/// input is not in K or S units.
pub const DELTA_RB_SETPT: f64 = 0.000_1;

/// Display filter time constants in seconds.
pub const DISPLAY_FILTER_TIMES: [f64; 8] = [0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0];

pub const NUMBER_OF_CHANNELS: usize = 4;
pub const NUMBER_OF_LOOPS: u8 = 4;

/// Checks that `value` is a supported display filter time constant.
pub fn check_display_filter_time(value: f64) -> Result<f64> {
    if DISPLAY_FILTER_TIMES.contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidFilterTime(value))
    }
}

/// Checks that `value` is neither NaN nor infinite.
pub fn check_finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::NotFinite(value))
    }
}

/// Checks that a name can be sent inside a quoted string.
pub fn check_name(name: &str) -> Result<&str> {
    if name.contains(['"', SEPARATOR, '\n', '\r']) {
        Err(Error::InvalidName(name.to_string()))
    } else {
        Ok(name)
    }
}

/// One of the sensor inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelId {
    A,
    B,
    C,
    D,
}

impl ChannelId {
    pub const ALL: [ChannelId; NUMBER_OF_CHANNELS] =
        [ChannelId::A, ChannelId::B, ChannelId::C, ChannelId::D];

    pub fn as_char(self) -> char {
        match self {
            ChannelId::A => 'A',
            ChannelId::B => 'B',
            ChannelId::C => 'C',
            ChannelId::D => 'D',
        }
    }
}

impl TryFrom<char> for ChannelId {
    type Error = Error;

    fn try_from(value: char) -> Result<Self> {
        match value.to_ascii_uppercase() {
            'A' => Ok(ChannelId::A),
            'B' => Ok(ChannelId::B),
            'C' => Ok(ChannelId::C),
            'D' => Ok(ChannelId::D),
            _ => Err(Error::InvalidChannel(value.to_string())),
        }
    }
}

impl FromStr for ChannelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => ChannelId::try_from(c),
            _ => Err(Error::InvalidChannel(s.to_string())),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One of the control loops, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct LoopId(u8);

impl LoopId {
    /// The only loop with a selectable heater range.
    pub const RANGED: LoopId = LoopId(1);

    pub fn all() -> impl Iterator<Item = LoopId> {
        (1..=NUMBER_OF_LOOPS).map(LoopId)
    }
}

impl std::ops::Deref for LoopId {
    type Target = u8;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u8> for LoopId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        if (1..=NUMBER_OF_LOOPS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidLoop(value))
        }
    }
}

impl From<LoopId> for u8 {
    fn from(id: LoopId) -> u8 {
        id.0
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unit of an input.
///
/// `Sensor` is what gets written to select the sensor native unit. The
/// instrument then reports the concrete unit back, which decodes to `Ohms` or
/// `Volts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    Kelvin,
    Celsius,
    Fahrenheit,
    Sensor,
    Ohms,
    Volts,
}

impl Unit {
    /// Wire representation used when setting the unit.
    pub fn encode(self) -> &'static str {
        match self {
            Unit::Kelvin => "K",
            Unit::Celsius => "C",
            Unit::Fahrenheit => "F",
            Unit::Sensor | Unit::Ohms | Unit::Volts => "S",
        }
    }

    /// Decodes a unit reply, including the sensor unit codes.
    ///
    /// Depending on the model, ohms are reported as `\x07` (M24C), `\xea`
    /// (M14) or `\xf4` (M32).
    pub fn decode(text: &str) -> Result<Self> {
        match text {
            "\u{07}" | "\u{ea}" | "\u{f4}" => Ok(Unit::Ohms),
            "V" => Ok(Unit::Volts),
            other => other.parse(),
        }
    }

    /// Unit label for display.
    pub fn label(self) -> &'static str {
        match self {
            Unit::Kelvin => "K",
            Unit::Celsius => "C",
            Unit::Fahrenheit => "F",
            Unit::Sensor => "S",
            Unit::Ohms => "Ohms",
            Unit::Volts => "V",
        }
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "K" => Ok(Unit::Kelvin),
            "C" => Ok(Unit::Celsius),
            "F" => Ok(Unit::Fahrenheit),
            "S" => Ok(Unit::Sensor),
            _ => Err(Error::InvalidUnit(s.to_string())),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Control type of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoopType {
    Off,
    Pid,
    Manual,
    Table,
    RampP,
    RampT,
}

impl LoopType {
    pub fn encode(self) -> &'static str {
        match self {
            LoopType::Off => "OFF",
            LoopType::Pid => "PID",
            LoopType::Manual => "MAN",
            LoopType::Table => "TABLE",
            LoopType::RampP => "RAMPP",
            LoopType::RampT => "RAMPT",
        }
    }

    /// Types that can run without a source input.
    pub fn is_sourceless(self) -> bool {
        matches!(self, LoopType::Off | LoopType::Manual)
    }
}

impl FromStr for LoopType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OFF" => Ok(LoopType::Off),
            "PID" => Ok(LoopType::Pid),
            "MAN" => Ok(LoopType::Manual),
            "TABLE" => Ok(LoopType::Table),
            "RAMPP" => Ok(LoopType::RampP),
            "RAMPT" => Ok(LoopType::RampT),
            _ => Err(Error::InvalidLoopType(s.to_string())),
        }
    }
}

impl fmt::Display for LoopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

/// Heater range of loop 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoopRange {
    High,
    Mid,
    Low,
}

impl LoopRange {
    pub fn encode(self) -> &'static str {
        match self {
            LoopRange::High => "HI",
            LoopRange::Mid => "MID",
            LoopRange::Low => "LOW",
        }
    }
}

impl FromStr for LoopRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HI" => Ok(LoopRange::High),
            "MID" => Ok(LoopRange::Mid),
            "LOW" => Ok(LoopRange::Low),
            _ => Err(Error::InvalidRange(s.to_string())),
        }
    }
}

impl fmt::Display for LoopRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

/// A two state switch as the instrument spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnOff {
    On,
    Off,
}

impl OnOff {
    pub fn encode(self) -> &'static str {
        match self {
            OnOff::On => "ON",
            OnOff::Off => "OFF",
        }
    }
}

impl From<bool> for OnOff {
    fn from(value: bool) -> Self {
        if value {
            OnOff::On
        } else {
            OnOff::Off
        }
    }
}

impl From<OnOff> for bool {
    fn from(value: OnOff) -> Self {
        value == OnOff::On
    }
}

impl FromStr for OnOff {
    type Err = Error;

    /// Accepts exactly `on`, `ON`, `off` and `OFF`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "on" | "ON" => Ok(OnOff::On),
            "off" | "OFF" => Ok(OnOff::Off),
            _ => Err(Error::InvalidOnOff(s.to_string())),
        }
    }
}

impl fmt::Display for OnOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn channel_id() {
        assert_eq!("a".parse::<ChannelId>(), Ok(ChannelId::A));
        assert_eq!(" D ".parse::<ChannelId>(), Ok(ChannelId::D));
        assert_matches!("E".parse::<ChannelId>(), Err(Error::InvalidChannel(..)));
        assert_matches!("AB".parse::<ChannelId>(), Err(Error::InvalidChannel(..)));
        assert_matches!("".parse::<ChannelId>(), Err(Error::InvalidChannel(..)));
        assert_eq!(ChannelId::C.to_string(), "C");
    }

    #[test]
    fn loop_id() {
        assert_matches!(LoopId::try_from(0u8), Err(Error::InvalidLoop(0)));
        assert_eq!(*LoopId::try_from(1u8).unwrap(), 1);
        assert_eq!(*LoopId::try_from(4u8).unwrap(), 4);
        assert_matches!(LoopId::try_from(5u8), Err(Error::InvalidLoop(5)));
        assert_eq!(
            Error::InvalidLoop(5).to_string(),
            "Invalid loop 5, valid loops are 1 to 4"
        );
        assert_eq!(LoopId::all().count(), 4);
        assert_eq!(LoopId::RANGED, LoopId::try_from(1u8).unwrap());
    }

    #[test]
    fn unit_decode() {
        assert_eq!(Unit::decode("K"), Ok(Unit::Kelvin));
        assert_eq!(Unit::decode("c"), Ok(Unit::Celsius));
        assert_eq!(Unit::decode("S"), Ok(Unit::Sensor));
        assert_eq!(Unit::decode("\u{07}"), Ok(Unit::Ohms));
        assert_eq!(Unit::decode("\u{ea}"), Ok(Unit::Ohms));
        assert_eq!(Unit::decode("V"), Ok(Unit::Volts));
        assert_matches!(Unit::decode("X"), Err(Error::InvalidUnit(..)));

        assert_eq!(Unit::Ohms.encode(), "S");
        assert_eq!(Unit::Ohms.label(), "Ohms");
        assert_eq!(Unit::Fahrenheit.encode(), "F");
    }

    #[test]
    fn loop_type() {
        assert_eq!("man".parse::<LoopType>(), Ok(LoopType::Manual));
        assert_eq!("RAMPT".parse::<LoopType>(), Ok(LoopType::RampT));
        assert_matches!("AUTO".parse::<LoopType>(), Err(Error::InvalidLoopType(..)));
        assert!(LoopType::Off.is_sourceless());
        assert!(LoopType::Manual.is_sourceless());
        assert!(!LoopType::Pid.is_sourceless());
    }

    #[test]
    fn loop_range_is_case_insensitive() {
        assert_eq!("low".parse::<LoopRange>(), Ok(LoopRange::Low));
        assert_eq!("Mid".parse::<LoopRange>(), Ok(LoopRange::Mid));
        assert_eq!("HI".parse::<LoopRange>(), Ok(LoopRange::High));
        assert_matches!("HIGH".parse::<LoopRange>(), Err(Error::InvalidRange(..)));
        assert_eq!(LoopRange::Low.to_string(), "LOW");
    }

    #[test]
    fn on_off_literals() {
        assert_eq!("on".parse::<OnOff>(), Ok(OnOff::On));
        assert_eq!("OFF".parse::<OnOff>(), Ok(OnOff::Off));
        assert_matches!("On".parse::<OnOff>(), Err(Error::InvalidOnOff(..)));
        assert_matches!("maybe".parse::<OnOff>(), Err(Error::InvalidOnOff(..)));
        assert_eq!(OnOff::from(true), OnOff::On);
        assert!(bool::from(OnOff::On));
    }

    #[test]
    fn display_filter_time() {
        for value in DISPLAY_FILTER_TIMES {
            assert_eq!(check_display_filter_time(value), Ok(value));
        }
        assert_matches!(check_display_filter_time(3.0), Err(Error::InvalidFilterTime(..)));
        assert_matches!(check_display_filter_time(128.0), Err(Error::InvalidFilterTime(..)));
    }

    #[test]
    fn finite_numbers() {
        assert_eq!(check_finite(-273.15), Ok(-273.15));
        assert_matches!(check_finite(f64::NAN), Err(Error::NotFinite(..)));
        assert_matches!(check_finite(f64::INFINITY), Err(Error::NotFinite(..)));
        assert_matches!(check_finite(f64::NEG_INFINITY), Err(Error::NotFinite(..)));
    }

    #[test]
    fn names() {
        assert_eq!(check_name("Sample stage"), Ok("Sample stage"));
        assert_matches!(check_name("a\"b"), Err(Error::InvalidName(..)));
        assert_matches!(check_name("a;b"), Err(Error::InvalidName(..)));
    }
}
