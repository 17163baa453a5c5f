//! Wire command construction.
//!
//! All instrument mnemonics live in this module. A query reads
//! `:<SECTION> <id>:<FIELD>?`, a set `:<SECTION> <id>:<FIELD> <value>`, and
//! system wide members drop the section and id. Sub-commands are joined with
//! `;` and the request is terminated by a newline.

use crate::protocol::{ChannelId, LoopId, SEPARATOR};

/// Starts the control loops.
pub const CONTROL_VERB: &str = "CONTROL";
/// Stops the control loops.
pub const STOP_VERB: &str = "STOP";

/// Line terminator appended to every request.
pub const TERMINATOR: char = '\n';

/// Where a member lives on the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Input(ChannelId),
    Loop(LoopId),
    System,
}

impl Section {
    fn prefix(self) -> String {
        match self {
            Section::Input(id) => format!(":INPUT {id}:"),
            Section::Loop(id) => format!(":LOOP {id}:"),
            Section::System => String::from(":"),
        }
    }
}

/// Members of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelField {
    Temperature,
    Unit,
    Name,
    Variance,
    Slope,
    Alarm,
    Minimum,
    Maximum,
}

impl ChannelField {
    pub const ALL: [ChannelField; 8] = [
        ChannelField::Temperature,
        ChannelField::Unit,
        ChannelField::Name,
        ChannelField::Variance,
        ChannelField::Slope,
        ChannelField::Alarm,
        ChannelField::Minimum,
        ChannelField::Maximum,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            ChannelField::Temperature => "TEMP",
            ChannelField::Unit => "UNIT",
            ChannelField::Name => "NAM",
            ChannelField::Variance => "VARI",
            ChannelField::Slope => "SLOP",
            ChannelField::Alarm => "ALAR",
            ChannelField::Minimum => "MIN",
            ChannelField::Maximum => "MAX",
        }
    }
}

/// Members of a control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopField {
    Source,
    Type,
    SetPoint,
    Rate,
    OutputPower,
    Range,
    ProportionalGain,
    IntegratorGain,
    DifferentiatorGain,
    Ramp,
    Load,
    MaxOutputPower,
    MaxSetPoint,
    ManualPower,
    VoltageSense,
    CurrentSense,
    ResistanceSense,
    TemperatureSense,
    AutotuneStatus,
}

impl LoopField {
    pub const ALL: [LoopField; 19] = [
        LoopField::Source,
        LoopField::Type,
        LoopField::SetPoint,
        LoopField::Rate,
        LoopField::OutputPower,
        LoopField::Range,
        LoopField::ProportionalGain,
        LoopField::IntegratorGain,
        LoopField::DifferentiatorGain,
        LoopField::Ramp,
        LoopField::Load,
        LoopField::MaxOutputPower,
        LoopField::MaxSetPoint,
        LoopField::ManualPower,
        LoopField::VoltageSense,
        LoopField::CurrentSense,
        LoopField::ResistanceSense,
        LoopField::TemperatureSense,
        LoopField::AutotuneStatus,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            LoopField::Source => "SOURCE",
            LoopField::Type => "TYP",
            LoopField::SetPoint => "SETPT",
            LoopField::Rate => "RATE",
            LoopField::OutputPower => "OUTPWR",
            LoopField::Range => "RANGE",
            LoopField::ProportionalGain => "PGAIN",
            LoopField::IntegratorGain => "IGAIN",
            LoopField::DifferentiatorGain => "DGAIN",
            LoopField::Ramp => "RAMP",
            LoopField::Load => "LOAD",
            LoopField::MaxOutputPower => "MAXPWR",
            LoopField::MaxSetPoint => "MAXSET",
            LoopField::ManualPower => "PMANUAL",
            LoopField::VoltageSense => "VSENSE",
            LoopField::CurrentSense => "ISENSE",
            LoopField::ResistanceSense => "RSENSE",
            LoopField::TemperatureSense => "TSENSE",
            LoopField::AutotuneStatus => "AUTOTUNE:STATUS",
        }
    }
}

/// Instrument wide members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemField {
    Idn,
    Name,
    HwRevision,
    FwRevision,
    Control,
    Lockout,
    Led,
    DisplayFilterTime,
    Date,
    Time,
}

impl SystemField {
    pub const ALL: [SystemField; 10] = [
        SystemField::Idn,
        SystemField::Name,
        SystemField::HwRevision,
        SystemField::FwRevision,
        SystemField::Control,
        SystemField::Lockout,
        SystemField::Led,
        SystemField::DisplayFilterTime,
        SystemField::Date,
        SystemField::Time,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            SystemField::Idn => "*IDN",
            SystemField::Name => "SYSTEM:NAME",
            SystemField::HwRevision => "SYSTEM:HWREV",
            SystemField::FwRevision => "SYSTEM:FWREV",
            SystemField::Control => "CONTROL",
            SystemField::Lockout => "SYSTEM:LOCKOUT",
            SystemField::Led => "SYSTEM:REMLED",
            SystemField::DisplayFilterTime => "SYSTEM:DISTC",
            SystemField::Date => "SYSTEM:DATE",
            SystemField::Time => "SYSTEM:TIME",
        }
    }
}

/// Builds `:<SECTION> <id>:<FIELD>?`.
pub fn query(section: Section, field: &str) -> String {
    format!("{}{field}?", section.prefix())
}

/// Builds `:<SECTION> <id>:<FIELD> <value>`.
pub fn set(section: Section, field: &str, value: &str) -> String {
    format!("{}{field} {value}", section.prefix())
}

/// Joins sub-commands into a single request.
pub fn join<I, S>(commands: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut request = String::new();
    for command in commands {
        if !request.is_empty() {
            request.push(SEPARATOR);
        }
        request.push_str(command.as_ref());
    }
    request
}

/// Set-then-get request. The reply is the value after the write, with no
/// other request in between.
pub fn compound(section: Section, field: &str, value: &str) -> String {
    join([set(section, field, value), query(section, field)])
}

/// Number of reply segments a request yields: one per query.
pub fn expected_replies(request: &str) -> usize {
    request
        .split(SEPARATOR)
        .filter(|command| command.trim_end().ends_with('?'))
        .count()
}

/// Appends the line terminator.
pub fn terminate(request: &str) -> String {
    let mut line = String::with_capacity(request.len() + 1);
    line.push_str(request);
    line.push(TERMINATOR);
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loop_1() -> LoopId {
        LoopId::try_from(1u8).unwrap()
    }

    #[test]
    fn queries() {
        assert_eq!(
            query(Section::Input(ChannelId::A), ChannelField::Temperature.mnemonic()),
            ":INPUT A:TEMP?"
        );
        assert_eq!(
            query(Section::Loop(loop_1()), LoopField::SetPoint.mnemonic()),
            ":LOOP 1:SETPT?"
        );
        assert_eq!(
            query(Section::System, SystemField::Idn.mnemonic()),
            ":*IDN?"
        );
        assert_eq!(
            query(Section::System, SystemField::Lockout.mnemonic()),
            ":SYSTEM:LOCKOUT?"
        );
    }

    #[test]
    fn sets() {
        assert_eq!(
            set(Section::Input(ChannelId::B), ChannelField::Name.mnemonic(), "\"Stage\""),
            ":INPUT B:NAM \"Stage\""
        );
        assert_eq!(
            set(Section::System, SystemField::DisplayFilterTime.mnemonic(), "0.5"),
            ":SYSTEM:DISTC 0.5"
        );
    }

    #[test]
    fn compound_is_set_then_get() {
        assert_eq!(
            compound(Section::Loop(loop_1()), LoopField::Range.mnemonic(), "LOW"),
            ":LOOP 1:RANGE LOW;:LOOP 1:RANGE?"
        );
    }

    #[test]
    fn reply_prediction() {
        assert_eq!(expected_replies(":INPUT A:TEMP?;:INPUT B:TEMP?"), 2);
        assert_eq!(expected_replies(":LOOP 1:SETPT 5;:LOOP 1:SETPT?"), 1);
        assert_eq!(expected_replies(":SYSTEM:LOCKOUT ON"), 0);
        assert_eq!(expected_replies("STOP;:CONTROL?"), 1);
    }

    #[test]
    fn termination() {
        assert_eq!(terminate(":*IDN?"), ":*IDN?\n");
        assert_eq!(join(Vec::<String>::new()), "");
        assert_eq!(join(["CONTROL", ":CONTROL?"]), "CONTROL;:CONTROL?");
    }
}
