use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use cryocon_lib::{attribute::Attribute, protocol as proto};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

fn parse_attribute(s: &str) -> Result<Attribute, String> {
    s.parse::<Attribute>().map_err(|e| e.to_string())
}

fn parse_channel(s: &str) -> Result<proto::ChannelId, String> {
    s.parse::<proto::ChannelId>().map_err(|e| e.to_string())
}

fn parse_loop(s: &str) -> Result<proto::LoopId, String> {
    let number = s
        .parse::<u8>()
        .map_err(|e| format!("Invalid loop number format: {e}"))?;
    proto::LoopId::try_from(number).map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliConnection {
    /// Connect to a controller via its ethernet interface.
    Tcp {
        /// The IP address or hostname of the controller, optionally with a port.
        /// Example: "192.168.1.20" or "cryocon.lab:5000".
        #[clap(verbatim_doc_comment)]
        address: String,

        /// Commands for the connected controller.
        #[command(subcommand)]
        command: CliCommands,
    },
    /// Connect to a controller via its RS-232 port.
    Serial {
        /// Serial port device name.
        /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
        #[arg(short, long, default_value_t = default_device_name(), verbatim_doc_comment)]
        device: String,

        /// Baud rate for serial communication.
        /// Must match the rate configured on the controller.
        #[arg(long, default_value_t = proto::DEFAULT_BAUD_RATE, verbatim_doc_comment)]
        baud_rate: u32,

        /// Commands for the connected controller.
        #[command(subcommand)]
        command: CliCommands,
    },
    /// Connect as described in a YAML configuration file.
    Config {
        /// The configuration file.
        #[arg(short, long, default_value = Config::DEFAULT_CONFIG_FILE)]
        file: PathBuf,

        /// Commands for the connected controller.
        #[command(subcommand)]
        command: CliCommands,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Run in daemon mode: continuously poll attributes and print them to the console.
    #[clap(verbatim_doc_comment)]
    Daemon {
        /// Interval for polling (e.g., "10s", "1m").
        /// Defaults to the poll rate of the configuration file, or 2 seconds.
        #[arg(value_parser = humantime::parse_duration, short, long, verbatim_doc_comment)]
        poll_interval: Option<Duration>,

        /// Attributes to poll. Defaults to the temperatures, the main loop
        /// settings and the control state.
        #[arg(value_parser = parse_attribute, verbatim_doc_comment)]
        attributes: Vec<Attribute>,
    },

    /// Read and display the identification of the controller.
    Idn,

    /// Read and display whether control is running and the front panel is locked.
    Status,

    /// Read and display several attributes in as few round trips as possible.
    /// Defaults to the temperatures, the main loop settings and the control state.
    #[clap(verbatim_doc_comment)]
    Read {
        /// Attribute names, e.g. "channela", "loop1setpoint", "control".
        #[arg(value_parser = parse_attribute, verbatim_doc_comment)]
        attributes: Vec<Attribute>,
    },

    /// Read and display one attribute.
    Get {
        /// Attribute name, e.g. "channelbunit".
        #[arg(value_parser = parse_attribute)]
        attribute: Attribute,
    },

    /// Write one attribute.
    /// Set point, output power and range are verified by reading them back.
    #[clap(verbatim_doc_comment)]
    Set {
        /// Attribute name, e.g. "loop1setpoint".
        #[arg(value_parser = parse_attribute)]
        attribute: Attribute,

        /// The new value. Switches take "on" or "off", dates "YYYY-MM-DD",
        /// times "HH:MM:SS".
        #[clap(verbatim_doc_comment)]
        value: String,
    },

    /// Start the control loops.
    On,

    /// Stop the control loops.
    /// **Warning:** Heater outputs are switched off.
    #[clap(verbatim_doc_comment)]
    Off {
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Send a raw command and display the raw reply.
    Run {
        /// Command text without line terminator, e.g. ":INPUT A:TEMP?".
        command: String,
    },
}

const fn about_text() -> &'static str {
    "Cryo-con CLI - Interact with Cryo-con temperature controllers via TCP or serial line."
}

#[derive(Parser, Debug)]
#[command(name="cryocon", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is warnings.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Specifies the connection method and controller commands.
    #[command(subcommand)]
    pub connection: CliConnection,

    /// I/O timeout for connecting and for every read and write.
    /// Examples: "1s", "500ms".
    #[arg(global = true, long, default_value = "1s", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Duration,

    /// Channels managed by this client, comma separated.
    /// Example: "A,B".
    #[arg(global = true, long, value_delimiter = ',', value_parser = parse_channel, verbatim_doc_comment)]
    pub channels: Option<Vec<proto::ChannelId>>,

    /// Loops managed by this client, comma separated.
    /// Example: "1,2".
    #[arg(global = true, long, value_delimiter = ',', value_parser = parse_loop, verbatim_doc_comment)]
    pub loops: Option<Vec<proto::LoopId>>,
}
