//! Cryo-con CLI
//!
//! A command-line interface (CLI) application for interacting with Cryo-con
//! temperature controllers over their ethernet interface or RS-232 port.
//!
//! This tool allows users to:
//! - Read the identification and the control state of a controller.
//! - Read any channel, loop or system attribute, several at once in few round trips.
//! - Write attributes, with read back verification of set points, output power and range.
//! - Start and stop the control loops.
//! - Send raw commands.
//! - Run in a continuous daemon mode to poll attributes and print them to the console.
//!
//! The CLI leverages the `cryocon_lib` crate for protocol definitions and client operations.

use anyhow::{Context, Result};
use clap::Parser;
use cryocon_lib::{
    attribute::Attribute,
    client::CryoCon,
    connection::{self, ConnectionUrl},
    protocol as proto,
    transport::Transport,
};
use dialoguer::Confirm;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::{panic, time::Duration};

mod commandline;
mod config;

type Client = CryoCon<Box<dyn Transport + Send>>;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0));

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// Connection settings merged from the command line and the configuration file.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    url: ConnectionUrl,
    timeout: Duration,
    baud_rate: u32,
    channels: Vec<proto::ChannelId>,
    loops: Vec<proto::LoopId>,
    retry_suppression: Duration,
    poll_rate: Duration,
}

impl Settings {
    fn from_args(args: &commandline::CliArgs) -> Result<(Settings, &commandline::CliCommands)> {
        let defaults = |url: ConnectionUrl, baud_rate: u32| Settings {
            url,
            timeout: args.timeout,
            baud_rate,
            channels: proto::ChannelId::ALL.to_vec(),
            loops: proto::LoopId::all().collect(),
            retry_suppression: cryocon_lib::client::DEFAULT_RETRY_SUPPRESSION,
            poll_rate: Duration::from_secs(2),
        };
        let (mut settings, command) = match &args.connection {
            commandline::CliConnection::Tcp { address, command } => {
                let url = format!("tcp://{address}")
                    .parse::<ConnectionUrl>()
                    .with_context(|| format!("Invalid TCP address format: '{address}'"))?;
                (defaults(url, proto::DEFAULT_BAUD_RATE), command)
            }
            commandline::CliConnection::Serial {
                device,
                baud_rate,
                command,
            } => {
                let url = ConnectionUrl::Serial {
                    device: device.clone(),
                };
                (defaults(url, *baud_rate), command)
            }
            commandline::CliConnection::Config { file, command } => {
                let config = config::Config::load(file)?;
                let settings = Settings {
                    url: config.url,
                    timeout: config.timeout,
                    baud_rate: config.baud_rate,
                    channels: config.channels,
                    loops: config.loops,
                    retry_suppression: config.retry_suppression,
                    poll_rate: config.poll_rate,
                };
                (settings, command)
            }
        };
        if let Some(channels) = &args.channels {
            settings.channels = channels.clone();
        }
        if let Some(loops) = &args.loops {
            settings.loops = loops.clone();
        }
        Ok((settings, command))
    }

    fn connect(&self) -> Result<Client> {
        info!("Attempting to connect to {}...", self.url);
        let transport = connection::open(&self.url, self.timeout, self.baud_rate)
            .with_context(|| format!("Failed to connect to controller at {}", self.url))?;
        Ok(CryoCon::new(transport)
            .with_channels(self.channels.iter().copied())
            .with_loops(self.loops.iter().copied())
            .with_retry_suppression(self.retry_suppression))
    }
}

/// The attributes to read when none are given.
fn attributes_or_polled(client: &Client, attributes: &[Attribute]) -> Vec<Attribute> {
    if attributes.is_empty() {
        Attribute::polled(client.channels(), client.loops())
    } else {
        attributes.to_vec()
    }
}

fn print_attributes(client: &mut Client, attributes: &[Attribute]) -> Result<()> {
    let values = client
        .read_attributes(attributes)
        .with_context(|| "Cannot read attributes")?;
    for (attribute, value) in values {
        println!("{attribute}: {value}");
    }
    Ok(())
}

fn handle_set(client: &mut Client, attribute: Attribute, value: &str) -> Result<()> {
    info!("Executing: Set {attribute} to {value}");
    let value = attribute
        .parse_value(value)
        .with_context(|| format!("Invalid value '{value}' for {attribute}"))?;
    client
        .set(attribute, &value)
        .with_context(|| format!("Failed to set {attribute} to {value}"))?;
    let read_back = client
        .get(attribute)
        .with_context(|| format!("Cannot read back {attribute}"))?;
    println!("{attribute} set to {read_back} successfully.");
    Ok(())
}

fn handle_off(client: &mut Client, yes: bool) -> Result<()> {
    info!("Executing: Stop control");
    if !yes
        && !Confirm::new()
            .with_prompt("Stopping control switches the heater outputs off. Continue?")
            .default(false)
            .show_default(true)
            .interact()
            .context("Failed to get user confirmation.")?
    {
        info!("Stop aborted by user.");
        return Ok(());
    }
    client.off().with_context(|| "Failed to stop control")?;
    println!("Control stopped.");
    Ok(())
}

fn run_daemon(client: &mut Client, poll_interval: Duration, attributes: &[Attribute]) -> ! {
    info!("Starting daemon mode: interval={poll_interval:?}, attributes={attributes:?}");
    loop {
        debug!("Daemon: Reading attributes for stdout...");
        if let Err(error) = print_attributes(client, attributes) {
            error!("{error:#}");
        }
        std::thread::sleep(poll_interval);
    }
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    // 1. Initialize logging as early as possible
    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "Cryo-con CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    // 2. Connect
    let (settings, command_to_execute) = Settings::from_args(&args)?;
    let mut client = settings.connect()?;

    // 3. Execute the command
    match command_to_execute {
        commandline::CliCommands::Daemon {
            poll_interval,
            attributes,
        } => {
            let attributes = attributes_or_polled(&client, attributes);
            run_daemon(
                &mut client,
                poll_interval.unwrap_or(settings.poll_rate),
                &attributes,
            );
        }
        commandline::CliCommands::Idn => {
            info!("Executing: Read identification");
            let idn = client.idn().with_context(|| "Cannot read identification")?;
            println!("{idn}");
        }
        commandline::CliCommands::Status => {
            info!("Executing: Read status");
            let status = client.status().with_context(|| "Cannot read status")?;
            println!(
                "Control: {}, front panel lockout: {}",
                proto::OnOff::from(status.control),
                proto::OnOff::from(status.lockout)
            );
        }
        commandline::CliCommands::Read { attributes } => {
            info!("Executing: Read attributes");
            let attributes = attributes_or_polled(&client, attributes);
            print_attributes(&mut client, &attributes)?;
        }
        commandline::CliCommands::Get { attribute } => {
            info!("Executing: Get {attribute}");
            let value = client
                .get(*attribute)
                .with_context(|| format!("Cannot read {attribute}"))?;
            println!("{attribute}: {value}");
        }
        commandline::CliCommands::Set { attribute, value } => {
            handle_set(&mut client, *attribute, value)?;
        }
        commandline::CliCommands::On => {
            info!("Executing: Start control");
            client.on().with_context(|| "Failed to start control")?;
            println!("Control started.");
        }
        commandline::CliCommands::Off { yes } => {
            handle_off(&mut client, *yes)?;
        }
        commandline::CliCommands::Run { command } => {
            info!("Executing: Run '{command}'");
            let reply = client
                .run(command)
                .with_context(|| format!("Failed to run '{command}'"))?;
            println!("{reply}");
        }
    }

    client.close().with_context(|| "Failed to close connection")?;
    Ok(())
}
