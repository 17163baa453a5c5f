use anyhow::Context;
use cryocon_lib::{
    client::DEFAULT_RETRY_SUPPRESSION,
    connection::ConnectionUrl,
    protocol::{self as proto, ChannelId, LoopId},
};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// `tcp://host[:port]` or `serial://device`
    pub url: ConnectionUrl,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelId>,
    #[serde(default = "default_loops")]
    pub loops: Vec<LoopId>,
    #[serde(default = "default_retry_suppression", with = "humantime_serde")]
    pub retry_suppression: Duration,
    #[serde(default = "default_poll_rate", with = "humantime_serde")]
    pub poll_rate: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_baud_rate() -> u32 {
    proto::DEFAULT_BAUD_RATE
}

fn default_channels() -> Vec<ChannelId> {
    ChannelId::ALL.to_vec()
}

fn default_loops() -> Vec<LoopId> {
    LoopId::all().collect()
}

fn default_retry_suppression() -> Duration {
    DEFAULT_RETRY_SUPPRESSION
}

fn default_poll_rate() -> Duration {
    Duration::from_secs(2)
}

impl Config {
    pub const DEFAULT_CONFIG_FILE: &'static str = "cryocon.yml";

    pub fn load(path: &Path) -> anyhow::Result<Config> {
        log::debug!("Loading config file from {path:?}");
        let config_file =
            File::open(path).with_context(|| format!("Cannot open config file {path:?}"))?;
        let config: Config = serde_yaml::from_reader(&config_file)
            .with_context(|| format!("Invalid config file {path:?}"))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config() {
        let config: Config = serde_yaml::from_str("url: tcp://192.168.1.20\n").unwrap();
        assert_eq!(
            config.url,
            ConnectionUrl::Tcp {
                host: "192.168.1.20".into(),
                port: proto::DEFAULT_TCP_PORT
            }
        );
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.channels.len(), 4);
        assert_eq!(config.loops.len(), 4);
        assert_eq!(config.retry_suppression, DEFAULT_RETRY_SUPPRESSION);
    }

    #[test]
    fn full_config() {
        let yaml = "\
url: serial:///dev/ttyS1
timeout: 500ms
baud_rate: 19200
channels: [A, C]
loops: [1]
retry_suppression: 5s
poll_rate: 1m
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.url,
            ConnectionUrl::Serial {
                device: "/dev/ttyS1".into()
            }
        );
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.channels, vec![ChannelId::A, ChannelId::C]);
        assert_eq!(config.loops, vec![LoopId::try_from(1u8).unwrap()]);
        assert_eq!(config.retry_suppression, Duration::from_secs(5));
        assert_eq!(config.poll_rate, Duration::from_secs(60));
    }

    #[test]
    fn invalid_loop() {
        assert!(serde_yaml::from_str::<Config>("url: tcp://host\nloops: [5]\n").is_err());
    }
}
