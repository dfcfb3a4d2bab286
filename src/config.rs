use crate::cli::Cli;
use crate::constants::KEEP_ALIVE_SECS;
use crate::topic::TopicPrefix;
use anyhow::{Context, Result, bail};
use clap::Parser;
use rumqttc::QoS;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct Config {
    pub file: PathBuf,
    pub block_size: NonZeroUsize,
    /// Normalized: always ends with the topic separator.
    pub topic: TopicPrefix,
    pub host: String,
    pub port: u16,
    pub qos: QoS,
    pub retain: bool,
    pub client_id: String,
    pub keep_alive: Duration,
}

impl Config {
    /// Parse CLI arguments into a Config
    pub fn from_cli() -> Result<Self> {
        Config::try_from(Cli::parse())
    }
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let retain = cli.retain();
        let block_size = usize::try_from(cli.block_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .with_context(|| format!("unsupported block size {}", cli.block_size))?;
        Ok(Config {
            file: cli.file,
            block_size,
            topic: TopicPrefix::new(&cli.mqtt_topic),
            host: cli.mqtt_host,
            port: cli.mqtt_port,
            qos: qos_from_level(cli.mqtt_qos)?,
            retain,
            client_id: cli.client_id,
            keep_alive: Duration::from_secs(KEEP_ALIVE_SECS),
        })
    }
}

pub fn qos_from_level(level: u8) -> Result<QoS> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        n => bail!("invalid MQTT QoS level {n}"),
    }
}
