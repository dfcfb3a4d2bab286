use crate::constants::{
    DEFAULT_BLOCK_SIZE, DEFAULT_CLIENT_ID, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_QOS, DEFAULT_TOPIC,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "suit-publish")]
#[command(
    about = "Publish a file block-wise to an MQTT topic, preceded by the block count.",
    after_help = "Tool for block-wise publishing of a file to an MQTT topic."
)]
pub struct Cli {
    /// Path of file to publish
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Block size in bytes
    #[arg(
        short = 's',
        long = "block-size",
        default_value_t = DEFAULT_BLOCK_SIZE,
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub block_size: u64,

    /// MQTT topic to publish to (prefix)
    #[arg(short = 't', long = "mqtt-topic", default_value = DEFAULT_TOPIC)]
    pub mqtt_topic: String,

    /// MQTT broker host name or IP address
    #[arg(short = 'b', long = "mqtt-host", default_value = DEFAULT_HOST)]
    pub mqtt_host: String,

    /// MQTT broker port
    #[arg(short = 'p', long = "mqtt-port", default_value_t = DEFAULT_PORT)]
    pub mqtt_port: u16,

    /// MQTT Quality of Service level
    #[arg(
        short = 'q',
        long = "mqtt-qos",
        default_value_t = DEFAULT_QOS,
        value_parser = clap::value_parser!(u8).range(0..=2),
    )]
    pub mqtt_qos: u8,

    /// Disable MQTT Retain flag
    #[arg(long = "mqtt-no-retain")]
    pub mqtt_no_retain: bool,

    /// MQTT Retain flag as 0 or 1; `-r0` disables it
    #[arg(
        short = 'r',
        value_name = "0|1",
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(0..=1),
    )]
    pub mqtt_retain: u8,

    /// MQTT client identifier
    #[arg(short = 'c', long = "client-id", default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,
}

impl Cli {
    /// Retain is on unless disabled by either spelling.
    pub fn retain(&self) -> bool {
        !self.mqtt_no_retain && self.mqtt_retain != 0
    }
}
