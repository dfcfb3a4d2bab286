use anyhow::Result;
use std::io;
use suit_publish::{Config, MqttTransport, logging, publisher};

fn main() -> Result<()> {
    logging::init();
    let config = Config::from_cli()?;

    // Broker errors are fatal; a missing file is reported, then disconnected cleanly.
    let transport = MqttTransport::connect(&config)?;
    publisher::run(&config, transport, &mut io::stdout().lock())?;
    Ok(())
}
