use crate::config::Config;
use crate::constants::PUBLISH_OVERHEAD;
use anyhow::{Context, Result, anyhow};
use rumqttc::{Client, Connection, Event, MqttOptions, Outgoing, Packet, QoS};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace};

/// rumqttc's own default for both directions.
const DEFAULT_MAX_PACKET_SIZE: usize = 10 * 1024;
const REQUEST_CAPACITY: usize = 10;

/// A broker connection that publishes one message at a time.
pub trait Transport {
    /// Publish `payload` to `topic` and block until delivery is acknowledged
    /// at the given QoS level.
    fn publish(
        &mut self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<()>;

    /// Tear the connection down.
    fn disconnect(self) -> Result<()>;
}

#[derive(Debug)]
pub enum TransportError {
    /// The network loop reported an error (refused, reset, protocol violation).
    Connection(String),
    /// The network loop stopped before the awaited acknowledgment arrived.
    Closed,
}

impl std::fmt::Display for TransportError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            TransportError::Connection(reason) => write!(f, "MQTT connection error: {reason}"),
            TransportError::Closed => write!(f, "MQTT network loop stopped unexpectedly"),
        }
    }
}

impl std::error::Error for TransportError {}

/// What the network thread reports back to the publishing thread.
#[derive(Debug)]
enum Notice {
    Connected,
    /// PUBLISH written to the socket, with its packet id (0 for QoS 0).
    Sent(u16),
    PubAck(u16),
    PubComp(u16),
    Disconnected,
    Failed(String),
}

/// MQTT transport backed by a rumqttc client whose event loop runs on a
/// dedicated thread.
pub struct MqttTransport {
    client: Client,
    notices: Receiver<Notice>,
    network: JoinHandle<()>,
}

impl MqttTransport {
    /// Connect to the configured broker and block until it accepts the session.
    pub fn connect(config: &Config) -> Result<Self> {
        let mut options =
            MqttOptions::new(config.client_id.as_str(), config.host.as_str(), config.port);
        options
            .set_keep_alive(config.keep_alive)
            .set_clean_session(true)
            .set_max_packet_size(DEFAULT_MAX_PACKET_SIZE, max_packet_size(config));

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let (tx, rx) = mpsc::channel();
        let network = thread::Builder::new()
            .name("mqtt-network".into())
            .spawn(move || drive(connection, tx))
            .context("failed to start MQTT network thread")?;

        let transport = MqttTransport {
            client,
            notices: rx,
            network,
        };
        transport
            .wait_for(|n| matches!(n, Notice::Connected).then_some(()))
            .with_context(|| {
                format!(
                    "failed to connect to MQTT broker {}:{}",
                    config.host, config.port
                )
            })?;
        info!(host = %config.host, port = config.port, client_id = %config.client_id, "connected");
        Ok(transport)
    }

    /// Block until the network thread reports a notice `pick` accepts.
    /// Connection failures end the wait with an error.
    fn wait_for<T>(
        &self,
        pick: impl Fn(&Notice) -> Option<T>,
    ) -> Result<T> {
        loop {
            let notice = self
                .notices
                .recv()
                .map_err(|_| anyhow!(TransportError::Closed))?;
            if let Some(found) = pick(&notice) {
                return Ok(found);
            }
            match notice {
                Notice::Failed(reason) => return Err(anyhow!(TransportError::Connection(reason))),
                Notice::Disconnected => return Err(anyhow!(TransportError::Closed)),
                other => trace!(?other, "skipping notice"),
            }
        }
    }
}

impl Transport for MqttTransport {
    fn publish(
        &mut self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<()> {
        let len = payload.len();
        self.client
            .publish(topic, qos, retain, payload)
            .with_context(|| format!("failed to queue publish to {topic}"))?;
        let pkid = self.wait_for(|n| match n {
            Notice::Sent(pkid) => Some(*pkid),
            _ => None,
        })?;
        match qos {
            QoS::AtMostOnce => {}
            QoS::AtLeastOnce => {
                self.wait_for(|n| matches!(n, Notice::PubAck(id) if *id == pkid).then_some(()))?
            }
            QoS::ExactlyOnce => {
                self.wait_for(|n| matches!(n, Notice::PubComp(id) if *id == pkid).then_some(()))?
            }
        }
        debug!(topic, len, pkid, "delivered");
        Ok(())
    }

    fn disconnect(self) -> Result<()> {
        self.client
            .disconnect()
            .context("failed to request MQTT disconnect")?;
        self.wait_for(|n| matches!(n, Notice::Disconnected).then_some(()))?;
        self.network
            .join()
            .map_err(|_| anyhow!("MQTT network thread panicked"))?;
        debug!("disconnected");
        Ok(())
    }
}

/// Largest outgoing PUBLISH this run can produce, never below rumqttc's
/// default. Saturates for block sizes near `usize::MAX`.
fn max_packet_size(config: &Config) -> usize {
    let topic_len = config.topic.as_str().len() + usize::MAX.to_string().len();
    config
        .block_size
        .get()
        .saturating_add(topic_len)
        .saturating_add(PUBLISH_OVERHEAD)
        .max(DEFAULT_MAX_PACKET_SIZE)
}

/// Network loop: drives the rumqttc connection and forwards the events the
/// publisher waits on. Stops after DISCONNECT goes out or on the first error.
fn drive(
    mut connection: Connection,
    notices: Sender<Notice>,
) {
    for event in connection.iter() {
        let notice = match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => Notice::Connected,
            Ok(Event::Incoming(Packet::PubAck(ack))) => Notice::PubAck(ack.pkid),
            Ok(Event::Incoming(Packet::PubComp(comp))) => Notice::PubComp(comp.pkid),
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => Notice::Sent(pkid),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                let _ = notices.send(Notice::Disconnected);
                return;
            }
            Ok(event) => {
                trace!(?event, "mqtt event");
                continue;
            }
            Err(e) => {
                let _ = notices.send(Notice::Failed(e.to_string()));
                return;
            }
        };
        if notices.send(notice).is_err() {
            return;
        }
    }
}
