#![allow(dead_code)]
use bytes::BytesMut;
use rumqttc::mqttbytes::v4::{
    self, ConnAck, ConnectReturnCode, Packet, PingResp, PubAck, PubComp, PubRec,
};
use rumqttc::mqttbytes::{self, QoS};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const IO_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_PACKET_SIZE: usize = 1 << 24;

/// One PUBLISH as the broker saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Everything one client session did.
#[derive(Debug, Default)]
pub struct Session {
    pub received: Vec<Received>,
    /// Packets that arrived while an acknowledgment was being held back.
    pub early: usize,
    /// The client ended with DISCONNECT rather than just closing the socket.
    pub disconnected: bool,
}

/// MQTT 3.1.1 broker for a single client connection, built on rumqttc's
/// packet codec.
///
/// Accepts CONNECT, acknowledges PUBLISH at every QoS level (PUBACK, or
/// PUBREC then PUBCOMP), answers PINGREQ and stops on DISCONNECT or EOF.
pub struct TestBroker {
    port: u16,
    handle: JoinHandle<io::Result<Session>>,
}

impl TestBroker {
    pub fn start() -> Self {
        Self::with_ack_delay(Duration::ZERO)
    }

    /// Hold every PUBACK and PUBCOMP back for `delay`, counting anything the
    /// client sends in the meantime as `Session::early`.
    pub fn with_ack_delay(delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let stream = accept(&listener)?;
            serve(stream, delay)
        });
        TestBroker { port, handle }
    }

    pub fn port(&self) -> String {
        self.port.to_string()
    }

    /// Wait for the client session to end and return what it did.
    pub fn finish(self) -> Session {
        self.handle.join().unwrap().unwrap()
    }
}

/// Port with nothing listening on it.
pub fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port().to_string()
}

fn accept(listener: &TcpListener) -> io::Result<TcpStream> {
    listener.set_nonblocking(true)?;
    let deadline = Instant::now() + IO_TIMEOUT;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                return Ok(stream);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock && Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => return Err(e),
        }
    }
}

fn codec_error(e: mqttbytes::Error) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, e)
}

struct Conn {
    stream: TcpStream,
    buf: BytesMut,
}

impl Conn {
    /// Next complete packet, or `None` once the client closes the socket.
    fn next_packet(&mut self) -> io::Result<Option<Packet>> {
        loop {
            match v4::read(&mut self.buf, MAX_PACKET_SIZE) {
                Ok(packet) => return Ok(Some(packet)),
                Err(mqttbytes::Error::InsufficientBytes(_)) => {
                    let mut chunk = [0u8; 4096];
                    let n = match self.stream.read(&mut chunk) {
                        Ok(n) => n,
                        Err(e) if e.kind() == ErrorKind::ConnectionReset => 0,
                        Err(e) => return Err(e),
                    };
                    if n == 0 {
                        return Ok(None);
                    }
                    self.buf.extend_from_slice(&chunk[..n]);
                }
                Err(e) => return Err(codec_error(e)),
            }
        }
    }

    fn send(
        &mut self,
        write: impl FnOnce(&mut BytesMut) -> Result<usize, mqttbytes::Error>,
    ) -> io::Result<()> {
        let mut out = BytesMut::new();
        write(&mut out).map_err(codec_error)?;
        self.stream.write_all(&out)
    }

    /// Sleep for `delay`; true if the client sent nothing in that window.
    fn quiet_for(
        &mut self,
        delay: Duration,
    ) -> io::Result<bool> {
        if delay.is_zero() {
            return Ok(true);
        }
        let already_buffered = !self.buf.is_empty();
        thread::sleep(delay);
        self.stream.set_nonblocking(true)?;
        let mut chunk = [0u8; 4096];
        let read = self.stream.read(&mut chunk);
        self.stream.set_nonblocking(false)?;
        let arrived = match read {
            Ok(0) => true,
            Ok(n) => {
                self.buf.extend_from_slice(&chunk[..n]);
                true
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) => return Err(e),
        };
        Ok(!already_buffered && !arrived)
    }
}

fn serve(
    stream: TcpStream,
    ack_delay: Duration,
) -> io::Result<Session> {
    stream.set_read_timeout(Some(IO_TIMEOUT))?;
    let mut conn = Conn {
        stream,
        buf: BytesMut::new(),
    };
    let mut session = Session::default();
    while let Some(packet) = conn.next_packet()? {
        match packet {
            Packet::Connect(_) => {
                conn.send(|b| ConnAck::new(ConnectReturnCode::Success, false).write(b))?
            }
            Packet::Publish(publish) => {
                let pkid = publish.pkid;
                let qos = publish.qos;
                session.received.push(Received {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                    qos,
                    retain: publish.retain,
                });
                match qos {
                    QoS::AtMostOnce => {}
                    QoS::AtLeastOnce => {
                        if !conn.quiet_for(ack_delay)? {
                            session.early += 1;
                        }
                        conn.send(|b| PubAck::new(pkid).write(b))?;
                    }
                    QoS::ExactlyOnce => conn.send(|b| PubRec::new(pkid).write(b))?,
                }
            }
            Packet::PubRel(rel) => {
                if !conn.quiet_for(ack_delay)? {
                    session.early += 1;
                }
                conn.send(|b| PubComp::new(rel.pkid).write(b))?;
            }
            Packet::PingReq => conn.send(|b| PingResp.write(b))?,
            Packet::Disconnect => {
                session.disconnected = true;
                break;
            }
            _ => {}
        }
    }
    Ok(session)
}
