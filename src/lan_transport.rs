use crate::transport::{LineChannel, Transport, TransportError};
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Settings for an Ethernet-to-serial converter sitting in front of a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanSettings {
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub reply_timeout: Duration,
    pub terminator: String,
}

impl LanSettings {
    pub const DEFAULT_TCP_PORT: u16 = 5000;

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl Default for LanSettings {
    fn default() -> Self {
        Self {
            port: Self::DEFAULT_TCP_PORT,
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(100),
            reply_timeout: Duration::from_secs(1),
            terminator: "\r\n".to_string(),
        }
    }
}

/// Serial line tunnelled through a TCP socket.
#[derive(Debug)]
pub struct LanTransport {
    host: String,
    channel: LineChannel<TcpStream>,
}

impl LanTransport {
    pub fn connect(host: &str, settings: &LanSettings) -> Result<Self, TransportError> {
        let address = (host, settings.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("could not resolve {}", host),
                )
            })?;

        let stream = TcpStream::connect_timeout(&address, settings.connect_timeout).map_err(|e| {
            log::error!("could not connect to {}: {}", address, e);
            e
        })?;
        stream.set_read_timeout(Some(settings.read_timeout))?;
        stream.set_nodelay(true)?;

        log::debug!("Connected to serial bridge at {}", address);
        Ok(Self {
            host: host.to_string(),
            channel: LineChannel::new(stream, &settings.terminator, settings.reply_timeout),
        })
    }
}

impl Transport for LanTransport {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        self.channel.write(command)
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.channel.query(command)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        log::debug!("Closing connection to serial bridge {}", self.host);
        if let Some(stream) = self.channel.stream_mut() {
            if let Err(e) = stream.shutdown(std::net::Shutdown::Both) {
                log::debug!("Socket shutdown failed: {}", e);
            }
        }
        self.channel.close()
    }
}
