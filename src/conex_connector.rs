use crate::clock::SystemClock;
use crate::conex_axis::{ConexAxis, ConexError};
use crate::serial_transport::{SerialSettings, SerialTransport};
use crate::stage_config::AxisConfig;
use crate::transport::{Transport, TransportError};

#[derive(Debug, Clone)]
pub struct ConexDevice {
    pub port: String,
    pub product: Option<String>,
}

impl ConexDevice {
    pub fn new(port: String, product: Option<String>) -> Self {
        Self { port, product }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("Controller error: {0}")]
    Controller(#[from] ConexError),

    #[error("Device answered {reply:?}, which is not a CONEX-CC controller")]
    NotAConex { reply: String },

    #[error("No CONEX-CC controller found. Please connect one or specify the port manually")]
    DeviceNotFound,
}

pub struct ConexConnector;

impl ConexConnector {
    /// Connect to a CONEX-CC and build a ready-to-use axis.
    ///
    /// Without a port, every USB serial port is probed until one identifies
    /// as a CONEX-CC.
    pub fn connect(
        port: Option<&str>,
        velocity: f64,
    ) -> Result<ConexAxis<SerialTransport>, ConnectorError> {
        let config = AxisConfig::default();
        let settings = SerialSettings::conex_cc();

        let transport = if let Some(port) = port {
            log::debug!("Connecting to CONEX-CC on port {}", port);
            let mut transport = SerialTransport::open(port, &settings)?;
            let revision = Self::identify(&mut transport, config.controller_address)?;
            log::info!("Found {} on {}", revision, port);
            transport
        } else {
            Self::find_controller(&settings, config.controller_address)?
        };

        Ok(ConexAxis::new(transport, SystemClock, config, velocity)?)
    }

    /// Ask for the controller revision (`VE`) and check it names a CONEX-CC.
    pub fn identify<T: Transport>(transport: &mut T, address: u8) -> Result<String, ConnectorError> {
        let command = format!("{}VE", address);
        let reply = transport.query(&command)?;
        let revision = reply.strip_prefix(&command).map(str::trim).unwrap_or("");

        if revision.starts_with("CONEX-CC") {
            Ok(revision.to_string())
        } else {
            Err(ConnectorError::NotAConex { reply })
        }
    }

    /// List USB serial ports; a CONEX-CC enumerates as one.
    pub fn get_available_ports() -> Result<Vec<ConexDevice>, ConnectorError> {
        let devices = serialport::available_ports()?
            .into_iter()
            .filter_map(|port| match port.port_type {
                serialport::SerialPortType::UsbPort(info) => {
                    Some(ConexDevice::new(port.port_name, info.product))
                }
                _ => None,
            })
            .collect();
        Ok(devices)
    }

    fn find_controller(
        settings: &SerialSettings,
        address: u8,
    ) -> Result<SerialTransport, ConnectorError> {
        for device in Self::get_available_ports()? {
            log::debug!("Probing {} for a CONEX-CC", device.port);
            let mut transport = match SerialTransport::open(&device.port, settings) {
                Ok(transport) => transport,
                Err(e) => {
                    log::debug!("Cannot open {}: {}", device.port, e);
                    continue;
                }
            };

            match Self::identify(&mut transport, address) {
                Ok(revision) => {
                    log::info!("Found {} on {}", revision, device.port);
                    return Ok(transport);
                }
                Err(e) => log::debug!("{} is not a CONEX-CC: {}", device.port, e),
            }
        }
        Err(ConnectorError::DeviceNotFound)
    }
}
