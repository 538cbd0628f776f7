use crate::transport::{LineChannel, Transport, TransportError};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::time::Duration;

/// Line settings for a serial-attached controller.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Timeout of a single driver read; keep it short.
    pub read_timeout: Duration,
    /// Deadline for a complete reply line.
    pub reply_timeout: Duration,
    pub terminator: String,
}

impl SerialSettings {
    /// CONEX-CC virtual COM port: 921600 baud, 8N1, XON/XOFF, CR LF.
    pub fn conex_cc() -> Self {
        Self {
            baud_rate: 921_600,
            flow_control: FlowControl::Software,
            ..Self::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            read_timeout: Duration::from_millis(10),
            reply_timeout: Duration::from_secs(1),
            terminator: "\r\n".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct SerialTransport {
    port_name: String,
    channel: LineChannel<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open `port` and discard anything left in the driver buffers.
    pub fn open(port: &str, settings: &SerialSettings) -> Result<Self, TransportError> {
        let serial = serialport::new(port, settings.baud_rate)
            .data_bits(settings.data_bits)
            .parity(settings.parity)
            .stop_bits(settings.stop_bits)
            .flow_control(settings.flow_control)
            .timeout(settings.read_timeout)
            .open()?;

        let mut transport = Self {
            port_name: port.to_string(),
            channel: LineChannel::new(serial, &settings.terminator, settings.reply_timeout),
        };

        transport.flush()?;
        log::debug!(
            "Serial port {} opened at {} baud",
            transport.port_name,
            settings.baud_rate
        );
        Ok(transport)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Flush the serial buffers
    fn flush(&mut self) -> Result<(), TransportError> {
        let serial = self.channel.stream_mut().ok_or(TransportError::Closed)?;
        serial.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        self.channel.write(command)
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.channel.query(command)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        log::debug!("Closing serial port {}", self.port_name);
        self.channel.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conex_settings() {
        let settings = SerialSettings::conex_cc();
        assert_eq!(settings.baud_rate, 921_600);
        assert_eq!(settings.flow_control, FlowControl::Software);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.terminator, "\r\n");
    }

    #[test]
    fn test_baud_rate_override_keeps_conex_framing() {
        let settings = SerialSettings::conex_cc().with_baud_rate(115_200);
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.flow_control, FlowControl::Software);
        assert_eq!(settings.terminator, "\r\n");
    }

    #[test]
    fn test_default_settings_are_plain_9600_8n1() {
        let settings = SerialSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.flow_control, FlowControl::None);
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialTransport::open("/dev/this-port-does-not-exist", &SerialSettings::default());
        assert!(matches!(result, Err(TransportError::SerialPort(_))));
    }
}
