use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

/// Longest reply line accepted before the stream is considered garbage.
pub const MAX_REPLY_LEN: usize = 1024;

/// A synchronous command/response channel to a controller.
///
/// Every call is one blocking round trip; implementations are not expected
/// to be shared between threads without external locking.
pub trait Transport {
    /// Send a command that produces no reply.
    fn write(&mut self, command: &str) -> Result<(), TransportError>;

    /// Send a command and return its reply line, terminator stripped.
    fn query(&mut self, command: &str) -> Result<String, TransportError>;

    /// Release the underlying handle. Further calls fail with [`TransportError::Closed`].
    fn close(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        (**self).write(command)
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        (**self).query(command)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Timeout error: Expected terminator {expected:?} but got {actual:?}. Likely due to a timeout."
    )]
    Timeout { expected: String, actual: String },

    #[error("Reply exceeded {limit} bytes without a terminator")]
    ReplyTooLong { limit: usize },

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Connection is closed")]
    Closed,
}

/// Terminator-delimited ASCII framing over a byte stream.
///
/// The stream must have a short read timeout configured. The reply deadline
/// is checked after every read, and a line longer than [`MAX_REPLY_LEN`] is
/// abandoned.
#[derive(Debug)]
pub struct LineChannel<S> {
    stream: Option<S>,
    terminator: String,
    reply_timeout: Duration,
}

impl<S: Read + Write> LineChannel<S> {
    pub fn new(stream: S, terminator: &str, reply_timeout: Duration) -> Self {
        Self {
            stream: Some(stream),
            terminator: terminator.to_string(),
            reply_timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Access the raw stream, e.g. to flush driver buffers.
    pub fn stream_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    fn send(&mut self, command: &str) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let command_with_terminator = format!("{}{}", command, self.terminator);
        stream.write_all(command_with_terminator.as_bytes())?;
        stream.flush()?;
        Ok(())
    }

    fn read_reply(&mut self) -> Result<String, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let terminator = self.terminator.as_bytes();
        let mut response = Vec::new();
        let start = Instant::now();

        loop {
            let mut byte = [0u8; 1];
            match stream.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(_) => {
                    response.push(byte[0]);
                    if response.ends_with(terminator) {
                        break;
                    }
                    if response.len() > MAX_REPLY_LEN {
                        return Err(TransportError::ReplyTooLong {
                            limit: MAX_REPLY_LEN,
                        });
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e.into()),
            }

            if start.elapsed() >= self.reply_timeout {
                return Err(TransportError::Timeout {
                    expected: self.terminator.clone(),
                    actual: String::from_utf8_lossy(&response).to_string(),
                });
            }
        }

        response.truncate(response.len() - terminator.len());
        let response_str = String::from_utf8(response)?;
        Ok(response_str.trim().to_string())
    }
}

impl<S: Read + Write> Transport for LineChannel<S> {
    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        self.send(command)
    }

    fn query(&mut self, command: &str) -> Result<String, TransportError> {
        self.send(command)?;
        self.read_reply()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.stream = None;
        Ok(())
    }
}
