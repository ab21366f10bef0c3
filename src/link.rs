use crate::alarm::Command;
use crate::config::LinkConfig;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::time::Duration;

// =========================================================================
// Actuator Link (serial channel to the alarm device)
// =========================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("failed to open {port}: {reason}")]
    Connect { port: String, reason: String },
    #[error("link is not connected")]
    NotConnected,
    #[error("link is faulted; reconnect before sending")]
    Faulted,
    #[error("serial I/O failed: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
    Faulted,
}

/// Whatever the device answered to a command. The core does not parse it
/// beyond "non-empty line = some response received".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub response: Option<String>,
}

/// Byte channel to the device. The production impl wraps a serial port;
/// tests substitute scripted transports.
pub trait Transport {
    /// Opens the channel. Must leave the device ready to accept commands
    /// before returning (the real device resets when the port opens and
    /// needs a settle delay).
    fn open(config: &LinkConfig) -> Result<Self, LinkError>
    where
        Self: Sized;

    /// Writes one newline-terminated token. Bounded by the configured
    /// send timeout.
    fn send_line(&mut self, token: &str) -> Result<(), LinkError>;

    /// Reads one response line, if the device sent one within the
    /// timeout. `None` means silence, which is not an error.
    fn recv_line(&mut self) -> Result<Option<String>, LinkError>;
}

/// Production transport over a real serial port.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl Transport for SerialTransport {
    fn open(config: &LinkConfig) -> Result<Self, LinkError> {
        // The connect timeout governs opening and settling; once the
        // link is up, I/O runs on the (usually shorter) send timeout.
        let mut port = serialport::new(&config.port, config.baud_rate)
            .timeout(Duration::from_millis(config.connect_timeout_ms))
            .open()
            .map_err(|e| LinkError::Connect {
                port: config.port.clone(),
                reason: e.to_string(),
            })?;

        // The device resets when the port opens (DTR toggle). Commands
        // sent before it finishes booting are silently lost.
        std::thread::sleep(Duration::from_millis(config.settle_delay_ms));

        port.set_timeout(Duration::from_millis(config.send_timeout_ms))
            .map_err(|e| LinkError::Connect {
                port: config.port.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { port })
    }

    fn send_line(&mut self, token: &str) -> Result<(), LinkError> {
        self.port
            .write_all(format!("{}\n", token).as_bytes())
            .and_then(|_| self.port.flush())
            .map_err(|e| LinkError::Io(e.to_string()))
    }

    fn recv_line(&mut self) -> Result<Option<String>, LinkError> {
        read_ascii_line(&mut self.port)
    }
}

/// Reads up to one newline-terminated line, byte-wise, so nothing past
/// the newline is consumed: a chatty device's later replies stay aligned
/// with later commands.
fn read_ascii_line(reader: &mut impl Read) -> Result<Option<String>, LinkError> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                if byte[0] == b'\n' {
                    break;
                }
                buf.push(byte[0]);
            }
            // The device is free not to answer; a read timeout is silence
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
            Err(e) => return Err(LinkError::Io(e.to_string())),
        }
    }

    let line = String::from_utf8_lossy(&buf).trim().to_string();
    Ok(if line.is_empty() { None } else { Some(line) })
}

/// Owns the channel and its state machine:
/// Disconnected --connect--> Connected --repeated send failures--> Faulted
/// --connect--> Connected. While Faulted, sends fail fast without I/O.
///
/// Failed sends are reported to the caller, never retried internally; the
/// next alarm edge is the natural retry point.
pub struct ActuatorLink<T: Transport> {
    config: LinkConfig,
    transport: Option<T>,
    state: LinkState,
    consecutive_failures: u32,
}

impl<T: Transport> ActuatorLink<T> {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            transport: None,
            state: LinkState::Disconnected,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Opens (or reopens) the channel. Valid from any state; success
    /// always lands in Connected with the failure counter cleared.
    pub fn connect(&mut self) -> Result<(), LinkError> {
        match T::open(&self.config) {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = LinkState::Connected;
                self.consecutive_failures = 0;
                debug!("actuator link connected on {}", self.config.port);
                Ok(())
            }
            Err(e) => {
                self.transport = None;
                if self.state == LinkState::Connected {
                    self.state = LinkState::Disconnected;
                }
                Err(e)
            }
        }
    }

    /// Sends one command and reads the (optional) acknowledgement line.
    pub fn send(&mut self, command: Command) -> Result<Ack, LinkError> {
        match self.state {
            LinkState::Faulted => return Err(LinkError::Faulted),
            LinkState::Disconnected => return Err(LinkError::NotConnected),
            LinkState::Connected => {}
        }

        let transport = self.transport.as_mut().ok_or(LinkError::NotConnected)?;

        let result = transport
            .send_line(command.token())
            .and_then(|_| transport.recv_line());

        match result {
            Ok(response) => {
                self.consecutive_failures = 0;
                Ok(Ack { response })
            }
            Err(e) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.max_send_failures {
                    warn!(
                        "actuator link faulted after {} consecutive send failures",
                        self.consecutive_failures
                    );
                    self.state = LinkState::Faulted;
                    self.transport = None;
                }
                Err(e)
            }
        }
    }

    /// Releases the channel. Safe to call any number of times.
    pub fn close(&mut self) {
        self.transport = None;
        if self.state == LinkState::Connected {
            self.state = LinkState::Disconnected;
        }
    }

    /// Best-effort final deactivate before the process exits: the physical
    /// alarm must not stay on after a normal shutdown. Failure is logged,
    /// never escalated.
    pub fn shutdown(&mut self) {
        if self.is_connected() {
            if let Err(e) = self.send(Command::Deactivate) {
                warn!("shutdown deactivate failed: {}", e);
            }
        }
        self.close();
    }
}

/// The link the application uses.
pub type SerialLink = ActuatorLink<SerialTransport>;
