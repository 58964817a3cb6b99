//! Telnet transport over a plain TCP stream.
//!
//! Option negotiation follows RFC 854/855 with the RFC 1143 rule of replying
//! only when an option's state changes: the server may echo and suppress
//! go-ahead, every other option is refused, and devlink never enables an
//! option on its own side. Login is driven by matching the username/password
//! prompts the device prints.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use memchr::memchr;
use regex::bytes::Regex;
use secrecy::ExposeSecret;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::config::{TransportConfig, TransportKind};
use super::Transport;
use crate::channel::PatternBuffer;
use crate::error::TransportError;

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodecState {
    Data,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Incremental Telnet stream decoder/encoder.
///
/// State is kept across calls so commands split between reads are handled.
#[derive(Debug)]
pub struct TelnetCodec {
    state: CodecState,
    /// Options the server has enabled on its side with our agreement.
    remote_enabled: [bool; 256],
}

impl Default for TelnetCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetCodec {
    pub fn new() -> Self {
        Self {
            state: CodecState::Data,
            remote_enabled: [false; 256],
        }
    }

    /// Split raw input into application data and negotiation replies.
    pub fn decode(&mut self, input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        // Fast path: plain data with no commands in flight
        if self.state == CodecState::Data && memchr(IAC, input).is_none() {
            return (input.iter().copied().filter(|b| *b != 0).collect(), Vec::new());
        }

        let mut data = Vec::with_capacity(input.len());
        let mut replies = Vec::new();

        for &byte in input {
            self.state = match self.state {
                CodecState::Data => match byte {
                    IAC => CodecState::Iac,
                    0 => CodecState::Data,
                    b => {
                        data.push(b);
                        CodecState::Data
                    }
                },
                CodecState::Iac => match byte {
                    IAC => {
                        data.push(IAC);
                        CodecState::Data
                    }
                    DO | DONT | WILL | WONT => CodecState::Negotiate(byte),
                    SB => CodecState::Sub,
                    // NOP, GA, AYT, ... carry no payload
                    _ => CodecState::Data,
                },
                CodecState::Negotiate(command) => {
                    if let Some(reply) = self.answer(command, byte) {
                        replies.extend_from_slice(&[IAC, reply, byte]);
                    }
                    CodecState::Data
                }
                CodecState::Sub => match byte {
                    IAC => CodecState::SubIac,
                    _ => CodecState::Sub,
                },
                CodecState::SubIac => match byte {
                    SE => CodecState::Data,
                    _ => CodecState::Sub,
                },
            };
        }

        (data, replies)
    }

    /// Our reply to a negotiation request, if one is due.
    ///
    /// A request that would not change the option's state is not answered,
    /// so two peers can never loop acknowledging each other.
    fn answer(&mut self, command: u8, option: u8) -> Option<u8> {
        let enabled = &mut self.remote_enabled[usize::from(option)];
        match command {
            WILL if *enabled => None,
            WILL if option == OPT_ECHO || option == OPT_SGA => {
                *enabled = true;
                Some(DO)
            }
            WILL => Some(DONT),
            WONT if *enabled => {
                *enabled = false;
                Some(DONT)
            }
            WONT => None,
            // Local options are never enabled: refuse DO, ignore DONT
            DO => Some(WONT),
            _ => None,
        }
    }

    /// Escape outgoing data: IAC is doubled and bare LF becomes CR LF.
    pub fn encode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + 2);
        let mut previous = 0u8;
        for &byte in data {
            match byte {
                IAC => out.extend_from_slice(&[IAC, IAC]),
                b'\n' if previous != b'\r' => out.extend_from_slice(b"\r\n"),
                b => out.push(b),
            }
            previous = byte;
        }
        out
    }
}

/// Telnet transport.
pub struct TelnetTransport {
    stream: TcpStream,
    codec: TelnetCodec,
    /// Output consumed during login that the caller has not seen yet.
    pending: Vec<u8>,
    closed: bool,
}

impl TelnetTransport {
    /// Connect and log in. `prompt` matches the device prompt that signals a
    /// successful login.
    pub async fn connect(config: &TransportConfig, prompt: &Regex) -> Result<Self, TransportError> {
        debug!("Telnet connecting to {}", config.socket_addr());

        let stream = tokio::time::timeout(
            config.timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|source| TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;

        let mut transport = Self {
            stream,
            codec: TelnetCodec::new(),
            pending: Vec::new(),
            closed: false,
        };

        tokio::time::timeout(config.timeout, transport.login(config, prompt))
            .await
            .map_err(|_| TransportError::Timeout(config.timeout))??;

        debug!("Telnet login complete on {}", config.socket_addr());
        Ok(transport)
    }

    async fn login(&mut self, config: &TransportConfig, prompt: &Regex) -> Result<(), TransportError> {
        let username_prompt = Regex::new(r"(?i)(user\s*name|login)\s*:\s*$").map_err(pattern_err)?;
        let password_prompt = Regex::new(r"(?i)pass(word|code)\s*:\s*$").map_err(pattern_err)?;
        let rejected = Regex::new(
            r"(?i)(login incorrect|login invalid|authentication failed|access denied|bad passwords?)",
        )
        .map_err(pattern_err)?;

        let mut buffer = PatternBuffer::default();
        let mut sent_username = false;
        let mut sent_password = false;

        loop {
            let chunk = self.read_socket(config.timeout).await?;
            buffer.extend(&chunk);

            if sent_password && buffer.search_full(&rejected).is_some() {
                return Err(TransportError::AuthenticationFailed {
                    user: config.username.clone(),
                });
            }

            if buffer.tail_contains(&password_prompt) {
                if sent_password {
                    return Err(TransportError::AuthenticationFailed {
                        user: config.username.clone(),
                    });
                }
                self.write_line(config.password.expose_secret().as_bytes()).await?;
                sent_password = true;
                buffer.clear();
            } else if buffer.tail_contains(&username_prompt) {
                if sent_username {
                    return Err(TransportError::AuthenticationFailed {
                        user: config.username.clone(),
                    });
                }
                self.write_line(config.username.as_bytes()).await?;
                sent_username = true;
                buffer.clear();
            } else if buffer.tail_ends_with(prompt) {
                // Devices without login still count as authenticated
                self.pending = buffer.take();
                return Ok(());
            }
        }
    }

    async fn write_line(&mut self, line: &[u8]) -> Result<(), TransportError> {
        let mut data = line.to_vec();
        data.push(b'\n');
        self.write(&data).await
    }

    /// Read and decode one socket chunk, answering negotiation on the way.
    async fn read_socket(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut raw = [0u8; 4096];

        loop {
            if self.closed {
                return Err(TransportError::Disconnected);
            }

            let n = tokio::time::timeout_at(deadline, self.stream.read(&mut raw))
                .await
                .map_err(|_| TransportError::Timeout(timeout))??;

            if n == 0 {
                self.closed = true;
                return Err(TransportError::Disconnected);
            }

            let (data, replies) = self.codec.decode(&raw[..n]);
            if !replies.is_empty() {
                self.stream.write_all(&replies).await?;
            }
            if !data.is_empty() {
                return Ok(data);
            }
        }
    }
}

#[async_trait]
impl Transport for TelnetTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Telnet
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Disconnected);
        }
        self.stream.write_all(&TelnetCodec::encode(data)).await?;
        Ok(())
    }

    async fn read(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.pending.is_empty() {
            return Ok(std::mem::take(&mut self.pending));
        }
        self.read_socket(timeout).await
    }

    fn is_alive(&self) -> bool {
        !self.closed
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        self.stream.shutdown().await?;
        Ok(())
    }
}

fn pattern_err(e: regex::Error) -> TransportError {
    TransportError::Telnet(format!("invalid login pattern: {e}"))
}
