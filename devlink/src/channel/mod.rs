//! Channel layer for pattern matching over a transport.
//!
//! A [`Channel`] pairs a transport with a [`PatternBuffer`] and offers the
//! two primitives the driver is built on: send a line, and read until a
//! pattern shows up at the tail of the output.

mod buffer;

pub use buffer::PatternBuffer;

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;

use crate::error::TransportError;
use crate::transport::{Transport, TransportKind};

/// Default number of trailing bytes searched for a prompt.
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// Interactive channel over a device transport.
pub struct Channel {
    transport: Box<dyn Transport>,
    buffer: PatternBuffer,
}

impl Channel {
    /// Wrap a transport.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::new(DEFAULT_SEARCH_DEPTH),
        }
    }

    /// Protocol of the underlying transport.
    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Send `input` followed by a newline.
    ///
    /// Any unread output is discarded first so the next read only sees the
    /// reply to this input.
    pub async fn send(&mut self, input: &str) -> Result<(), TransportError> {
        self.buffer.clear();
        let mut line = Vec::with_capacity(input.len() + 1);
        line.extend_from_slice(input.as_bytes());
        line.push(b'\n');
        self.transport.write(&line).await
    }

    /// Read until a match of `pattern` closes the output, or `timeout`
    /// elapses. Returns everything read, including the match.
    pub async fn read_until(
        &mut self,
        pattern: &Regex,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.buffer.tail_ends_with(pattern) {
                return Ok(self.buffer.take());
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout(timeout));
            }

            let chunk = match self.transport.read(remaining).await {
                Ok(chunk) => chunk,
                Err(TransportError::Timeout(_)) => return Err(TransportError::Timeout(timeout)),
                Err(e) => return Err(e),
            };
            trace!("read {} bytes", chunk.len());
            self.buffer.extend(&chunk);
        }
    }

    /// Whether the transport still looks connected.
    pub fn is_alive(&self) -> bool {
        self.transport.is_alive()
    }

    /// Close the transport.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.transport.close().await
    }
}
