// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Touch-injection client.

use crate::error::GatewayError;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use touchagent_core::{Point, Swipe, TouchDevice};

const CHANNEL: &str = "touch";

/// What happened after a command was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AckState {
    Acked,
    NoAck,
    PeerClosed,
}

/// Sends `tap` and `swipe` lines over a persistent connection.
///
/// The connection is opened lazily on first use. When a write fails the connection
/// is dropped and reopened once within the same call; after that the call reports
/// failure and the next call starts over.
#[derive(Debug)]
pub struct TouchClient {
    addr: String,
    ack_timeout: Duration,
    connect_timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl TouchClient {
    /// Creates a client for `host:port`. Nothing is dialled until the first command.
    pub fn new(host: &str, port: u16, ack_timeout: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            ack_timeout,
            connect_timeout: Duration::from_secs(2),
            stream: Mutex::new(None),
        }
    }

    /// The address this client dials.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn open(&self) -> Result<TcpStream, GatewayError> {
        let stream = crate::connect(&self.addr, self.connect_timeout)?;
        stream
            .set_read_timeout(Some(self.ack_timeout.max(Duration::from_millis(1))))
            .map_err(|e| GatewayError::io(CHANNEL, e))?;
        log::info!("TouchClient: connected to {}.", self.addr);
        Ok(stream)
    }

    fn write_command(stream: &mut TcpStream, line: &str) -> Result<AckState, GatewayError> {
        stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| GatewayError::io(CHANNEL, e))?;

        let mut ack = [0u8; 64];
        match stream.read(&mut ack) {
            Ok(0) => Ok(AckState::PeerClosed),
            Ok(_) => Ok(AckState::Acked),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(AckState::NoAck)
            }
            Err(e) => Err(GatewayError::io(CHANNEL, e)),
        }
    }

    /// Sends one command line, reconnecting at most once.
    fn send_line(&self, line: &str) -> bool {
        let mut slot = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let mut reconnected = false;

        loop {
            if slot.is_none() {
                match self.open() {
                    Ok(stream) => *slot = Some(stream),
                    Err(e) => {
                        log::warn!("TouchClient: {e}");
                        return false;
                    }
                }
            }
            let Some(stream) = slot.as_mut() else {
                return false;
            };

            match Self::write_command(stream, line) {
                Ok(state) => {
                    log::trace!("TouchClient: sent {:?} ({:?}).", line.trim_end(), state);
                    if state == AckState::PeerClosed {
                        log::debug!("TouchClient: peer closed after command, will reconnect.");
                        *slot = None;
                    }
                    return true;
                }
                Err(e) if !reconnected => {
                    log::warn!("TouchClient: {e}; reconnecting.");
                    *slot = None;
                    reconnected = true;
                }
                Err(e) => {
                    log::error!("TouchClient: {e}; giving up on {:?}.", line.trim_end());
                    *slot = None;
                    return false;
                }
            }
        }
    }
}

impl TouchDevice for TouchClient {
    fn tap(&self, point: Point, delay: Duration) -> bool {
        let sent = self.send_line(&format!("tap {} {}\n", point.x, point.y));
        if sent && !delay.is_zero() {
            thread::sleep(delay);
        }
        sent
    }

    fn swipe(&self, swipe: &Swipe) -> bool {
        let line = format!(
            "swipe {} {} {} {} {}\n",
            swipe.from.x, swipe.from.y, swipe.to.x, swipe.to.y, swipe.duration_ms
        );
        let sent = self.send_line(&line);
        if sent {
            thread::sleep(Duration::from_millis(swipe.duration_ms));
        }
        sent
    }

    fn is_connected(&self) -> bool {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn reconnect(&self) -> bool {
        let mut slot = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        match self.open() {
            Ok(stream) => {
                *slot = Some(stream);
                true
            }
            Err(e) => {
                log::warn!("TouchClient: reconnect failed: {e}");
                false
            }
        }
    }
}
