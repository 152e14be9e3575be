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

//! Request/response screenshot client.

use crate::codec::{self, LengthBounds};
use crate::error::GatewayError;
use std::io::Write;
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use touchagent_core::{Frame, FrameSource};

const CHANNEL: &str = "screenshot";

/// Requests one screenshot per call on a persistent connection.
///
/// The exchange is `screenshot\n` followed by a length-prefixed image payload.
/// A length outside [`LengthBounds::SCREENSHOT`] drops the connection. Any other
/// socket failure drops it and retries once with a fresh connection.
#[derive(Debug)]
pub struct ScreenshotClient {
    addr: String,
    timeout: Duration,
    seq: AtomicU64,
    stream: Mutex<Option<TcpStream>>,
}

impl ScreenshotClient {
    /// Creates a client for `host:port`; `timeout` bounds connect, write and read.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            timeout,
            seq: AtomicU64::new(0),
            stream: Mutex::new(None),
        }
    }

    fn open(&self) -> Result<TcpStream, GatewayError> {
        let stream = crate::connect(&self.addr, self.timeout)?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|e| GatewayError::io(CHANNEL, e))?;
        log::info!("ScreenshotClient: connected to {}.", self.addr);
        Ok(stream)
    }

    fn request(stream: &mut TcpStream) -> Result<Vec<u8>, GatewayError> {
        stream
            .write_all(b"screenshot\n")
            .and_then(|_| stream.flush())
            .map_err(|e| GatewayError::io(CHANNEL, e))?;
        codec::read_packet(stream, LengthBounds::SCREENSHOT, CHANNEL)
    }

    /// Fetches the raw encoded screenshot bytes.
    pub fn fetch_raw(&self) -> Result<Vec<u8>, GatewayError> {
        let mut slot = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let mut retried = false;

        loop {
            let mut stream = match slot.take() {
                Some(stream) => stream,
                None => self.open()?,
            };
            match Self::request(&mut stream) {
                Ok(payload) => {
                    *slot = Some(stream);
                    return Ok(payload);
                }
                Err(e @ GatewayError::PacketLength { .. }) => return Err(e),
                Err(e) if !retried => {
                    log::warn!("ScreenshotClient: {e}; reconnecting.");
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn capture(&self) -> Result<Frame, GatewayError> {
        let payload = self.fetch_raw()?;
        let image = image::load_from_memory(&payload)?;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Frame::from_dynamic(image, seq))
    }
}

impl FrameSource for ScreenshotClient {
    fn capture_frame(&self) -> Option<Frame> {
        match self.capture() {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("ScreenshotClient: capture failed: {e}");
                None
            }
        }
    }
}
