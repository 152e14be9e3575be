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

//! Capture-mode control client.

use crate::error::GatewayError;
use std::io::{BufRead, BufReader, Write};
use std::time::Duration;
use touchagent_core::{ControlChannel, ControlCommand, ControlReply};

const CHANNEL: &str = "control";

/// Sends one command per short-lived connection and reads a single reply line.
#[derive(Debug, Clone)]
pub struct ControlClient {
    addr: String,
    timeout: Duration,
}

impl ControlClient {
    /// Creates a client for `host:port`; `timeout` bounds the whole round trip.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            timeout,
        }
    }

    /// Sends `command` and returns the parsed reply.
    pub fn round_trip(&self, command: ControlCommand) -> Result<ControlReply, GatewayError> {
        let mut stream = crate::connect(&self.addr, self.timeout)?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|e| GatewayError::io(CHANNEL, e))?;

        stream
            .write_all(format!("{}\n", command.as_wire()).as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| GatewayError::io(CHANNEL, e))?;

        let mut line = String::new();
        let read = BufReader::new(stream)
            .read_line(&mut line)
            .map_err(|e| GatewayError::io(CHANNEL, e))?;
        if read == 0 {
            return Err(GatewayError::Closed(CHANNEL));
        }
        Ok(ControlReply::parse(&line))
    }
}

impl ControlChannel for ControlClient {
    fn send(&self, command: ControlCommand) -> Option<ControlReply> {
        match self.round_trip(command) {
            Ok(reply) => {
                if let ControlReply::Unknown(text) = &reply {
                    log::warn!(
                        "ControlClient: unexpected reply to {}: {:?}",
                        command.as_wire(),
                        text
                    );
                } else {
                    log::debug!("ControlClient: {} -> {:?}", command.as_wire(), reply);
                }
                Some(reply)
            }
            Err(e) => {
                log::warn!("ControlClient: {} failed: {e}", command.as_wire());
                None
            }
        }
    }
}
