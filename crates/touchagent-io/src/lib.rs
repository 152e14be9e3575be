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

//! # TouchAgent I/O
//!
//! Socket clients for the device-side agent, reached through forwarded TCP ports:
//!
//! - [`TouchClient`]: line protocol for taps and swipes, persistent connection.
//! - [`ScreenshotClient`]: request/response screenshots with length-prefixed replies.
//! - [`ControlClient`]: one short connection per mode-control command.
//! - [`VideoStreamListener`]: background receiver for the length-prefixed video stream.
//!
//! Clients implement the device traits of `touchagent-core`. Internally they work
//! with [`GatewayError`]; at the trait boundary every failure is logged and turned
//! into `false` or `None`.

pub mod codec;
mod control;
mod error;
mod screenshot;
mod touch;
pub mod video;

pub use control::ControlClient;
pub use error::GatewayError;
pub use screenshot::ScreenshotClient;
pub use touch::TouchClient;
pub use video::{ImagePacketDecoder, PacketDecoder, VideoStreamListener};

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Resolves `addr` and opens a TCP connection with a bounded connect timeout.
pub(crate) fn connect(addr: &str, timeout: Duration) -> Result<TcpStream, GatewayError> {
    let resolved: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|source| GatewayError::Connect {
            addr: addr.to_string(),
            source,
        })?
        .collect();

    let mut last_error = None;
    for socket_addr in resolved {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(stream) => {
                // Taps are tiny; do not let Nagle batch them.
                let _ = stream.set_nodelay(true);
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(GatewayError::Connect {
        addr: addr.to_string(),
        source: last_error.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "address did not resolve")
        }),
    })
}
