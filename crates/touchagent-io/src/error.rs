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

use std::io;
use thiserror::Error;

/// Failures on any device channel.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The TCP connection could not be opened.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address that was dialled.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Reading or writing an open connection failed.
    #[error("i/o failure on the {channel} channel: {source}")]
    Io {
        /// Which channel failed.
        channel: &'static str,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The peer closed the connection.
    #[error("the {0} channel was closed by the peer")]
    Closed(&'static str),
    /// A length prefix outside the accepted range.
    #[error("packet length {len} outside accepted range [{min}, {max}]")]
    PacketLength {
        /// The announced length.
        len: u32,
        /// Smallest accepted length.
        min: u32,
        /// Largest accepted length.
        max: u32,
    },
    /// The payload was not a decodable image.
    #[error("failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
}

impl GatewayError {
    /// Wraps an I/O error, mapping a clean end-of-stream to [`GatewayError::Closed`].
    pub(crate) fn io(channel: &'static str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            GatewayError::Closed(channel)
        } else {
            GatewayError::Io { channel, source }
        }
    }

    /// Whether the error is a read timeout rather than a broken connection.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            GatewayError::Io { source, .. }
                if matches!(source.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
        )
    }
}
