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

//! Length-prefixed packet framing shared by the screenshot and video channels.
//!
//! Each packet is a 4-byte big-endian length followed by that many payload bytes.

use crate::error::GatewayError;
use std::io::{Read, Write};

/// Accepted payload sizes for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    /// Smallest accepted payload.
    pub min: u32,
    /// Largest accepted payload.
    pub max: u32,
}

impl LengthBounds {
    /// Screenshots: anything under 1 KiB or over 10 MiB is malformed.
    pub const SCREENSHOT: LengthBounds = LengthBounds {
        min: 1024,
        max: 10 * 1024 * 1024,
    };

    /// Video packets can be tiny (parameter sets) but share the upper bound.
    pub const VIDEO: LengthBounds = LengthBounds {
        min: 1,
        max: 10 * 1024 * 1024,
    };

    /// Validates an announced length.
    pub fn check(&self, len: u32) -> Result<usize, GatewayError> {
        if len < self.min || len > self.max {
            return Err(GatewayError::PacketLength {
                len,
                min: self.min,
                max: self.max,
            });
        }
        Ok(len as usize)
    }
}

/// Reads one whole packet from a blocking reader.
pub fn read_packet<R: Read>(
    reader: &mut R,
    bounds: LengthBounds,
    channel: &'static str,
) -> Result<Vec<u8>, GatewayError> {
    let mut header = [0u8; 4];
    reader
        .read_exact(&mut header)
        .map_err(|e| GatewayError::io(channel, e))?;
    let len = bounds.check(u32::from_be_bytes(header))?;

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .map_err(|e| GatewayError::io(channel, e))?;
    Ok(payload)
}

/// Writes one packet. Used by device simulators.
pub fn write_packet<W: Write>(writer: &mut W, payload: &[u8]) -> std::io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "packet too large"))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Reassembles packets from a byte stream that arrives in arbitrary chunks.
///
/// The video receiver reads with a short timeout so it can notice a stop request;
/// reads may therefore end anywhere inside a packet.
#[derive(Debug)]
pub struct PacketAssembler {
    buffer: Vec<u8>,
    bounds: LengthBounds,
}

impl PacketAssembler {
    /// Creates an empty assembler.
    pub fn new(bounds: LengthBounds) -> Self {
        Self {
            buffer: Vec::new(),
            bounds,
        }
    }

    /// Appends received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes received but not yet returned as a packet.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Takes the next complete packet, if one is buffered.
    ///
    /// An out-of-range length means the stream lost sync; the caller should drop
    /// the connection.
    pub fn next_packet(&mut self) -> Result<Option<Vec<u8>>, GatewayError> {
        if self.buffer.len() < 4 {
            return Ok(None);
        }
        let header = [self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]];
        let len = self.bounds.check(u32::from_be_bytes(header))?;
        if self.buffer.len() < 4 + len {
            return Ok(None);
        }
        let packet = self.buffer[4..4 + len].to_vec();
        self.buffer.drain(..4 + len);
        Ok(Some(packet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_packet_accepts_in_range_length() {
        let payload = vec![7u8; 2048];
        let mut wire = Vec::new();
        write_packet(&mut wire, &payload).unwrap();
        let read = read_packet(&mut Cursor::new(wire), LengthBounds::SCREENSHOT, "test").unwrap();
        assert_eq!(read, payload);
    }

    #[test]
    fn test_read_packet_rejects_short_screenshot() {
        let mut wire = Vec::new();
        write_packet(&mut wire, &[0u8; 100]).unwrap();
        let err = read_packet(&mut Cursor::new(wire), LengthBounds::SCREENSHOT, "test").unwrap_err();
        assert!(matches!(err, GatewayError::PacketLength { len: 100, .. }));
    }

    #[test]
    fn test_read_packet_rejects_oversized_length() {
        let wire = (11 * 1024 * 1024u32).to_be_bytes().to_vec();
        let err = read_packet(&mut Cursor::new(wire), LengthBounds::SCREENSHOT, "test").unwrap_err();
        assert!(matches!(err, GatewayError::PacketLength { .. }));
    }

    #[test]
    fn test_read_packet_truncated_is_closed() {
        let mut wire = 2048u32.to_be_bytes().to_vec();
        wire.extend_from_slice(&[1u8; 10]);
        let err = read_packet(&mut Cursor::new(wire), LengthBounds::SCREENSHOT, "test").unwrap_err();
        assert!(matches!(err, GatewayError::Closed("test")));
    }

    #[test]
    fn test_assembler_handles_split_packets() {
        let mut wire = Vec::new();
        write_packet(&mut wire, b"first").unwrap();
        write_packet(&mut wire, b"second").unwrap();

        let mut assembler = PacketAssembler::new(LengthBounds::VIDEO);
        assembler.push(&wire[..6]);
        assert_eq!(assembler.next_packet().unwrap(), None);
        assembler.push(&wire[6..]);
        assert_eq!(assembler.next_packet().unwrap(), Some(b"first".to_vec()));
        assert_eq!(assembler.next_packet().unwrap(), Some(b"second".to_vec()));
        assert_eq!(assembler.next_packet().unwrap(), None);
        assert_eq!(assembler.buffered(), 0);
    }

    #[test]
    fn test_assembler_reports_lost_sync() {
        let mut assembler = PacketAssembler::new(LengthBounds::VIDEO);
        assembler.push(&0u32.to_be_bytes());
        assert!(assembler.next_packet().is_err());
    }
}
