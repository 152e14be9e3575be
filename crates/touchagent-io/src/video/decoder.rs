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

use crate::error::GatewayError;
use image::DynamicImage;

/// Incremental packet-to-image decoder.
///
/// A decoder keeps whatever state its codec needs between packets. Returning
/// `Ok(None)` means the packet was consumed but produced no picture yet.
pub trait PacketDecoder: Send {
    /// Feeds one packet.
    fn decode(&mut self, packet: &[u8]) -> Result<Option<DynamicImage>, GatewayError>;

    /// Discards codec state, called when the stream restarts.
    fn reset(&mut self) {}
}

/// Decodes packets that each hold one complete PNG or JPEG image.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImagePacketDecoder;

impl PacketDecoder for ImagePacketDecoder {
    fn decode(&mut self, packet: &[u8]) -> Result<Option<DynamicImage>, GatewayError> {
        Ok(Some(image::load_from_memory(packet)?))
    }
}
