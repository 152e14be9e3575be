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

//! Live video stream reception.
//!
//! The stream is a sequence of length-prefixed packets. Turning packets into
//! images is delegated to a [`PacketDecoder`]; the built-in
//! [`ImagePacketDecoder`] handles streams of self-contained encoded images.
//! Bitstream codecs plug in through the same trait.

mod decoder;
mod listener;

pub use decoder::{ImagePacketDecoder, PacketDecoder};
pub use listener::VideoStreamListener;
