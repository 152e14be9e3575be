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

//! The rift dungeon module.
//!
//! Runs on the live video stream rather than screenshots. Every fresh frame is
//! checked against a fixed priority list ([`observe`]); the first condition found
//! is acted on and the loop moves to the next frame. The sweep button is the one
//! point where the loop waits for the user: it pauses itself until
//! [`RiftAgent::resume`](touchagent_core::RiftAgent::resume) is called.

mod agent;
mod phase;

pub use agent::RiftLoop;
pub use phase::{observe, Observation, RiftPhase, RiftState};
