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

//! # TouchAgent Agents
//!
//! The automation modules driven by the orchestrator. Each module owns its own
//! threads and talks to the rest of the system only through the
//! [`CoordinationContext`](touchagent_control::CoordinationContext): it reads pause
//! signals, raises pending handoffs and calls the coordinator hooks, but never
//! writes the task flag.
//!
//! Screen positions and template names are looked up by the keys in [`keys`];
//! a missing key is logged once and treated as "not on screen".

pub mod collection_agent;
pub mod expedition_agent;
pub mod keys;
pub mod research_agent;
pub mod rift_agent;
mod screen;
mod worker;

pub use collection_agent::CollectionLoop;
pub use expedition_agent::ExpeditionRunner;
pub use research_agent::ResearchFlow;
pub use rift_agent::{RiftLoop, RiftPhase};
pub use screen::Screen;
