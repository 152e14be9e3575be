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

//! # TouchAgent Core
//!
//! Foundational crate of the workspace. It holds the types every other crate speaks
//! (screen geometry, frames, the task flag), the contracts between the automation
//! modules and their collaborators (device channels, perception, agents, listeners),
//! and the small coordination primitives the modules share (signals, one-shot events,
//! loop completion acknowledgements, pacing).
//!
//! Nothing in here performs I/O except configuration loading.

#![warn(missing_docs)]

pub mod agent;
pub mod config;
pub mod device;
pub mod frame;
pub mod geometry;
pub mod listener;
pub mod perception;
pub mod sync;
pub mod task;

pub use agent::{
    Agent, CollectionAgent, ExpeditionAgent, ExpeditionOutcome, ResearchAgent, ResearchOutcome,
    RiftAgent,
};
pub use config::{AssetConfig, AutomationConfig, Config, ConfigError, DeviceConfig, Layout};
pub use device::{
    CaptureMode, ControlChannel, ControlCommand, ControlReply, FrameSource, StreamSource,
    TouchDevice,
};
pub use frame::Frame;
pub use geometry::{Point, Region, Swipe};
pub use listener::{CoordinatorHooks, NoopListener, StatusListener, TimerKind, TimerStatus};
pub use perception::Perceiver;
pub use sync::{Completion, CompletionGuard, Pacer, ReadyEvent, Signal};
pub use task::{AgentId, AgentStatus, TaskFlag};
