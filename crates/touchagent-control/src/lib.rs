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

//! # TouchAgent Control
//!
//! The coordination core. The [`CoordinationContext`] holds the state every module
//! shares; the [`Orchestrator`] is the only writer of the task flag and decides which
//! module may tap; the [`TimerManager`] drives the research countdowns; the
//! [`ConnectionMonitor`] keeps an eye on the device channels.

pub mod context;
pub mod monitor;
pub mod orchestrator;
pub mod registry;
pub mod timer;

pub use context::{CoordinationContext, PauseSignals, PendingFlag, PendingHandoffs};
pub use monitor::{ConnectionMonitor, MonitorConfig};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use registry::AgentSet;
pub use timer::{TimerCallback, TimerManager};
