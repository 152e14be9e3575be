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

//! Module identities and the task flag describing which module owns the device.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the automation modules.
///
/// The order of the variants is the start-up order used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentId {
    /// Tech research and its timers.
    Research,
    /// Resource collection tap loop and assist watcher.
    Collection,
    /// Alliance expedition run.
    Expedition,
    /// Roguelike dungeon loop on the live video stream.
    Rift,
}

impl AgentId {
    /// Every agent, in start-up order.
    pub const ALL: [AgentId; 4] = [
        AgentId::Research,
        AgentId::Collection,
        AgentId::Expedition,
        AgentId::Rift,
    ];
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which module currently holds logical ownership of the tap channel.
///
/// Exactly one value at any instant. Only the orchestrator writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFlag {
    /// Nothing is tapping.
    #[default]
    Idle,
    /// The collection loops own the device.
    Collecting,
    /// The research flow owns the device.
    Researching,
    /// An expedition run owns the device.
    Expedition,
    /// The rift loop owns the device.
    Rift,
}

impl TaskFlag {
    /// The agent owning the device under this flag, if any.
    pub fn owner(self) -> Option<AgentId> {
        match self {
            TaskFlag::Idle => None,
            TaskFlag::Collecting => Some(AgentId::Collection),
            TaskFlag::Researching => Some(AgentId::Research),
            TaskFlag::Expedition => Some(AgentId::Expedition),
            TaskFlag::Rift => Some(AgentId::Rift),
        }
    }

    /// The flag an agent sets while it owns the device.
    pub fn for_agent(agent: AgentId) -> Self {
        match agent {
            AgentId::Research => TaskFlag::Researching,
            AgentId::Collection => TaskFlag::Collecting,
            AgentId::Expedition => TaskFlag::Expedition,
            AgentId::Rift => TaskFlag::Rift,
        }
    }

    /// Whether a timed research trigger may take the device right away.
    pub fn yields_to_research(self) -> bool {
        matches!(self, TaskFlag::Idle | TaskFlag::Collecting)
    }
}

impl fmt::Display for TaskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskFlag::Idle => "idle",
            TaskFlag::Collecting => "collecting",
            TaskFlag::Researching => "researching",
            TaskFlag::Expedition => "expedition",
            TaskFlag::Rift => "rift",
        };
        f.write_str(label)
    }
}

/// Point-in-time status of an agent, for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Which agent this describes.
    pub agent: AgentId,
    /// Whether its loop or run is active.
    pub running: bool,
    /// Free-form detail such as the current phase.
    pub detail: String,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.running { "running" } else { "stopped" };
        if self.detail.is_empty() {
            write!(f, "{}: {}", self.agent, state)
        } else {
            write!(f, "{}: {} ({})", self.agent, state, self.detail)
        }
    }
}
