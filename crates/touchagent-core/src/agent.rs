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

//! Contracts between the orchestrator and the automation modules.
//!
//! The orchestrator only sees these traits. Two shapes exist: long-lived loops that
//! are started and stopped ([`CollectionAgent`], [`RiftAgent`]) and run-once flows
//! that block the calling thread until they finish ([`ExpeditionAgent`],
//! [`ResearchAgent`]).

use crate::sync::ReadyEvent;
use crate::task::{AgentId, AgentStatus};
use std::time::Duration;

/// Behaviour common to every automation module.
pub trait Agent: Send + Sync {
    /// Which module this is.
    fn id(&self) -> AgentId;

    /// Whether the module's loop or run is active.
    fn is_running(&self) -> bool;

    /// Status line for displays.
    fn report_status(&self) -> AgentStatus {
        AgentStatus {
            agent: self.id(),
            running: self.is_running(),
            detail: String::new(),
        }
    }
}

/// The resource collection loops.
pub trait CollectionAgent: Agent {
    /// Stops any previous loops, waits for them to exit, then starts tapping
    /// `resources` and watching for assist requests.
    fn start(&self, resources: Vec<String>);

    /// Asks both loops to exit. Does not wait.
    fn stop(&self);

    /// Waits up to `timeout` for both loops to acknowledge exit.
    fn await_exit(&self, timeout: Duration) -> bool;
}

/// How an expedition run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpeditionOutcome {
    /// A run was already in progress; nothing was done.
    AlreadyRunning,
    /// The run finished and the home screen was confirmed.
    HomeConfirmed,
    /// The run finished but the home screen could not be confirmed.
    HomeUnconfirmed,
    /// The expedition pause was raised mid-run.
    Aborted,
    /// A page never became ready.
    PageUnavailable,
}

/// The alliance expedition flow.
pub trait ExpeditionAgent: Agent {
    /// Runs the whole expedition sequence once, blocking until it ends.
    fn run_once(&self) -> ExpeditionOutcome;
}

/// How a research flow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchOutcome {
    /// The flow ran to the end.
    Completed {
        /// Whether returning to the home screen was confirmed.
        home_confirmed: bool,
    },
    /// No screenshot could be captured on the critical path.
    CaptureFailed,
}

/// The tech research flow.
pub trait ResearchAgent: Agent {
    /// Inspects the research page and starts, tracks or helps research.
    fn run(&self) -> ResearchOutcome;

    /// Consumes a free accelerate if available and reschedules the cooldown.
    fn try_accelerate(&self) -> ResearchOutcome;

    /// Set when the most recent flow finished, whatever its outcome.
    fn ready(&self) -> &ReadyEvent;
}

/// The rift dungeon loop.
pub trait RiftAgent: Agent {
    /// Switches the device to video mode and starts the loop.
    ///
    /// Returns `false` if the loop was already running and `force` is not set, or
    /// if the video stream could not be started.
    fn start(&self, retry_limit: u32, force: bool) -> bool;

    /// Asks the loop to exit. Does not wait.
    fn stop(&self);

    /// Waits up to `timeout` for the loop to acknowledge exit.
    fn await_exit(&self, timeout: Duration) -> bool;

    /// Clears a manual pause. Returns `false` if the loop is not running.
    fn resume(&self) -> bool;
}
