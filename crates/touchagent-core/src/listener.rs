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

//! Observer interfaces between the automation modules and the rest of the system.
//!
//! [`StatusListener`] is the outward-facing side: front-ends and loggers receive status
//! changes through it. [`CoordinatorHooks`] is the inward-facing side: modules ask the
//! orchestrator to pause or resume through it without knowing who implements it.

use crate::device::CaptureMode;
use crate::task::{AgentId, TaskFlag};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The two countdowns kept by the timer manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Time until the running research completes.
    Research,
    /// Cooldown until the free accelerate can be used again.
    Accelerate,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Remaining time on both countdowns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    /// Remaining research time, `None` when no countdown is set.
    pub research: Option<Duration>,
    /// Remaining accelerate cooldown, `None` when no countdown is set.
    pub accelerate: Option<Duration>,
}

fn write_clock(f: &mut fmt::Formatter<'_>, remaining: Option<Duration>) -> fmt::Result {
    match remaining {
        Some(d) => {
            let secs = d.as_secs();
            write!(f, "{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
        None => f.write_str("none"),
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("research ")?;
        write_clock(f, self.research)?;
        f.write_str(", accelerate ")?;
        write_clock(f, self.accelerate)
    }
}

/// Receives status changes. Every method defaults to doing nothing, so a listener
/// implements only the events it cares about.
///
/// Calls arrive synchronously on the thread that produced the event.
pub trait StatusListener: Send + Sync {
    /// The task flag changed.
    fn task_changed(&self, _flag: TaskFlag) {}

    /// A user-facing notification.
    fn notify(&self, _title: &str, _message: &str) {}

    /// The rift module's level or failure count changed.
    fn rift_level_updated(&self, _level: u32, _failures: u32) {}

    /// One timer tick elapsed.
    fn timers_updated(&self, _status: &TimerStatus) {}

    /// The capture mode reported by the device changed, `None` when unreachable.
    fn capture_mode_changed(&self, _mode: Option<CaptureMode>) {}

    /// The touch channel connected or disconnected.
    fn connection_changed(&self, _connected: bool) {}
}

/// A listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl StatusListener for NoopListener {}

/// Requests a module can make of whoever coordinates it.
pub trait CoordinatorHooks: Send + Sync {
    /// Pause everything on behalf of `requester`.
    fn pause_all(&self, requester: AgentId);

    /// `agent` finished and the screen is confirmed back home; collection may resume.
    fn resume_after(&self, agent: AgentId);

    /// A countdown reached zero.
    fn timer_expired(&self, kind: TimerKind);
}
