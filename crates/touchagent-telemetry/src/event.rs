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

use serde::{Deserialize, Serialize};
use std::fmt;
use touchagent_core::{CaptureMode, TaskFlag, TimerStatus};

/// One status change, in a form that can leave the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    /// The task flag changed.
    TaskChanged {
        /// The new owner of the device.
        flag: TaskFlag,
    },
    /// A user-facing notification.
    Notification {
        /// Short heading.
        title: String,
        /// Body text.
        message: String,
    },
    /// Rift progress.
    RiftLevel {
        /// Current floor.
        level: u32,
        /// Failures since the last cleared floor.
        failures: u32,
    },
    /// Remaining countdowns, in seconds.
    Timers {
        /// Research countdown.
        research_secs: Option<u64>,
        /// Accelerate cooldown.
        accelerate_secs: Option<u64>,
    },
    /// The device's capture mode; `None` when unreachable.
    CaptureMode {
        /// Reported mode.
        mode: Option<CaptureMode>,
    },
    /// The touch channel connected or dropped.
    Connection {
        /// Whether a connection is held.
        connected: bool,
    },
}

impl StatusEvent {
    /// A timers event from a timer status.
    pub fn timers(status: &TimerStatus) -> Self {
        StatusEvent::Timers {
            research_secs: status.research.map(|d| d.as_secs()),
            accelerate_secs: status.accelerate.map(|d| d.as_secs()),
        }
    }

    /// The event as one line of JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::TaskChanged { flag } => write!(f, "task: {flag}"),
            StatusEvent::Notification { title, message } => write!(f, "{title}: {message}"),
            StatusEvent::RiftLevel { level, failures } => {
                write!(f, "rift: level {level}, failures {failures}")
            }
            StatusEvent::Timers {
                research_secs,
                accelerate_secs,
            } => {
                let clock = |secs: &Option<u64>| match secs {
                    Some(s) => format!("{}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60),
                    None => "none".to_string(),
                };
                write!(
                    f,
                    "timers: research {}, accelerate {}",
                    clock(research_secs),
                    clock(accelerate_secs)
                )
            }
            StatusEvent::CaptureMode { mode: Some(mode) } => write!(f, "capture mode: {mode}"),
            StatusEvent::CaptureMode { mode: None } => f.write_str("capture mode: unknown"),
            StatusEvent::Connection { connected: true } => f.write_str("device connected"),
            StatusEvent::Connection { connected: false } => f.write_str("device disconnected"),
        }
    }
}
