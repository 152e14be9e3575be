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

use crate::event::StatusEvent;
use touchagent_core::{CaptureMode, StatusListener, TaskFlag, TimerStatus};

/// Writes every status change to the log.
///
/// Timer ticks arrive once per second and are logged at `trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl StatusListener for LogListener {
    fn task_changed(&self, flag: TaskFlag) {
        log::info!("Status: task {flag}");
    }

    fn notify(&self, title: &str, message: &str) {
        log::info!("Status: [{title}] {message}");
    }

    fn rift_level_updated(&self, level: u32, failures: u32) {
        log::info!("Status: rift level {level}, failures {failures}");
    }

    fn timers_updated(&self, status: &TimerStatus) {
        log::trace!("Status: timers {status}");
    }

    fn capture_mode_changed(&self, mode: Option<CaptureMode>) {
        match mode {
            Some(mode) => log::info!("Status: capture mode {mode}"),
            None => log::warn!("Status: capture mode unknown"),
        }
    }

    fn connection_changed(&self, connected: bool) {
        if connected {
            log::info!("Status: device connected");
        } else {
            log::warn!("Status: device disconnected");
        }
    }
}

/// Publishes every status change as a [`StatusEvent`].
#[derive(Debug, Clone)]
pub struct BusListener {
    sender: flume::Sender<StatusEvent>,
}

impl BusListener {
    /// Publishes into `sender`, usually [`EventBus::sender`](crate::EventBus::sender).
    pub fn new(sender: flume::Sender<StatusEvent>) -> Self {
        Self { sender }
    }

    fn publish(&self, event: StatusEvent) {
        if self.sender.send(event).is_err() {
            log::trace!("BusListener: no receiver left, event dropped.");
        }
    }
}

impl StatusListener for BusListener {
    fn task_changed(&self, flag: TaskFlag) {
        self.publish(StatusEvent::TaskChanged { flag });
    }

    fn notify(&self, title: &str, message: &str) {
        self.publish(StatusEvent::Notification {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn rift_level_updated(&self, level: u32, failures: u32) {
        self.publish(StatusEvent::RiftLevel { level, failures });
    }

    fn timers_updated(&self, status: &TimerStatus) {
        self.publish(StatusEvent::timers(status));
    }

    fn capture_mode_changed(&self, mode: Option<CaptureMode>) {
        self.publish(StatusEvent::CaptureMode { mode });
    }

    fn connection_changed(&self, connected: bool) {
        self.publish(StatusEvent::Connection { connected });
    }
}
