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

//! Background watch over the device channels.

use crate::context::CoordinationContext;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use touchagent_core::{CaptureMode, ControlChannel, TouchDevice};

/// How often each channel is checked.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Touch connection check interval.
    pub connection_interval: Duration,
    /// Capture mode query interval.
    pub mode_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            connection_interval: Duration::from_secs(3),
            mode_interval: Duration::from_secs(30),
        }
    }
}

/// Remembers the last observed state so only changes are reported.
struct Probe {
    ctx: Arc<CoordinationContext>,
    touch: Arc<dyn TouchDevice>,
    control: Arc<dyn ControlChannel>,
    connected: Option<bool>,
    mode: Option<Option<CaptureMode>>,
}

impl Probe {
    fn new(
        ctx: Arc<CoordinationContext>,
        touch: Arc<dyn TouchDevice>,
        control: Arc<dyn ControlChannel>,
    ) -> Self {
        Self {
            ctx,
            touch,
            control,
            connected: None,
            mode: None,
        }
    }

    fn check_connection(&mut self) {
        let mut connected = self.touch.is_connected();
        if !connected {
            log::debug!("ConnectionMonitor: touch channel down, reconnecting.");
            connected = self.touch.reconnect();
        }
        if self.connected != Some(connected) {
            if connected {
                log::info!("ConnectionMonitor: touch channel connected.");
            } else {
                log::warn!("ConnectionMonitor: touch channel disconnected.");
            }
            self.connected = Some(connected);
            self.ctx.report_connection(connected);
        }
    }

    fn check_mode(&mut self) {
        let mode = self.control.query_mode();
        if self.mode != Some(mode) {
            log::info!("ConnectionMonitor: capture mode is {mode:?}.");
            self.mode = Some(mode);
            self.ctx.report_capture_mode(mode);
        }
    }
}

/// Checks the touch connection and the capture mode on a background thread.
pub struct ConnectionMonitor {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ConnectionMonitor {
    /// Starts the monitor thread. The first checks run immediately.
    pub fn start(
        ctx: Arc<CoordinationContext>,
        touch: Arc<dyn TouchDevice>,
        control: Arc<dyn ControlChannel>,
        config: MonitorConfig,
    ) -> Self {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let mut probe = Probe::new(ctx, touch, control);

        let spawned = thread::Builder::new()
            .name("connection-monitor".into())
            .spawn(move || {
                log::info!("ConnectionMonitor thread started.");
                let now = Instant::now();
                let mut next_connection = now;
                let mut next_mode = now;
                loop {
                    let now = Instant::now();
                    if now >= next_connection {
                        probe.check_connection();
                        next_connection = now + config.connection_interval;
                    }
                    if now >= next_mode {
                        probe.check_mode();
                        next_mode = now + config.mode_interval;
                    }

                    let wake = next_connection.min(next_mode);
                    match stop_rx.recv_timeout(wake.saturating_duration_since(Instant::now())) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::info!("ConnectionMonitor thread stopped.");
            });

        match spawned {
            Ok(handle) => Self {
                stop_tx: Some(stop_tx),
                handle: Some(handle),
            },
            Err(e) => {
                log::error!("ConnectionMonitor: failed to spawn thread: {e}");
                Self {
                    stop_tx: None,
                    handle: None,
                }
            }
        }
    }

    /// Stops the monitor thread and waits for it.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
