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

//! One-shot checks against a live device.

use crate::app::Devices;
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::thread;
use std::time::Duration;
use touchagent_core::{
    CaptureMode, ControlChannel, ControlCommand, ControlReply, FrameSource, TouchDevice,
};

const MODE_POLLS: u32 = 5;
const MODE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Switches the device to screenshot mode, captures one frame and writes it to `out`.
pub fn screenshot(devices: &Devices, out: &Path) -> Result<()> {
    let reply = devices
        .control
        .round_trip(ControlCommand::SwitchToScreenshot)
        .context("switch to screenshot mode failed")?;
    if reply != ControlReply::ScreenshotAck {
        bail!("device did not acknowledge screenshot mode, replied {reply:?}");
    }

    let mut confirmed = false;
    for attempt in 1..=MODE_POLLS {
        match devices.control.query_mode() {
            Some(CaptureMode::Screenshot) => {
                confirmed = true;
                break;
            }
            other => log::debug!("Selftest: mode poll {attempt}/{MODE_POLLS} gave {other:?}."),
        }
        thread::sleep(MODE_POLL_INTERVAL);
    }
    if !confirmed {
        log::warn!("Selftest: device never reported screenshot mode, capturing anyway.");
    }

    let frame = devices
        .screenshots
        .capture_frame()
        .context("no screenshot received")?;
    frame
        .image()
        .save(out)
        .with_context(|| format!("failed to write '{}'", out.display()))?;
    println!(
        "saved {}x{} screenshot to {}",
        frame.width(),
        frame.height(),
        out.display()
    );
    Ok(())
}

/// Reports whether each device channel answers.
pub fn status(devices: &Devices) {
    let touch = devices.touch.is_connected() || devices.touch.reconnect();
    println!(
        "touch channel: {}",
        if touch { "connected" } else { "unreachable" }
    );
    match devices.control.query_mode() {
        Some(mode) => println!("capture mode: {mode}"),
        None => println!("capture mode: unknown (control channel unreachable)"),
    }
}
