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

//! Contracts for the device channels: touch input, frame capture and mode control.
//!
//! Implementations never panic and never propagate errors to callers: a failed
//! operation is logged by the implementation and reported as `false` or `None`.
//! Retrying is the caller's decision.

use crate::frame::Frame;
use crate::geometry::{Point, Swipe};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The touch-injection channel.
pub trait TouchDevice: Send + Sync {
    /// Taps `point`, then blocks for `delay`.
    fn tap(&self, point: Point, delay: Duration) -> bool;

    /// Performs a swipe and blocks for its duration.
    fn swipe(&self, swipe: &Swipe) -> bool;

    /// Whether a live connection is currently held.
    fn is_connected(&self) -> bool;

    /// Drops any existing connection and opens a new one.
    fn reconnect(&self) -> bool;
}

/// Anything that can hand out the most recent screen image.
pub trait FrameSource: Send + Sync {
    /// Returns the most recent decoded frame, or `None` when none is available
    /// within the source's bounded timeout.
    fn capture_frame(&self) -> Option<Frame>;
}

/// A frame source fed by a continuous stream that must be started explicitly.
pub trait StreamSource: FrameSource {
    /// Starts (or restarts) the background receiver.
    fn start(&self) -> bool;

    /// Stops the background receiver.
    fn stop(&self);

    /// True once at least one frame has been decoded since the last start.
    fn is_ready(&self) -> bool;
}

/// Which capture mode the device-side agent is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureMode {
    /// Request/response screenshots.
    Screenshot,
    /// Continuous encoded video stream.
    VideoStream,
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::Screenshot => f.write_str("screenshot"),
            CaptureMode::VideoStream => f.write_str("video stream"),
        }
    }
}

/// Commands accepted on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    /// Switch the capture channel to screenshot mode.
    SwitchToScreenshot,
    /// Switch the capture channel to video stream mode.
    SwitchToVideo,
    /// Ask which mode is active.
    QueryStatus,
}

impl ControlCommand {
    /// The command text sent on the wire, without the trailing newline.
    pub fn as_wire(self) -> &'static str {
        match self {
            ControlCommand::SwitchToScreenshot => "SWITCH_TO_SCREENSHOT",
            ControlCommand::SwitchToVideo => "switch_to_video",
            ControlCommand::QueryStatus => "query_status",
        }
    }
}

/// A parsed control-channel reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    /// `ACK_SWITCH_TO_SCREENSHOT`
    ScreenshotAck,
    /// `STATUS:SCREENSHOT_MODE` or `STATUS:VIDEO_STREAM_MODE`
    Mode(CaptureMode),
    /// Anything else, verbatim.
    Unknown(String),
}

impl ControlReply {
    /// Parses one reply line. Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "ACK_SWITCH_TO_SCREENSHOT" => ControlReply::ScreenshotAck,
            "STATUS:SCREENSHOT_MODE" => ControlReply::Mode(CaptureMode::Screenshot),
            "STATUS:VIDEO_STREAM_MODE" => ControlReply::Mode(CaptureMode::VideoStream),
            other => ControlReply::Unknown(other.to_string()),
        }
    }
}

/// The short-connection control channel.
pub trait ControlChannel: Send + Sync {
    /// Sends one command and returns the reply, or `None` on any failure.
    fn send(&self, command: ControlCommand) -> Option<ControlReply>;

    /// Queries the active capture mode; `None` when unknown or unreachable.
    fn query_mode(&self) -> Option<CaptureMode> {
        match self.send(ControlCommand::QueryStatus) {
            Some(ControlReply::Mode(mode)) => Some(mode),
            _ => None,
        }
    }
}
