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

//! Named access to the device for the automation modules.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use touchagent_core::{
    Frame, FrameSource, Layout, Pacer, Perceiver, Point, Region, TouchDevice,
};

/// Taps, captures and perception checks addressed by layout key.
///
/// Every missing layout key is logged once and then behaves as "not on screen":
/// checks return no-match and taps are skipped.
pub struct Screen {
    touch: Arc<dyn TouchDevice>,
    frames: Arc<dyn FrameSource>,
    perceiver: Arc<dyn Perceiver>,
    layout: Arc<Layout>,
    pacer: Pacer,
    missing: Mutex<BTreeSet<String>>,
}

impl Screen {
    /// Creates a screen over the given device channels.
    pub fn new(
        touch: Arc<dyn TouchDevice>,
        frames: Arc<dyn FrameSource>,
        perceiver: Arc<dyn Perceiver>,
        layout: Arc<Layout>,
        pacer: Pacer,
    ) -> Self {
        Self {
            touch,
            frames,
            perceiver,
            layout,
            pacer,
            missing: Mutex::new(BTreeSet::new()),
        }
    }

    /// The same device with a different frame source, such as the video stream.
    pub fn with_frames(&self, frames: Arc<dyn FrameSource>) -> Self {
        Self::new(
            Arc::clone(&self.touch),
            frames,
            Arc::clone(&self.perceiver),
            Arc::clone(&self.layout),
            self.pacer,
        )
    }

    /// The pacing applied to every delay.
    pub fn pacer(&self) -> Pacer {
        self.pacer
    }

    /// Sleeps for the paced number of milliseconds.
    pub fn sleep_ms(&self, millis: u64) {
        self.pacer.sleep_ms(millis);
    }

    // --- Layout ---

    fn report_missing(&self, kind: &str, key: &str) {
        let first = self
            .missing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
        if first {
            log::warn!("Screen: no {kind} named '{key}' in the layout, skipping.");
        }
    }

    /// The point named `key`.
    pub fn point(&self, key: &str) -> Option<Point> {
        let point = self.layout.point(key);
        if point.is_none() {
            self.report_missing("point", key);
        }
        point
    }

    /// The region named `key`.
    pub fn region(&self, key: &str) -> Option<Region> {
        let region = self.layout.region(key);
        if region.is_none() {
            self.report_missing("region", key);
        }
        region
    }

    // --- Touch ---

    /// Taps `point` and waits the paced `delay_ms`.
    pub fn tap_point(&self, point: Point, delay_ms: u64) -> bool {
        self.touch
            .tap(point, self.pacer.scaled(Duration::from_millis(delay_ms)))
    }

    /// Taps the point named `key`. Returns `false` if the key is missing or the
    /// tap failed.
    pub fn tap(&self, key: &str, delay_ms: u64) -> bool {
        match self.point(key) {
            Some(point) => self.tap_point(point, delay_ms),
            None => false,
        }
    }

    /// Performs the swipe named `key`.
    pub fn swipe(&self, key: &str) -> bool {
        match self.layout.swipe(key) {
            Some(mut swipe) => {
                swipe.duration_ms = self
                    .pacer
                    .scaled(Duration::from_millis(swipe.duration_ms))
                    .as_millis() as u64;
                self.touch.swipe(&swipe)
            }
            None => {
                self.report_missing("swipe", key);
                false
            }
        }
    }

    // --- Frames ---

    /// The latest frame, or `None` if acquisition failed.
    pub fn capture(&self) -> Option<Frame> {
        self.frames.capture_frame()
    }

    /// Captures up to `attempts` times, waiting `delay_ms` between failures.
    pub fn capture_retry(&self, attempts: u32, delay_ms: u64) -> Option<Frame> {
        for attempt in 1..=attempts {
            if let Some(frame) = self.capture() {
                return Some(frame);
            }
            log::warn!("Screen: capture failed ({attempt}/{attempts}).");
            if attempt < attempts {
                self.sleep_ms(delay_ms);
            }
        }
        None
    }

    // --- Perception ---

    /// The perception engine.
    pub fn perceiver(&self) -> &dyn Perceiver {
        self.perceiver.as_ref()
    }

    /// Whether `template` appears inside the region named `region_key`.
    pub fn matches(&self, frame: &Frame, template: &str, region_key: &str, threshold: f32) -> bool {
        self.region(region_key)
            .is_some_and(|region| self.perceiver.matches(frame, template, region, threshold))
    }

    /// Best score of `template` inside the region named `region_key`.
    pub fn match_score(&self, frame: &Frame, template: &str, region_key: &str) -> Option<f32> {
        let region = self.region(region_key)?;
        self.perceiver.match_score(frame, template, region)
    }

    /// Every occurrence of `template` inside the region named `region_key`.
    pub fn locate_all(
        &self,
        frame: &Frame,
        template: &str,
        region_key: &str,
        threshold: f32,
    ) -> Vec<Point> {
        match self.region(region_key) {
            Some(region) => self.perceiver.locate_all(frame, template, region, threshold),
            None => Vec::new(),
        }
    }

    /// The number shown in the region named `region_key`.
    pub fn read_number(&self, frame: &Frame, region_key: &str) -> Option<u32> {
        let region = self.region(region_key)?;
        self.perceiver.read_number(frame, region)
    }

    /// The rift floor shown in the region named `region_key`.
    pub fn read_floor(&self, frame: &Frame, region_key: &str) -> Option<u32> {
        let region = self.region(region_key)?;
        self.perceiver.read_floor(frame, region)
    }

    /// The `H:MM:SS` duration shown in the region named `region_key`.
    pub fn read_duration(&self, frame: &Frame, region_key: &str) -> Option<Duration> {
        let region = self.region(region_key)?;
        self.perceiver.read_duration(frame, region)
    }

    /// Whether any of `needles` is written in the region named `region_key`.
    pub fn contains_text(&self, frame: &Frame, region_key: &str, needles: &[&str]) -> bool {
        self.region(region_key)
            .is_some_and(|region| self.perceiver.contains_text(frame, region, needles))
    }

    /// Where `needle` is written inside the region named `region_key`.
    pub fn locate_text(&self, frame: &Frame, region_key: &str, needle: &str) -> Option<Point> {
        let region = self.region(region_key)?;
        self.perceiver.locate_text(frame, region, needle)
    }
}
