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

//! The perception contract consumed by every automation module.

use crate::frame::Frame;
use crate::geometry::{Point, Region};
use std::time::Duration;

/// Answers questions about a frame: is this icon here, what number is written there.
///
/// Every query is restricted to a region of the frame. A region that does not fit
/// the frame, a region smaller than the reference image, or an unknown template id
/// is a non-match, never a panic. OCR queries return `None` for "unknown", which
/// callers must treat as "do not act", never as zero.
pub trait Perceiver: Send + Sync {
    /// Best normalized cross-correlation score of `template` inside `region`.
    fn match_score(&self, frame: &Frame, template: &str, region: Region) -> Option<f32>;

    /// Whether `template` appears inside `region` with a score of at least `threshold`.
    fn matches(&self, frame: &Frame, template: &str, region: Region, threshold: f32) -> bool {
        self.match_score(frame, template, region)
            .is_some_and(|score| score >= threshold)
    }

    /// Centres of every non-overlapping occurrence scoring at least `threshold`,
    /// best first, in absolute frame coordinates.
    fn locate_all(&self, frame: &Frame, template: &str, region: Region, threshold: f32)
        -> Vec<Point>;

    /// Raw OCR text inside `region`, optionally restricted to `charset`.
    fn read_text(&self, frame: &Frame, region: Region, charset: Option<&str>) -> Option<String>;

    /// A counter such as `3/10` (returns 3) or a plain number.
    fn read_number(&self, frame: &Frame, region: Region) -> Option<u32>;

    /// A floor label such as `第12层`.
    fn read_floor(&self, frame: &Frame, region: Region) -> Option<u32>;

    /// A countdown such as `1:02:03`.
    fn read_duration(&self, frame: &Frame, region: Region) -> Option<Duration>;

    /// Whether any of `needles` occurs in the text inside `region`.
    fn contains_text(&self, frame: &Frame, region: Region, needles: &[&str]) -> bool;

    /// Where `needle` is written inside `region`, if found.
    fn locate_text(&self, frame: &Frame, region: Region, needle: &str) -> Option<Point>;
}
