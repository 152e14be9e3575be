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

//! Screen-space geometry: tap points, rectangular regions and swipe gestures.
//!
//! All coordinates are device pixels with the origin at the top-left corner.
//! In configuration files points are written as `[x, y]` and regions as
//! `[left, top, right, bottom]`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tap target on the device screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Point {
    /// Horizontal position in pixels.
    pub x: i32,
    /// Vertical position in pixels.
    pub y: i32,
}

impl Point {
    /// Creates a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this point moved by `(dx, dy)`.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl From<[i32; 2]> for Point {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [i32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle, right and bottom edges exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct Region {
    /// Left edge.
    pub left: u32,
    /// Top edge.
    pub top: u32,
    /// Right edge (exclusive).
    pub right: u32,
    /// Bottom edge (exclusive).
    pub bottom: u32,
}

impl Region {
    /// Creates a region from its four edges.
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width in pixels; zero for inverted regions.
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Height in pixels; zero for inverted regions.
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// True when the region covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Whether `point` lies inside the region, edges included.
    ///
    /// Inclusive on every side so that button hit-boxes copied from a screenshot
    /// editor behave as drawn.
    pub fn contains(&self, point: Point) -> bool {
        let (x, y) = (i64::from(point.x), i64::from(point.y));
        x >= i64::from(self.left)
            && x <= i64::from(self.right)
            && y >= i64::from(self.top)
            && y <= i64::from(self.bottom)
    }

    /// The centre point of the region.
    pub fn centre(&self) -> Point {
        Point::new(
            (self.left + self.width() / 2) as i32,
            (self.top + self.height() / 2) as i32,
        )
    }

    /// Clamps the region to a `width` x `height` frame.
    ///
    /// Returns `None` when nothing of the region remains inside the frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        let clamped = Region::new(
            self.left.min(width),
            self.top.min(height),
            self.right.min(width),
            self.bottom.min(height),
        );
        (!clamped.is_empty()).then_some(clamped)
    }
}

impl From<[u32; 4]> for Region {
    fn from([left, top, right, bottom]: [u32; 4]) -> Self {
        Self::new(left, top, right, bottom)
    }
}

impl From<Region> for [u32; 4] {
    fn from(r: Region) -> Self {
        [r.left, r.top, r.right, r.bottom]
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// A straight-line swipe gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swipe {
    /// Where the finger goes down.
    pub from: Point,
    /// Where the finger lifts.
    pub to: Point,
    /// Gesture duration in milliseconds.
    #[serde(default = "default_swipe_ms")]
    pub duration_ms: u64,
}

fn default_swipe_ms() -> u64 {
    300
}

impl Swipe {
    /// Creates a swipe gesture.
    pub const fn new(from: Point, to: Point, duration_ms: u64) -> Self {
        Self {
            from,
            to,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_dimensions() {
        let r = Region::new(10, 20, 110, 70);
        assert_eq!(r.width(), 100);
        assert_eq!(r.height(), 50);
        assert_eq!(r.centre(), Point::new(60, 45));
        assert!(!r.is_empty());
        assert!(Region::new(50, 0, 10, 10).is_empty());
    }

    #[test]
    fn test_region_contains_is_inclusive() {
        let r = Region::new(0, 0, 10, 10);
        assert!(r.contains(Point::new(0, 0)));
        assert!(r.contains(Point::new(10, 10)));
        assert!(!r.contains(Point::new(11, 5)));
        assert!(!r.contains(Point::new(-1, 5)));
    }

    #[test]
    fn test_region_clamp() {
        let r = Region::new(90, 90, 200, 200);
        assert_eq!(r.clamp_to(100, 100), Some(Region::new(90, 90, 100, 100)));
        assert_eq!(Region::new(150, 150, 200, 200).clamp_to(100, 100), None);
    }

    #[test]
    fn test_point_offset() {
        assert_eq!(Point::new(100, 200).offset(365, -33), Point::new(465, 167));
    }
}
