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

//! Decoded screen captures.

use image::{DynamicImage, GrayImage, RgbImage};
use std::fmt;
use std::sync::Arc;

/// A decoded screen image together with its capture sequence number.
///
/// Frames are cheap to clone; the pixel buffer is shared. The sequence number
/// increases with every frame a source produces, which lets consumers of a live
/// stream tell a fresh frame from the one they already acted on.
#[derive(Clone)]
pub struct Frame {
    image: Arc<RgbImage>,
    seq: u64,
}

impl Frame {
    /// Wraps an RGB image.
    pub fn new(image: RgbImage, seq: u64) -> Self {
        Self {
            image: Arc::new(image),
            seq,
        }
    }

    /// Converts any decoded image to RGB and wraps it.
    pub fn from_dynamic(image: DynamicImage, seq: u64) -> Self {
        Self::new(image.to_rgb8(), seq)
    }

    /// The pixel data.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Sequence number assigned by the producing source.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the frame is at least `width` x `height`.
    pub fn is_at_least(&self, width: u32, height: u32) -> bool {
        self.width() >= width && self.height() >= height
    }

    /// A grayscale copy of the frame.
    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(self.image.as_ref())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("seq", &self.seq)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
