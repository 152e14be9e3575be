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

//! Image clean-up applied before OCR.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

/// Variants tried in turn when reading text off busy backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// The crop as captured.
    Plain,
    /// Brightness halved; recovers light text on light panels.
    Darkened,
    /// Hard black/white threshold at mid-gray.
    Binarized,
}

impl Variant {
    /// All variants in the order they are tried.
    pub const ALL: [Variant; 3] = [Variant::Plain, Variant::Darkened, Variant::Binarized];

    /// Applies the variant.
    pub fn apply(self, image: &GrayImage) -> GrayImage {
        match self {
            Variant::Plain => image.clone(),
            Variant::Darkened => scale_brightness(image, 0.5),
            Variant::Binarized => binarize(image, 128),
        }
    }
}

/// Pixels at or above `threshold` become white, the rest black.
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] >= threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Multiplies every pixel by `factor`, saturating.
pub fn scale_brightness(image: &GrayImage, factor: f32) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = f32::from(image.get_pixel(x, y).0[0]) * factor;
        Luma([v.round().clamp(0.0, 255.0) as u8])
    })
}

/// Enlarges small crops so glyphs reach a size OCR engines handle well.
pub fn upscale(image: &GrayImage, factor: u32) -> GrayImage {
    if factor <= 1 {
        return image.clone();
    }
    imageops::resize(
        image,
        image.width() * factor,
        image.height() * factor,
        FilterType::CatmullRom,
    )
}
