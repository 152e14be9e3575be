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

//! Optical character recognition.
//!
//! The engine itself is an external collaborator behind [`OcrEngine`]. This module
//! owns what the automation needs on top of it: parsing counters, floor labels and
//! countdowns out of noisy recognised text.

mod parse;
mod tesseract;

pub use parse::{parse_clock, parse_counter, parse_floor};
pub use tesseract::{parse_tsv, TesseractCli};

use crate::error::VisionError;
use image::GrayImage;

/// Digits and the counter separator.
pub const COUNTER_CHARSET: &str = "0123456789/";

/// Digits and the clock separator.
pub const CLOCK_CHARSET: &str = "0123456789:";

/// A recognised word and its bounding box in the input image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrWord {
    /// Recognised text.
    pub text: String,
    /// Left edge.
    pub left: u32,
    /// Top edge.
    pub top: u32,
    /// Box width.
    pub width: u32,
    /// Box height.
    pub height: u32,
}

/// A text recognition engine.
pub trait OcrEngine: Send + Sync {
    /// Recognises a single line of text, optionally limited to `charset`.
    fn recognize(&self, image: &GrayImage, charset: Option<&str>) -> Result<String, VisionError>;

    /// Recognises individual words with their positions.
    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<OcrWord>, VisionError>;
}
