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

//! # TouchAgent Vision
//!
//! Stateless perception over captured frames.
//!
//! - [`matcher`]: zero-mean normalized cross-correlation template matching.
//! - [`TemplateLibrary`]: named reference images loaded lazily from a directory.
//! - [`ocr`]: the OCR engine seam and the parsers for the numbers the game displays.
//! - [`VisionEngine`]: the [`Perceiver`](touchagent_core::Perceiver) implementation
//!   tying the above together.

mod engine;
mod error;
pub mod matcher;
pub mod ocr;
pub mod preprocess;
mod templates;

pub use engine::VisionEngine;
pub use error::VisionError;
pub use templates::TemplateLibrary;
