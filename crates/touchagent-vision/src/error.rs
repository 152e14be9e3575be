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

use std::path::PathBuf;
use thiserror::Error;

/// Failures inside the perception engine.
#[derive(Debug, Error)]
pub enum VisionError {
    /// A reference image could not be loaded.
    #[error("failed to load template '{id}' from '{path}': {source}")]
    Template {
        /// Template id.
        id: String,
        /// File that was tried.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: image::ImageError,
    },
    /// The OCR process could not be run.
    #[error("failed to run OCR command '{command}': {source}")]
    OcrSpawn {
        /// Executable name.
        command: String,
        /// Spawn or pipe error.
        #[source]
        source: std::io::Error,
    },
    /// The OCR process exited unsuccessfully.
    #[error("OCR command exited with {status}: {stderr}")]
    OcrFailed {
        /// Exit status.
        status: std::process::ExitStatus,
        /// Captured error output.
        stderr: String,
    },
    /// An image could not be encoded for the OCR engine.
    #[error("failed to encode OCR input: {0}")]
    Encode(#[from] image::ImageError),
}
