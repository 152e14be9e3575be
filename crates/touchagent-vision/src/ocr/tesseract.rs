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

use super::{OcrEngine, OcrWord};
use crate::error::VisionError;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

/// Runs a Tesseract-compatible executable, feeding the image as PNG on stdin.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: String,
    languages: String,
}

impl TesseractCli {
    /// Creates an engine invoking `command` with the `+`-separated `languages`.
    pub fn new(command: impl Into<String>, languages: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            languages: languages.into(),
        }
    }

    fn run(&self, image: &GrayImage, extra: &[String]) -> Result<String, VisionError> {
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image.clone()).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let spawn_error = |source| VisionError::OcrSpawn {
            command: self.command.clone(),
            source,
        };

        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.languages])
            .args(extra)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png).map_err(spawn_error)?;
        }
        let output = child.wait_with_output().map_err(spawn_error)?;
        if !output.status.success() {
            return Err(VisionError::OcrFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &GrayImage, charset: Option<&str>) -> Result<String, VisionError> {
        // Page segmentation mode 7: treat the crop as a single line.
        let mut extra = vec!["--psm".to_string(), "7".to_string()];
        if let Some(charset) = charset {
            extra.push("-c".to_string());
            extra.push(format!("tessedit_char_whitelist={charset}"));
        }
        let text = self.run(image, &extra)?;
        Ok(text.trim().to_string())
    }

    fn recognize_words(&self, image: &GrayImage) -> Result<Vec<OcrWord>, VisionError> {
        let tsv = self.run(image, &["--psm".to_string(), "11".to_string(), "tsv".to_string()])?;
        Ok(parse_tsv(&tsv))
    }
}

/// Extracts the word rows (level 5) of Tesseract's TSV output.
pub fn parse_tsv(tsv: &str) -> Vec<OcrWord> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 12 || cols[0] != "5" {
                return None;
            }
            let text = cols[11].trim();
            if text.is_empty() {
                return None;
            }
            Some(OcrWord {
                text: text.to_string(),
                left: cols[6].parse().ok()?,
                top: cols[7].parse().ok()?,
                width: cols[8].parse().ok()?,
                height: cols[9].parse().ok()?,
            })
        })
        .collect()
}
