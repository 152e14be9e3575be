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

//! The perception engine used by the automation modules.

use crate::matcher::ScoreMap;
use crate::ocr::{self, OcrEngine, CLOCK_CHARSET, COUNTER_CHARSET};
use crate::preprocess::{self, Variant};
use crate::templates::TemplateLibrary;
use image::GrayImage;
use std::time::Duration;
use touchagent_core::{Frame, Perceiver, Point, Region};

/// Crops are enlarged by this factor before OCR.
const OCR_UPSCALE: u32 = 2;

/// Upper bound on occurrences returned by one [`Perceiver::locate_all`] query.
const MAX_OCCURRENCES: usize = 32;

/// Template matching and OCR over captured frames.
///
/// Stateless apart from the template cache; safe to share between every module.
pub struct VisionEngine {
    templates: TemplateLibrary,
    ocr: Box<dyn OcrEngine>,
}

impl VisionEngine {
    /// Creates an engine from a template library and an OCR backend.
    pub fn new(templates: TemplateLibrary, ocr: Box<dyn OcrEngine>) -> Self {
        Self { templates, ocr }
    }

    /// The template library.
    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    /// Grayscale crop of `region`, clamped to the frame. `None` when the region lies
    /// entirely outside.
    fn crop(frame: &Frame, region: Region) -> Option<(GrayImage, Region)> {
        let clamped = region.clamp_to(frame.width(), frame.height())?;
        let rgb = image::imageops::crop_imm(
            frame.image(),
            clamped.left,
            clamped.top,
            clamped.width(),
            clamped.height(),
        )
        .to_image();
        Some((image::imageops::grayscale(&rgb), clamped))
    }

    fn score_map(
        &self,
        frame: &Frame,
        template: &str,
        region: Region,
    ) -> Option<(ScoreMap, Region, (u32, u32))> {
        let reference = self.templates.get(template)?;
        let Some((crop, clamped)) = Self::crop(frame, region) else {
            log::debug!("VisionEngine: region {region} lies outside the frame.");
            return None;
        };
        let map = ScoreMap::compute(&crop, &reference)?;
        Some((map, clamped, reference.dimensions()))
    }

    fn ocr_text(&self, image: &GrayImage, charset: Option<&str>) -> Option<String> {
        match self.ocr.recognize(image, charset) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("VisionEngine: OCR failed: {e}");
                None
            }
        }
    }

    /// Runs OCR over each preprocessing variant until `parse` accepts the text.
    fn read_with<T>(
        &self,
        frame: &Frame,
        region: Region,
        charset: Option<&str>,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let (crop, _) = Self::crop(frame, region)?;
        let crop = preprocess::upscale(&crop, OCR_UPSCALE);
        Variant::ALL.iter().find_map(|variant| {
            let text = self.ocr_text(&variant.apply(&crop), charset)?;
            let parsed = parse(&text);
            if parsed.is_none() {
                log::trace!("VisionEngine: {variant:?} OCR gave unparseable {text:?}.");
            }
            parsed
        })
    }
}

impl Perceiver for VisionEngine {
    fn match_score(&self, frame: &Frame, template: &str, region: Region) -> Option<f32> {
        let (map, _, _) = self.score_map(frame, template, region)?;
        Some(map.best().score)
    }

    fn locate_all(
        &self,
        frame: &Frame,
        template: &str,
        region: Region,
        threshold: f32,
    ) -> Vec<Point> {
        let Some((map, clamped, (tw, th))) = self.score_map(frame, template, region) else {
            return Vec::new();
        };
        map.peaks(threshold, MAX_OCCURRENCES)
            .into_iter()
            .map(|m| {
                Point::new(
                    (clamped.left + m.x + tw / 2) as i32,
                    (clamped.top + m.y + th / 2) as i32,
                )
            })
            .collect()
    }

    fn read_text(&self, frame: &Frame, region: Region, charset: Option<&str>) -> Option<String> {
        let (crop, _) = Self::crop(frame, region)?;
        let text = self.ocr_text(&preprocess::upscale(&crop, OCR_UPSCALE), charset)?;
        (!text.is_empty()).then_some(text)
    }

    fn read_number(&self, frame: &Frame, region: Region) -> Option<u32> {
        self.read_with(frame, region, Some(COUNTER_CHARSET), ocr::parse_counter)
    }

    fn read_floor(&self, frame: &Frame, region: Region) -> Option<u32> {
        self.read_with(frame, region, None, ocr::parse_floor)
    }

    fn read_duration(&self, frame: &Frame, region: Region) -> Option<Duration> {
        self.read_with(frame, region, Some(CLOCK_CHARSET), ocr::parse_clock)
    }

    fn contains_text(&self, frame: &Frame, region: Region, needles: &[&str]) -> bool {
        self.read_with(frame, region, None, |text| {
            needles.iter().any(|needle| text.contains(needle)).then_some(())
        })
        .is_some()
    }

    fn locate_text(&self, frame: &Frame, region: Region, needle: &str) -> Option<Point> {
        let (crop, clamped) = Self::crop(frame, region)?;
        let words = match self
            .ocr
            .recognize_words(&preprocess::upscale(&crop, OCR_UPSCALE))
        {
            Ok(words) => words,
            Err(e) => {
                log::warn!("VisionEngine: OCR failed: {e}");
                return None;
            }
        };
        let word = words.iter().find(|w| w.text.contains(needle))?;
        let cx = (word.left + word.width / 2) / OCR_UPSCALE;
        let cy = (word.top + word.height / 2) / OCR_UPSCALE;
        Some(Point::new(
            (clamped.left + cx) as i32,
            (clamped.top + cy) as i32,
        ))
    }
}
