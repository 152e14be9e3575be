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

//! Zero-mean normalized cross-correlation.
//!
//! For a template `T` of `n` pixels placed at `(x, y)` over image `I`:
//!
//! ```text
//! R(x, y) = Σ T'(i, j) · I'(x + i, y + j) / sqrt(Σ T'² · Σ I'²)
//! ```
//!
//! where `T'` and `I'` are `T` and the covered window with their means removed.
//! Scores lie in `[-1, 1]`; `1` is a perfect match up to brightness and contrast.
//! Window sums come from summed-area tables, so only the numerator is computed per
//! template pixel.

use image::GrayImage;

const FLAT_EPSILON: f64 = 1e-6;

/// Where a template matched and how well.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchLocation {
    /// Left edge of the matching window.
    pub x: u32,
    /// Top edge of the matching window.
    pub y: u32,
    /// Correlation score in `[-1, 1]`.
    pub score: f32,
}

/// Correlation scores for every placement of a template over an image.
#[derive(Debug, Clone)]
pub struct ScoreMap {
    width: u32,
    height: u32,
    template_width: u32,
    template_height: u32,
    scores: Vec<f32>,
}

impl ScoreMap {
    /// Computes the map. Returns `None` when the template is larger than the image
    /// in either dimension or either image is empty.
    pub fn compute(image: &GrayImage, template: &GrayImage) -> Option<Self> {
        let (iw, ih) = image.dimensions();
        let (tw, th) = template.dimensions();
        if tw == 0 || th == 0 || tw > iw || th > ih {
            return None;
        }

        let n = f64::from(tw) * f64::from(th);
        let t_mean = template.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / n;
        let t_centered: Vec<f64> = template
            .pixels()
            .map(|p| f64::from(p.0[0]) - t_mean)
            .collect();
        let t_energy: f64 = t_centered.iter().map(|v| v * v).sum();

        let table = SummedArea::new(image);
        let (width, height) = (iw - tw + 1, ih - th + 1);
        let mut scores = Vec::with_capacity((width * height) as usize);
        let raw = image.as_raw();

        for y in 0..height {
            for x in 0..width {
                let (sum, sum_sq) = table.window(x, y, tw, th);
                let i_energy = (sum_sq - sum * sum / n).max(0.0);

                let score = if t_energy < FLAT_EPSILON {
                    // A flat template only correlates with a flat window.
                    if i_energy < FLAT_EPSILON {
                        1.0
                    } else {
                        0.0
                    }
                } else if i_energy < FLAT_EPSILON {
                    0.0
                } else {
                    let mut numerator = 0.0;
                    for j in 0..th {
                        let row = ((y + j) * iw + x) as usize;
                        let t_row = (j * tw) as usize;
                        for i in 0..tw as usize {
                            numerator += t_centered[t_row + i] * f64::from(raw[row + i]);
                        }
                    }
                    (numerator / (t_energy * i_energy).sqrt()).clamp(-1.0, 1.0)
                };
                scores.push(score as f32);
            }
        }

        Some(Self {
            width,
            height,
            template_width: tw,
            template_height: th,
            scores,
        })
    }

    /// The best-scoring placement.
    pub fn best(&self) -> MatchLocation {
        let mut best = MatchLocation {
            x: 0,
            y: 0,
            score: f32::NEG_INFINITY,
        };
        for (index, &score) in self.scores.iter().enumerate() {
            if score > best.score {
                best = MatchLocation {
                    x: index as u32 % self.width,
                    y: index as u32 / self.width,
                    score,
                };
            }
        }
        best
    }

    /// Every placement scoring at least `threshold`, best first, with no two
    /// returned windows overlapping. At most `limit` results.
    pub fn peaks(mut self, threshold: f32, limit: usize) -> Vec<MatchLocation> {
        let mut found = Vec::new();
        while found.len() < limit {
            let best = self.best();
            if best.score < threshold {
                break;
            }
            found.push(best);
            self.suppress(best.x, best.y);
        }
        found
    }

    /// Masks every placement whose window overlaps the window at `(x, y)`.
    fn suppress(&mut self, x: u32, y: u32) {
        let x0 = x.saturating_sub(self.template_width - 1);
        let y0 = y.saturating_sub(self.template_height - 1);
        let x1 = (x + self.template_width).min(self.width);
        let y1 = (y + self.template_height).min(self.height);
        for sy in y0..y1 {
            for sx in x0..x1 {
                self.scores[(sy * self.width + sx) as usize] = f32::NEG_INFINITY;
            }
        }
    }
}

/// Summed-area tables of pixel values and squared pixel values.
struct SummedArea {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl SummedArea {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = image.dimensions();
        let stride = w as usize + 1;
        let mut sum = vec![0.0; stride * (h as usize + 1)];
        let mut sum_sq = vec![0.0; stride * (h as usize + 1)];

        for y in 0..h as usize {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w as usize {
                let v = f64::from(image.get_pixel(x as u32, y as u32).0[0]);
                row += v;
                row_sq += v * v;
                let at = (y + 1) * stride + x + 1;
                sum[at] = sum[at - stride] + row;
                sum_sq[at] = sum_sq[at - stride] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let at = |table: &[f64], x: usize, y: usize| table[y * self.stride + x];
        let rect = |table: &[f64]| {
            at(table, x1, y1) - at(table, x0, y1) - at(table, x1, y0) + at(table, x0, y0)
        };
        (rect(&self.sum), rect(&self.sum_sq))
    }
}

/// The best placement of `template` in `image`, or `None` when it cannot fit.
pub fn best_match(image: &GrayImage, template: &GrayImage) -> Option<MatchLocation> {
    ScoreMap::compute(image, template).map(|map| map.best())
}

/// Every non-overlapping placement scoring at least `threshold`, best first.
pub fn find_all(
    image: &GrayImage,
    template: &GrayImage,
    threshold: f32,
    limit: usize,
) -> Vec<MatchLocation> {
    ScoreMap::compute(image, template)
        .map(|map| map.peaks(threshold, limit))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// A textured background with deterministic noise.
    fn background(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([((x * 7 + y * 13) % 50 + 20) as u8]))
    }

    /// A distinctive 6x6 cross pattern.
    fn marker() -> GrayImage {
        GrayImage::from_fn(6, 6, |x, y| {
            if x == 2 || x == 3 || y == 2 || y == 3 {
                Luma([250])
            } else {
                Luma([5])
            }
        })
    }

    fn paste(target: &mut GrayImage, patch: &GrayImage, x: u32, y: u32) {
        image::imageops::replace(target, patch, i64::from(x), i64::from(y));
    }

    #[test]
    fn test_exact_match_scores_one() {
        let mut image = background(40, 30);
        paste(&mut image, &marker(), 17, 9);
        let found = best_match(&image, &marker()).unwrap();
        assert_eq!((found.x, found.y), (17, 9));
        assert!(found.score > 0.999, "score {}", found.score);
    }

    #[test]
    fn test_match_is_brightness_invariant() {
        let mut image = background(40, 30);
        let brighter = GrayImage::from_fn(6, 6, |x, y| {
            Luma([marker().get_pixel(x, y).0[0] / 2 + 60])
        });
        paste(&mut image, &brighter, 3, 4);
        let found = best_match(&image, &marker()).unwrap();
        assert_eq!((found.x, found.y), (3, 4));
        assert!(found.score > 0.99);
    }

    #[test]
    fn test_template_larger_than_image_is_no_match() {
        let image = background(5, 40);
        assert!(best_match(&image, &marker()).is_none());
        let image = background(40, 5);
        assert!(find_all(&image, &marker(), 0.5, 10).is_empty());
    }

    #[test]
    fn test_flat_inputs_do_not_divide_by_zero() {
        let flat = GrayImage::from_pixel(10, 10, Luma([90]));
        let found = best_match(&flat, &marker()).unwrap();
        assert_eq!(found.score, 0.0);

        let flat_template = GrayImage::from_pixel(3, 3, Luma([10]));
        let found = best_match(&flat, &flat_template).unwrap();
        assert_eq!(found.score, 1.0);
    }

    #[test]
    fn test_find_all_returns_separate_occurrences() {
        let mut image = background(60, 20);
        paste(&mut image, &marker(), 4, 5);
        paste(&mut image, &marker(), 30, 7);
        paste(&mut image, &marker(), 50, 2);

        let mut found: Vec<(u32, u32)> = find_all(&image, &marker(), 0.95, 10)
            .into_iter()
            .map(|m| (m.x, m.y))
            .collect();
        found.sort();
        assert_eq!(found, vec![(4, 5), (30, 7), (50, 2)]);
    }

    #[test]
    fn test_find_all_respects_limit() {
        let mut image = background(60, 20);
        paste(&mut image, &marker(), 4, 5);
        paste(&mut image, &marker(), 30, 7);
        assert_eq!(find_all(&image, &marker(), 0.95, 1).len(), 1);
    }
}
