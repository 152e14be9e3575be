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

use crate::error::VisionError;
use image::GrayImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Named reference images, loaded on first use from `<dir>/<id>.png`.
///
/// A template that fails to load is remembered as missing so the failure is
/// logged once rather than on every frame.
#[derive(Debug)]
pub struct TemplateLibrary {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Option<Arc<GrayImage>>>>,
}

impl TemplateLibrary {
    /// Creates a library rooted at `dir`. Nothing is read yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The directory templates are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Registers an in-memory template, replacing any cached entry.
    pub fn insert(&self, id: impl Into<String>, template: GrayImage) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), Some(Arc::new(template)));
    }

    /// The template named `id`, or `None` if it is missing or unreadable.
    pub fn get(&self, id: &str) -> Option<Arc<GrayImage>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = cache.get(id) {
            return entry.clone();
        }

        let entry = match self.load(id) {
            Ok(template) => {
                log::debug!(
                    "TemplateLibrary: loaded '{id}' ({}x{}).",
                    template.width(),
                    template.height()
                );
                Some(Arc::new(template))
            }
            Err(e) => {
                log::warn!("TemplateLibrary: {e}");
                None
            }
        };
        cache.insert(id.to_string(), entry.clone());
        entry
    }

    fn load(&self, id: &str) -> Result<GrayImage, VisionError> {
        let path = self.dir.join(format!("{id}.png"));
        image::open(&path)
            .map(|image| image.to_luma8())
            .map_err(|source| VisionError::Template {
                id: id.to_string(),
                path,
                source,
            })
    }
}
