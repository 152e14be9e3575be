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

//! Configuration file model.
//!
//! A single TOML file with four tables:
//!
//! ```toml
//! [device]        # endpoints and socket timeouts
//! [automation]    # module toggles, resources, retry limits, pacing
//! [assets]        # template directory and OCR command
//! [layout]        # named points, regions and swipes
//! ```
//!
//! Every field has a default, so a missing file or a partial file is valid.

use crate::geometry::{Point, Region, Swipe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file '{path}'")]
    Read {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this model.
    #[error("failed to parse config file '{path}'")]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: toml::de::Error,
    },
}

/// The whole configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device endpoints.
    pub device: DeviceConfig,
    /// Module toggles and limits.
    pub automation: AutomationConfig,
    /// Reference images and OCR.
    pub assets: AssetConfig,
    /// Named screen positions.
    pub layout: Layout,
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!(
                "Config: no '{}' found, using default configuration.",
                path.display()
            );
            return Ok(Self::default());
        }

        log::info!("Config: loading '{}'.", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Where the device-side agent listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Host of the forwarded ports.
    pub host: String,
    /// Touch-injection port.
    pub touch_port: u16,
    /// Screenshot and video port.
    pub capture_port: u16,
    /// Control port.
    pub control_port: u16,
    /// How long to wait for a tap acknowledgement, in milliseconds.
    /// A missing acknowledgement is not an error.
    pub ack_timeout_ms: u64,
    /// Connect and read timeout on the capture channel, in milliseconds.
    pub capture_timeout_ms: u64,
    /// Timeout of one control command round trip, in milliseconds.
    pub control_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            touch_port: 6100,
            capture_port: 6101,
            control_port: 6102,
            ack_timeout_ms: 100,
            capture_timeout_ms: 3000,
            control_timeout_ms: 2000,
        }
    }
}

/// User-controlled module settings. Modules read them when they start and never
/// write them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Run the collection loops.
    pub collect_enabled: bool,
    /// Resource labels tapped by the collection loop, in order.
    pub resources: Vec<String>,
    /// Run the research flow at start-up and on timer expiry.
    pub research_enabled: bool,
    /// Let the assist watcher hand over to the expedition module.
    pub expedition_enabled: bool,
    /// Spend scouting energy during expeditions.
    pub scout_enabled: bool,
    /// Claim territory rewards during expeditions.
    pub reward_enabled: bool,
    /// Start the rift module at start-up.
    pub rift_enabled: bool,
    /// Rift failures tolerated before giving up; 0 gives up on the first failure.
    pub rift_retry_limit: u32,
    /// Multiplier applied to every empirical delay.
    pub pace: f32,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            collect_enabled: true,
            resources: vec!["food".to_string()],
            research_enabled: false,
            expedition_enabled: false,
            scout_enabled: false,
            reward_enabled: false,
            rift_enabled: false,
            rift_retry_limit: 30,
            pace: 1.0,
        }
    }
}

/// Reference images and the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding `<template id>.png` reference images.
    pub template_dir: PathBuf,
    /// OCR executable, invoked as a Tesseract-compatible CLI.
    pub ocr_command: String,
    /// OCR language list passed to the engine.
    pub ocr_languages: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("icons"),
            ocr_command: "tesseract".to_string(),
            ocr_languages: "chi_sim+eng".to_string(),
        }
    }
}

/// Named screen positions. Keys are dotted names such as `expedition.button`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Tap targets.
    pub points: BTreeMap<String, Point>,
    /// Regions searched by perception.
    pub regions: BTreeMap<String, Region>,
    /// Swipe gestures.
    pub swipes: BTreeMap<String, Swipe>,
}

impl Layout {
    /// The point named `key`.
    pub fn point(&self, key: &str) -> Option<Point> {
        self.points.get(key).copied()
    }

    /// The region named `key`.
    pub fn region(&self, key: &str) -> Option<Region> {
        self.regions.get(key).copied()
    }

    /// The swipe named `key`.
    pub fn swipe(&self, key: &str) -> Option<Swipe> {
        self.swipes.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.device.touch_port, 6100);
        assert_eq!(config.automation.rift_retry_limit, 30);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[automation]
resources = ["food", "wood"]
expedition_enabled = true

[layout.points]
"collect.food" = [120, 640]

[layout.regions]
"home.marker" = [503, 29, 577, 88]

[layout.swipes]
"expedition.scroll" = {{ from = [540, 1500], to = [540, 900], duration_ms = 400 }}
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.automation.resources, vec!["food", "wood"]);
        assert!(config.automation.expedition_enabled);
        assert!(config.automation.collect_enabled);
        assert_eq!(config.device.control_port, 6102);
        assert_eq!(
            config.layout.point("collect.food"),
            Some(Point::new(120, 640))
        );
        assert_eq!(
            config.layout.region("home.marker"),
            Some(Region::new(503, 29, 577, 88))
        );
        assert_eq!(
            config.layout.swipe("expedition.scroll").map(|s| s.duration_ms),
            Some(400)
        );
        assert_eq!(config.layout.point("missing"), None);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[automation]\nrift_retry_limit = \"many\"").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
