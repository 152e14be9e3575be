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

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

fn counter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*/\s*(\d+)").expect("counter pattern is valid"))
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("number pattern is valid"))
}

fn floor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"第\s*(\d+)\s*层").expect("floor pattern is valid"))
}

fn clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{1,2})\s*:\s*(\d{1,2})\s*:\s*(\d{1,2})").expect("clock pattern is valid")
    })
}

/// Reads a `current/total` counter and returns `current`.
///
/// Text without a separator falls back to the first run of digits. Anything else
/// is unknown.
pub fn parse_counter(text: &str) -> Option<u32> {
    if let Some(caps) = counter_re().captures(text) {
        return caps[1].parse().ok();
    }
    number_re().find(text)?.as_str().parse().ok()
}

/// Reads a floor label such as `第12层`.
pub fn parse_floor(text: &str) -> Option<u32> {
    let caps = floor_re().captures(text)?;
    caps[1].parse().ok()
}

/// Reads an `H:MM:SS` countdown.
pub fn parse_clock(text: &str) -> Option<Duration> {
    let caps = clock_re().captures(text)?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
}
