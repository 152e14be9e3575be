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

//! Console commands read from standard input while running.

use anyhow::bail;
use std::str::FromStr;

/// One line typed on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the start-up sequence.
    Start,
    /// Pause every module, keep the current run state.
    Pause,
    /// Pause everything and abort a running expedition.
    Stop,
    /// Restart collection if nothing else holds the device.
    Resume,
    /// Run the research flow now.
    Research,
    /// Request an expedition run.
    Expedition,
    /// Request a rift run.
    Rift,
    /// Continue a rift run paused on a sweep.
    Continue,
    /// Print the task flag, module states and timers.
    Status,
    /// Shut down and exit.
    Quit,
}

impl Command {
    /// Every command word, for the help line.
    pub const WORDS: &'static str =
        "start, pause, stop, resume, research, expedition, rift, continue, status, quit";
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let word = line.trim().to_ascii_lowercase();
        let command = match word.as_str() {
            "start" => Command::Start,
            "pause" => Command::Pause,
            "stop" => Command::Stop,
            "resume" => Command::Resume,
            "research" => Command::Research,
            "expedition" => Command::Expedition,
            "rift" => Command::Rift,
            "continue" | "c" => Command::Continue,
            "status" | "s" => Command::Status,
            "quit" | "exit" | "q" => Command::Quit,
            "" => bail!("empty command"),
            other => bail!("unknown command '{other}' (expected one of: {})", Self::WORDS),
        };
        Ok(command)
    }
}
