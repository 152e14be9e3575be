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

use crate::keys::{collect, home};
use crate::screen::Screen;
use touchagent_core::Frame;

const CHAT_CLOSE_THRESHOLD: f32 = 0.8;
const ASSIST_THRESHOLD: f32 = 0.8;
const IDLE_SQUAD_THRESHOLD: f32 = 0.85;

/// What the assist watcher should do about one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    /// The chat overlay is open.
    CloseChat,
    /// An ally asked for help.
    Assist,
    /// Squads are idle; hand over to the expedition module.
    IdleSquad,
}

/// Decides the watcher action for `frame`, first match wins.
///
/// Idle squads are only reported when `expedition_armed` is set, i.e. expeditions
/// are enabled and none is already running.
pub fn inspect(screen: &Screen, frame: &Frame, expedition_armed: bool) -> Option<WatchAction> {
    if screen.matches(
        frame,
        collect::CHAT_CLOSE_TEMPLATE,
        collect::CHAT_CLOSE_REGION,
        CHAT_CLOSE_THRESHOLD,
    ) {
        return Some(WatchAction::CloseChat);
    }
    if screen.matches(
        frame,
        collect::ASSIST_TEMPLATE,
        collect::ASSIST_REGION,
        ASSIST_THRESHOLD,
    ) {
        return Some(WatchAction::Assist);
    }
    if expedition_armed
        && screen.matches(
            frame,
            home::IDLE_SQUAD_TEMPLATE,
            home::IDLE_SQUAD_REGION,
            IDLE_SQUAD_THRESHOLD,
        )
    {
        return Some(WatchAction::IdleSquad);
    }
    None
}
