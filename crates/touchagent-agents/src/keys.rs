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

//! Layout keys and template ids used by the modules.
//!
//! Points, regions and swipes are looked up in the `[layout]` section of the
//! configuration; templates are `<template_dir>/<id>.png`.

/// Keys shared by several modules.
pub mod home {
    /// Region holding the home screen marker.
    pub const REGION: &str = "home.region";
    /// Template of the home screen marker.
    pub const TEMPLATE: &str = "home";
    /// Region where the idle-squad icon appears on the home screen.
    pub const IDLE_SQUAD_REGION: &str = "home.idle_squad_region";
    /// Template of the idle-squad icon.
    pub const IDLE_SQUAD_TEMPLATE: &str = "idle_squad";
}

/// Collection and assist watcher keys.
pub mod collect {
    /// The tap point for a resource label, `collect.<label>`.
    pub fn resource(label: &str) -> String {
        format!("collect.{label}")
    }

    /// Region searched for the chat close button.
    pub const CHAT_CLOSE_REGION: &str = "assist.chat_close_region";
    /// Chat close button.
    pub const CHAT_CLOSE: &str = "assist.chat_close";
    /// Template of the chat close button.
    pub const CHAT_CLOSE_TEMPLATE: &str = "chat_close";
    /// Region searched for the assist icon.
    pub const ASSIST_REGION: &str = "assist.icon_region";
    /// Assist button.
    pub const ASSIST: &str = "assist.button";
    /// Template of the assist icon.
    pub const ASSIST_TEMPLATE: &str = "assist";
}

/// Expedition keys.
pub mod expedition {
    pub const OPEN: &str = "expedition.open";
    pub const PAGE_REGION: &str = "expedition.page_region";
    pub const PAGE_TEMPLATE: &str = "expedition_page";

    pub const POPUP_CLOSE: &str = "expedition.popup_close";
    /// `(template, region)` of every popup dismissed while waiting for a page.
    pub const POPUPS: [(&str, &str); 4] = [
        ("popup_event_complete", "expedition.event_complete_region"),
        ("popup_crusade_success", "expedition.crusade_success_region"),
        ("popup_congratulations", "expedition.congratulations_region"),
        ("popup_gather_success", "expedition.gather_success_region"),
    ];

    pub const TERRITORY: &str = "expedition.territory";
    pub const CLAIM_ALL: &str = "expedition.claim_all";
    pub const CLOSE_TERRITORY: &str = "expedition.close_territory";

    pub const SCOUT_ENERGY_REGION: &str = "scout.energy_region";
    pub const SCOUT: &str = "scout.button";

    pub const EVENTS: &str = "expedition.events";
    pub const EVENT_PAGE_REGION: &str = "expedition.event_page_region";
    pub const EVENT_PAGE_TEMPLATE: &str = "event_page";
    pub const RESOURCE_TAB: &str = "expedition.resource_tab";
    pub const CLOSE_EVENTS: &str = "expedition.close_events";
    pub const SCROLL: &str = "expedition.scroll";

    pub const RESOURCE_LIST_REGION: &str = "expedition.resource_list_region";
    pub const MARKER_TEMPLATE: &str = "unclaimed_marker";
    /// Offset from a marker centre to its "go" button, stored as a point.
    pub const GO_OFFSET: &str = "expedition.go_offset";
    pub const GO_REGION: &str = "expedition.go_region";

    pub const DETAIL_CENTRE: &str = "expedition.detail_centre";
    pub const GATHER: &str = "expedition.gather";
    pub const IDLE_TROOP_REGION: &str = "expedition.idle_troop_region";
    pub const IDLE_TROOP_TEMPLATE: &str = "idle_troop";
    pub const DISPATCH: &str = "expedition.dispatch";
    pub const BACK_TO_EVENTS: &str = "expedition.back_to_events";

    pub const EXIT: &str = "expedition.exit";
}

/// Research keys.
pub mod research {
    pub const OPEN: &str = "research.open";
    pub const CLOSE: &str = "research.close";
    pub const DONE_REGION: &str = "research.done_region";
    pub const DONE_TEMPLATE: &str = "research_done";
    pub const CLOSE_DONE: &str = "research.close_done";
    pub const AVAILABLE_REGION: &str = "research.available_region";
    /// Tapped when the "available" label cannot be located.
    pub const AVAILABLE_DEFAULT: &str = "research.available_default";
    pub const AVAILABLE_TEXT: &str = "可研发";
    pub const START: &str = "research.start";
    pub const HELP: &str = "research.help";
    pub const STATUS_REGION: &str = "research.status_region";
    pub const STATUS_TEXT: [&str; 3] = ["研究", "研", "究"];
    pub const REMAINING_REGION: &str = "research.remaining_region";
    pub const ACCELERATE_REGION: &str = "research.accelerate_region";
    pub const ACCELERATE_ON_TEMPLATE: &str = "accelerate_on";
    pub const ACCELERATE_OFF_TEMPLATE: &str = "accelerate_off";
    pub const ACCELERATE: &str = "research.accelerate";
    pub const FREE_REDUCE: &str = "research.free_reduce";
    pub const COOLDOWN_REGION: &str = "research.cooldown_region";
    /// Region holding the research page icon; it disappears once home.
    pub const PAGE_REGION: &str = "research.page_region";
    pub const PAGE_TEMPLATE: &str = "research_page";
}

/// Rift keys.
pub mod rift {
    pub const AD_REGION: &str = "rift.ad_region";
    pub const AD_TEMPLATE: &str = "rift_ad";
    pub const CLOSE_AD: &str = "rift.close_ad";
    pub const REWARD_REGION: &str = "rift.reward_region";
    pub const REWARD_TEMPLATE: &str = "rift_reward";
    pub const CLOSE_REWARD: &str = "rift.close_reward";
    pub const FAILURE_REGION: &str = "rift.failure_region";
    pub const FAILURE_TEMPLATE: &str = "rift_failure";
    pub const CLOSE_FAILURE: &str = "rift.close_failure";
    pub const CHALLENGE_REGION: &str = "rift.challenge_region";
    pub const CHALLENGE_TEMPLATE: &str = "rift_challenge";
    pub const CHALLENGE: &str = "rift.challenge";
    pub const SWEEP_REGION: &str = "rift.sweep_region";
    pub const SWEEP_TEMPLATE: &str = "rift_sweep";
    pub const BATTLE_REGION: &str = "rift.battle_region";
    pub const BATTLE_TEMPLATE: &str = "rift_battle";
    pub const SKIP_REGION: &str = "rift.skip_region";
    pub const SKIP_TEMPLATE: &str = "rift_skip";
    pub const SKIP: &str = "rift.skip";
    pub const CONTINUE_REGION: &str = "rift.continue_region";
    pub const CONTINUE_TEMPLATE: &str = "rift_continue";
    pub const CONTINUE: &str = "rift.continue";
    pub const RETURN_HOME: &str = "rift.return_home";
    pub const LEVEL_REGION: &str = "rift.level_region";
}
