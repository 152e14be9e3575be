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

use super::watcher::{inspect, WatchAction};
use crate::keys::collect;
use crate::screen::Screen;
use crate::worker::{LoopHandle, LoopSlot};
use std::sync::Arc;
use std::time::Duration;
use touchagent_control::CoordinationContext;
use touchagent_core::{Agent, AgentId, CollectionAgent, Signal};

const PAUSED_POLL_MS: u64 = 500;
const TAP_DELAY_MS: u64 = 10;
const TAP_GAP_MS: u64 = 175;
const CYCLE_GAP_MS: u64 = 10;
const WATCH_RETRY_MS: u64 = 1000;
const WATCH_ACTION_MS: u64 = 1000;
const WATCH_IDLE_STEPS: u32 = 8;

/// The collection module: a resource tap loop plus the assist watcher.
pub struct CollectionLoop {
    ctx: Arc<CoordinationContext>,
    screen: Arc<Screen>,
    slot: LoopSlot,
    exit_timeout: Duration,
}

impl CollectionLoop {
    /// Creates a stopped module. `exit_timeout` bounds how long a restart waits for
    /// the previous loops to exit.
    pub fn new(ctx: Arc<CoordinationContext>, screen: Arc<Screen>, exit_timeout: Duration) -> Self {
        Self {
            ctx,
            screen,
            slot: LoopSlot::default(),
            exit_timeout,
        }
    }
}

impl Agent for CollectionLoop {
    fn id(&self) -> AgentId {
        AgentId::Collection
    }

    fn is_running(&self) -> bool {
        self.slot.is_running()
    }
}

impl CollectionAgent for CollectionLoop {
    fn start(&self, resources: Vec<String>) {
        self.slot.stop();
        if !self.slot.await_exit(self.exit_timeout) {
            log::warn!("Collection: previous loops did not exit in time, starting anyway.");
        }

        log::info!("Collection: starting with resources {resources:?}.");
        let mut handle = LoopHandle::new();

        let (ctx, screen, running) = (
            Arc::clone(&self.ctx),
            Arc::clone(&self.screen),
            handle.running(),
        );
        handle.spawn("collection-tap", move |_done| {
            tap_loop(&ctx, &screen, &running, &resources)
        });

        let (ctx, screen, running) = (
            Arc::clone(&self.ctx),
            Arc::clone(&self.screen),
            handle.running(),
        );
        handle.spawn("assist-watcher", move |_done| {
            watch_loop(&ctx, &screen, &running)
        });

        self.slot.install(handle);
    }

    fn stop(&self) {
        self.slot.stop();
    }

    fn await_exit(&self, timeout: Duration) -> bool {
        self.slot.await_exit(timeout)
    }
}

fn tap_loop(ctx: &CoordinationContext, screen: &Screen, running: &Signal, resources: &[String]) {
    log::info!("Collection tap thread started.");
    let keys: Vec<String> = resources.iter().map(|r| collect::resource(r)).collect();

    while running.is_set() {
        // 1. Suspend while any pause covering collection is raised.
        if ctx.pause.collection_paused() {
            screen.sleep_ms(PAUSED_POLL_MS);
            continue;
        }

        // 2. One pass over the resource buttons, in order.
        for key in &keys {
            if !running.is_set() || ctx.pause.collection_paused() {
                break;
            }
            screen.tap(key, TAP_DELAY_MS);
            screen.sleep_ms(TAP_GAP_MS);
        }

        screen.sleep_ms(CYCLE_GAP_MS);
    }
    log::info!("Collection tap thread stopped.");
}

fn watch_loop(ctx: &CoordinationContext, screen: &Screen, running: &Signal) {
    log::info!("Assist watcher thread started.");

    while running.is_set() {
        if ctx.pause.collection_paused() {
            screen.sleep_ms(PAUSED_POLL_MS);
            continue;
        }

        let Some(frame) = screen.capture() else {
            screen.sleep_ms(WATCH_RETRY_MS);
            continue;
        };

        let armed = ctx.config().expedition_enabled && !ctx.expedition_running().is_set();
        match inspect(screen, &frame, armed) {
            Some(WatchAction::CloseChat) => {
                log::debug!("Collection: closing chat overlay.");
                screen.tap(collect::CHAT_CLOSE, WATCH_ACTION_MS);
                continue;
            }
            Some(WatchAction::Assist) => {
                log::debug!("Collection: helping allies.");
                screen.tap(collect::ASSIST, WATCH_ACTION_MS);
                continue;
            }
            Some(WatchAction::IdleSquad) => {
                log::info!("Collection: idle squads detected, requesting expedition.");
                ctx.notify("Expedition", "idle squads detected, starting expedition");
                ctx.request_pause_all(AgentId::Collection);
                running.clear();
                ctx.pending.expedition.raise();
                break;
            }
            None => {}
        }

        for _ in 0..WATCH_IDLE_STEPS {
            if !running.is_set() {
                break;
            }
            screen.sleep_ms(WATCH_ACTION_MS);
        }
    }
    log::info!("Assist watcher thread stopped.");
}
