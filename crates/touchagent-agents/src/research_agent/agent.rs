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

use crate::keys::research as keys;
use crate::screen::Screen;
use std::sync::{Arc, Weak};
use touchagent_control::{CoordinationContext, TimerCallback, TimerManager};
use touchagent_core::{
    Agent, AgentId, Frame, ReadyEvent, ResearchAgent, ResearchOutcome, Signal, TimerKind,
};

const DONE_THRESHOLD: f32 = 0.8;
const ACCELERATE_ON_THRESHOLD: f32 = 0.75;
const ACCELERATE_MARGIN: f32 = 0.01;
const PAGE_THRESHOLD: f32 = 0.8;

/// Cooldown of the free accelerate, in seconds.
const ACCELERATE_COOLDOWN_SECS: u64 = 7199;
/// Time taken off the running research by one free accelerate, in seconds.
const ACCELERATE_REDUCTION_SECS: u64 = 1800;
/// Used when the cooldown label cannot be read.
const FALLBACK_COOLDOWN_SECS: u64 = 60;
const HOME_ATTEMPTS: u32 = 3;

/// Marks the flow finished when dropped.
struct FlowGuard<'a> {
    running: &'a Signal,
    ready: &'a ReadyEvent,
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        self.running.clear();
        self.ready.set();
    }
}

/// The research module.
pub struct ResearchFlow {
    ctx: Arc<CoordinationContext>,
    screen: Arc<Screen>,
    timers: Arc<TimerManager>,
    running: Signal,
    ready: ReadyEvent,
}

impl ResearchFlow {
    /// Creates the module. Countdowns are written to `timers`.
    pub fn new(
        ctx: Arc<CoordinationContext>,
        screen: Arc<Screen>,
        timers: Arc<TimerManager>,
    ) -> Self {
        Self {
            ctx,
            screen,
            timers,
            running: Signal::new(),
            ready: ReadyEvent::new(),
        }
    }

    fn begin(&self) -> FlowGuard<'_> {
        self.running.set();
        self.ready.clear();
        FlowGuard {
            running: &self.running,
            ready: &self.ready,
        }
    }

    fn expiry_callback(&self, kind: TimerKind) -> TimerCallback {
        let ctx: Weak<CoordinationContext> = Arc::downgrade(&self.ctx);
        Box::new(move || {
            if let Some(ctx) = ctx.upgrade() {
                ctx.timer_expired(kind);
            }
        })
    }

    fn arm(&self, kind: TimerKind, seconds: u64) {
        self.timers
            .set(kind, seconds, Some(self.expiry_callback(kind)));
    }

    fn accelerate_available(&self, frame: &Frame) -> bool {
        let on = self
            .screen
            .match_score(frame, keys::ACCELERATE_ON_TEMPLATE, keys::ACCELERATE_REGION)
            .unwrap_or(0.0);
        let off = self
            .screen
            .match_score(frame, keys::ACCELERATE_OFF_TEMPLATE, keys::ACCELERATE_REGION)
            .unwrap_or(0.0);
        log::debug!("Research: accelerate scores on={on:.3} off={off:.3}.");
        on > ACCELERATE_ON_THRESHOLD && on - off > ACCELERATE_MARGIN
    }

    fn arm_cooldown(&self, frame: &Frame) {
        let cooldown = self
            .screen
            .read_duration(frame, keys::COOLDOWN_REGION)
            .map(|d| d.as_secs())
            .unwrap_or(FALLBACK_COOLDOWN_SECS);
        self.arm(TimerKind::Accelerate, cooldown);
    }

    fn arm_remaining(&self, frame: &Frame) {
        match self.screen.read_duration(frame, keys::REMAINING_REGION) {
            Some(remaining) => self.arm(TimerKind::Research, remaining.as_secs()),
            None => log::warn!("Research: remaining time not readable."),
        }
    }

    fn start_new_research(&self, frame: &Frame) {
        log::info!("Research: starting new research.");
        self.screen.tap(keys::CLOSE_DONE, 600);

        match self
            .screen
            .locate_text(frame, keys::AVAILABLE_REGION, keys::AVAILABLE_TEXT)
        {
            Some(point) => self.screen.tap_point(point, 500),
            None => self.screen.tap(keys::AVAILABLE_DEFAULT, 500),
        };
        self.screen.tap(keys::START, 800);
        self.screen.tap(keys::HELP, 500);
    }

    fn use_accelerate(&self) {
        log::info!("Research: using free accelerate.");
        self.screen.tap(keys::ACCELERATE, 500);
        self.screen.tap(keys::FREE_REDUCE, 1500);
    }

    fn return_home(&self) -> bool {
        for attempt in 1..=HOME_ATTEMPTS {
            self.screen.tap(keys::CLOSE, 2500);
            if let Some(frame) = self.screen.capture() {
                if !self
                    .screen
                    .matches(&frame, keys::PAGE_TEMPLATE, keys::PAGE_REGION, PAGE_THRESHOLD)
                {
                    return true;
                }
            }
            log::debug!("Research: still on the research page ({attempt}/{HOME_ATTEMPTS}).");
        }
        log::warn!("Research: could not confirm the home screen.");
        false
    }

    fn run_flow(&self) -> ResearchOutcome {
        // 1. Open the research page.
        self.screen.tap(keys::OPEN, 4000);
        let Some(frame) = self.screen.capture_retry(3, 1000) else {
            log::error!("Research: no screenshot of the research page.");
            return ResearchOutcome::CaptureFailed;
        };

        // 2. Completed, running or idle.
        if self
            .screen
            .matches(&frame, keys::DONE_TEMPLATE, keys::DONE_REGION, DONE_THRESHOLD)
        {
            self.start_new_research(&frame);
        } else if self
            .screen
            .contains_text(&frame, keys::STATUS_REGION, &keys::STATUS_TEXT)
        {
            log::info!("Research: research in progress.");
            self.arm_remaining(&frame);
            if self.accelerate_available(&frame) {
                self.use_accelerate();
                let Some(after) = self.screen.capture() else {
                    return ResearchOutcome::CaptureFailed;
                };
                self.arm_remaining(&after);
                self.arm(TimerKind::Accelerate, ACCELERATE_COOLDOWN_SECS);
            } else {
                self.arm_cooldown(&frame);
            }
        } else {
            self.start_new_research(&frame);
        }

        // 3. Home.
        ResearchOutcome::Completed {
            home_confirmed: self.return_home(),
        }
    }

    fn accelerate_flow(&self) -> ResearchOutcome {
        self.screen.tap(keys::OPEN, 1200);
        let Some(frame) = self.screen.capture() else {
            return ResearchOutcome::CaptureFailed;
        };

        if self.accelerate_available(&frame) {
            self.use_accelerate();
            self.arm(TimerKind::Accelerate, ACCELERATE_COOLDOWN_SECS);
            if let Some(remaining) = self.timers.remaining(TimerKind::Research) {
                self.arm(
                    TimerKind::Research,
                    remaining.saturating_sub(ACCELERATE_REDUCTION_SECS),
                );
            }
        } else {
            log::info!("Research: accelerate still cooling down.");
            self.arm_cooldown(&frame);
        }

        ResearchOutcome::Completed {
            home_confirmed: self.return_home(),
        }
    }
}

impl Agent for ResearchFlow {
    fn id(&self) -> AgentId {
        AgentId::Research
    }

    fn is_running(&self) -> bool {
        self.running.is_set()
    }
}

impl ResearchAgent for ResearchFlow {
    fn run(&self) -> ResearchOutcome {
        let _flow = self.begin();
        log::info!("Research: flow started.");
        let outcome = self.run_flow();
        log::info!("Research: flow finished ({outcome:?}).");
        outcome
    }

    fn try_accelerate(&self) -> ResearchOutcome {
        let _flow = self.begin();
        log::info!("Research: accelerate flow started.");
        let outcome = self.accelerate_flow();
        log::info!("Research: accelerate flow finished ({outcome:?}).");
        outcome
    }

    fn ready(&self) -> &ReadyEvent {
        &self.ready
    }
}
