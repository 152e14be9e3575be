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

use super::phase::{observe, Observation, RiftPhase, RiftState};
use crate::keys::rift as keys;
use crate::screen::Screen;
use crate::worker::{LoopHandle, LoopSlot};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use touchagent_control::CoordinationContext;
use touchagent_core::{
    Agent, AgentId, AgentStatus, ControlChannel, ControlCommand, ControlReply, Frame, RiftAgent,
    Signal, StreamSource,
};

const MIN_FRAME_SIDE: u32 = 100;
const READY_POLLS: u32 = 10;
const READY_POLL_MS: u64 = 200;
const PAUSED_POLL_MS: u64 = 500;
const NO_FRAME_MS: u64 = 200;
const STALE_FRAME_MS: u64 = 50;

/// The rift module.
pub struct RiftLoop {
    ctx: Arc<CoordinationContext>,
    screen: Arc<Screen>,
    stream: Arc<dyn StreamSource>,
    control: Arc<dyn ControlChannel>,
    slot: LoopSlot,
    paused: Arc<Signal>,
    state: Arc<Mutex<RiftState>>,
    exit_timeout: Duration,
}

impl RiftLoop {
    /// Creates a stopped module. `screen` must capture from `stream`.
    pub fn new(
        ctx: Arc<CoordinationContext>,
        screen: Arc<Screen>,
        stream: Arc<dyn StreamSource>,
        control: Arc<dyn ControlChannel>,
        exit_timeout: Duration,
    ) -> Self {
        Self {
            ctx,
            screen,
            stream,
            control,
            slot: LoopSlot::default(),
            paused: Arc::new(Signal::new()),
            state: Arc::new(Mutex::new(RiftState::new(0))),
            exit_timeout,
        }
    }

    /// A snapshot of the current run's counters.
    pub fn state(&self) -> RiftState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the loop is waiting for [`RiftAgent::resume`].
    pub fn is_paused(&self) -> bool {
        self.paused.is_set()
    }

    fn switch_to_video(&self) -> bool {
        match self.control.send(ControlCommand::SwitchToVideo) {
            Some(reply) => log::info!("RiftAgent: switch to video answered {reply:?}."),
            None => log::warn!("RiftAgent: no answer to the video switch, trying the stream anyway."),
        }
        self.screen.sleep_ms(500);

        self.stream.stop();
        if !self.stream.start() {
            log::error!("RiftAgent: video stream could not be started.");
            return false;
        }
        for _ in 0..READY_POLLS {
            if self.stream.is_ready() {
                return true;
            }
            self.screen.sleep_ms(READY_POLL_MS);
        }
        log::warn!("RiftAgent: no decoded frame yet, starting the loop anyway.");
        true
    }
}

impl Agent for RiftLoop {
    fn id(&self) -> AgentId {
        AgentId::Rift
    }

    fn is_running(&self) -> bool {
        self.slot.is_running()
    }

    fn report_status(&self) -> AgentStatus {
        let state = self.state();
        let level = state
            .level
            .map_or_else(|| "?".to_string(), |l| l.to_string());
        AgentStatus {
            agent: AgentId::Rift,
            running: self.is_running(),
            detail: format!(
                "level {level}, failures {}/{}, {:?}{}",
                state.failures,
                state.retry_limit,
                state.phase,
                if self.is_paused() { ", paused" } else { "" }
            ),
        }
    }
}

impl RiftAgent for RiftLoop {
    fn start(&self, retry_limit: u32, force: bool) -> bool {
        if self.slot.is_running() && !force {
            log::info!("RiftAgent: already running.");
            return false;
        }
        self.slot.stop();
        if !self.slot.await_exit(self.exit_timeout) {
            log::warn!("RiftAgent: previous loop did not exit in time.");
        }

        if !self.switch_to_video() {
            return false;
        }

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = RiftState::new(retry_limit);
        self.paused.clear();

        let mut handle = LoopHandle::new();
        let worker = RiftWorker {
            ctx: Arc::clone(&self.ctx),
            screen: Arc::clone(&self.screen),
            stream: Arc::clone(&self.stream),
            control: Arc::clone(&self.control),
            paused: Arc::clone(&self.paused),
            shared: Arc::clone(&self.state),
            running: handle.running(),
            state: RiftState::new(retry_limit),
        };
        handle.spawn("rift-loop", move |_done| worker.run());
        self.slot.install(handle);
        log::info!("RiftAgent: started (retry limit {retry_limit}).");
        true
    }

    fn stop(&self) {
        self.slot.stop();
    }

    fn await_exit(&self, timeout: Duration) -> bool {
        self.slot.await_exit(timeout)
    }

    fn resume(&self) -> bool {
        if !self.slot.is_running() {
            log::info!("RiftAgent: resume ignored, not running.");
            return false;
        }
        if self.paused.replace(false) {
            log::info!("RiftAgent: resumed.");
        }
        true
    }
}

/// The state owned by the loop thread.
struct RiftWorker {
    ctx: Arc<CoordinationContext>,
    screen: Arc<Screen>,
    stream: Arc<dyn StreamSource>,
    control: Arc<dyn ControlChannel>,
    paused: Arc<Signal>,
    shared: Arc<Mutex<RiftState>>,
    running: Arc<Signal>,
    state: RiftState,
}

impl RiftWorker {
    fn run(mut self) {
        log::info!("Rift thread started.");
        while self.running.is_set() {
            // 1. Manual pause.
            if self.paused.is_set() {
                self.screen.sleep_ms(PAUSED_POLL_MS);
                continue;
            }

            // 2. A fresh, usable frame.
            let Some(frame) = self.screen.capture() else {
                self.screen.sleep_ms(NO_FRAME_MS);
                continue;
            };
            if !frame.is_at_least(MIN_FRAME_SIDE, MIN_FRAME_SIDE) {
                log::debug!("RiftAgent: frame {frame:?} too small, skipped.");
                self.screen.sleep_ms(NO_FRAME_MS);
                continue;
            }
            if !self.state.accept_frame(frame.seq()) {
                self.screen.sleep_ms(STALE_FRAME_MS);
                continue;
            }

            // 3. First recognised condition.
            let Some(observation) =
                observe(&self.screen, &frame, self.state.phase, self.paused.is_set())
            else {
                continue;
            };
            let phase = self.state.phase;
            self.state.phase = phase.next(observation);

            if observation == Observation::Home {
                self.finish(phase == RiftPhase::ReturningHome);
                break;
            }
            self.act(observation, &frame);
            self.publish();
        }

        if self.running.replace(false) {
            log::info!("RiftAgent: stopped before reaching home.");
        }
        self.stream.stop();
        log::info!("Rift thread stopped.");
    }

    fn act(&mut self, observation: Observation, frame: &Frame) {
        match observation {
            Observation::Home => {}
            Observation::Ad => {
                self.screen.tap(keys::CLOSE_AD, 1200);
            }
            Observation::Reward => {
                self.screen.tap(keys::CLOSE_REWARD, 1500);
            }
            Observation::Failure => self.on_failure(frame),
            Observation::Challenge => {
                log::debug!("RiftAgent: challenge.");
                self.screen.tap(keys::CHALLENGE, 1500);
            }
            Observation::Sweep => {
                log::info!("RiftAgent: sweep available, waiting for the user.");
                self.paused.set();
                self.ctx
                    .notify("Rift", "sweep available, press continue when done");
                self.ctx.request_pause_all(AgentId::Rift);
                self.screen.sleep_ms(500);
            }
            Observation::BattleAnim => {
                self.screen.sleep_ms(500);
            }
            Observation::Skip => {
                self.screen.tap(keys::SKIP, 1200);
            }
            Observation::Continue => {
                self.state.on_level_clear();
                if let Some(level) = self.state.level {
                    log::info!("RiftAgent: floor cleared, now on {level}.");
                    self.ctx.report_rift_level(level, self.state.failures);
                }
                self.screen.tap(keys::CONTINUE, 1500);
            }
        }
    }

    fn on_failure(&mut self, frame: &Frame) {
        if let Some(level) = self.screen.read_floor(frame, keys::LEVEL_REGION) {
            self.state.level = Some(level);
        }
        self.screen.tap(keys::CLOSE_FAILURE, 1500);
        if let Some(after) = self.screen.capture() {
            if self
                .screen
                .matches(&after, keys::AD_TEMPLATE, keys::AD_REGION, 0.8)
            {
                self.screen.tap(keys::CLOSE_AD, 1500);
            }
        }

        let gave_up = self.state.on_failure();
        log::info!(
            "RiftAgent: battle lost ({}/{}).",
            self.state.failures,
            self.state.retry_limit
        );
        if let Some(level) = self.state.level {
            self.ctx.report_rift_level(level, self.state.failures);
        }

        if gave_up {
            log::warn!("RiftAgent: failure limit reached, returning home.");
            for _ in 0..2 {
                self.screen.tap(keys::RETURN_HOME, 1200);
            }
        }
    }

    fn finish(&mut self, gave_up: bool) {
        if gave_up {
            log::warn!("RiftAgent: back home after giving up.");
            self.ctx.notify(
                "Rift",
                &format!("gave up after {} failures", self.state.failures),
            );
        } else {
            log::info!("RiftAgent: back home.");
            self.ctx.notify("Rift", "run finished");
        }
        self.publish();

        match self.control.send(ControlCommand::SwitchToScreenshot) {
            Some(ControlReply::ScreenshotAck) => {}
            other => log::warn!("RiftAgent: screenshot switch answered {other:?}."),
        }
        self.stream.stop();
        self.running.clear();
        self.ctx.request_resume_after(AgentId::Rift);
    }

    fn publish(&self) {
        *self.shared.lock().unwrap_or_else(PoisonError::into_inner) = self.state.clone();
    }
}
