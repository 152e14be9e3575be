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

//! The pause / handoff / resume protocol.
//!
//! Every decision that writes the task flag is taken under the `handoff` mutex, and
//! that mutex is released before any blocking call (waiting for loops to exit,
//! running a flow, polling the device). A `lease` records which exclusive module
//! currently owns the device so that a resume cannot start collection underneath it.

use super::OrchestratorConfig;
use crate::context::CoordinationContext;
use crate::registry::AgentSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Instant;
use touchagent_core::{
    AgentId, CaptureMode, ControlChannel, CoordinatorHooks, ExpeditionOutcome, ResearchOutcome,
    Signal, TaskFlag, TimerKind,
};

/// Events handled by the orchestrator loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OrchestratorEvent {
    Timer(TimerKind),
}

pub(crate) struct Shared {
    pub(crate) ctx: Arc<CoordinationContext>,
    pub(crate) agents: AgentSet,
    control: Arc<dyn ControlChannel>,
    config: OrchestratorConfig,
    handoff: Mutex<()>,
    lease: Mutex<Option<AgentId>>,
    /// Set by stop-all; cleared by start-all and an explicit resume.
    stopped: Signal,
    last_research_trigger: Mutex<Option<Instant>>,
}

impl Shared {
    pub(crate) fn new(
        ctx: Arc<CoordinationContext>,
        agents: AgentSet,
        control: Arc<dyn ControlChannel>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            ctx,
            agents,
            control,
            config,
            handoff: Mutex::new(()),
            lease: Mutex::new(None),
            stopped: Signal::new(),
            last_research_trigger: Mutex::new(None),
        }
    }

    fn lock_handoff(&self) -> MutexGuard<'_, ()> {
        self.handoff.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lease(&self) -> Option<AgentId> {
        *self.lease.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_lease(&self, holder: Option<AgentId>) {
        *self.lease.lock().unwrap_or_else(PoisonError::into_inner) = holder;
    }

    fn release_lease(&self, holder: AgentId) {
        let mut lease = self.lease.lock().unwrap_or_else(PoisonError::into_inner);
        if *lease == Some(holder) {
            *lease = None;
        }
    }

    pub(crate) fn poll_interval(&self) -> std::time::Duration {
        self.config.poll_interval
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.is_set()
    }

    // --- Pause / resume ---

    /// Pause-all. Must be called with the handoff mutex held.
    ///
    /// A pause requested by the rift loop itself (sweep) leaves rift running and the
    /// flag on rift. A research or expedition lease keeps its flag; those flows
    /// release it when they return.
    fn pause_all_locked(&self, requester: Option<AgentId>) {
        self.ctx.pause.global.set();
        self.agents.collection.stop();

        if requester == Some(AgentId::Rift) {
            log::info!("Orchestrator: rift requested a manual pause.");
            return;
        }

        self.agents.rift.stop();
        self.release_lease(AgentId::Rift);
        if self.lease().is_none() {
            self.ctx.set_task_flag(TaskFlag::Idle);
        }
        match requester {
            Some(agent) => log::info!("Orchestrator: paused everything for {agent}."),
            None => log::debug!("Orchestrator: paused everything."),
        }
    }

    pub(crate) fn pause_all(&self, requester: Option<AgentId>) {
        let _guard = self.lock_handoff();
        self.pause_all_locked(requester);
    }

    /// Starts collection when nothing else holds the device. Returns whether it did.
    pub(crate) fn resume_internal(&self) -> bool {
        let resources = {
            let _guard = self.lock_handoff();
            if self.stopped.is_set() {
                log::debug!("Orchestrator: resume skipped, automation is stopped.");
                return false;
            }
            let flag = self.ctx.task_flag();
            if flag != TaskFlag::Idle {
                log::debug!("Orchestrator: resume skipped, flag is {flag}.");
                return false;
            }
            if let Some(holder) = self.lease().or_else(|| self.agents.busy_exclusive()) {
                log::debug!("Orchestrator: resume skipped, {holder} still holds the device.");
                return false;
            }
            let config = self.ctx.config();
            if !config.collect_enabled {
                log::info!("Orchestrator: collection disabled, staying idle.");
                return false;
            }
            self.ctx.pause.global.clear();
            self.ctx.set_task_flag(TaskFlag::Collecting);
            config.resources
        };

        log::info!("Orchestrator: resuming collection of {resources:?}.");
        self.agents.collection.start(resources);

        // A handoff may have taken the device while the loops were starting.
        if self.ctx.task_flag() != TaskFlag::Collecting {
            log::debug!("Orchestrator: device taken during resume, stopping collection.");
            self.agents.collection.stop();
        }
        true
    }

    /// Lifts a stop-all, including the expedition pause it set. The collection loops
    /// also honour that pause, so leaving it set would start them paused.
    pub(crate) fn clear_stopped(&self) {
        if self.stopped.replace(false) {
            self.ctx.pause.expedition.clear();
        }
    }

    pub(crate) fn resume(&self) -> bool {
        self.clear_stopped();
        self.resume_internal()
    }

    /// Resume-after hook: `agent` finished and reported the home screen.
    pub(crate) fn resume_after(&self, agent: AgentId) {
        if agent == AgentId::Rift && !self.confirm_screenshot_mode() {
            {
                let _guard = self.lock_handoff();
                self.release_lease(AgentId::Rift);
                self.ctx.release_task_flag(TaskFlag::Rift, TaskFlag::Idle);
            }
            self.ctx.notify(
                "Rift",
                "device did not return to screenshot mode, collection not resumed",
            );
            return;
        }

        {
            let _guard = self.lock_handoff();
            self.release_lease(agent);
            self.ctx
                .release_task_flag(TaskFlag::for_agent(agent), TaskFlag::Idle);
        }
        log::info!("Orchestrator: {agent} finished, resuming.");
        self.resume_internal();
    }

    fn confirm_screenshot_mode(&self) -> bool {
        for attempt in 1..=self.config.mode_confirm_attempts {
            let mode = self.control.query_mode();
            self.ctx.report_capture_mode(mode);
            if mode == Some(CaptureMode::Screenshot) {
                return true;
            }
            log::debug!(
                "Orchestrator: capture mode {mode:?} (attempt {attempt}/{}).",
                self.config.mode_confirm_attempts
            );
            thread::sleep(self.config.mode_confirm_interval);
        }
        false
    }

    pub(crate) fn stop_all(&self) {
        self.stopped.set();
        {
            let _guard = self.lock_handoff();
            self.pause_all_locked(None);
            self.ctx.pause.expedition.set();
            self.ctx.set_task_flag(TaskFlag::Idle);
        }
        self.ctx.notify("Orchestrator", "all modules stopped");
    }

    // --- Research ---

    /// Timed research trigger.
    pub(crate) fn on_timer(&self, kind: TimerKind) {
        loop {
            let wait = {
                let mut last = self
                    .last_research_trigger
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let now = Instant::now();
                match *last {
                    Some(prev) if now.duration_since(prev) < self.config.research_debounce => {
                        Some(self.config.research_debounce - now.duration_since(prev))
                    }
                    _ => {
                        *last = Some(now);
                        None
                    }
                }
            };
            match wait {
                Some(wait) => {
                    log::debug!("Orchestrator: {kind} trigger throttled for {wait:?}.");
                    thread::sleep(wait);
                }
                None => break,
            }
        }

        if self.stopped.is_set() {
            log::info!("Orchestrator: {kind} trigger ignored, automation is stopped.");
            return;
        }

        let flag = self.ctx.task_flag();
        if flag.yields_to_research() {
            self.run_exclusive_research(kind);
        } else if flag == TaskFlag::Expedition {
            log::info!(
                "Orchestrator: {kind} trigger during expedition, checking again in {:?}.",
                self.config.research_defer
            );
            thread::sleep(self.config.research_defer);
            let flag = self.ctx.task_flag();
            if !self.stopped.is_set() && flag.yields_to_research() {
                self.run_exclusive_research(kind);
            } else {
                log::info!("Orchestrator: {kind} trigger dropped, flag is still {flag}.");
            }
        } else {
            log::info!("Orchestrator: {kind} trigger ignored while {flag}.");
        }
    }

    /// Takes the device for research, runs one flow, then gives the device back.
    pub(crate) fn run_exclusive_research(&self, kind: TimerKind) -> bool {
        {
            let _guard = self.lock_handoff();
            let flag = self.ctx.task_flag();
            if !flag.yields_to_research() {
                log::info!("Orchestrator: research refused while {flag}.");
                return false;
            }
            if let Some(holder) = self.lease().or_else(|| self.agents.busy_exclusive()) {
                log::info!("Orchestrator: research refused, {holder} holds the device.");
                return false;
            }
            self.ctx.pause.research.set();
            self.pause_all_locked(Some(AgentId::Research));
            self.ctx.set_task_flag(TaskFlag::Researching);
            self.set_lease(Some(AgentId::Research));
        }

        if !self.agents.collection.await_exit(self.config.exit_timeout) {
            log::warn!("Orchestrator: collection did not acknowledge exit before research.");
        }

        let outcome = match kind {
            TimerKind::Research => self.agents.research.run(),
            TimerKind::Accelerate => self.agents.research.try_accelerate(),
        };
        if !self
            .agents
            .research
            .ready()
            .wait_timeout(self.config.exit_timeout)
        {
            log::warn!("Orchestrator: research did not signal readiness.");
        }
        match outcome {
            ResearchOutcome::Completed { home_confirmed } => {
                log::info!("Orchestrator: research finished (home confirmed: {home_confirmed}).")
            }
            ResearchOutcome::CaptureFailed => {
                log::warn!("Orchestrator: research aborted on capture failure.")
            }
        }

        {
            let _guard = self.lock_handoff();
            self.release_lease(AgentId::Research);
            self.ctx.pause.research.clear();
            self.ctx
                .release_task_flag(TaskFlag::Researching, TaskFlag::Idle);
        }
        self.resume_internal();
        true
    }

    // --- Handoffs ---

    /// Consumes pending handoff flags. Called once per scheduling pass.
    pub(crate) fn poll_handoffs(self: &Arc<Self>) {
        if self.ctx.pending.expedition.take() {
            self.begin_expedition();
        }
        if self.ctx.pending.rift.take() {
            let shared = Arc::clone(self);
            spawn_named("rift-start", move || {
                shared.start_rift();
            });
        }
    }

    fn begin_expedition(self: &Arc<Self>) {
        {
            let _guard = self.lock_handoff();
            if self.stopped.is_set() {
                log::info!("Orchestrator: expedition request dropped, automation is stopped.");
                return;
            }
            let flag = self.ctx.task_flag();
            if self.lease().is_some() || matches!(flag, TaskFlag::Researching | TaskFlag::Rift) {
                log::debug!("Orchestrator: expedition waits, flag is {flag}.");
                self.ctx.pending.expedition.raise();
                return;
            }
            if self.agents.expedition.is_running() || self.ctx.expedition_running().is_set() {
                log::info!("Orchestrator: expedition already running, request dropped.");
                return;
            }
            self.pause_all_locked(Some(AgentId::Expedition));
            self.ctx.set_task_flag(TaskFlag::Expedition);
            self.set_lease(Some(AgentId::Expedition));
            self.ctx.pause.expedition.clear();
        }

        let shared = Arc::clone(self);
        spawn_named("expedition-run", move || {
            if !shared.agents.collection.await_exit(shared.config.exit_timeout) {
                log::warn!("Orchestrator: collection did not acknowledge exit before expedition.");
            }
            let outcome = shared.agents.expedition.run_once();
            shared.finish_expedition(outcome);
        });
    }

    fn finish_expedition(&self, outcome: ExpeditionOutcome) {
        log::info!("Orchestrator: expedition ended with {outcome:?}.");
        if outcome == ExpeditionOutcome::HomeConfirmed {
            // The module normally reports home itself through the resume-after hook.
            if self.ctx.task_flag() == TaskFlag::Expedition {
                self.resume_after(AgentId::Expedition);
            }
            return;
        }

        {
            let _guard = self.lock_handoff();
            self.release_lease(AgentId::Expedition);
            self.ctx
                .release_task_flag(TaskFlag::Expedition, TaskFlag::Idle);
        }
        if outcome != ExpeditionOutcome::AlreadyRunning {
            self.ctx.notify(
                "Expedition",
                &format!("ended without reaching home ({outcome:?}), collection stays paused"),
            );
        }
    }

    /// Rift handoff. Returns whether the rift loop was started.
    pub(crate) fn start_rift(&self) -> bool {
        let retry_limit = self.ctx.config().rift_retry_limit;
        {
            let _guard = self.lock_handoff();
            if self.stopped.is_set() {
                log::info!("Orchestrator: rift request dropped, automation is stopped.");
                return false;
            }
            if self.agents.rift.is_running() {
                log::info!("Orchestrator: rift already running.");
                return false;
            }
            if let Some(holder) = self.lease() {
                log::info!("Orchestrator: rift refused, {holder} holds the device.");
                return false;
            }
            self.pause_all_locked(None);
            self.ctx.set_task_flag(TaskFlag::Rift);
            self.set_lease(Some(AgentId::Rift));
        }

        if !self.agents.collection.await_exit(self.config.exit_timeout) {
            log::warn!("Orchestrator: collection did not acknowledge exit before rift.");
        }

        if self.agents.rift.start(retry_limit, false) {
            let _guard = self.lock_handoff();
            if self.lease() != Some(AgentId::Rift) {
                log::info!("Orchestrator: rift was paused while starting, stopping it.");
                self.agents.rift.stop();
                return false;
            }
            return true;
        }

        {
            let _guard = self.lock_handoff();
            self.release_lease(AgentId::Rift);
            self.ctx.release_task_flag(TaskFlag::Rift, TaskFlag::Idle);
        }
        self.ctx.notify("Rift", "could not start, resuming collection");
        self.resume_internal();
        false
    }

    // --- Start-up ---

    /// The start-up sequence: research, collection, expedition, rift.
    pub(crate) fn startup(&self) {
        self.stopped.clear();
        self.ctx.pause.global.clear();
        self.ctx.pause.expedition.clear();
        let config = self.ctx.config();
        log::info!("Orchestrator: starting modules.");

        if config.research_enabled {
            self.run_exclusive_research(TimerKind::Research);
        }
        if self.abort_startup("research") {
            return;
        }

        if config.collect_enabled {
            self.resume_internal();
        }
        if self.abort_startup("collection") {
            return;
        }

        if config.expedition_enabled {
            log::info!("Orchestrator: expedition armed, waiting for idle squads.");
        }
        if self.abort_startup("expedition") {
            return;
        }

        if config.rift_enabled {
            self.start_rift();
        }
        log::info!("Orchestrator: start-up sequence complete.");
    }

    fn abort_startup(&self, after: &str) -> bool {
        let stopped = self.stopped.is_set();
        if stopped {
            log::info!("Orchestrator: start-up aborted after {after}.");
        }
        stopped
    }
}

pub(crate) fn spawn_named(name: &str, body: impl FnOnce() + Send + 'static) {
    if let Err(e) = thread::Builder::new().name(name.to_string()).spawn(body) {
        log::error!("Orchestrator: failed to spawn {name} thread: {e}");
    }
}

/// Forwards module requests to the orchestrator without keeping it alive.
pub(crate) struct HookBridge {
    pub(crate) shared: Weak<Shared>,
    pub(crate) events: crossbeam_channel::Sender<OrchestratorEvent>,
}

impl CoordinatorHooks for HookBridge {
    fn pause_all(&self, requester: AgentId) {
        if let Some(shared) = self.shared.upgrade() {
            shared.pause_all(Some(requester));
        }
    }

    fn resume_after(&self, agent: AgentId) {
        if let Some(shared) = self.shared.upgrade() {
            shared.resume_after(agent);
        }
    }

    fn timer_expired(&self, kind: TimerKind) {
        if self.events.send(OrchestratorEvent::Timer(kind)).is_err() {
            log::warn!("Orchestrator: {kind} expiry lost, event loop is gone.");
        }
    }
}
