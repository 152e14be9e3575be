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

//! The module scheduler.
//!
//! The [`Orchestrator`] is the only writer of the task flag. It runs a background
//! loop that handles timer expiries and consumes pending handoff flags, and exposes
//! the manual entry points used by front-ends.

mod protocol;

use crate::context::CoordinationContext;
use crate::registry::AgentSet;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use protocol::{spawn_named, HookBridge, OrchestratorEvent, Shared};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use touchagent_core::{AgentStatus, ControlChannel, TaskFlag, TimerKind};

/// Timing knobs of the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How often the loop checks pending handoffs.
    pub poll_interval: Duration,
    /// Delay before re-checking a research trigger that arrived during an expedition.
    pub research_defer: Duration,
    /// Minimum spacing between two handled research triggers.
    pub research_debounce: Duration,
    /// How many times to query the capture mode after a rift run.
    pub mode_confirm_attempts: u32,
    /// Delay between capture mode queries.
    pub mode_confirm_interval: Duration,
    /// How long to wait for a module to acknowledge exit or readiness.
    pub exit_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            research_defer: Duration::from_secs(10),
            research_debounce: Duration::from_secs(2),
            mode_confirm_attempts: 5,
            mode_confirm_interval: Duration::from_secs(1),
            exit_timeout: Duration::from_secs(3),
        }
    }
}

/// Decides which module may drive the device.
pub struct Orchestrator {
    shared: Arc<Shared>,
    events: Receiver<OrchestratorEvent>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Orchestrator {
    /// Creates an orchestrator and registers it as the context's coordinator hooks.
    pub fn new(
        ctx: Arc<CoordinationContext>,
        agents: AgentSet,
        control: Arc<dyn ControlChannel>,
        config: OrchestratorConfig,
    ) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared::new(Arc::clone(&ctx), agents, control, config));
        ctx.register_hooks(Arc::new(HookBridge {
            shared: Arc::downgrade(&shared),
            events: tx,
        }));
        Self {
            shared,
            events: rx,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Starts the scheduling loop.
    pub fn start(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            return;
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let poll_interval = self.shared.poll_interval();

        let spawned = thread::Builder::new()
            .name("orchestrator".into())
            .spawn(move || {
                log::info!("Orchestrator thread started.");

                while running.load(Ordering::Relaxed) {
                    // 1. Timer expiries run on their own worker so the loop keeps polling.
                    match events.recv_timeout(poll_interval) {
                        Ok(OrchestratorEvent::Timer(kind)) => {
                            let worker = Arc::clone(&shared);
                            spawn_named("research-trigger", move || worker.on_timer(kind));
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    // 2. Pending handoffs.
                    shared.poll_handoffs();
                }
                log::info!("Orchestrator thread stopped.");
            });

        match spawned {
            Ok(handle) => self.handle = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                log::error!("Orchestrator: failed to spawn loop thread: {e}");
            }
        }
    }

    /// Stops the scheduling loop. Modules keep their current state.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Runs the start-up sequence on a background thread.
    pub fn start_all(&self) {
        let shared = Arc::clone(&self.shared);
        spawn_named("orchestrator-startup", move || shared.startup());
    }

    /// Runs the start-up sequence on the calling thread.
    pub fn run_startup(&self) {
        self.shared.startup();
    }

    /// Pauses every module and sets the task flag to idle. Idempotent.
    pub fn pause_all(&self) {
        self.shared.pause_all(None);
    }

    /// Starts collection if nothing else holds the device.
    ///
    /// Clears a previous stop-all. Returns whether collection was started.
    pub fn resume(&self) -> bool {
        self.shared.resume()
    }

    /// Pauses everything and aborts any expedition run in progress.
    pub fn stop_all(&self) {
        self.shared.stop_all();
    }

    /// Handles one timed research trigger on the calling thread.
    ///
    /// Blocks until the trigger was handled, deferred and dropped, or ignored.
    pub fn trigger_research(&self, kind: TimerKind) {
        self.shared.on_timer(kind);
    }

    /// Runs a research flow now on a background thread, unless another exclusive
    /// module holds the device. Manual requests clear a previous stop-all.
    pub fn manual_research(&self) {
        self.shared.clear_stopped();
        let shared = Arc::clone(&self.shared);
        spawn_named("manual-research", move || {
            shared.run_exclusive_research(TimerKind::Research);
        });
    }

    /// Requests an expedition run at the next scheduling pass.
    pub fn manual_expedition(&self) {
        self.shared.clear_stopped();
        self.shared.ctx.pause.expedition.clear();
        if !self.shared.ctx.pending.expedition.raise() {
            log::info!("Orchestrator: expedition request already pending.");
        }
    }

    /// Requests a rift run at the next scheduling pass.
    pub fn request_rift(&self) {
        self.shared.clear_stopped();
        if !self.shared.ctx.pending.rift.raise() {
            log::info!("Orchestrator: rift request already pending.");
        }
    }

    /// Clears a rift sweep pause.
    pub fn continue_rift(&self) -> bool {
        self.shared.agents.rift.resume()
    }

    /// Consumes pending handoff flags once. The loop calls this every poll interval.
    pub fn poll_handoffs(&self) {
        self.shared.poll_handoffs();
    }

    /// The current task flag.
    pub fn task_flag(&self) -> TaskFlag {
        self.shared.ctx.task_flag()
    }

    /// Whether stop-all was requested and not yet cleared.
    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }

    /// Status of every module.
    pub fn statuses(&self) -> Vec<AgentStatus> {
        self.shared.agents.statuses()
    }

    /// Stops every module and the loop, then unregisters the hooks.
    pub fn shutdown(&mut self) {
        self.shared.stop_all();
        self.stop();
        self.shared.ctx.clear_hooks();
        log::info!("Orchestrator: shut down.");
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}
