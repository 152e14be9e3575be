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

//! Shared coordination state.
//!
//! One [`CoordinationContext`] is created at start-up and handed to every module by
//! `Arc`. It is plain data plus dispatch: no module owns it, and each field has a
//! single writer role:
//!
//! | Field | Writer |
//! |---|---|
//! | task flag | orchestrator (setter is crate-private) |
//! | pause signals | orchestrator |
//! | pending handoffs | watchers raise, orchestrator takes |
//! | expedition running | expedition module |
//! | config | front-end |

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use touchagent_core::{
    AgentId, AutomationConfig, CaptureMode, CoordinatorHooks, Signal, StatusListener, TaskFlag,
    TimerKind, TimerStatus,
};

/// The cooperative pause signals.
#[derive(Debug, Default)]
pub struct PauseSignals {
    /// Set by pause-all; every loop suspends while it is set.
    pub global: Signal,
    /// Set by stop-all; aborts an expedition run and suspends collection.
    pub expedition: Signal,
    /// Set while the research flow holds the device.
    pub research: Signal,
}

impl PauseSignals {
    /// Whether the collection loops must suspend.
    pub fn collection_paused(&self) -> bool {
        self.global.is_set() || self.expedition.is_set()
    }
}

/// A request to hand the device over, raised by a watcher and taken once.
#[derive(Debug, Default)]
pub struct PendingFlag(Signal);

impl PendingFlag {
    /// Raises the flag. Returns `false` if it was already raised.
    pub fn raise(&self) -> bool {
        !self.0.replace(true)
    }

    /// Consumes the flag. Returns whether it was raised.
    pub fn take(&self) -> bool {
        self.0.replace(false)
    }

    /// Whether the flag is raised, without consuming it.
    pub fn is_raised(&self) -> bool {
        self.0.is_set()
    }
}

/// Pending handoff requests.
#[derive(Debug, Default)]
pub struct PendingHandoffs {
    /// The assist watcher saw idle squads.
    pub expedition: PendingFlag,
    /// A rift run was requested.
    pub rift: PendingFlag,
}

/// State shared by the orchestrator and every module.
pub struct CoordinationContext {
    task: Mutex<TaskFlag>,
    /// Pause signals.
    pub pause: PauseSignals,
    /// Pending handoffs.
    pub pending: PendingHandoffs,
    expedition_running: Signal,
    config: RwLock<AutomationConfig>,
    hooks: RwLock<Option<Arc<dyn CoordinatorHooks>>>,
    listeners: RwLock<Vec<Arc<dyn StatusListener>>>,
}

impl CoordinationContext {
    /// Creates a context with the flag idle, every signal clear and no listeners.
    pub fn new(config: AutomationConfig) -> Self {
        Self {
            task: Mutex::new(TaskFlag::Idle),
            pause: PauseSignals::default(),
            pending: PendingHandoffs::default(),
            expedition_running: Signal::new(),
            config: RwLock::new(config),
            hooks: RwLock::new(None),
            listeners: RwLock::new(Vec::new()),
        }
    }

    // --- Task flag ---

    /// The current task flag.
    pub fn task_flag(&self) -> TaskFlag {
        *self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the task flag and returns the previous value. Listeners hear about
    /// actual changes only.
    pub(crate) fn set_task_flag(&self, flag: TaskFlag) -> TaskFlag {
        let previous = {
            let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *task, flag)
        };
        if previous != flag {
            log::info!("Context: task flag {previous} -> {flag}");
            self.for_each_listener(|l| l.task_changed(flag));
        }
        previous
    }

    /// Moves the flag from `from` to `to`; does nothing if the flag is something else.
    pub(crate) fn release_task_flag(&self, from: TaskFlag, to: TaskFlag) -> bool {
        let changed = {
            let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
            if *task == from {
                *task = to;
                true
            } else {
                false
            }
        };
        if changed && from != to {
            log::info!("Context: task flag {from} -> {to}");
            self.for_each_listener(|l| l.task_changed(to));
        }
        changed
    }

    // --- Module state ---

    /// Set by the expedition module while a run is in progress.
    pub fn expedition_running(&self) -> &Signal {
        &self.expedition_running
    }

    /// A snapshot of the user settings.
    pub fn config(&self) -> AutomationConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the user settings. Running modules keep the snapshot they started with.
    pub fn update_config(&self, config: AutomationConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    // --- Registration ---

    /// Registers the coordinator hooks, replacing any previous registration.
    pub fn register_hooks(&self, hooks: Arc<dyn CoordinatorHooks>) {
        *self.hooks.write().unwrap_or_else(PoisonError::into_inner) = Some(hooks);
    }

    /// Removes the coordinator hooks; later requests become no-ops.
    pub fn clear_hooks(&self) {
        *self.hooks.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Adds a status listener.
    pub fn add_listener(&self, listener: Arc<dyn StatusListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    // --- Requests to the coordinator ---

    /// Asks the coordinator to pause everything.
    pub fn request_pause_all(&self, requester: AgentId) {
        self.with_hooks("pause_all", |h| h.pause_all(requester));
    }

    /// Tells the coordinator `agent` finished and the screen is back home.
    pub fn request_resume_after(&self, agent: AgentId) {
        self.with_hooks("resume_after", |h| h.resume_after(agent));
    }

    /// Tells the coordinator a countdown expired.
    pub fn timer_expired(&self, kind: TimerKind) {
        self.with_hooks("timer_expired", |h| h.timer_expired(kind));
    }

    // --- Status fan-out ---

    /// Sends a user-facing notification.
    pub fn notify(&self, title: &str, message: &str) {
        log::info!("{title}: {message}");
        self.for_each_listener(|l| l.notify(title, message));
    }

    /// Reports the rift level and failure count.
    pub fn report_rift_level(&self, level: u32, failures: u32) {
        self.for_each_listener(|l| l.rift_level_updated(level, failures));
    }

    /// Reports remaining timer values.
    pub fn report_timers(&self, status: &TimerStatus) {
        self.for_each_listener(|l| l.timers_updated(status));
    }

    /// Reports the device capture mode.
    pub fn report_capture_mode(&self, mode: Option<CaptureMode>) {
        self.for_each_listener(|l| l.capture_mode_changed(mode));
    }

    /// Reports the touch connection state.
    pub fn report_connection(&self, connected: bool) {
        self.for_each_listener(|l| l.connection_changed(connected));
    }

    fn with_hooks(&self, what: &str, call: impl FnOnce(&dyn CoordinatorHooks)) {
        let hooks = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match hooks {
            Some(hooks) => guarded(what, || call(hooks.as_ref())),
            None => log::trace!("Context: no hooks registered for {what}."),
        }
    }

    fn for_each_listener(&self, call: impl Fn(&dyn StatusListener)) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            guarded("listener", || call(listener.as_ref()));
        }
    }
}

/// Runs `call`, logging instead of propagating a panic.
fn guarded(what: &str, call: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(call)) {
        log::error!("Context: {what} callback panicked: {}", panic_message(&payload));
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
