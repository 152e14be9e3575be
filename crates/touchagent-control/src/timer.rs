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

//! Countdown timers for the research flow.
//!
//! Two independent countdowns, one per [`TimerKind`], tick once per interval on a
//! dedicated thread. When a countdown reaches zero its ready event is set, its
//! callback runs once, and the countdown clears itself.

use crate::context::{panic_message, CoordinationContext};
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use touchagent_core::{ReadyEvent, TimerKind, TimerStatus};

/// A one-shot action run when a countdown expires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

struct Countdown {
    remaining: u64,
    callback: Option<TimerCallback>,
}

#[derive(Default)]
struct Slots {
    research: Option<Countdown>,
    accelerate: Option<Countdown>,
}

impl Slots {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<Countdown> {
        match kind {
            TimerKind::Research => &mut self.research,
            TimerKind::Accelerate => &mut self.accelerate,
        }
    }

    fn status(&self) -> TimerStatus {
        let remaining = |slot: &Option<Countdown>| {
            slot.as_ref()
                .map(|c| Duration::from_secs(c.remaining))
        };
        TimerStatus {
            research: remaining(&self.research),
            accelerate: remaining(&self.accelerate),
        }
    }
}

/// Owns the research and accelerate countdowns.
pub struct TimerManager {
    ctx: Arc<CoordinationContext>,
    slots: Mutex<Slots>,
    research_ready: ReadyEvent,
    accelerate_ready: ReadyEvent,
    interval: Duration,
    stop_tx: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TimerManager {
    /// Creates a manager ticking every `interval` once started.
    pub fn new(ctx: Arc<CoordinationContext>, interval: Duration) -> Self {
        Self {
            ctx,
            slots: Mutex::new(Slots::default()),
            research_ready: ReadyEvent::new(),
            accelerate_ready: ReadyEvent::new(),
            interval,
            stop_tx: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Starts the tick thread. Does nothing if it is already running.
    pub fn start(self: &Arc<Self>) {
        let mut handle_slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle_slot.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = self.interval;

        let spawned = thread::Builder::new()
            .name("timer-manager".into())
            .spawn(move || {
                log::info!("TimerManager thread started.");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let Some(manager) = weak.upgrade() else {
                        break;
                    };
                    manager.tick();
                }
                log::info!("TimerManager thread stopped.");
            });

        match spawned {
            Ok(handle) => {
                *handle_slot = Some(handle);
                *self.stop_tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(stop_tx);
            }
            Err(e) => log::error!("TimerManager: failed to spawn tick thread: {e}"),
        }
    }

    /// Stops the tick thread and waits for it. Countdowns keep their values.
    pub fn stop(&self) {
        if let Some(tx) = self
            .stop_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = tx.send(());
        }
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::error!("TimerManager: tick thread panicked.");
            }
        }
    }

    /// Sets the `kind` countdown to `seconds`, replacing any previous countdown and
    /// discarding its callback. Clears the matching ready event.
    pub fn set(&self, kind: TimerKind, seconds: u64, callback: Option<TimerCallback>) {
        let replaced = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slot(kind)
            .replace(Countdown {
                remaining: seconds,
                callback,
            });
        self.ready(kind).clear();
        if replaced.is_some() {
            log::debug!("TimerManager: {kind} countdown replaced.");
        }
        log::info!("TimerManager: {kind} countdown set to {seconds}s.");
    }

    /// Removes the `kind` countdown without firing it.
    pub fn clear(&self, kind: TimerKind) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slot(kind)
            .take();
    }

    /// Seconds left on the `kind` countdown.
    pub fn remaining(&self, kind: TimerKind) -> Option<u64> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .slot(kind)
            .as_ref()
            .map(|c| c.remaining)
    }

    /// Remaining time on both countdowns.
    pub fn status(&self) -> TimerStatus {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status()
    }

    /// The event set when the `kind` countdown expires.
    pub fn ready(&self, kind: TimerKind) -> &ReadyEvent {
        match kind {
            TimerKind::Research => &self.research_ready,
            TimerKind::Accelerate => &self.accelerate_ready,
        }
    }

    /// Advances both countdowns by one step, firing any that reach zero.
    ///
    /// Called by the tick thread; public so that callers can drive time manually.
    pub fn tick(&self) {
        let mut fired = Vec::new();
        let status = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            for kind in [TimerKind::Research, TimerKind::Accelerate] {
                let slot = slots.slot(kind);
                if let Some(countdown) = slot.as_mut() {
                    countdown.remaining = countdown.remaining.saturating_sub(1);
                    if countdown.remaining == 0 {
                        let callback = slot.take().and_then(|c| c.callback);
                        fired.push((kind, callback));
                    }
                }
            }
            slots.status()
        };

        // Callbacks run outside the lock so they may set new countdowns.
        for (kind, callback) in fired {
            log::info!("TimerManager: {kind} countdown expired.");
            self.ready(kind).set();
            if let Some(callback) = callback {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
                    log::error!(
                        "TimerManager: {kind} callback panicked: {}",
                        panic_message(&payload)
                    );
                }
            }
        }

        self.ctx.report_timers(&status);
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.stop();
    }
}
