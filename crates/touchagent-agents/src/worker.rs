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

//! Background loop bookkeeping shared by the long-lived modules.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use touchagent_core::{Completion, CompletionGuard, Signal};

/// One generation of loops: a shared running signal and one completion per thread.
pub(crate) struct LoopHandle {
    running: Arc<Signal>,
    exits: Vec<Completion>,
}

impl LoopHandle {
    /// A handle with its running signal set and no threads yet.
    pub(crate) fn new() -> Self {
        let running = Arc::new(Signal::new());
        running.set();
        Self {
            running,
            exits: Vec::new(),
        }
    }

    /// The running signal the threads of this generation observe.
    pub(crate) fn running(&self) -> Arc<Signal> {
        Arc::clone(&self.running)
    }

    /// Spawns a named thread belonging to this generation.
    ///
    /// The body receives the guard that acknowledges its exit. If the thread cannot
    /// be spawned the guard is dropped at once and the generation's running signal
    /// is cleared.
    pub(crate) fn spawn(&mut self, name: &str, body: impl FnOnce(CompletionGuard) + Send + 'static) {
        let done = Completion::new();
        let guard = done.guard();
        self.exits.push(done);
        if let Err(e) = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(guard))
        {
            log::error!("Failed to spawn {name} thread: {e}");
            self.running.clear();
        }
    }
}

/// The current loop generation of a module, if any.
#[derive(Default)]
pub(crate) struct LoopSlot(Mutex<Option<LoopHandle>>);

impl LoopSlot {
    pub(crate) fn is_running(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| h.running.is_set())
    }

    /// Asks the current generation to exit. Does not wait.
    pub(crate) fn stop(&self) {
        if let Some(handle) = self.0.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            handle.running.clear();
        }
    }

    /// Waits up to `timeout` for every thread of the current generation to exit.
    pub(crate) fn await_exit(&self, timeout: Duration) -> bool {
        let exits = match self.0.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(handle) => handle.exits.clone(),
            None => return true,
        };
        let deadline = Instant::now() + timeout;
        exits
            .iter()
            .all(|exit| exit.wait_timeout(deadline.saturating_duration_since(Instant::now())))
    }

    /// Installs a new generation.
    pub(crate) fn install(&self, handle: LoopHandle) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }
}
