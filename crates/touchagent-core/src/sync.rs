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

//! Coordination primitives shared by the automation loops.
//!
//! - [`Signal`]: a boolean checked cooperatively at suspension points.
//! - [`ReadyEvent`]: a resettable one-shot event other threads can block on.
//! - [`Completion`]: an exit acknowledgement a loop raises when its thread ends.
//! - [`Pacer`]: scales the empirical sleeps and deadlines of the modules.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// A shared boolean flag.
#[derive(Debug, Default)]
pub struct Signal(AtomicBool);

impl Signal {
    /// Creates a cleared signal.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Sets the signal.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clears the signal.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether the signal is set.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Stores `value` and returns the previous value.
    pub fn replace(&self, value: bool) -> bool {
        self.0.swap(value, Ordering::SeqCst)
    }
}

/// A resettable event: threads wait until some other thread sets it.
#[derive(Debug, Default)]
pub struct ReadyEvent {
    state: Mutex<bool>,
    cond: Condvar,
}

impl ReadyEvent {
    /// Creates a cleared event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event and wakes every waiter.
    pub fn set(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = true;
        self.cond.notify_all();
    }

    /// Clears the event.
    pub fn clear(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Whether the event is set.
    pub fn is_set(&self) -> bool {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the event is set.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while !*state {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until the event is set or `timeout` elapses. Returns whether it was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (state, _) = self
            .cond
            .wait_timeout_while(state, timeout, |ready| !*ready)
            .unwrap_or_else(PoisonError::into_inner);
        *state
    }
}

/// Acknowledgement that a background loop has exited.
///
/// The loop thread holds a [`CompletionGuard`]; the guard raises the completion when
/// it is dropped, including when the thread unwinds. Whoever starts the next loop
/// waits on the completions of the previous ones instead of sleeping a fixed delay.
#[derive(Debug, Clone, Default)]
pub struct Completion(Arc<ReadyEvent>);

impl Completion {
    /// Creates a pending completion.
    pub fn new() -> Self {
        Self::default()
    }

    /// A completion that is already raised, for loops that never started.
    pub fn done() -> Self {
        let completion = Self::new();
        completion.0.set();
        completion
    }

    /// The guard to move into the loop thread.
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard(Arc::clone(&self.0))
    }

    /// Whether the loop has exited.
    pub fn is_done(&self) -> bool {
        self.0.is_set()
    }

    /// Waits up to `timeout` for the loop to exit. Returns whether it did.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.0.wait_timeout(timeout)
    }
}

/// Raises its [`Completion`] when dropped.
#[derive(Debug)]
pub struct CompletionGuard(Arc<ReadyEvent>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.set();
    }
}

/// Scales the empirical delays of the automation flows.
///
/// A scale of `1.0` keeps the delays tuned against the live game; tests run with a
/// small scale so that multi-second waits take milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacer {
    scale: f32,
}

impl Pacer {
    /// Creates a pacer. Negative or non-finite scales are treated as zero.
    pub fn new(scale: f32) -> Self {
        let scale = if scale.is_finite() { scale.max(0.0) } else { 0.0 };
        Self { scale }
    }

    /// The scale factor.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// `duration` scaled. A non-zero duration never scales below one millisecond,
    /// so polling loops cannot turn into busy loops.
    pub fn scaled(&self, duration: Duration) -> Duration {
        if duration.is_zero() || self.scale == 1.0 {
            return duration;
        }
        duration.mul_f32(self.scale).max(Duration::from_millis(1))
    }

    /// Sleeps for the scaled `duration`.
    pub fn sleep(&self, duration: Duration) {
        thread::sleep(self.scaled(duration));
    }

    /// Sleeps for the scaled number of milliseconds.
    pub fn sleep_ms(&self, millis: u64) {
        self.sleep(Duration::from_millis(millis));
    }

    /// The instant the scaled `duration` from now.
    pub fn deadline(&self, duration: Duration) -> Instant {
        Instant::now() + self.scaled(duration)
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(1.0)
    }
}
