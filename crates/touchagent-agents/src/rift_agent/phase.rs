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

//! Rift phases, the per-frame observation and the per-run counters.

use crate::keys::{home, rift as keys};
use crate::screen::Screen;
use touchagent_core::Frame;

const HOME_THRESHOLD: f32 = 0.9;
const POPUP_THRESHOLD: f32 = 0.8;
const BUTTON_THRESHOLD: f32 = 0.8;

/// Where the rift loop is within one floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiftPhase {
    /// Waiting for the challenge or sweep button.
    #[default]
    WaitSweep,
    /// A challenge was started; the battle animation has not been seen yet.
    InBattleAnim,
    /// The battle animation is playing; the skip button may appear. Kept until the
    /// continue button or a new challenge so a missed skip tap is retried.
    SkipAvailable,
    /// The failure ceiling was reached and "return to main" was tapped.
    ReturningHome,
}

/// The first recognised condition on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The home screen: the run is over.
    Home,
    /// An advertisement popup.
    Ad,
    /// A reward popup.
    Reward,
    /// The battle was lost.
    Failure,
    /// The challenge button.
    Challenge,
    /// The sweep button; needs the user.
    Sweep,
    /// The battle animation.
    BattleAnim,
    /// The skip button.
    Skip,
    /// The continue button after a cleared floor.
    Continue,
}

impl RiftPhase {
    /// The phase after acting on `observation`.
    pub fn next(self, observation: Observation) -> RiftPhase {
        match (self, observation) {
            (RiftPhase::ReturningHome, _) => RiftPhase::ReturningHome,
            (_, Observation::Challenge) => RiftPhase::InBattleAnim,
            (RiftPhase::InBattleAnim, Observation::BattleAnim) => RiftPhase::SkipAvailable,
            (_, Observation::Continue) => RiftPhase::WaitSweep,
            (phase, _) => phase,
        }
    }
}

/// Checks `frame` in priority order. First match wins.
///
/// The sweep check is skipped while the loop is paused; the battle animation and
/// skip checks only apply in their phase.
pub fn observe(screen: &Screen, frame: &Frame, phase: RiftPhase, paused: bool) -> Option<Observation> {
    let seen = |template: &str, region: &str, threshold: f32| {
        screen.matches(frame, template, region, threshold)
    };

    if seen(home::TEMPLATE, home::REGION, HOME_THRESHOLD) {
        return Some(Observation::Home);
    }
    if seen(keys::AD_TEMPLATE, keys::AD_REGION, POPUP_THRESHOLD) {
        return Some(Observation::Ad);
    }
    if seen(keys::REWARD_TEMPLATE, keys::REWARD_REGION, POPUP_THRESHOLD) {
        return Some(Observation::Reward);
    }
    if seen(keys::FAILURE_TEMPLATE, keys::FAILURE_REGION, POPUP_THRESHOLD) {
        return Some(Observation::Failure);
    }
    if seen(keys::CHALLENGE_TEMPLATE, keys::CHALLENGE_REGION, BUTTON_THRESHOLD) {
        return Some(Observation::Challenge);
    }
    if !paused && seen(keys::SWEEP_TEMPLATE, keys::SWEEP_REGION, BUTTON_THRESHOLD) {
        return Some(Observation::Sweep);
    }
    if phase == RiftPhase::InBattleAnim
        && seen(keys::BATTLE_TEMPLATE, keys::BATTLE_REGION, BUTTON_THRESHOLD)
    {
        return Some(Observation::BattleAnim);
    }
    if phase == RiftPhase::SkipAvailable
        && seen(keys::SKIP_TEMPLATE, keys::SKIP_REGION, BUTTON_THRESHOLD)
    {
        return Some(Observation::Skip);
    }
    if seen(keys::CONTINUE_TEMPLATE, keys::CONTINUE_REGION, BUTTON_THRESHOLD) {
        return Some(Observation::Continue);
    }
    None
}

/// Counters of one rift run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiftState {
    /// Current phase.
    pub phase: RiftPhase,
    /// Failures since the last cleared floor.
    pub failures: u32,
    /// Last floor read from the screen.
    pub level: Option<u32>,
    /// Failures tolerated before giving up.
    pub retry_limit: u32,
    /// Sequence number of the last frame acted on.
    pub last_seq: Option<u64>,
}

impl RiftState {
    /// A fresh run.
    pub fn new(retry_limit: u32) -> Self {
        Self {
            phase: RiftPhase::WaitSweep,
            failures: 0,
            level: None,
            retry_limit,
            last_seq: None,
        }
    }

    /// Whether `seq` is newer than the last frame acted on. Records it if so.
    pub fn accept_frame(&mut self, seq: u64) -> bool {
        if self.last_seq.is_some_and(|last| seq <= last) {
            return false;
        }
        self.last_seq = Some(seq);
        true
    }

    /// Counts one failure. Returns `true` once the ceiling is reached, and again for
    /// every later failure so the return home is retried. A limit of 0 gives up on
    /// the first failure.
    pub fn on_failure(&mut self) -> bool {
        self.failures += 1;
        if self.failures >= self.retry_limit {
            self.phase = RiftPhase::ReturningHome;
            return true;
        }
        false
    }

    /// A floor was cleared.
    pub fn on_level_clear(&mut self) {
        if let Some(level) = self.level.as_mut() {
            *level += 1;
        }
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_ceiling_on_nth_event() {
        let mut state = RiftState::new(3);
        assert!(!state.on_failure());
        assert!(!state.on_failure());
        assert_eq!(state.phase, RiftPhase::WaitSweep);
        assert!(state.on_failure());
        assert_eq!(state.phase, RiftPhase::ReturningHome);
    }

    #[test]
    fn test_failures_past_ceiling_keep_returning_home() {
        let mut state = RiftState::new(2);
        let results: Vec<bool> = (0..4).map(|_| state.on_failure()).collect();
        assert_eq!(results, vec![false, true, true, true]);
        assert_eq!(state.phase, RiftPhase::ReturningHome);
    }

    #[test]
    fn test_zero_limit_gives_up_on_first_failure() {
        let mut state = RiftState::new(0);
        assert!(state.on_failure());
        assert_eq!(state.phase, RiftPhase::ReturningHome);
        assert!(state.on_failure());
    }

    #[test]
    fn test_level_clear_resets_failures() {
        let mut state = RiftState::new(3);
        state.level = Some(12);
        state.on_failure();
        state.on_failure();
        state.on_level_clear();
        assert_eq!(state.failures, 0);
        assert_eq!(state.level, Some(13));
        assert!(!state.on_failure());
    }

    #[test]
    fn test_unknown_level_stays_unknown() {
        let mut state = RiftState::new(3);
        state.on_level_clear();
        assert_eq!(state.level, None);
    }

    #[test]
    fn test_stale_frames_rejected() {
        let mut state = RiftState::new(3);
        assert!(state.accept_frame(4));
        assert!(!state.accept_frame(4));
        assert!(!state.accept_frame(3));
        assert!(state.accept_frame(5));
    }

    #[test]
    fn test_phase_transitions() {
        use Observation::*;
        let phase = RiftPhase::WaitSweep.next(Challenge);
        assert_eq!(phase, RiftPhase::InBattleAnim);
        let phase = phase.next(BattleAnim);
        assert_eq!(phase, RiftPhase::SkipAvailable);
        assert_eq!(phase.next(Ad), RiftPhase::SkipAvailable);
        assert_eq!(phase.next(Skip), RiftPhase::SkipAvailable);
        assert_eq!(phase.next(Continue), RiftPhase::WaitSweep);
        assert_eq!(RiftPhase::ReturningHome.next(Continue), RiftPhase::ReturningHome);
        assert_eq!(RiftPhase::ReturningHome.next(Challenge), RiftPhase::ReturningHome);
        assert_eq!(RiftPhase::WaitSweep.next(BattleAnim), RiftPhase::WaitSweep);
    }
}
