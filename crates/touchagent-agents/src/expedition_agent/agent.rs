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

use crate::keys::{expedition as keys, home};
use crate::screen::Screen;
use std::sync::Arc;
use std::time::{Duration, Instant};
use touchagent_control::CoordinationContext;
use touchagent_core::{Agent, AgentId, ExpeditionAgent, ExpeditionOutcome, Frame, Point};

const PAGE_THRESHOLD: f32 = 0.85;
const POPUP_THRESHOLD: f32 = 0.7;
const MARKER_THRESHOLD: f32 = 0.95;
const IDLE_TROOP_THRESHOLD: f32 = 0.85;
const HOME_THRESHOLD: f32 = 0.95;

const PAGE_TIMEOUT: Duration = Duration::from_secs(8);
const TERRITORY_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_PAGE_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_PAGE_ATTEMPTS: u32 = 3;
const SCOUT_ROUNDS: u32 = 10;
const SCROLL_ROUNDS: u32 = 15;
const EXIT_ATTEMPTS: u32 = 3;

type Step<T = ()> = Result<T, ExpeditionOutcome>;

/// Clears the shared running flag when a run ends, however it ends.
struct RunningGuard<'a>(&'a CoordinationContext);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.expedition_running().clear();
    }
}

/// Whether every idle troop found a target during the scroll loop.
enum Dispatch {
    /// The list was exhausted; the event pages are still open.
    Exhausted,
    /// No troops were left; the run already closed the pages.
    OutOfTroops,
}

/// The expedition module.
pub struct ExpeditionRunner {
    ctx: Arc<CoordinationContext>,
    screen: Arc<Screen>,
}

impl ExpeditionRunner {
    /// Creates the module.
    pub fn new(ctx: Arc<CoordinationContext>, screen: Arc<Screen>) -> Self {
        Self { ctx, screen }
    }

    fn checkpoint(&self) -> Step {
        if self.ctx.pause.expedition.is_set() {
            log::info!("Expedition: pause requested, aborting run.");
            return Err(ExpeditionOutcome::Aborted);
        }
        Ok(())
    }

    /// Taps the close button if any known popup covers the screen.
    fn dismiss_popup(&self, frame: &Frame) -> bool {
        let covered = keys::POPUPS.iter().any(|(template, region)| {
            self.screen.matches(frame, template, region, POPUP_THRESHOLD)
        });
        if covered {
            log::debug!("Expedition: dismissing popup.");
            self.screen.tap(keys::POPUP_CLOSE, 0);
        }
        covered
    }

    /// Polls until `template` shows in `region`, dismissing popups on the way.
    fn wait_for_page(
        &self,
        template: &str,
        region: &str,
        timeout: Duration,
        poll_ms: u64,
        popup_ms: u64,
    ) -> Step<bool> {
        let deadline = self.screen.pacer().deadline(timeout);
        while Instant::now() < deadline {
            self.checkpoint()?;
            if let Some(frame) = self.screen.capture() {
                if self.dismiss_popup(&frame) {
                    self.screen.sleep_ms(popup_ms);
                    continue;
                }
                if self.screen.matches(&frame, template, region, PAGE_THRESHOLD) {
                    return Ok(true);
                }
            }
            self.screen.sleep_ms(poll_ms);
        }
        Ok(false)
    }

    fn run_steps(&self) -> Step<ExpeditionOutcome> {
        let config = self.ctx.config();

        // 1. Expedition page.
        self.checkpoint()?;
        self.screen.tap(keys::OPEN, 2000);
        if !self.wait_for_page(keys::PAGE_TEMPLATE, keys::PAGE_REGION, PAGE_TIMEOUT, 500, 1200)? {
            log::warn!("Expedition: page did not open.");
            return Err(ExpeditionOutcome::PageUnavailable);
        }

        // 2. Territory rewards.
        if config.reward_enabled {
            self.claim_rewards()?;
        }

        // 3. Scouting energy.
        if config.scout_enabled {
            self.scout()?;
        }

        // 4. Resource events.
        self.open_resource_events()?;
        if let Dispatch::OutOfTroops = self.dispatch_troops()? {
            return Ok(self.exit_home());
        }

        self.screen.tap(keys::CLOSE_EVENTS, 1000);
        Ok(self.exit_home())
    }

    fn claim_rewards(&self) -> Step {
        self.checkpoint()?;
        log::info!("Expedition: claiming territory rewards.");
        self.screen.tap(keys::TERRITORY, 1000);
        for _ in 0..2 {
            self.screen.tap(keys::CLAIM_ALL, 500);
        }
        self.screen.tap(keys::CLOSE_TERRITORY, 0);
        self.screen.sleep_ms(800);
        if !self.wait_for_page(
            keys::PAGE_TEMPLATE,
            keys::PAGE_REGION,
            TERRITORY_TIMEOUT,
            800,
            800,
        )? {
            log::warn!("Expedition: page not back after rewards, continuing.");
        }
        Ok(())
    }

    fn scout(&self) -> Step {
        for round in 1..=SCOUT_ROUNDS {
            self.checkpoint()?;
            let Some(frame) = self.screen.capture() else {
                break;
            };
            if self.dismiss_popup(&frame) {
                self.screen.sleep_ms(800);
                continue;
            }
            match self.screen.read_number(&frame, keys::SCOUT_ENERGY_REGION) {
                Some(energy) if energy > 0 => {
                    log::debug!("Expedition: scouting ({energy} energy, round {round}).");
                    self.screen.tap(keys::SCOUT, 800);
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn open_resource_events(&self) -> Step {
        self.screen.sleep_ms(1600);
        for attempt in 1..=EVENT_PAGE_ATTEMPTS {
            self.checkpoint()?;
            self.screen.tap(keys::EVENTS, 1000);
            if self.wait_for_page(
                keys::EVENT_PAGE_TEMPLATE,
                keys::EVENT_PAGE_REGION,
                EVENT_PAGE_TIMEOUT,
                600,
                600,
            )? {
                self.screen.tap(keys::RESOURCE_TAB, 800);
                return Ok(());
            }
            log::warn!("Expedition: event page not ready ({attempt}/{EVENT_PAGE_ATTEMPTS}).");
        }
        Err(ExpeditionOutcome::PageUnavailable)
    }

    /// Unclaimed markers on screen, translated to their "go" buttons.
    fn go_buttons(&self, frame: &Frame) -> Vec<Point> {
        let (Some(offset), Some(go_region)) = (
            self.screen.point(keys::GO_OFFSET),
            self.screen.region(keys::GO_REGION),
        ) else {
            return Vec::new();
        };
        self.screen
            .locate_all(frame, keys::MARKER_TEMPLATE, keys::RESOURCE_LIST_REGION, MARKER_THRESHOLD)
            .into_iter()
            .map(|marker| marker.offset(offset.x, offset.y))
            .filter(|go| go_region.contains(*go))
            .collect()
    }

    fn dispatch_troops(&self) -> Step<Dispatch> {
        for round in 1..=SCROLL_ROUNDS {
            self.checkpoint()?;
            let Some(frame) = self.screen.capture() else {
                continue;
            };
            let targets = self.go_buttons(&frame);
            if targets.is_empty() {
                log::debug!("Expedition: no unclaimed events visible (round {round}), scrolling.");
                self.screen.swipe(keys::SCROLL);
                self.screen.sleep_ms(1000);
                continue;
            }

            for go in targets {
                self.checkpoint()?;
                self.screen.tap_point(go, 1000);
                self.screen.tap(keys::DETAIL_CENTRE, 500);
                self.screen.tap(keys::GATHER, 800);

                let Some(detail) = self.screen.capture() else {
                    log::warn!("Expedition: troop check capture failed, skipping this event.");
                    self.screen.tap(keys::BACK_TO_EVENTS, 1000);
                    continue;
                };
                let troops = self.screen.matches(
                    &detail,
                    keys::IDLE_TROOP_TEMPLATE,
                    keys::IDLE_TROOP_REGION,
                    IDLE_TROOP_THRESHOLD,
                );
                if !troops {
                    log::info!("Expedition: no idle troops left.");
                    for _ in 0..2 {
                        self.screen.tap(keys::BACK_TO_EVENTS, 500);
                    }
                    self.screen.tap(keys::CLOSE_EVENTS, 1000);
                    return Ok(Dispatch::OutOfTroops);
                }

                self.screen.tap(keys::DISPATCH, 1500);
                self.screen.tap(keys::BACK_TO_EVENTS, 1000);
            }
        }
        Ok(Dispatch::Exhausted)
    }

    fn exit_home(&self) -> ExpeditionOutcome {
        for attempt in 1..=EXIT_ATTEMPTS {
            self.screen.tap(keys::EXIT, 2000);
            let home = self.screen.capture().is_some_and(|frame| {
                self.screen
                    .matches(&frame, home::TEMPLATE, home::REGION, HOME_THRESHOLD)
            });
            if home {
                return ExpeditionOutcome::HomeConfirmed;
            }
            log::debug!("Expedition: home not confirmed ({attempt}/{EXIT_ATTEMPTS}).");
        }
        log::warn!("Expedition: could not confirm the home screen.");
        ExpeditionOutcome::HomeUnconfirmed
    }
}

impl Agent for ExpeditionRunner {
    fn id(&self) -> AgentId {
        AgentId::Expedition
    }

    fn is_running(&self) -> bool {
        self.ctx.expedition_running().is_set()
    }
}

impl ExpeditionAgent for ExpeditionRunner {
    fn run_once(&self) -> ExpeditionOutcome {
        if self.ctx.expedition_running().replace(true) {
            log::info!("Expedition: a run is already in progress.");
            return ExpeditionOutcome::AlreadyRunning;
        }

        log::info!("Expedition: run started.");
        let outcome = {
            let _running = RunningGuard(&self.ctx);
            self.run_steps().unwrap_or_else(|outcome| outcome)
        };
        log::info!("Expedition: run finished ({outcome:?}).");

        if outcome == ExpeditionOutcome::HomeConfirmed {
            self.ctx.request_resume_after(AgentId::Expedition);
        }
        outcome
    }
}
