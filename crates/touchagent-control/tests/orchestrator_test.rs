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

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use touchagent_control::{AgentSet, CoordinationContext, Orchestrator, OrchestratorConfig};
use touchagent_core::{
    Agent, AgentId, AutomationConfig, CaptureMode, CollectionAgent, ControlChannel,
    ControlCommand, ControlReply, ExpeditionAgent, ExpeditionOutcome, ReadyEvent,
    ResearchAgent, ResearchOutcome, RiftAgent, StatusListener, TaskFlag, TimerKind,
};

/// Tracks which modules are driving the device.
struct Ledger {
    ctx: Arc<CoordinationContext>,
    collection_running: AtomicBool,
    exclusive_active: AtomicUsize,
    max_exclusive: AtomicUsize,
    violations: AtomicUsize,
}

impl Ledger {
    fn collection_tapping(&self) -> bool {
        self.collection_running.load(Ordering::SeqCst) && !self.ctx.pause.collection_paused()
    }

    fn enter(&self) {
        if self.collection_tapping() {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        let active = self.exclusive_active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_exclusive.fetch_max(active, Ordering::SeqCst);
        if active > 1 {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.exclusive_active.fetch_sub(1, Ordering::SeqCst);
    }
}

struct StubCollection {
    ledger: Arc<Ledger>,
    starts: Mutex<Vec<Vec<String>>>,
}

impl Agent for StubCollection {
    fn id(&self) -> AgentId {
        AgentId::Collection
    }

    fn is_running(&self) -> bool {
        self.ledger.collection_running.load(Ordering::SeqCst)
    }
}

impl CollectionAgent for StubCollection {
    fn start(&self, resources: Vec<String>) {
        self.starts.lock().unwrap().push(resources);
        self.ledger.collection_running.store(true, Ordering::SeqCst);
        if self.ledger.collection_tapping()
            && self.ledger.exclusive_active.load(Ordering::SeqCst) > 0
        {
            self.ledger.violations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stop(&self) {
        self.ledger.collection_running.store(false, Ordering::SeqCst);
    }

    fn await_exit(&self, _timeout: Duration) -> bool {
        true
    }
}

struct StubResearch {
    ledger: Arc<Ledger>,
    running: AtomicBool,
    runs: AtomicUsize,
    accelerations: AtomicUsize,
    hold: Duration,
    ready: ReadyEvent,
}

impl StubResearch {
    fn flow(&self) -> ResearchOutcome {
        self.ready.clear();
        self.running.store(true, Ordering::SeqCst);
        self.ledger.enter();
        thread::sleep(self.hold);
        self.ledger.leave();
        self.running.store(false, Ordering::SeqCst);
        self.ready.set();
        ResearchOutcome::Completed {
            home_confirmed: true,
        }
    }
}

impl Agent for StubResearch {
    fn id(&self) -> AgentId {
        AgentId::Research
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl ResearchAgent for StubResearch {
    fn run(&self) -> ResearchOutcome {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.flow()
    }

    fn try_accelerate(&self) -> ResearchOutcome {
        self.accelerations.fetch_add(1, Ordering::SeqCst);
        self.flow()
    }

    fn ready(&self) -> &ReadyEvent {
        &self.ready
    }
}

struct StubExpedition {
    ledger: Arc<Ledger>,
    ctx: Arc<CoordinationContext>,
    running: AtomicBool,
    runs: AtomicUsize,
    resume_requests: AtomicUsize,
    hold: Duration,
    outcome: Mutex<ExpeditionOutcome>,
}

impl Agent for StubExpedition {
    fn id(&self) -> AgentId {
        AgentId::Expedition
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl ExpeditionAgent for StubExpedition {
    fn run_once(&self) -> ExpeditionOutcome {
        if self.running.swap(true, Ordering::SeqCst) {
            return ExpeditionOutcome::AlreadyRunning;
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.ctx.expedition_running().set();
        self.ledger.enter();
        thread::sleep(self.hold);
        self.ledger.leave();
        self.ctx.expedition_running().clear();
        self.running.store(false, Ordering::SeqCst);

        let outcome = *self.outcome.lock().unwrap();
        if outcome == ExpeditionOutcome::HomeConfirmed {
            self.resume_requests.fetch_add(1, Ordering::SeqCst);
            self.ctx.request_resume_after(AgentId::Expedition);
        }
        outcome
    }
}

struct StubRift {
    ledger: Arc<Ledger>,
    ctx: Arc<CoordinationContext>,
    running: AtomicBool,
    starts: AtomicUsize,
}

impl StubRift {
    /// Simulates the loop seeing the home screen.
    fn finish_home(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.ledger.leave();
            self.ctx.request_resume_after(AgentId::Rift);
        }
    }
}

impl Agent for StubRift {
    fn id(&self) -> AgentId {
        AgentId::Rift
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl RiftAgent for StubRift {
    fn start(&self, _retry_limit: u32, force: bool) -> bool {
        if self.running.load(Ordering::SeqCst) && !force {
            return false;
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        self.ledger.enter();
        true
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.ledger.leave();
        }
    }

    fn await_exit(&self, _timeout: Duration) -> bool {
        true
    }

    fn resume(&self) -> bool {
        self.is_running()
    }
}

struct StubControl(Mutex<CaptureMode>);

impl ControlChannel for StubControl {
    fn send(&self, command: ControlCommand) -> Option<ControlReply> {
        match command {
            ControlCommand::QueryStatus => Some(ControlReply::Mode(*self.0.lock().unwrap())),
            ControlCommand::SwitchToScreenshot => Some(ControlReply::ScreenshotAck),
            ControlCommand::SwitchToVideo => None,
        }
    }
}

#[derive(Default)]
struct FlagRecorder(Mutex<Vec<TaskFlag>>);

impl StatusListener for FlagRecorder {
    fn task_changed(&self, flag: TaskFlag) {
        self.0.lock().unwrap().push(flag);
    }
}

struct Harness {
    ctx: Arc<CoordinationContext>,
    ledger: Arc<Ledger>,
    collection: Arc<StubCollection>,
    research: Arc<StubResearch>,
    expedition: Arc<StubExpedition>,
    rift: Arc<StubRift>,
    control: Arc<StubControl>,
    flags: Arc<FlagRecorder>,
    orchestrator: Orchestrator,
}

fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        poll_interval: Duration::from_millis(5),
        research_defer: Duration::from_millis(100),
        research_debounce: Duration::ZERO,
        mode_confirm_attempts: 3,
        mode_confirm_interval: Duration::from_millis(5),
        exit_timeout: Duration::from_millis(200),
    }
}

fn harness_with(automation: AutomationConfig, config: OrchestratorConfig, hold: Duration) -> Harness {
    let ctx = Arc::new(CoordinationContext::new(automation));
    let flags = Arc::new(FlagRecorder::default());
    ctx.add_listener(flags.clone());
    let ledger = Arc::new(Ledger {
        ctx: Arc::clone(&ctx),
        collection_running: AtomicBool::new(false),
        exclusive_active: AtomicUsize::new(0),
        max_exclusive: AtomicUsize::new(0),
        violations: AtomicUsize::new(0),
    });
    let collection = Arc::new(StubCollection {
        ledger: Arc::clone(&ledger),
        starts: Mutex::new(Vec::new()),
    });
    let research = Arc::new(StubResearch {
        ledger: Arc::clone(&ledger),
        running: AtomicBool::new(false),
        runs: AtomicUsize::new(0),
        accelerations: AtomicUsize::new(0),
        hold,
        ready: ReadyEvent::new(),
    });
    let expedition = Arc::new(StubExpedition {
        ledger: Arc::clone(&ledger),
        ctx: Arc::clone(&ctx),
        running: AtomicBool::new(false),
        runs: AtomicUsize::new(0),
        resume_requests: AtomicUsize::new(0),
        hold,
        outcome: Mutex::new(ExpeditionOutcome::HomeConfirmed),
    });
    let rift = Arc::new(StubRift {
        ledger: Arc::clone(&ledger),
        ctx: Arc::clone(&ctx),
        running: AtomicBool::new(false),
        starts: AtomicUsize::new(0),
    });
    let control = Arc::new(StubControl(Mutex::new(CaptureMode::Screenshot)));
    let agents = AgentSet {
        collection: collection.clone(),
        research: research.clone(),
        expedition: expedition.clone(),
        rift: rift.clone(),
    };
    let orchestrator = Orchestrator::new(Arc::clone(&ctx), agents, control.clone(), config);
    Harness {
        ctx,
        ledger,
        collection,
        research,
        expedition,
        rift,
        control,
        flags,
        orchestrator,
    }
}

fn harness() -> Harness {
    harness_with(
        AutomationConfig::default(),
        test_config(),
        Duration::from_millis(30),
    )
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_pause_all_is_idempotent() {
    let h = harness();
    assert!(h.orchestrator.resume());
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Collecting);

    h.orchestrator.pause_all();
    let once = (
        h.ctx.pause.global.is_set(),
        h.collection.is_running(),
        h.rift.is_running(),
        h.orchestrator.task_flag(),
    );
    h.orchestrator.pause_all();
    let twice = (
        h.ctx.pause.global.is_set(),
        h.collection.is_running(),
        h.rift.is_running(),
        h.orchestrator.task_flag(),
    );

    assert_eq!(once, (true, false, false, TaskFlag::Idle));
    assert_eq!(once, twice);
}

#[test]
fn test_resume_starts_exactly_the_configured_resources() {
    let automation = AutomationConfig {
        resources: vec!["food".into(), "wood".into()],
        ..AutomationConfig::default()
    };
    let h = harness_with(automation, test_config(), Duration::from_millis(10));

    assert!(h.orchestrator.resume());
    assert_eq!(
        *h.collection.starts.lock().unwrap(),
        vec![vec!["food".to_string(), "wood".to_string()]]
    );
    assert!(!h.ctx.pause.global.is_set());

    // Already collecting: nothing new is started.
    assert!(!h.orchestrator.resume());
    assert_eq!(h.collection.starts.lock().unwrap().len(), 1);
}

#[test]
fn test_resume_with_collection_disabled_stays_idle() {
    let automation = AutomationConfig {
        collect_enabled: false,
        ..AutomationConfig::default()
    };
    let h = harness_with(automation, test_config(), Duration::from_millis(10));

    assert!(!h.orchestrator.resume());
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Idle);
    assert!(h.collection.starts.lock().unwrap().is_empty());
}

#[test]
fn test_resume_refused_while_run_once_module_holds_device() {
    let h = harness();
    h.expedition.running.store(true, Ordering::SeqCst);

    assert!(!h.orchestrator.resume());
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Idle);
    assert!(h.collection.starts.lock().unwrap().is_empty());
}

#[test]
fn test_expedition_handoff_consumes_flag_once() {
    let h = harness();
    h.orchestrator.resume();

    // What the assist watcher does on an idle-squad match.
    h.ctx.request_pause_all(AgentId::Collection);
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Idle);
    assert!(h.ctx.pending.expedition.raise());

    h.orchestrator.poll_handoffs();
    assert!(!h.ctx.pending.expedition.is_raised());
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Expedition);

    h.orchestrator.poll_handoffs();
    assert!(wait_until(Duration::from_secs(2), || {
        h.orchestrator.task_flag() == TaskFlag::Collecting
    }));
    assert_eq!(h.expedition.runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_collection_expedition_collection_round_trip() {
    let mut h = harness();
    h.orchestrator.start();
    assert!(h.orchestrator.resume());

    h.ctx.request_pause_all(AgentId::Collection);
    h.ctx.pending.expedition.raise();

    assert!(wait_until(Duration::from_secs(2), || {
        h.expedition.runs.load(Ordering::SeqCst) == 1
            && h.orchestrator.task_flag() == TaskFlag::Collecting
    }));
    h.orchestrator.stop();

    assert_eq!(h.expedition.resume_requests.load(Ordering::SeqCst), 1);
    assert_eq!(
        *h.collection.starts.lock().unwrap(),
        vec![vec!["food".to_string()], vec!["food".to_string()]]
    );
    assert_eq!(
        *h.flags.0.lock().unwrap(),
        vec![
            TaskFlag::Collecting,
            TaskFlag::Idle,
            TaskFlag::Expedition,
            TaskFlag::Idle,
            TaskFlag::Collecting,
        ]
    );
}

#[test]
fn test_expedition_without_home_releases_to_idle() {
    let h = harness();
    *h.expedition.outcome.lock().unwrap() = ExpeditionOutcome::HomeUnconfirmed;
    h.orchestrator.resume();

    h.orchestrator.manual_expedition();
    h.orchestrator.poll_handoffs();

    assert!(wait_until(Duration::from_secs(2), || {
        h.expedition.runs.load(Ordering::SeqCst) == 1
            && h.orchestrator.task_flag() == TaskFlag::Idle
    }));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Idle);
    assert_eq!(h.collection.starts.lock().unwrap().len(), 1);
}

#[test]
fn test_research_trigger_takes_device_then_resumes() {
    let h = harness();
    h.orchestrator.resume();

    h.orchestrator.trigger_research(TimerKind::Research);

    assert_eq!(h.research.runs.load(Ordering::SeqCst), 1);
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Collecting);
    assert!(!h.ctx.pause.research.is_set());
    assert_eq!(h.collection.starts.lock().unwrap().len(), 2);
    assert_eq!(
        h.flags.0.lock().unwrap()[..3],
        [TaskFlag::Collecting, TaskFlag::Idle, TaskFlag::Researching]
    );
}

#[test]
fn test_accelerate_trigger_uses_accelerate_flow() {
    let h = harness();
    h.orchestrator.trigger_research(TimerKind::Accelerate);
    assert_eq!(h.research.accelerations.load(Ordering::SeqCst), 1);
    assert_eq!(h.research.runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_trigger_during_expedition_is_dropped_if_still_busy() {
    let h = harness_with(
        AutomationConfig::default(),
        test_config(),
        Duration::from_millis(400),
    );
    h.orchestrator.manual_expedition();
    h.orchestrator.poll_handoffs();
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Expedition);

    let started = Instant::now();
    h.orchestrator.trigger_research(TimerKind::Research);

    assert!(started.elapsed() >= Duration::from_millis(100));
    assert_eq!(h.research.runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_trigger_during_expedition_runs_after_single_recheck() {
    let config = OrchestratorConfig {
        research_defer: Duration::from_millis(300),
        ..test_config()
    };
    let h = harness_with(AutomationConfig::default(), config, Duration::from_millis(40));
    h.orchestrator.manual_expedition();
    h.orchestrator.poll_handoffs();
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Expedition);

    h.orchestrator.trigger_research(TimerKind::Research);

    assert_eq!(h.research.runs.load(Ordering::SeqCst), 1);
    assert_eq!(h.expedition.runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_trigger_ignored_while_rift_runs() {
    let h = harness();
    h.orchestrator.request_rift();
    h.orchestrator.poll_handoffs();
    assert!(wait_until(Duration::from_secs(2), || h.rift.is_running()));
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Rift);

    h.orchestrator.trigger_research(TimerKind::Research);

    assert_eq!(h.research.runs.load(Ordering::SeqCst), 0);
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Rift);
}

#[test]
fn test_rift_sweep_pause_keeps_rift_running() {
    let h = harness();
    h.orchestrator.request_rift();
    h.orchestrator.poll_handoffs();
    assert!(wait_until(Duration::from_secs(2), || h.rift.is_running()));

    h.ctx.request_pause_all(AgentId::Rift);

    assert!(h.rift.is_running());
    assert!(h.ctx.pause.global.is_set());
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Rift);
    assert!(h.orchestrator.continue_rift());
}

#[test]
fn test_rift_resume_requires_screenshot_mode() {
    let h = harness();
    *h.control.0.lock().unwrap() = CaptureMode::VideoStream;
    h.orchestrator.request_rift();
    h.orchestrator.poll_handoffs();
    assert!(wait_until(Duration::from_secs(2), || h.rift.is_running()));

    h.rift.finish_home();

    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Idle);
    assert!(h.collection.starts.lock().unwrap().is_empty());

    // A later rift run that ends in screenshot mode resumes collection.
    *h.control.0.lock().unwrap() = CaptureMode::Screenshot;
    h.orchestrator.request_rift();
    h.orchestrator.poll_handoffs();
    assert!(wait_until(Duration::from_secs(2), || h.rift.is_running()));
    h.rift.finish_home();

    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Collecting);
    assert_eq!(h.collection.starts.lock().unwrap().len(), 1);
    assert_eq!(h.rift.starts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_startup_runs_research_then_collection() {
    let automation = AutomationConfig {
        research_enabled: true,
        ..AutomationConfig::default()
    };
    let h = harness_with(automation, test_config(), Duration::from_millis(10));

    h.orchestrator.run_startup();

    assert_eq!(h.research.runs.load(Ordering::SeqCst), 1);
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Collecting);
    assert_eq!(h.collection.starts.lock().unwrap().len(), 1);
    assert!(!h.rift.is_running());
}

#[test]
fn test_startup_with_rift_enabled_ends_in_rift() {
    let automation = AutomationConfig {
        rift_enabled: true,
        ..AutomationConfig::default()
    };
    let h = harness_with(automation, test_config(), Duration::from_millis(10));

    h.orchestrator.run_startup();

    assert!(h.rift.is_running());
    assert!(!h.collection.is_running());
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Rift);
}

#[test]
fn test_stop_all_blocks_triggers_until_resumed() {
    let h = harness();
    h.orchestrator.resume();

    h.orchestrator.stop_all();
    assert!(h.orchestrator.is_stopped());
    assert!(h.ctx.pause.expedition.is_set());
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Idle);

    h.orchestrator.trigger_research(TimerKind::Research);
    assert_eq!(h.research.runs.load(Ordering::SeqCst), 0);

    assert!(h.orchestrator.resume());
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Collecting);
}

#[test]
fn test_resume_after_stop_all_unpauses_collection() {
    let h = harness();
    h.orchestrator.resume();
    h.orchestrator.stop_all();
    assert!(h.ctx.pause.collection_paused());

    assert!(h.orchestrator.resume());
    assert_eq!(h.orchestrator.task_flag(), TaskFlag::Collecting);
    assert!(!h.ctx.pause.expedition.is_set());
    assert!(!h.ctx.pause.collection_paused());
}

#[test]
fn test_manual_research_after_stop_all_unpauses_collection() {
    let h = harness();
    h.orchestrator.stop_all();

    h.orchestrator.manual_research();
    assert!(wait_until(Duration::from_secs(5), || {
        h.research.runs.load(Ordering::SeqCst) == 1
            && h.orchestrator.task_flag() == TaskFlag::Collecting
    }));
    assert!(!h.orchestrator.is_stopped());
    assert!(!h.ctx.pause.collection_paused());
}

#[test]
fn test_statuses_cover_every_module() {
    let h = harness();
    h.orchestrator.resume();
    let statuses = h.orchestrator.statuses();
    let ids: Vec<AgentId> = statuses.iter().map(|s| s.agent).collect();
    assert_eq!(ids, AgentId::ALL.to_vec());
    assert!(statuses[1].running);
}

#[test]
fn test_mutual_exclusion_under_interleaved_requests() {
    let config = OrchestratorConfig {
        research_defer: Duration::from_millis(10),
        ..test_config()
    };
    let mut h = harness_with(AutomationConfig::default(), config, Duration::from_millis(3));
    let h_ctx = Arc::clone(&h.ctx);
    h.orchestrator.start();
    h.orchestrator.resume();

    let done = Arc::new(AtomicBool::new(false));

    let finisher = {
        let rift = Arc::clone(&h.rift);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                if rift.is_running() {
                    thread::sleep(Duration::from_millis(4));
                    rift.finish_home();
                }
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    // Requests arrive the way modules raise them: timer hooks and pending flags.
    let requesters: Vec<_> = (0..4)
        .map(|worker| {
            let ctx = Arc::clone(&h_ctx);
            thread::spawn(move || {
                for round in 0..25 {
                    match (worker + round) % 3 {
                        0 => ctx.timer_expired(TimerKind::Research),
                        1 => {
                            ctx.pending.expedition.raise();
                        }
                        _ => {
                            ctx.pending.rift.raise();
                        }
                    }
                    thread::sleep(Duration::from_millis(2));
                }
            })
        })
        .collect();

    for requester in requesters {
        requester.join().unwrap();
    }
    // Let queued work drain.
    thread::sleep(Duration::from_millis(500));
    done.store(true, Ordering::SeqCst);
    finisher.join().unwrap();
    h.orchestrator.stop();

    assert_eq!(h.ledger.violations.load(Ordering::SeqCst), 0);
    assert!(h.ledger.max_exclusive.load(Ordering::SeqCst) <= 1);
    assert!(h.expedition.runs.load(Ordering::SeqCst) >= 1);
}
