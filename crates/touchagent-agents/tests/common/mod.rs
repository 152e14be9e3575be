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

//! Fake device, frames and perception shared by the module tests.

#![allow(dead_code)]

use image::RgbImage;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use touchagent_agents::keys::{collect, expedition, home, research, rift};
use touchagent_agents::Screen;
use touchagent_control::CoordinationContext;
use touchagent_core::{
    AgentId, AutomationConfig, CaptureMode, ControlChannel, ControlCommand, ControlReply,
    CoordinatorHooks, Frame, FrameSource, Layout, Pacer, Perceiver, Point, Region,
    StatusListener, StreamSource, Swipe, TimerKind, TouchDevice,
};

/// Scale applied to every module delay in tests.
pub const TEST_PACE: f32 = 0.001;

// --- Device ---

type Reaction = Box<dyn Fn() + Send + Sync>;

/// Records every tap and swipe. Taps on registered points run a reaction, which
/// is how tests make the fake screen respond.
#[derive(Default)]
pub struct RecordingDevice {
    taps: Mutex<Vec<Point>>,
    swipes: Mutex<Vec<Swipe>>,
    reactions: Mutex<Vec<(Point, Reaction)>>,
}

impl RecordingDevice {
    pub fn on_tap(&self, point: Point, reaction: impl Fn() + Send + Sync + 'static) {
        self.reactions
            .lock()
            .unwrap()
            .push((point, Box::new(reaction)));
    }

    pub fn taps(&self) -> Vec<Point> {
        self.taps.lock().unwrap().clone()
    }

    pub fn tap_count(&self, point: Point) -> usize {
        self.taps.lock().unwrap().iter().filter(|p| **p == point).count()
    }

    pub fn swipe_count(&self) -> usize {
        self.swipes.lock().unwrap().len()
    }
}

impl TouchDevice for RecordingDevice {
    fn tap(&self, point: Point, _delay: Duration) -> bool {
        self.taps.lock().unwrap().push(point);
        for (target, reaction) in self.reactions.lock().unwrap().iter() {
            if *target == point {
                reaction();
            }
        }
        true
    }

    fn swipe(&self, swipe: &Swipe) -> bool {
        self.swipes.lock().unwrap().push(*swipe);
        true
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reconnect(&self) -> bool {
        true
    }
}

// --- Frames ---

/// Blank frames with increasing sequence numbers.
pub struct ScriptedFrames {
    seq: AtomicU64,
    pub fail: AtomicBool,
    pub small: AtomicBool,
    pub frozen: AtomicBool,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub ready: AtomicBool,
}

impl Default for ScriptedFrames {
    fn default() -> Self {
        Self {
            seq: AtomicU64::new(0),
            fail: AtomicBool::new(false),
            small: AtomicBool::new(false),
            frozen: AtomicBool::new(false),
            started: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
            ready: AtomicBool::new(true),
        }
    }
}

impl FrameSource for ScriptedFrames {
    fn capture_frame(&self) -> Option<Frame> {
        if self.fail.load(Ordering::SeqCst) {
            return None;
        }
        let seq = if self.frozen.load(Ordering::SeqCst) {
            self.seq.load(Ordering::SeqCst)
        } else {
            self.seq.fetch_add(1, Ordering::SeqCst) + 1
        };
        let side = if self.small.load(Ordering::SeqCst) { 50 } else { 200 };
        Some(Frame::new(RgbImage::new(side, side), seq))
    }
}

impl StreamSource for ScriptedFrames {
    fn start(&self) -> bool {
        self.started.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

// --- Perception ---

/// Answers perception queries from values the test sets.
#[derive(Default)]
pub struct ScriptedPerceiver {
    scores: Mutex<HashMap<String, f32>>,
    once: Mutex<HashSet<String>>,
    locations: Mutex<HashMap<String, Vec<Point>>>,
    texts: Mutex<HashMap<Region, String>>,
    numbers: Mutex<HashMap<Region, u32>>,
    durations: Mutex<HashMap<Region, Duration>>,
}

impl ScriptedPerceiver {
    pub fn show(&self, template: &str) {
        self.set_score(template, 1.0);
    }

    /// Visible for exactly one query.
    pub fn show_once(&self, template: &str) {
        self.show(template);
        self.once.lock().unwrap().insert(template.to_string());
    }

    pub fn hide(&self, template: &str) {
        self.scores.lock().unwrap().remove(template);
    }

    pub fn set_score(&self, template: &str, score: f32) {
        self.scores
            .lock()
            .unwrap()
            .insert(template.to_string(), score);
    }

    /// Returned by the next `locate_all` for `template`, then cleared.
    pub fn set_locations(&self, template: &str, points: Vec<Point>) {
        self.locations
            .lock()
            .unwrap()
            .insert(template.to_string(), points);
    }

    pub fn set_text(&self, region: Region, text: &str) {
        self.texts.lock().unwrap().insert(region, text.to_string());
    }

    pub fn set_number(&self, region: Region, value: u32) {
        self.numbers.lock().unwrap().insert(region, value);
    }

    pub fn set_duration(&self, region: Region, value: Duration) {
        self.durations.lock().unwrap().insert(region, value);
    }
}

impl Perceiver for ScriptedPerceiver {
    fn match_score(&self, _frame: &Frame, template: &str, _region: Region) -> Option<f32> {
        let score = self.scores.lock().unwrap().get(template).copied();
        if score.is_some() && self.once.lock().unwrap().remove(template) {
            self.hide(template);
        }
        Some(score.unwrap_or(0.0))
    }

    fn locate_all(&self, _frame: &Frame, template: &str, _region: Region, _threshold: f32) -> Vec<Point> {
        self.locations
            .lock()
            .unwrap()
            .remove(template)
            .unwrap_or_default()
    }

    fn read_text(&self, _frame: &Frame, region: Region, _charset: Option<&str>) -> Option<String> {
        self.texts.lock().unwrap().get(&region).cloned()
    }

    fn read_number(&self, _frame: &Frame, region: Region) -> Option<u32> {
        self.numbers.lock().unwrap().get(&region).copied()
    }

    fn read_floor(&self, frame: &Frame, region: Region) -> Option<u32> {
        self.read_number(frame, region)
    }

    fn read_duration(&self, _frame: &Frame, region: Region) -> Option<Duration> {
        self.durations.lock().unwrap().get(&region).copied()
    }

    fn contains_text(&self, frame: &Frame, region: Region, needles: &[&str]) -> bool {
        self.read_text(frame, region, None)
            .is_some_and(|text| needles.iter().any(|n| text.contains(n)))
    }

    fn locate_text(&self, frame: &Frame, region: Region, needle: &str) -> Option<Point> {
        self.contains_text(frame, region, &[needle])
            .then(|| region.centre())
    }
}

// --- Control channel ---

/// Replies like the device: switches change the reported mode.
pub struct FakeControl {
    mode: Mutex<CaptureMode>,
    pub sent: Mutex<Vec<ControlCommand>>,
}

impl Default for FakeControl {
    fn default() -> Self {
        Self {
            mode: Mutex::new(CaptureMode::Screenshot),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl FakeControl {
    pub fn sent(&self) -> Vec<ControlCommand> {
        self.sent.lock().unwrap().clone()
    }
}

impl ControlChannel for FakeControl {
    fn send(&self, command: ControlCommand) -> Option<ControlReply> {
        self.sent.lock().unwrap().push(command);
        let mut mode = self.mode.lock().unwrap();
        Some(match command {
            ControlCommand::SwitchToScreenshot => {
                *mode = CaptureMode::Screenshot;
                ControlReply::ScreenshotAck
            }
            ControlCommand::SwitchToVideo => {
                *mode = CaptureMode::VideoStream;
                ControlReply::Unknown("OK".into())
            }
            ControlCommand::QueryStatus => ControlReply::Mode(*mode),
        })
    }
}

// --- Events ---

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PauseAll(AgentId),
    ResumeAfter(AgentId),
    TimerExpired(TimerKind),
    Notify(String),
    RiftLevel(u32, u32),
}

/// Records hook calls and listener notifications in order.
#[derive(Default)]
pub struct EventLog(Mutex<Vec<Event>>);

impl EventLog {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn notified(&self, needle: &str) -> bool {
        self.0
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, Event::Notify(text) if text.contains(needle)))
    }

    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }
}

impl CoordinatorHooks for EventLog {
    fn pause_all(&self, requester: AgentId) {
        self.push(Event::PauseAll(requester));
    }

    fn resume_after(&self, agent: AgentId) {
        self.push(Event::ResumeAfter(agent));
    }

    fn timer_expired(&self, kind: TimerKind) {
        self.push(Event::TimerExpired(kind));
    }
}

impl StatusListener for EventLog {
    fn notify(&self, title: &str, message: &str) {
        self.push(Event::Notify(format!("{title}: {message}")));
    }

    fn rift_level_updated(&self, level: u32, failures: u32) {
        self.push(Event::RiftLevel(level, failures));
    }
}

// --- Layout ---

const POINT_KEYS: &[&str] = &[
    collect::CHAT_CLOSE,
    collect::ASSIST,
    expedition::OPEN,
    expedition::POPUP_CLOSE,
    expedition::TERRITORY,
    expedition::CLAIM_ALL,
    expedition::CLOSE_TERRITORY,
    expedition::SCOUT,
    expedition::EVENTS,
    expedition::RESOURCE_TAB,
    expedition::CLOSE_EVENTS,
    expedition::DETAIL_CENTRE,
    expedition::GATHER,
    expedition::DISPATCH,
    expedition::BACK_TO_EVENTS,
    expedition::EXIT,
    research::OPEN,
    research::CLOSE,
    research::CLOSE_DONE,
    research::AVAILABLE_DEFAULT,
    research::START,
    research::HELP,
    research::ACCELERATE,
    research::FREE_REDUCE,
    rift::CLOSE_AD,
    rift::CLOSE_REWARD,
    rift::CLOSE_FAILURE,
    rift::CHALLENGE,
    rift::SKIP,
    rift::CONTINUE,
    rift::RETURN_HOME,
];

const REGION_KEYS: &[&str] = &[
    home::REGION,
    home::IDLE_SQUAD_REGION,
    collect::CHAT_CLOSE_REGION,
    collect::ASSIST_REGION,
    expedition::PAGE_REGION,
    expedition::SCOUT_ENERGY_REGION,
    expedition::EVENT_PAGE_REGION,
    expedition::RESOURCE_LIST_REGION,
    expedition::IDLE_TROOP_REGION,
    research::DONE_REGION,
    research::AVAILABLE_REGION,
    research::STATUS_REGION,
    research::REMAINING_REGION,
    research::ACCELERATE_REGION,
    research::COOLDOWN_REGION,
    research::PAGE_REGION,
    rift::AD_REGION,
    rift::REWARD_REGION,
    rift::FAILURE_REGION,
    rift::CHALLENGE_REGION,
    rift::SWEEP_REGION,
    rift::BATTLE_REGION,
    rift::SKIP_REGION,
    rift::CONTINUE_REGION,
    rift::LEVEL_REGION,
];

/// Every layout key the modules use, each at a distinct position.
pub fn test_layout(resources: &[&str]) -> Layout {
    let mut layout = Layout::default();
    let resource_keys: Vec<String> = resources.iter().map(|r| collect::resource(r)).collect();
    let points = POINT_KEYS
        .iter()
        .map(|k| k.to_string())
        .chain(resource_keys);
    for (i, key) in points.enumerate() {
        let i = i as i32;
        layout.points.insert(key, Point::new(10 + i * 10, 20 + i * 10));
    }
    layout
        .points
        .insert(expedition::GO_OFFSET.to_string(), Point::new(100, 0));

    for (i, key) in REGION_KEYS.iter().enumerate() {
        let i = i as u32 * 10;
        layout
            .regions
            .insert(key.to_string(), Region::new(i, i, i + 8, i + 8));
    }
    for (_, region) in expedition::POPUPS {
        layout
            .regions
            .insert(region.to_string(), Region::new(500, 500, 520, 520));
    }
    layout.regions.insert(
        expedition::GO_REGION.to_string(),
        Region::new(0, 0, 1000, 1000),
    );
    layout.swipes.insert(
        expedition::SCROLL.to_string(),
        Swipe::new(Point::new(100, 600), Point::new(100, 200), 300),
    );
    layout
}

// --- Fixture ---

/// One fake device wired into a context and a screen.
pub struct Fixture {
    pub ctx: Arc<CoordinationContext>,
    pub device: Arc<RecordingDevice>,
    pub frames: Arc<ScriptedFrames>,
    pub perceiver: Arc<ScriptedPerceiver>,
    pub control: Arc<FakeControl>,
    pub layout: Arc<Layout>,
    pub screen: Arc<Screen>,
    pub events: Arc<EventLog>,
}

impl Fixture {
    pub fn new(config: AutomationConfig) -> Self {
        let resources: Vec<&str> = config.resources.iter().map(String::as_str).collect();
        let layout = Arc::new(test_layout(&resources));
        let ctx = Arc::new(CoordinationContext::new(config));
        let device = Arc::new(RecordingDevice::default());
        let frames = Arc::new(ScriptedFrames::default());
        let perceiver = Arc::new(ScriptedPerceiver::default());
        let events = Arc::new(EventLog::default());
        ctx.register_hooks(events.clone());
        ctx.add_listener(events.clone());

        let screen = Arc::new(Screen::new(
            device.clone(),
            frames.clone(),
            perceiver.clone(),
            layout.clone(),
            Pacer::new(TEST_PACE),
        ));
        Self {
            ctx,
            device,
            frames,
            perceiver,
            control: Arc::new(FakeControl::default()),
            layout,
            screen,
            events,
        }
    }

    pub fn point(&self, key: &str) -> Point {
        self.layout.point(key).unwrap()
    }

    pub fn region(&self, key: &str) -> Region {
        self.layout.region(key).unwrap()
    }

    pub fn taps_of(&self, key: &str) -> usize {
        self.device.tap_count(self.point(key))
    }
}

/// Polls `condition` every millisecond until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}
