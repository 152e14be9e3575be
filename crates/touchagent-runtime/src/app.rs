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

//! Builds the object graph from a [`Config`] and owns it for the lifetime of a run.

use crate::command::Command;
use std::sync::Arc;
use std::time::Duration;
use touchagent_agents::{CollectionLoop, ExpeditionRunner, ResearchFlow, RiftLoop, Screen};
use touchagent_control::{
    AgentSet, ConnectionMonitor, CoordinationContext, MonitorConfig, Orchestrator,
    OrchestratorConfig, TimerManager,
};
use touchagent_core::{Config, ControlChannel, Pacer, TouchDevice};
use touchagent_io::{ControlClient, ScreenshotClient, TouchClient, VideoStreamListener};
use touchagent_telemetry::LogListener;
use touchagent_vision::ocr::TesseractCli;
use touchagent_vision::{TemplateLibrary, VisionEngine};

const TIMER_INTERVAL: Duration = Duration::from_secs(1);
const EXIT_TIMEOUT: Duration = Duration::from_secs(3);

/// The device clients, built once and shared by everything else.
pub struct Devices {
    pub touch: Arc<TouchClient>,
    pub screenshots: Arc<ScreenshotClient>,
    pub video: Arc<VideoStreamListener>,
    pub control: Arc<ControlClient>,
}

impl Devices {
    pub fn connect(config: &Config) -> Self {
        let device = &config.device;
        let host = device.host.as_str();
        let capture_timeout = Duration::from_millis(device.capture_timeout_ms);
        Self {
            touch: Arc::new(TouchClient::new(
                host,
                device.touch_port,
                Duration::from_millis(device.ack_timeout_ms),
            )),
            screenshots: Arc::new(ScreenshotClient::new(
                host,
                device.capture_port,
                capture_timeout,
            )),
            video: Arc::new(VideoStreamListener::new(
                host,
                device.capture_port,
                capture_timeout,
            )),
            control: Arc::new(ControlClient::new(
                host,
                device.control_port,
                Duration::from_millis(device.control_timeout_ms),
            )),
        }
    }
}

/// A running automation session.
pub struct App {
    ctx: Arc<CoordinationContext>,
    timers: Arc<TimerManager>,
    orchestrator: Orchestrator,
    monitor: ConnectionMonitor,
}

impl App {
    /// Wires every module and starts the background threads. Modules stay idle until
    /// [`Command::Start`].
    pub fn start(config: Config) -> Self {
        let devices = Devices::connect(&config);
        let ctx = Arc::new(CoordinationContext::new(config.automation.clone()));
        ctx.add_listener(Arc::new(LogListener));

        let ocr = TesseractCli::new(
            config.assets.ocr_command.clone(),
            config.assets.ocr_languages.clone(),
        );
        let vision = Arc::new(VisionEngine::new(
            TemplateLibrary::new(config.assets.template_dir.clone()),
            Box::new(ocr),
        ));
        let pacer = Pacer::new(config.automation.pace);
        let screen = Arc::new(Screen::new(
            devices.touch.clone(),
            devices.screenshots.clone(),
            vision,
            Arc::new(config.layout),
            pacer,
        ));
        let video_screen = Arc::new(screen.with_frames(devices.video.clone()));

        let timers = Arc::new(TimerManager::new(Arc::clone(&ctx), TIMER_INTERVAL));
        let control: Arc<dyn ControlChannel> = devices.control.clone();
        let agents = AgentSet {
            collection: Arc::new(CollectionLoop::new(
                Arc::clone(&ctx),
                Arc::clone(&screen),
                EXIT_TIMEOUT,
            )),
            research: Arc::new(ResearchFlow::new(
                Arc::clone(&ctx),
                Arc::clone(&screen),
                Arc::clone(&timers),
            )),
            expedition: Arc::new(ExpeditionRunner::new(Arc::clone(&ctx), Arc::clone(&screen))),
            rift: Arc::new(RiftLoop::new(
                Arc::clone(&ctx),
                video_screen,
                devices.video.clone(),
                Arc::clone(&control),
                EXIT_TIMEOUT,
            )),
        };

        let mut orchestrator = Orchestrator::new(
            Arc::clone(&ctx),
            agents,
            Arc::clone(&control),
            OrchestratorConfig {
                exit_timeout: EXIT_TIMEOUT,
                ..OrchestratorConfig::default()
            },
        );
        orchestrator.start();
        timers.start();

        let touch: Arc<dyn TouchDevice> = devices.touch.clone();
        let monitor = ConnectionMonitor::start(
            Arc::clone(&ctx),
            touch,
            control,
            MonitorConfig::default(),
        );

        log::info!("App: all components started.");
        Self {
            ctx,
            timers,
            orchestrator,
            monitor,
        }
    }

    /// The shared context, for attaching extra listeners.
    pub fn context(&self) -> &Arc<CoordinationContext> {
        &self.ctx
    }

    /// Applies one console command. Returns `false` when the session should end.
    pub fn handle(&self, command: Command) -> bool {
        log::debug!("App: command {command:?}.");
        match command {
            Command::Start => self.orchestrator.start_all(),
            Command::Pause => self.orchestrator.pause_all(),
            Command::Stop => self.orchestrator.stop_all(),
            Command::Resume => {
                if !self.orchestrator.resume() {
                    println!("collection not resumed: another module holds the device");
                }
            }
            Command::Research => self.orchestrator.manual_research(),
            Command::Expedition => self.orchestrator.manual_expedition(),
            Command::Rift => self.orchestrator.request_rift(),
            Command::Continue => {
                if !self.orchestrator.continue_rift() {
                    println!("no rift run to continue");
                }
            }
            Command::Status => self.print_status(),
            Command::Quit => return false,
        }
        true
    }

    fn print_status(&self) {
        println!("task: {}", self.orchestrator.task_flag());
        if self.orchestrator.is_stopped() {
            println!("stopped: waiting for start or resume");
        }
        for status in self.orchestrator.statuses() {
            println!("  {status}");
        }
        println!("timers: {}", self.timers.status());
    }

    /// Stops every module and background thread.
    pub fn shutdown(mut self) {
        log::info!("App: shutting down.");
        self.orchestrator.shutdown();
        self.timers.stop();
        self.monitor.stop();
    }
}
