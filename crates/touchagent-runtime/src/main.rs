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

mod app;
mod command;
mod selftest;

use anyhow::{Context, Result};
use app::{App, Devices};
use clap::{Parser, Subcommand};
use command::Command;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use touchagent_core::{Config, Signal};
use touchagent_telemetry::{init_logging, BusListener, EventBus, StatusEvent};

#[derive(Debug, Parser)]
#[command(name = "touchagent", version)]
#[command(about = "Drives a mobile game through a device-side touch and capture agent")]
struct Cli {
    /// Configuration file; defaults are used when it does not exist
    #[arg(long, short, default_value = "touchagent.toml")]
    config: PathBuf,

    /// Raise the log level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Run the automation, reading commands from standard input
    Run {
        /// Run the start-up sequence immediately
        #[arg(long)]
        autostart: bool,

        /// Print every status change as one JSON line on standard output
        #[arg(long)]
        json_events: bool,
    },
    /// Switch the device to screenshot mode and save one capture
    Screenshot {
        /// Output image path
        #[arg(long, default_value = "screenshot.png")]
        out: PathBuf,
    },
    /// Report whether the device channels answer
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)
        .with_context(|| format!("cannot load '{}'", cli.config.display()))?;

    match cli.command.unwrap_or(Mode::Run {
        autostart: false,
        json_events: false,
    }) {
        Mode::Run {
            autostart,
            json_events,
        } => run(config, autostart, json_events),
        Mode::Screenshot { out } => selftest::screenshot(&Devices::connect(&config), &out),
        Mode::Status => {
            selftest::status(&Devices::connect(&config));
            Ok(())
        }
    }
}

fn run(config: Config, autostart: bool, json_events: bool) -> Result<()> {
    let app = App::start(config);

    let printing = Arc::new(Signal::new());
    let printer = if json_events {
        let bus = EventBus::<StatusEvent>::new();
        app.context()
            .add_listener(Arc::new(BusListener::new(bus.sender())));
        printing.set();
        Some(spawn_printer(bus, Arc::clone(&printing))?)
    } else {
        None
    };

    if autostart {
        app.handle(Command::Start);
    }
    println!("commands: {}", Command::WORDS);

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read standard input")?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                if !app.handle(command) {
                    break;
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    app.shutdown();
    printing.clear();
    if let Some(handle) = printer {
        let _ = handle.join();
    }
    Ok(())
}

fn spawn_printer(
    bus: EventBus<StatusEvent>,
    printing: Arc<Signal>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("event-printer".into())
        .spawn(move || {
            while printing.is_set() {
                let Some(event) = bus.next_timeout(Duration::from_millis(200)) else {
                    continue;
                };
                match event.to_json() {
                    Ok(json) => println!("{json}"),
                    Err(e) => log::error!("EventPrinter: cannot encode {event}: {e}"),
                }
            }
            for event in bus.drain() {
                if let Ok(json) = event.to_json() {
                    println!("{json}");
                }
            }
        })
        .context("failed to spawn the event printer")
}
