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

//! Logging and status reporting.
//!
//! Status changes reach the outside world through [`StatusListener`]
//! implementations registered on the coordination context:
//! [`LogListener`] writes them to the log and [`BusListener`] turns them into
//! [`StatusEvent`]s on an [`EventBus`] for whatever front end consumes them.
//!
//! [`StatusListener`]: touchagent_core::StatusListener

#![warn(missing_docs)]

mod bus;
mod event;
mod listener;
mod logging;

pub use bus::EventBus;
pub use event::StatusEvent;
pub use listener::{BusListener, LogListener};
pub use logging::init_logging;
