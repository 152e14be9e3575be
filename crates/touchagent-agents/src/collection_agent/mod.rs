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

//! The resource collection module.
//!
//! Two threads share one running signal:
//! - the **tap loop** cycles through the configured resource buttons;
//! - the **assist watcher** closes the chat overlay, presses the assist button and,
//!   when idle squads show up on the home screen, hands the device to the
//!   expedition module.

mod agent;
mod watcher;

pub use agent::CollectionLoop;
pub use watcher::{inspect, WatchAction};
