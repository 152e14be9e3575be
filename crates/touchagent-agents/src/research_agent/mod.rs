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

//! The tech research module.
//!
//! Each flow opens the research page, starts new research or records how long the
//! current one has left, uses the free accelerate when it is available, and
//! returns home. The two countdowns it leaves in the timer manager call back into
//! the coordinator when they expire.

mod agent;

pub use agent::ResearchFlow;
