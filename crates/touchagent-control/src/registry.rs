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

//! The set of automation modules the orchestrator drives.

use std::sync::Arc;
use touchagent_core::{
    Agent, AgentId, AgentStatus, CollectionAgent, ExpeditionAgent, ResearchAgent, RiftAgent,
};

/// One handle per automation module.
#[derive(Clone)]
pub struct AgentSet {
    /// Resource collection loops.
    pub collection: Arc<dyn CollectionAgent>,
    /// Research flow.
    pub research: Arc<dyn ResearchAgent>,
    /// Expedition flow.
    pub expedition: Arc<dyn ExpeditionAgent>,
    /// Rift loop.
    pub rift: Arc<dyn RiftAgent>,
}

impl AgentSet {
    /// Looks up a module by id.
    pub fn get(&self, id: AgentId) -> &dyn Agent {
        match id {
            AgentId::Collection => self.collection.as_ref(),
            AgentId::Research => self.research.as_ref(),
            AgentId::Expedition => self.expedition.as_ref(),
            AgentId::Rift => self.rift.as_ref(),
        }
    }

    /// Status of every module, in [`AgentId::ALL`] order.
    pub fn statuses(&self) -> Vec<AgentStatus> {
        AgentId::ALL
            .iter()
            .map(|&id| self.get(id).report_status())
            .collect()
    }

    /// The first exclusive module currently running, if any.
    ///
    /// Collection is not exclusive and is never reported here.
    pub fn busy_exclusive(&self) -> Option<AgentId> {
        [AgentId::Research, AgentId::Expedition, AgentId::Rift]
            .into_iter()
            .find(|&id| self.get(id).is_running())
    }
}
