// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::sync::Arc;
use vg_adapters::Agent;

/// Agents keyed by name
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent under its own name, replacing any previous one
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        let name = agent.name().to_string();
        if self.agents.insert(name.clone(), agent).is_some() {
            tracing::warn!(agent = %name, "replaced registered agent");
        }
    }

    pub fn with(mut self, agent: impl Agent + 'static) -> Self {
        self.register(Arc::new(agent));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Agents that must pass startup validation
    pub fn critical(&self) -> impl Iterator<Item = &Arc<dyn Agent>> {
        self.agents.values().filter(|a| a.is_critical())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
