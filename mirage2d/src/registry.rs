use std::collections::BTreeMap;

use crate::actor::Actor;
use crate::ai::Controller;

/// Unique identifier for an agent in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u32);

impl AgentId {
    /// Get the underlying integer ID (useful for debugging or serialization).
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// Which side an agent fights on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Player,
    Enemy,
}

/// An actor together with whatever drives it.
pub struct Agent {
    pub role: Role,
    pub actor: Actor,
    pub controller: Box<dyn Controller>,
}

impl Agent {
    pub fn new(role: Role, actor: Actor, controller: impl Controller + 'static) -> Self {
        Self {
            role,
            actor,
            controller: Box::new(controller),
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("role", &self.role)
            .field("controller", &self.controller.name())
            .field("actor", &self.actor)
            .finish()
    }
}

/// Owns every live agent. Iteration is in spawn order.
#[derive(Debug)]
pub struct AgentRegistry {
    next_id: u32,
    agents: BTreeMap<AgentId, Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            agents: BTreeMap::new(),
        }
    }

    /// Add an agent and return its `AgentId`.
    pub fn spawn(&mut self, agent: Agent) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.agents.insert(id, agent);
        id
    }

    /// Remove an agent, handing it back.
    pub fn despawn(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Agent)> {
        self.agents.iter().map(|(&id, agent)| (id, agent))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (AgentId, &mut Agent)> {
        self.agents.iter_mut().map(|(&id, agent)| (id, agent))
    }

    /// The first agent with the given role.
    pub fn first_with_role(&self, role: Role) -> Option<(AgentId, &Agent)> {
        self.iter().find(|(_, agent)| agent.role == role)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MageBrain;
    use crate::config::{ActorConfig, MageConfig};
    use crate::math::Vec2;

    fn mage() -> Agent {
        let actor = Actor::from_config(Vec2::ZERO, &ActorConfig::mage()).expect("valid animations");
        Agent::new(Role::Enemy, actor, MageBrain::new(MageConfig::default()))
    }

    #[test]
    fn ids_are_unique_and_never_zero() {
        let mut registry = AgentRegistry::new();
        let a = registry.spawn(mage());
        let b = registry.spawn(mage());
        assert_ne!(a, b);
        assert_ne!(a.to_u32(), 0);
        assert_eq!(registry.len(), 2);

        assert!(registry.despawn(a).is_some());
        assert!(registry.despawn(a).is_none());
        assert!(!registry.contains(a));
        assert_eq!(registry.first_with_role(Role::Enemy).map(|(id, _)| id), Some(b));
        assert!(registry.first_with_role(Role::Player).is_none());
    }
}
