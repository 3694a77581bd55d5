//! Local agent discovery.
//!
//! In local mode without an explicit host/port, the endpoint resolver asks an
//! [`AgentRegistry`] where the agent is listening. The registry is read-only
//! from the client's point of view; how it is stored is up to the
//! implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// Where a local agent is listening.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentAddress {
    pub host: String,
    pub port: u16,
}

impl AgentAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for AgentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Lookup capability for locally-served agents.
pub trait AgentRegistry: Send + Sync {
    /// Address of `agent_id`, or `None` when it is not registered.
    fn lookup(&self, agent_id: &str) -> Option<AgentAddress>;
}

/// An in-memory registry.
///
/// # Example
///
/// ```
/// use runagent::registry::{AgentAddress, AgentRegistry, StaticRegistry};
///
/// let registry = StaticRegistry::new().with_agent("a1", AgentAddress::new("127.0.0.1", 8450));
/// assert_eq!(registry.lookup("a1").unwrap().port, 8450);
/// assert!(registry.lookup("a2").is_none());
/// ```
#[derive(Debug, Default)]
pub struct StaticRegistry {
    agents: RwLock<HashMap<String, AgentAddress>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent (builder-style).
    pub fn with_agent(self, agent_id: impl Into<String>, address: AgentAddress) -> Self {
        self.register(agent_id, address);
        self
    }

    /// Register or replace an agent's address.
    pub fn register(&self, agent_id: impl Into<String>, address: AgentAddress) {
        let mut agents = match self.agents.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        agents.insert(agent_id.into(), address);
    }

    /// Remove an agent. Returns its previous address.
    pub fn unregister(&self, agent_id: &str) -> Option<AgentAddress> {
        let mut agents = match self.agents.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        agents.remove(agent_id)
    }
}

impl AgentRegistry for StaticRegistry {
    fn lookup(&self, agent_id: &str) -> Option<AgentAddress> {
        let agents = match self.agents.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        agents.get(agent_id).cloned()
    }
}

impl<F> AgentRegistry for F
where
    F: Fn(&str) -> Option<AgentAddress> + Send + Sync,
{
    fn lookup(&self, agent_id: &str) -> Option<AgentAddress> {
        self(agent_id)
    }
}
