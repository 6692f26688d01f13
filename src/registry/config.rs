//! Registry configuration

/// What a sender does when a connection's outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait for the connection's writer to make room
    #[default]
    Wait,
    /// Treat a full queue as a failed delivery (observers get pruned)
    Disconnect,
}

/// Configuration for the connection registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of each connection's outbound queue
    pub outbound_capacity: usize,

    /// Behavior when an outbound queue is full
    pub overflow_policy: OverflowPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            overflow_policy: OverflowPolicy::Wait,
        }
    }
}

impl RegistryConfig {
    /// Set the outbound queue capacity (at least 1)
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }
}
