use serde::{Deserialize, Serialize};

use crate::request::{Request, RequestType};

/// Queue priority: lower values drain first.
pub type Priority = u8;

/// Priority assignment per request kind.
///
/// By default reflections outrank writes, writes outrank reads, and
/// replication yields to client traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTable {
    pub reflect: Priority,
    pub query_write: Priority,
    pub query_read: Priority,
    pub replicate: Priority,
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self {
            reflect: 0,
            query_write: 1,
            query_read: 2,
            replicate: 3,
        }
    }
}

impl PriorityTable {
    pub fn priority_for(&self, request: &Request) -> Priority {
        match request.request_type {
            RequestType::Reflect => self.reflect,
            RequestType::Query => match &request.query {
                Some(query) if query.is_select() => self.query_read,
                _ => self.query_write,
            },
            RequestType::Replicate => self.replicate,
            // Never enqueued; validation rejects it first.
            RequestType::Noop => Priority::MAX,
        }
    }
}
