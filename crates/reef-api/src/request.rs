use serde::{Deserialize, Serialize};

use reef_crdt::Link;
use reef_query::Query;

/// Kind of a client request. Exactly one payload field is populated per
/// kind; `Noop` carries nothing and is rejected by validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    #[default]
    Noop,
    Query,
    Reflect,
    Replicate,
}

/// Read-only introspection requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReflectionType {
    #[default]
    Noop,
    HeadPath,
    DumpNamespace,
    Index,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub request_type: RequestType,
    #[serde(default)]
    pub query: Option<Query>,
    #[serde(default)]
    pub reflection: Option<ReflectionType>,
    #[serde(default)]
    pub replicate: Vec<Link>,
}

impl Request {
    pub fn query(query: Query) -> Self {
        Self {
            request_type: RequestType::Query,
            query: Some(query),
            ..Self::default()
        }
    }

    pub fn reflect(reflection: ReflectionType) -> Self {
        Self {
            request_type: RequestType::Reflect,
            reflection: Some(reflection),
            ..Self::default()
        }
    }

    pub fn replicate(links: Vec<Link>) -> Self {
        Self {
            request_type: RequestType::Replicate,
            replicate: links,
            ..Self::default()
        }
    }

    pub fn noop() -> Self {
        Self::default()
    }
}
