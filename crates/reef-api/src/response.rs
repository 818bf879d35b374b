use serde::{Deserialize, Serialize};

use reef_crdt::{Address, Index, Namespace};

use crate::error::ApiError;
use crate::request::RequestType;

pub const RESPONSE_OK_MSG: &str = "ok";
pub const RESPONSE_FAIL_MSG: &str = "error";

/// The single reply to a request.
///
/// `msg` is `"error"` iff `err` is present. The payload fields are mutually
/// exclusive, depending on the request kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub msg: String,
    #[serde(default)]
    pub err: Option<String>,
    pub request_type: RequestType,
    #[serde(default)]
    pub path: Option<Address>,
    #[serde(default)]
    pub namespace: Option<Namespace>,
    #[serde(default)]
    pub index: Option<Index>,
}

impl Response {
    pub fn ok(request_type: RequestType) -> Self {
        Self {
            msg: RESPONSE_OK_MSG.to_string(),
            request_type,
            ..Self::default()
        }
    }

    pub fn error(request_type: RequestType, err: &ApiError) -> Self {
        Self {
            msg: RESPONSE_FAIL_MSG.to_string(),
            err: Some(err.to_string()),
            request_type,
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: Address) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.index = Some(index);
        self
    }

    pub fn is_error(&self) -> bool {
        self.err.is_some()
    }
}
