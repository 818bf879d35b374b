use std::sync::Arc;

use reef_crypto::SigningKey;
use reef_proto::CodecOptions;

use crate::retry::RetryPolicy;

/// Engine tunables.
#[derive(Clone)]
pub struct EngineOptions {
    /// Topics the engine publishes new head addresses on.
    pub replicate_topics: Vec<String>,
    /// When set, published links are signed with this key.
    pub signing_key: Option<Arc<SigningKey>>,
    pub codec: CodecOptions,
    /// Retry policy for transient store failures.
    pub retry: RetryPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            replicate_topics: vec!["reef/heads".to_string()],
            signing_key: None,
            codec: CodecOptions::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl std::fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOptions")
            .field("replicate_topics", &self.replicate_topics)
            .field("signed", &self.signing_key.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}
