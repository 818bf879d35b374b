//! HTTP surface for a reef peer.
//!
//! One command endpoint accepts an encoded [`reef_api::Request`] by POST
//! and answers with an encoded [`reef_api::Response`]; the content-type
//! header selects the binary or text codec. Success is 200, validation and
//! application errors are 400 with the encoded error response as the body.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::ReefServer;
