//! Request, response and command contract between clients, the service
//! pipeline and the namespace engine.
//!
//! A client [`Request`] is validated, turned into a [`Command`] carrying a
//! one-shot response channel, and queued for the engine. The engine answers
//! with exactly one [`Response`] per command.

pub mod command;
pub mod error;
pub mod priority;
pub mod request;
pub mod response;
pub mod validate;

pub use command::{Command, CommandKind};
pub use error::{ApiError, ApiResult};
pub use priority::{Priority, PriorityTable};
pub use request::{ReflectionType, Request, RequestType};
pub use response::Response;
pub use validate::{RequestValidator, StandardValidator};
