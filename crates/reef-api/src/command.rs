use tokio::sync::oneshot;

use reef_crdt::Link;
use reef_query::Query;

use crate::error::{ApiError, ApiResult};
use crate::request::{ReflectionType, Request, RequestType};
use crate::response::Response;

/// What the engine should do for one request.
#[derive(Clone, Debug)]
pub enum CommandKind {
    RunQuery(Query),
    Reflect(ReflectionType),
    Replicate(Vec<Link>),
}

/// A queued unit of work: the original request, its engine dispatch, and
/// the one-shot channel the response is delivered on.
///
/// Dropping a command without responding closes the channel without a
/// value; that is how shutdown cancels pending work.
#[derive(Debug)]
pub struct Command {
    pub request: Request,
    pub kind: CommandKind,
    responder: oneshot::Sender<Response>,
}

impl Command {
    /// Build a command from a validated request, returning the receiver the
    /// caller awaits. Exactly one response will be delivered, after which
    /// the channel is closed.
    pub fn from_request(request: Request) -> ApiResult<(Command, oneshot::Receiver<Response>)> {
        let kind = match request.request_type {
            RequestType::Query => {
                let query = request
                    .query
                    .clone()
                    .ok_or_else(|| ApiError::Validation("query request without query".into()))?;
                CommandKind::RunQuery(query)
            }
            RequestType::Reflect => {
                let reflection = request.reflection.ok_or_else(|| {
                    ApiError::Validation("reflect request without reflection".into())
                })?;
                CommandKind::Reflect(reflection)
            }
            RequestType::Replicate => CommandKind::Replicate(request.replicate.clone()),
            RequestType::Noop => {
                return Err(ApiError::Validation("no-op request".into()));
            }
        };

        let (tx, rx) = oneshot::channel();
        Ok((
            Command {
                request,
                kind,
                responder: tx,
            },
            rx,
        ))
    }

    pub fn request_type(&self) -> RequestType {
        self.request.request_type
    }

    /// Deliver the response. The send is non-blocking; an abandoned
    /// receiver is logged and the response discarded.
    pub fn respond(self, response: Response) {
        if self.responder.send(response).is_err() {
            tracing::warn!("response channel abandoned by caller, discarding response");
        }
    }

    /// Reply with an error response derived from `err`.
    pub fn fail(self, err: &ApiError) {
        let request_type = self.request_type();
        self.respond(Response::error(request_type, err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_query::QuerySelect;

    #[tokio::test]
    async fn query_command_delivers_exactly_one_response() {
        let request = Request::query(Query::select("t", QuerySelect::default()));
        let (command, mut rx) = Command::from_request(request).unwrap();
        assert!(matches!(command.kind, CommandKind::RunQuery(_)));

        command.respond(Response::ok(RequestType::Query));

        let response = (&mut rx).await.unwrap();
        assert_eq!(response.msg, "ok");
        // The channel is closed after the single response.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropping_command_closes_channel_without_value() {
        let request = Request::reflect(ReflectionType::HeadPath);
        let (command, rx) = Command::from_request(request).unwrap();
        drop(command);
        assert!(rx.await.is_err());
    }

    #[test]
    fn noop_request_is_rejected() {
        let err = Command::from_request(Request::noop()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let request = Request {
            request_type: RequestType::Query,
            query: None,
            ..Request::default()
        };
        assert!(Command::from_request(request).is_err());
    }

    #[tokio::test]
    async fn responding_to_abandoned_receiver_does_not_panic() {
        let request = Request::reflect(ReflectionType::Index);
        let (command, rx) = Command::from_request(request).unwrap();
        drop(rx);
        command.respond(Response::ok(RequestType::Reflect));
    }
}
