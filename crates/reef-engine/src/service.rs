use std::sync::Arc;

use tokio::sync::{oneshot, Mutex, Semaphore};
use tokio::task::JoinHandle;

use reef_api::{
    ApiError, ApiResult, Command, CommandKind, Request, RequestValidator, Response,
    StandardValidator,
};
use reef_cache::{CacheError, ResidentPriorityQueue};

use crate::remote::RemoteNamespace;

/// The request pipeline: admission, queueing and dispatch.
pub struct Service;

/// Client handle to a launched service. Cheap to clone.
#[derive(Clone)]
pub struct ServiceHandle {
    queue: Arc<ResidentPriorityQueue>,
    validator: Arc<dyn RequestValidator>,
}

impl Service {
    /// Launch the dispatcher task draining `queue` against `core`.
    ///
    /// `query_limit` bounds how many commands may be in flight against the
    /// engine concurrently; the single-writer CRDT engine wants 1.
    pub fn launch(
        core: RemoteNamespace,
        queue: Arc<ResidentPriorityQueue>,
        query_limit: usize,
    ) -> (ServiceHandle, JoinHandle<()>) {
        let handle = Service::handle_only(Arc::clone(&queue));
        let dispatcher = tokio::spawn(dispatch_loop(
            Arc::new(Mutex::new(core)),
            queue,
            query_limit.max(1),
        ));
        (handle, dispatcher)
    }

    /// A handle with no dispatcher attached. Calls validate and enqueue but
    /// nothing drains; used to exercise admission behavior in isolation.
    pub fn handle_only(queue: Arc<ResidentPriorityQueue>) -> ServiceHandle {
        ServiceHandle {
            queue,
            validator: Arc::new(StandardValidator),
        }
    }
}

impl ServiceHandle {
    /// Validate and enqueue a request.
    ///
    /// `Validation` and `QueueFull` errors surface here synchronously.
    /// Otherwise the returned channel yields exactly one response and then
    /// closes; if the service shuts down first, the channel closes without
    /// a value.
    pub fn call(&self, request: Request) -> ApiResult<oneshot::Receiver<Response>> {
        if self.queue.is_closed() {
            return Err(ApiError::AlreadyClosed);
        }
        self.validator.validate(&request)?;
        let (command, receiver) = Command::from_request(request)?;
        self.queue.enqueue(command).map_err(|err| match err {
            CacheError::QueueFull => ApiError::QueueFull,
            CacheError::Closed => ApiError::AlreadyClosed,
            other => ApiError::Internal(other.to_string()),
        })?;
        Ok(receiver)
    }

    /// Signal shutdown. In-flight commands run to completion; queued
    /// commands are dropped, closing their channels without a value.
    pub fn close_api(&self) {
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

async fn dispatch_loop(
    core: Arc<Mutex<RemoteNamespace>>,
    queue: Arc<ResidentPriorityQueue>,
    query_limit: usize,
) {
    let limit = Arc::new(Semaphore::new(query_limit));
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    while let Some(command) = queue.dequeue().await {
        let permit = match Arc::clone(&limit).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let core = Arc::clone(&core);
        workers.push(tokio::spawn(async move {
            let mut engine = core.lock().await;
            dispatch(&mut engine, command).await;
            drop(permit);
        }));
        workers.retain(|worker| !worker.is_finished());
    }

    // Queue closed: let in-flight commands finish, then close the engine.
    for worker in workers {
        if let Err(err) = worker.await {
            tracing::warn!(%err, "dispatch worker panicked");
        }
    }
    core.lock().await.close().await;
    tracing::debug!("dispatcher stopped");
}

async fn dispatch(engine: &mut RemoteNamespace, command: Command) {
    let response = match &command.kind {
        CommandKind::RunQuery(query) => engine.run_query(query).await,
        CommandKind::Reflect(reflection) => engine.reflect(*reflection).await,
        CommandKind::Replicate(links) => engine.replicate(links).await,
    };
    command.respond(response);
}
