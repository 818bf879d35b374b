use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use tokio::sync::Notify;

use reef_api::{Command, Priority, PriorityTable};

use crate::error::{CacheError, CacheResult};

/// Bounded request priority queue.
///
/// `enqueue` is non-blocking and fails synchronously when the queue is at
/// capacity. A single consumer drains commands in priority order, FIFO
/// within a priority class. `close` wakes the consumer; commands still
/// queued at close are dropped, which closes their response channels
/// without a value.
pub struct ResidentPriorityQueue {
    capacity: usize,
    priorities: PriorityTable,
    state: Mutex<QueueState>,
    notify: Notify,
}

struct QueueState {
    heap: BinaryHeap<QueueItem>,
    seq: u64,
    closed: bool,
}

struct QueueItem {
    priority: Priority,
    seq: u64,
    command: Command,
}

// BinaryHeap is a max-heap; invert so the lowest (priority, seq) pops first.
impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.priority, other.seq).cmp(&(self.priority, self.seq))
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueItem {}

impl ResidentPriorityQueue {
    pub fn new(capacity: usize, priorities: PriorityTable) -> Self {
        Self {
            capacity: capacity.max(1),
            priorities,
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                seq: 0,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("lock poisoned").heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn enqueue(&self, command: Command) -> CacheResult<()> {
        let priority = self.priorities.priority_for(&command.request);
        {
            let mut state = self.state.lock().expect("lock poisoned");
            if state.closed {
                return Err(CacheError::Closed);
            }
            if state.heap.len() >= self.capacity {
                return Err(CacheError::QueueFull);
            }
            let seq = state.seq;
            state.seq += 1;
            state.heap.push(QueueItem {
                priority,
                seq,
                command,
            });
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Pop the next command in priority order, waiting if the queue is
    /// empty. Returns `None` once the queue is closed.
    pub async fn dequeue(&self) -> Option<Command> {
        loop {
            {
                let mut state = self.state.lock().expect("lock poisoned");
                if state.closed {
                    return None;
                }
                if let Some(item) = state.heap.pop() {
                    return Some(item.command);
                }
            }
            self.notify.notified().await;
        }
    }

    /// Close the queue. Queued commands are dropped, closing their
    /// response channels without a value.
    pub fn close(&self) {
        let dropped = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.closed = true;
            std::mem::take(&mut state.heap)
        };
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "dropping queued commands on close");
        }
        drop(dropped);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("lock poisoned").closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_api::{ReflectionType, Request};
    use reef_query::{Query, QuerySelect, RowJoin};
    use tokio::sync::oneshot;

    fn command(request: Request) -> (Command, oneshot::Receiver<reef_api::Response>) {
        Command::from_request(request).unwrap()
    }

    fn select_request() -> Request {
        Request::query(Query::select("t", QuerySelect::default()))
    }

    fn join_request(row: &str) -> Request {
        Request::query(Query::join(
            "t",
            vec![RowJoin {
                row_key: row.into(),
                entries: Default::default(),
            }],
        ))
    }

    #[tokio::test]
    async fn reflect_drains_before_query() {
        let queue = ResidentPriorityQueue::new(8, PriorityTable::default());
        let (query_cmd, _rx1) = command(select_request());
        let (reflect_cmd, _rx2) = command(Request::reflect(ReflectionType::HeadPath));

        queue.enqueue(query_cmd).unwrap();
        queue.enqueue(reflect_cmd).unwrap();

        let first = queue.dequeue().await.unwrap();
        assert_eq!(first.request_type(), reef_api::RequestType::Reflect);
        let second = queue.dequeue().await.unwrap();
        assert_eq!(second.request_type(), reef_api::RequestType::Query);
    }

    #[tokio::test]
    async fn fifo_within_priority_class() {
        let queue = ResidentPriorityQueue::new(8, PriorityTable::default());
        let (first, _rx1) = command(join_request("first"));
        let (second, _rx2) = command(join_request("second"));

        queue.enqueue(first).unwrap();
        queue.enqueue(second).unwrap();

        let order: Vec<String> = [
            queue.dequeue().await.unwrap(),
            queue.dequeue().await.unwrap(),
        ]
        .iter()
        .map(|cmd| match &cmd.kind {
            reef_api::CommandKind::RunQuery(q) => match &q.op {
                reef_query::QueryOp::Join(j) => j.rows[0].row_key.clone(),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        })
        .collect();

        assert_eq!(order, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn enqueue_fails_synchronously_when_full() {
        let queue = ResidentPriorityQueue::new(1, PriorityTable::default());
        let (first, _rx1) = command(select_request());
        let (second, _rx2) = command(select_request());

        queue.enqueue(first).unwrap();
        let err = queue.enqueue(second).unwrap_err();
        assert!(matches!(err, CacheError::QueueFull));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn close_drops_queued_commands() {
        let queue = ResidentPriorityQueue::new(8, PriorityTable::default());
        let (cmd, rx) = command(select_request());
        queue.enqueue(cmd).unwrap();

        queue.close();

        // The queued command's channel closed without a value.
        assert!(rx.await.is_err());
        assert!(queue.dequeue().await.is_none());
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn enqueue_after_close_is_rejected() {
        let queue = ResidentPriorityQueue::new(8, PriorityTable::default());
        queue.close();
        let (cmd, _rx) = command(select_request());
        assert!(matches!(queue.enqueue(cmd), Err(CacheError::Closed)));
    }

    #[tokio::test]
    async fn dequeue_wakes_on_enqueue() {
        use std::sync::Arc;

        let queue = Arc::new(ResidentPriorityQueue::new(8, PriorityTable::default()));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue().await })
        };

        // Give the consumer a chance to park first.
        tokio::task::yield_now().await;
        let (cmd, _rx) = command(select_request());
        queue.enqueue(cmd).unwrap();

        let drained = consumer.await.unwrap();
        assert!(drained.is_some());
    }
}
