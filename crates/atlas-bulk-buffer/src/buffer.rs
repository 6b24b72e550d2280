// Time/count-windowed coalescing of individual operations into bulk calls

use crate::error::BufferError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, timeout_at};

/// An item that can flow through the buffer. Results are matched back to
/// their submitters by id, not by position.
pub trait Entity: Send + 'static {
    fn id(&self) -> &str;
}

/// The outcome of one buffered operation.
pub type OperationResult<T> = Result<T, BufferError>;

/// The underlying bulk call.
///
/// A whole-call failure (`Err`) fails every operation in the window;
/// per-entity outcomes are reported through the returned vector, where an
/// entity-level error carries the failing entity's id.
#[async_trait]
pub trait BulkOperation<T: Entity>: Send + Sync {
    async fn run(&self, entities: Vec<T>) -> anyhow::Result<Vec<OperationResult<T>>>;
}

/// Buffer window bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferOptions {
    /// How long a window stays open after its first submission. `None`
    /// behaves as zero: the window flushes whatever is already queued.
    pub max_duration: Option<Duration>,
    /// Flush as soon as this many operations are buffered. `None` means
    /// unbounded.
    pub max_operations: Option<usize>,
}

struct Pending<T> {
    entity: T,
    reply: oneshot::Sender<OperationResult<T>>,
}

/// Coalesces individually submitted operations into bulk calls.
///
/// The first submission opens a window; the window flushes when
/// `max_operations` is reached or `max_duration` elapses. Window
/// transitions are serialized by a single collector task, while the bulk
/// call itself runs concurrently with the next window's accumulation.
/// Every submitted operation resolves exactly once.
pub struct OperationBuffer<T: Entity> {
    tx: Mutex<Option<mpsc::UnboundedSender<Pending<T>>>>,
}

impl<T: Entity> OperationBuffer<T> {
    pub fn new(operation: Arc<dyn BulkOperation<T>>, options: BufferOptions) -> OperationBuffer<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(collect(operation, options, rx));
        OperationBuffer {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Submit one operation and wait for its outcome.
    pub async fn submit(&self, entity: T) -> OperationResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let pending = Pending {
            entity,
            reply: reply_tx,
        };
        let sent = match &*lock_tx(&self.tx) {
            Some(tx) => tx.send(pending).is_ok(),
            None => false,
        };
        if !sent {
            return Err(BufferError::Closed);
        }
        reply_rx.await.unwrap_or(Err(BufferError::Closed))
    }

    /// Stop accepting submissions. Operations already buffered still flush;
    /// later `submit` calls fail with [`BufferError::Closed`].
    pub fn close(&self) {
        lock_tx(&self.tx).take();
    }
}

fn lock_tx<T>(
    tx: &Mutex<Option<mpsc::UnboundedSender<Pending<T>>>>,
) -> std::sync::MutexGuard<'_, Option<mpsc::UnboundedSender<Pending<T>>>> {
    match tx.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Collector loop: accumulate one window at a time, then hand it off.
async fn collect<T: Entity>(
    operation: Arc<dyn BulkOperation<T>>,
    options: BufferOptions,
    mut rx: mpsc::UnboundedReceiver<Pending<T>>,
) {
    let max_operations = options.max_operations.unwrap_or(usize::MAX);
    let max_duration = options.max_duration.unwrap_or(Duration::ZERO);

    while let Some(first) = rx.recv().await {
        let deadline = Instant::now() + max_duration;
        let mut window = vec![first];
        while window.len() < max_operations {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(pending)) => window.push(pending),
                // all senders dropped; flush what we have
                Ok(None) => break,
                // window elapsed
                Err(_) => break,
            }
        }
        // the bulk call overlaps with the next window's accumulation
        tokio::spawn(flush(Arc::clone(&operation), window));
    }
}

/// Run the bulk call for one window and fan the results back out by id.
async fn flush<T: Entity>(operation: Arc<dyn BulkOperation<T>>, window: Vec<Pending<T>>) {
    let mut entities = Vec::with_capacity(window.len());
    let mut waiters = Vec::with_capacity(window.len());
    for pending in window {
        waiters.push((pending.entity.id().to_string(), pending.reply));
        entities.push(pending.entity);
    }

    match operation.run(entities).await {
        Ok(results) => {
            for result in results {
                let id = match &result {
                    Ok(entity) => entity.id().to_string(),
                    Err(BufferError::Entity { id, .. }) => id.clone(),
                    Err(other) => {
                        tracing::warn!(error = %other, "bulk operation result carries no entity id");
                        continue;
                    }
                };
                match pull_first_waiter(&mut waiters, &id) {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        tracing::warn!(%id, "bulk operation result matched no buffered entity");
                    }
                }
            }
            // never leave a submitter hanging on an omitted entity
            for (id, reply) in waiters {
                let _ = reply.send(Err(BufferError::Unmatched(id)));
            }
        }
        Err(error) => {
            let message = error.to_string();
            for (_, reply) in waiters {
                let _ = reply.send(Err(BufferError::Operation(message.clone())));
            }
        }
    }
}

fn pull_first_waiter<T>(
    waiters: &mut Vec<(String, oneshot::Sender<OperationResult<T>>)>,
    id: &str,
) -> Option<oneshot::Sender<OperationResult<T>>> {
    let index = waiters.iter().position(|(waiter_id, _)| waiter_id == id)?;
    Some(waiters.remove(index).1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[derive(Debug, Clone, PartialEq)]
    struct Task {
        id: String,
        attempts: u32,
    }

    impl Task {
        fn new(id: &str) -> Task {
            Task {
                id: id.to_string(),
                attempts: 0,
            }
        }
    }

    impl Entity for Task {
        fn id(&self) -> &str {
            &self.id
        }
    }

    /// Bumps each task's attempt count and records batch compositions.
    /// Results come back in reverse order to exercise id matching.
    struct BumpOp {
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl BumpOp {
        fn new() -> Arc<BumpOp> {
            Arc::new(BumpOp {
                batches: Mutex::new(Vec::new()),
            })
        }

        fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BulkOperation<Task> for BumpOp {
        async fn run(&self, entities: Vec<Task>) -> anyhow::Result<Vec<OperationResult<Task>>> {
            self.batches
                .lock()
                .unwrap()
                .push(entities.iter().map(|t| t.id.clone()).collect());
            let mut results: Vec<OperationResult<Task>> = entities
                .into_iter()
                .map(|mut task| {
                    task.attempts += 1;
                    Ok(task)
                })
                .collect();
            results.reverse();
            Ok(results)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_window_flushes_at_capacity() {
        let op = BumpOp::new();
        let buffer = OperationBuffer::new(
            op.clone() as Arc<dyn BulkOperation<Task>>,
            BufferOptions {
                max_duration: Some(Duration::from_secs(60)),
                max_operations: Some(2),
            },
        );

        let (a, b) = tokio::join!(buffer.submit(Task::new("a")), buffer.submit(Task::new("b")));
        assert_eq!(a.unwrap().attempts, 1);
        assert_eq!(b.unwrap().attempts, 1);
        assert_eq!(op.batches(), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_window_flushes_on_timeout() {
        let op = BumpOp::new();
        let buffer = OperationBuffer::new(
            op.clone() as Arc<dyn BulkOperation<Task>>,
            BufferOptions {
                max_duration: Some(Duration::from_millis(50)),
                max_operations: None,
            },
        );

        let result = buffer.submit(Task::new("solo")).await.unwrap();
        assert_eq!(result.attempts, 1);
        assert_eq!(op.batches(), vec![vec!["solo".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_match_by_id_not_order() {
        let op = BumpOp::new();
        let buffer = OperationBuffer::new(
            op.clone() as Arc<dyn BulkOperation<Task>>,
            BufferOptions {
                max_duration: Some(Duration::from_secs(1)),
                max_operations: Some(3),
            },
        );

        let (a, b, c) = tokio::join!(
            buffer.submit(Task::new("a")),
            buffer.submit(Task::new("b")),
            buffer.submit(Task::new("c")),
        );
        // BumpOp reverses its result order
        assert_eq!(a.unwrap().id, "a");
        assert_eq!(b.unwrap().id, "b");
        assert_eq!(c.unwrap().id, "c");
    }

    struct PartialFailureOp;

    #[async_trait]
    impl BulkOperation<Task> for PartialFailureOp {
        async fn run(&self, entities: Vec<Task>) -> anyhow::Result<Vec<OperationResult<Task>>> {
            Ok(entities
                .into_iter()
                .map(|task| {
                    if task.id == "bad" {
                        Err(BufferError::entity("bad", "boom"))
                    } else {
                        Ok(task)
                    }
                })
                .collect())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_reaches_only_its_submitter() {
        let buffer = OperationBuffer::new(
            Arc::new(PartialFailureOp),
            BufferOptions {
                max_duration: Some(Duration::from_secs(1)),
                max_operations: Some(2),
            },
        );

        let (good, bad) = tokio::join!(
            buffer.submit(Task::new("good")),
            buffer.submit(Task::new("bad")),
        );
        assert_eq!(good.unwrap().id, "good");
        let error = bad.unwrap_err();
        assert_eq!(error.to_string(), "[bad]: boom");
    }

    /// Drops every result for ids starting with "lost".
    struct ForgetfulOp;

    #[async_trait]
    impl BulkOperation<Task> for ForgetfulOp {
        async fn run(&self, entities: Vec<Task>) -> anyhow::Result<Vec<OperationResult<Task>>> {
            Ok(entities
                .into_iter()
                .filter(|task| !task.id.starts_with("lost"))
                .map(Ok)
                .collect())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_omitted_entity_fails_explicitly() {
        let buffer = OperationBuffer::new(
            Arc::new(ForgetfulOp),
            BufferOptions {
                max_duration: Some(Duration::from_secs(1)),
                max_operations: Some(2),
            },
        );

        let (kept, lost) = tokio::join!(
            buffer.submit(Task::new("kept")),
            buffer.submit(Task::new("lost-1")),
        );
        assert_eq!(kept.unwrap().id, "kept");
        assert_eq!(
            lost.unwrap_err().to_string(),
            "no bulk operation result for entity [lost-1]"
        );
    }

    struct BrokenOp;

    #[async_trait]
    impl BulkOperation<Task> for BrokenOp {
        async fn run(&self, _entities: Vec<Task>) -> anyhow::Result<Vec<OperationResult<Task>>> {
            Err(anyhow!("backend down"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_whole_call_failure_fans_out() {
        let buffer = OperationBuffer::new(
            Arc::new(BrokenOp),
            BufferOptions {
                max_duration: Some(Duration::from_secs(1)),
                max_operations: Some(2),
            },
        );

        let (a, b) = tokio::join!(buffer.submit(Task::new("a")), buffer.submit(Task::new("b")));
        assert_eq!(
            a.unwrap_err(),
            BufferError::Operation("backend down".to_string())
        );
        assert_eq!(
            b.unwrap_err(),
            BufferError::Operation("backend down".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_buffer_rejects_new_submissions() {
        let op = BumpOp::new();
        let buffer = OperationBuffer::new(
            op.clone() as Arc<dyn BulkOperation<Task>>,
            BufferOptions {
                max_duration: Some(Duration::from_millis(10)),
                max_operations: Some(1),
            },
        );

        // buffered work still flushes before the close takes effect
        assert_eq!(buffer.submit(Task::new("a")).await.unwrap().attempts, 1);

        buffer.close();
        assert_eq!(
            buffer.submit(Task::new("b")).await.unwrap_err(),
            BufferError::Closed
        );
        assert_eq!(op.batches(), vec![vec!["a".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_windows_are_independent() {
        let op = BumpOp::new();
        let buffer = OperationBuffer::new(
            op.clone() as Arc<dyn BulkOperation<Task>>,
            BufferOptions {
                max_duration: Some(Duration::from_millis(10)),
                max_operations: Some(1),
            },
        );

        assert_eq!(buffer.submit(Task::new("a")).await.unwrap().attempts, 1);
        assert_eq!(buffer.submit(Task::new("b")).await.unwrap().attempts, 1);
        assert_eq!(
            op.batches(),
            vec![vec!["a".to_string()], vec!["b".to_string()]]
        );
    }
}
