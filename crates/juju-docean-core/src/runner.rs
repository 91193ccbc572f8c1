//! Bounded-concurrency operation runner
//!
//! Queued operations are spawned onto the tokio runtime when a batch is
//! started with [`Runner::iter_results`]. At most `workers` run at once;
//! the rest wait for a permit. Outcomes are delivered in completion order,
//! exactly one per queued operation, and a failing or panicking operation
//! never affects its siblings.
//!
//! Dropping [`Results`] early does not cancel anything: in-flight
//! operations still run to their own terminal state.

use futures_util::{FutureExt, Stream, StreamExt};
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error};

use crate::error::OperationError;
use crate::operation::{Operation, OperationOutput, OperationState};

/// Terminal outcome of one queued operation
#[derive(Debug)]
pub struct Completed {
    /// Position in the batch queue
    pub index: usize,
    pub operation: Operation,
    pub result: Result<OperationOutput, OperationError>,
}

impl Completed {
    pub fn state(&self) -> OperationState {
        if self.result.is_ok() {
            OperationState::Succeeded
        } else {
            OperationState::Failed
        }
    }
}

pub struct Runner {
    workers: usize,
    queue: Vec<Operation>,
}

impl Runner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            queue: Vec::new(),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Add an operation to the current batch
    pub fn queue(&mut self, operation: impl Into<Operation>) {
        let operation = operation.into();
        debug!("Queued {}", operation.describe());
        self.queue.push(operation);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Start the queued batch and return its outcome stream.
    ///
    /// The queue is emptied, so the runner can take a new batch right away.
    /// Must be called from within a tokio runtime.
    pub fn iter_results(&mut self) -> Results {
        let batch = std::mem::take(&mut self.queue);
        let total = batch.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let states = Arc::new(Mutex::new(vec![OperationState::Pending; total]));
        let (tx, rx) = mpsc::unbounded_channel();

        for (index, operation) in batch.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let states = Arc::clone(&states);
            let tx = tx.clone();

            tokio::spawn(async move {
                // never closed
                let _permit = semaphore.acquire_owned().await.ok();
                set_state(&states, index, OperationState::Running);

                let result = match AssertUnwindSafe(operation.execute()).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!("Operation {} panicked: {}", operation.describe(), message);
                        Err(OperationError::Panicked {
                            operation: operation.describe(),
                            message,
                        })
                    }
                };

                let completed = Completed {
                    index,
                    operation,
                    result,
                };
                set_state(&states, index, completed.state());
                // the receiver may be gone; the operation still ran
                let _ = tx.send(completed);
            });
        }

        Results {
            rx,
            remaining: total,
            states,
        }
    }
}

fn set_state(states: &Mutex<Vec<OperationState>>, index: usize, state: OperationState) {
    if let Ok(mut states) = states.lock() {
        states[index] = state;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Outcome stream of one batch, in completion order
pub struct Results {
    rx: mpsc::UnboundedReceiver<Completed>,
    remaining: usize,
    states: Arc<Mutex<Vec<OperationState>>>,
}

impl Results {
    /// Outcomes not yet delivered
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Current state of every operation in the batch, by queue position
    pub fn states(&self) -> Vec<OperationState> {
        self.states
            .lock()
            .map(|states| states.clone())
            .unwrap_or_default()
    }

    /// Drain the whole batch
    pub async fn collect_all(self) -> Vec<Completed> {
        self.collect().await
    }
}

impl Stream for Results {
    type Item = Completed;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.remaining == 0 {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(completed)) => {
                this.remaining -= 1;
                Poll::Ready(Some(completed))
            }
            Poll::Ready(None) => {
                this.remaining = 0;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
