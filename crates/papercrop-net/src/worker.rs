// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Generic worker pool: a fixed set of workers draining one queue of
// polymorphic tasks and replying on per-task result channels.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use papercrop_core::{PapercropError, Result};

/// Capacity of pool input queues and per-stage result channels. Exceeds
/// the number of in-flight tasks any one stage dispatches.
pub const QUEUE_DEPTH: usize = 100;

/// A processing function carried by a task. `Arc<dyn Fn>` rather than a
/// plain fn pointer so stages can capture shared state (the contour stage
/// closes over the stitched edge map).
pub type TaskFn<T, R> = Arc<dyn Fn(T) -> Result<R> + Send + Sync>;

/// One unit of work flowing through a pool.
///
/// Exactly one outcome (the function's output or its error) is delivered
/// on `reply` per task.
pub struct Task<T, R> {
    /// Remote address of the owning connection, for log affinity.
    pub peer: SocketAddr,
    /// The stage input.
    pub input: T,
    /// The processing function. A task without one is answered with an
    /// error.
    pub func: Option<TaskFn<T, R>>,
    /// Single-writer channel back to the connection handler.
    pub reply: mpsc::Sender<Result<R>>,
}

/// Spawn `num_workers` workers draining `tasks` until the channel closes.
///
/// Each worker loops: receive, process with [`treatment_worker`], repeat.
/// When every sender is gone and the queue is drained the workers log a
/// stop message and terminate.
pub fn start_pool<T, R>(name: &'static str, num_workers: usize, tasks: mpsc::Receiver<Task<T, R>>)
where
    T: Send + 'static,
    R: Send + 'static,
{
    let tasks = Arc::new(Mutex::new(tasks));

    for worker_id in 0..num_workers {
        let tasks = Arc::clone(&tasks);
        tokio::spawn(async move {
            info!(pool = name, worker = worker_id, "worker started");
            loop {
                // Hold the lock only for the receive so siblings keep
                // draining while this worker processes.
                let task = { tasks.lock().await.recv().await };
                match task {
                    Some(task) => treatment_worker(task).await,
                    None => break,
                }
            }
            info!(pool = name, worker = worker_id, "worker stopped");
        });
    }
}

/// The default worker body: run the task's function on its input and
/// deliver the outcome.
pub async fn treatment_worker<T, R>(task: Task<T, R>) {
    let Task {
        peer,
        input,
        func,
        reply,
    } = task;

    debug!(peer = %peer, "processing task");

    let outcome = match func {
        Some(f) => f(input),
        None => Err(PapercropError::Worker(
            "no processing function provided".into(),
        )),
    };

    if reply.send(outcome).await.is_err() {
        warn!(peer = %peer, "result channel dropped before delivery");
    }

    debug!(peer = %peer, "task processing completed");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_peer() -> SocketAddr {
        "127.0.0.1:9".parse().expect("peer addr")
    }

    #[tokio::test]
    async fn pool_processes_tasks_and_replies() {
        let (task_tx, task_rx) = mpsc::channel(QUEUE_DEPTH);
        start_pool("test", 4, task_rx);

        let (reply_tx, mut reply_rx) = mpsc::channel(QUEUE_DEPTH);
        let double: TaskFn<u32, u32> = Arc::new(|n| Ok(n * 2));

        for n in 0..10u32 {
            task_tx
                .send(Task {
                    peer: test_peer(),
                    input: n,
                    func: Some(Arc::clone(&double)),
                    reply: reply_tx.clone(),
                })
                .await
                .expect("dispatch");
        }
        drop(reply_tx);

        let mut results = Vec::new();
        for _ in 0..10 {
            results.push(reply_rx.recv().await.expect("result").expect("ok"));
        }
        results.sort_unstable();
        assert_eq!(results, (0..10).map(|n| n * 2).collect::<Vec<_>>());
        // All results delivered; nothing further arrives.
        assert!(reply_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn missing_function_yields_worker_error() {
        let (task_tx, task_rx) = mpsc::channel(QUEUE_DEPTH);
        start_pool("test", 1, task_rx);

        let (reply_tx, mut reply_rx) = mpsc::channel::<Result<u32>>(QUEUE_DEPTH);
        task_tx
            .send(Task {
                peer: test_peer(),
                input: 7u32,
                func: None,
                reply: reply_tx,
            })
            .await
            .expect("dispatch");

        let outcome = reply_rx.recv().await.expect("delivered");
        assert!(matches!(outcome, Err(PapercropError::Worker(_))));
    }

    #[tokio::test]
    async fn failing_function_delivers_the_error() {
        let (task_tx, task_rx) = mpsc::channel(QUEUE_DEPTH);
        start_pool("test", 2, task_rx);

        let (reply_tx, mut reply_rx) = mpsc::channel::<Result<u32>>(QUEUE_DEPTH);
        let fail: TaskFn<u32, u32> =
            Arc::new(|_| Err(PapercropError::Worker("boom".into())));
        task_tx
            .send(Task {
                peer: test_peer(),
                input: 1,
                func: Some(fail),
                reply: reply_tx,
            })
            .await
            .expect("dispatch");

        let outcome = reply_rx.recv().await.expect("delivered");
        match outcome {
            Err(PapercropError::Worker(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected worker error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tasks_from_two_producers_interleave() {
        let (task_tx, task_rx) = mpsc::channel(QUEUE_DEPTH);
        start_pool("test", 4, task_rx);

        let identity: TaskFn<u32, u32> = Arc::new(|n| Ok(n));

        let mut receivers = Vec::new();
        for producer in 0..2u32 {
            let (reply_tx, reply_rx) = mpsc::channel(QUEUE_DEPTH);
            receivers.push(reply_rx);
            for n in 0..5u32 {
                task_tx
                    .send(Task {
                        peer: test_peer(),
                        input: producer * 100 + n,
                        func: Some(Arc::clone(&identity)),
                        reply: reply_tx.clone(),
                    })
                    .await
                    .expect("dispatch");
            }
        }

        // Each producer gets exactly its own five results back.
        for (producer, rx) in receivers.iter_mut().enumerate() {
            let mut got = Vec::new();
            for _ in 0..5 {
                got.push(rx.recv().await.expect("result").expect("ok"));
            }
            got.sort_unstable();
            let base = producer as u32 * 100;
            assert_eq!(got, (base..base + 5).collect::<Vec<_>>());
        }
    }
}
