use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info_span, warn};

pub type TaskId = u64;

type Outcome<R> = (TaskId, Result<R>);

/// Fixed set of workers pulling comparison tasks from a shared queue.
///
/// Each task runs `job` on the blocking thread pool, since comparisons are
/// CPU-bound. Results stream back in completion order, not submit order.
pub struct ComparePool<T, R> {
    next_id: TaskId,
    tasks: Option<mpsc::UnboundedSender<(TaskId, T)>>,
    results: mpsc::UnboundedReceiver<Outcome<R>>,
    workers: JoinSet<()>,
}

impl<T, R> ComparePool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F>(workers: usize, job: F) -> Self
    where
        F: Fn(T) -> Result<R> + Send + Sync + 'static,
    {
        let worker_count = workers.max(1);
        debug!(workers = worker_count, "starting compare pool");

        let job = Arc::new(job);
        let (task_tx, task_rx) = mpsc::unbounded_channel::<(TaskId, T)>();
        let (result_tx, results) = mpsc::unbounded_channel();
        let queue = Arc::new(Mutex::new(task_rx));

        let mut set = JoinSet::new();
        for idx in 0..worker_count {
            let queue = queue.clone();
            let tx = result_tx.clone();
            let job = job.clone();
            let span = info_span!("worker", id = idx);
            set.spawn(
                async move {
                    debug!("started");
                    loop {
                        let next = queue.lock().await.recv().await;
                        let Some((id, task)) = next else {
                            debug!("queue closed, exiting");
                            break;
                        };
                        debug!(task = id, "picked task");

                        let job = job.clone();
                        let outcome = match tokio::task::spawn_blocking(move || (*job)(task)).await
                        {
                            Ok(result) => result,
                            Err(e) => {
                                warn!(task = id, error = %e, "comparison task panicked");
                                Err(anyhow!("comparison task panicked: {e}"))
                            }
                        };
                        if tx.send((id, outcome)).is_err() {
                            debug!("result receiver dropped, exiting");
                            break;
                        }
                    }
                }
                .instrument(span),
            );
        }

        Self {
            next_id: 0,
            tasks: Some(task_tx),
            results,
            workers: set,
        }
    }

    /// Queue a task. Fails once the pool has been closed.
    pub fn submit(&mut self, task: T) -> Result<TaskId> {
        let Some(tasks) = &self.tasks else {
            bail!("compare pool is closed");
        };
        let id = self.next_id;
        tasks
            .send((id, task))
            .map_err(|_| anyhow!("compare pool workers have exited"))?;
        self.next_id += 1;
        Ok(id)
    }

    /// Next finished task. Returns `None` once the pool is closed and every
    /// queued task has been reported.
    pub async fn recv(&mut self) -> Option<Outcome<R>> {
        self.results.recv().await
    }

    /// Stop accepting tasks. Queued tasks still run.
    pub fn close(&mut self) {
        self.tasks = None;
    }

    /// Close the queue and wait for every worker to exit. Results that
    /// were not received are dropped.
    pub async fn shutdown(mut self) -> Result<()> {
        self.close();
        while let Some(joined) = self.workers.join_next().await {
            joined.context("compare worker panicked")?;
        }
        debug!("compare pool shut down");
        Ok(())
    }
}
