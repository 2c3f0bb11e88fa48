//! In-process calculation queue backed by a tokio worker pool.
//!
//! Submitted field ids go through an unbounded channel to a dispatch loop
//! that runs at most `concurrency` jobs at once. Duplicate submissions are
//! prevented upstream by the status store, so the channel needs no
//! deduplication of its own.
//!
//! A field re-queued while its job runs gets a second job. Jobs for the same
//! field take a per-field lock, so the second one starts only after the first
//! has finished and never races it for the results key.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::domain::ports::{CalculationQueue, JobDispatchError};
use crate::domain::{CalculationWorker, FieldId};

/// Sending half handed to the dispatcher.
#[derive(Clone)]
pub struct WorkerPoolQueue {
    jobs: mpsc::UnboundedSender<FieldId>,
}

#[async_trait]
impl CalculationQueue for WorkerPoolQueue {
    async fn submit(&self, field_id: FieldId) -> Result<(), JobDispatchError> {
        self.jobs
            .send(field_id)
            .map_err(|_| JobDispatchError::unavailable("worker pool has shut down"))?;
        debug!(%field_id, "calculation job submitted");
        Ok(())
    }
}

/// Owner of the dispatch loop; dropping it leaves the loop running until
/// every queue handle is dropped.
pub struct WorkerPool {
    shutdown: oneshot::Sender<()>,
    dispatch: JoinHandle<()>,
}

impl WorkerPool {
    /// Spawn the dispatch loop on the current runtime.
    pub fn start(worker: CalculationWorker, concurrency: usize) -> (WorkerPoolQueue, Self) {
        let (jobs, receiver) = mpsc::unbounded_channel();
        let (shutdown, stop) = oneshot::channel();
        let concurrency = concurrency.max(1);
        let dispatch = tokio::spawn(dispatch_loop(worker, receiver, stop, concurrency));
        info!(concurrency, "calculation worker pool started");
        (WorkerPoolQueue { jobs }, Self { shutdown, dispatch })
    }

    /// Run every submitted job, returning once all queue handles have been
    /// dropped and the channel is empty. Used by batch commands.
    pub async fn drain(self) {
        let Self { shutdown, dispatch } = self;
        drop(shutdown);
        if let Err(error) = dispatch.await {
            warn!(%error, "calculation dispatch loop ended abnormally");
        }
    }

    /// Stop accepting jobs and wait for running ones to finish. Jobs still
    /// waiting in the channel are dropped; their status stays `Queued`.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(error) = self.dispatch.await {
            warn!(%error, "calculation dispatch loop ended abnormally");
        }
    }
}

/// One lock per field with a job in flight.
#[derive(Default)]
struct FieldLocks {
    locks: HashMap<FieldId, Arc<Mutex<()>>>,
}

impl FieldLocks {
    fn lock_for(&mut self, field_id: FieldId) -> Arc<Mutex<()>> {
        // Drop locks no job holds any more.
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(self.locks.entry(field_id).or_default())
    }
}

async fn dispatch_loop(
    worker: CalculationWorker,
    mut jobs: mpsc::UnboundedReceiver<FieldId>,
    mut stop: oneshot::Receiver<()>,
    concurrency: usize,
) {
    let slots = Arc::new(Semaphore::new(concurrency));
    let mut field_locks = FieldLocks::default();
    let mut running = JoinSet::new();
    let mut listening = true;
    loop {
        let field_id = tokio::select! {
            signal = &mut stop, if listening => match signal {
                Ok(()) => break,
                // Pool handle dropped; keep serving until the queue closes.
                Err(_) => {
                    listening = false;
                    continue;
                }
            },
            next = jobs.recv() => match next {
                Some(field_id) => field_id,
                None => break,
            },
        };
        let field_lock = field_locks.lock_for(field_id);
        let slots = Arc::clone(&slots);
        let worker = worker.clone();
        running.spawn(async move {
            let _field_guard = field_lock.lock().await;
            let Ok(_permit) = slots.acquire_owned().await else {
                return;
            };
            // Failures are logged and recorded as `Failed` by the worker.
            let _ = worker.process(field_id).await;
        });
        // Reap finished jobs so the set does not grow without bound.
        while running.try_join_next().is_some() {}
    }
    jobs.close();
    while let Some(joined) = running.join_next().await {
        if let Err(error) = joined {
            warn!(%error, "calculation job task ended abnormally");
        }
    }
    info!("calculation worker pool stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::domain::field::fixtures::field;
    use crate::domain::ports::{
        CalculationResultsStore, FixtureSoilWaterModel, JobStatusStore,
        MockCalculationResultsStore, MockFieldRepository, MockIrrigationRepository, SoilWaterModel,
        SoilWaterModelError,
    };
    use crate::domain::{
        CalculationDispatcher, CalculationResults, CalculationWorkerPorts, DispatchOutcome,
        JobStatus, SimulationInput,
    };
    use crate::outbound::cache::InMemoryCalculationCache;

    #[tokio::test]
    async fn submitted_jobs_run_to_done() {
        let field = field();
        let field_id = field.id;
        let cache = Arc::new(InMemoryCalculationCache::new());
        let mut fields = MockFieldRepository::new();
        fields
            .expect_find_by_id()
            .returning(move |_| Ok(Some(field.clone())));
        let mut irrigations = MockIrrigationRepository::new();
        irrigations
            .expect_list_for_field()
            .returning(|_| Ok(Vec::new()));
        let mut results = MockCalculationResultsStore::new();
        results.expect_put().times(1).returning(|_, _| Ok(()));
        let worker = CalculationWorker::new(CalculationWorkerPorts {
            status: cache.clone(),
            fields: Arc::new(fields),
            irrigations: Arc::new(irrigations),
            model: Arc::new(FixtureSoilWaterModel),
            results: Arc::new(results),
        });

        let (queue, pool) = WorkerPool::start(worker, 2);
        cache
            .set(&field_id, JobStatus::Queued)
            .await
            .expect("set");
        queue.submit(field_id).await.expect("submit");

        let mut status = JobStatus::Queued;
        for _ in 0..50 {
            status = JobStatusStore::get(&*cache, &field_id).await.expect("get");
            if status == JobStatus::Done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, JobStatus::Done);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn drain_runs_queued_jobs_before_returning() {
        let field = field();
        let field_id = field.id;
        let cache = Arc::new(InMemoryCalculationCache::new());
        let mut fields = MockFieldRepository::new();
        fields
            .expect_find_by_id()
            .returning(move |_| Ok(Some(field.clone())));
        let mut irrigations = MockIrrigationRepository::new();
        irrigations
            .expect_list_for_field()
            .returning(|_| Ok(Vec::new()));
        let mut results = MockCalculationResultsStore::new();
        results.expect_put().times(1).returning(|_, _| Ok(()));
        let worker = CalculationWorker::new(CalculationWorkerPorts {
            status: cache.clone(),
            fields: Arc::new(fields),
            irrigations: Arc::new(irrigations),
            model: Arc::new(FixtureSoilWaterModel),
            results: Arc::new(results),
        });

        let (queue, pool) = WorkerPool::start(worker, 1);
        cache
            .set(&field_id, JobStatus::Queued)
            .await
            .expect("set");
        queue.submit(field_id).await.expect("submit");
        drop(queue);
        pool.drain().await;

        let status = JobStatusStore::get(&*cache, &field_id).await.expect("get");
        assert_eq!(status, JobStatus::Done);
    }

    /// Model whose first run is slow and returns older numbers than later
    /// runs, so a stale job finishing last would be visible.
    struct SlowFirstRun {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SoilWaterModel for SlowFirstRun {
        async fn run(
            &self,
            input: &SimulationInput,
        ) -> Result<CalculationResults, SoilWaterModelError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            let mut results = FixtureSoilWaterModel.run(input).await?;
            results.raw = if call == 0 { 1.0 } else { 2.0 };
            Ok(results)
        }
    }

    #[tokio::test]
    async fn requeue_while_processing_keeps_newest_results() {
        let field = field();
        let field_id = field.id;
        let cache = Arc::new(InMemoryCalculationCache::new());
        let mut fields = MockFieldRepository::new();
        fields
            .expect_find_by_id()
            .returning(move |_| Ok(Some(field.clone())));
        let fields = Arc::new(fields);
        let mut irrigations = MockIrrigationRepository::new();
        irrigations
            .expect_list_for_field()
            .returning(|_| Ok(Vec::new()));
        let worker = CalculationWorker::new(CalculationWorkerPorts {
            status: cache.clone(),
            fields: fields.clone(),
            irrigations: Arc::new(irrigations),
            model: Arc::new(SlowFirstRun {
                calls: AtomicUsize::new(0),
            }),
            results: cache.clone(),
        });
        let (queue, pool) = WorkerPool::start(worker, 2);
        let dispatcher = CalculationDispatcher::new(cache.clone(), Arc::new(queue), fields);

        dispatcher
            .request_recompute(&field_id)
            .await
            .expect("first request");
        for _ in 0..50 {
            let status = JobStatusStore::get(&*cache, &field_id).await.expect("get");
            if status == JobStatus::Processing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let outcome = dispatcher
            .request_recompute(&field_id)
            .await
            .expect("second request");
        assert_eq!(outcome, DispatchOutcome::Submitted);

        drop(dispatcher);
        pool.drain().await;

        let status = JobStatusStore::get(&*cache, &field_id).await.expect("get");
        let stored = CalculationResultsStore::get(&*cache, &field_id)
            .await
            .expect("get")
            .expect("results stored");
        assert_eq!(status, JobStatus::Done);
        assert_eq!(stored.raw, 2.0);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_unavailable() {
        let worker = CalculationWorker::new(CalculationWorkerPorts {
            status: Arc::new(InMemoryCalculationCache::new()),
            fields: Arc::new(MockFieldRepository::new()),
            irrigations: Arc::new(MockIrrigationRepository::new()),
            model: Arc::new(FixtureSoilWaterModel),
            results: Arc::new(MockCalculationResultsStore::new()),
        });
        let (queue, pool) = WorkerPool::start(worker, 1);
        pool.shutdown().await;

        let error = queue
            .submit(FieldId::random())
            .await
            .expect_err("closed");
        assert!(matches!(error, JobDispatchError::Unavailable { .. }));
    }
}
