//! Dispatch against the in-process status store and a recording queue.

use std::sync::Arc;

use irrigation_backend::domain::ports::JobStatusStore;
use irrigation_backend::domain::{CalculationDispatcher, DispatchOutcome, JobStatus, UserId};
use irrigation_backend::outbound::cache::InMemoryCalculationCache;
use irrigation_backend::test_support::{InMemoryFieldRepository, RecordingQueue};
use rstest::rstest;

mod support;

use support::field;

struct Harness {
    dispatcher: CalculationDispatcher,
    cache: Arc<InMemoryCalculationCache>,
    queue: Arc<RecordingQueue>,
}

fn harness(fields: Arc<InMemoryFieldRepository>) -> Harness {
    let cache = Arc::new(InMemoryCalculationCache::new());
    let queue = Arc::new(RecordingQueue::new());
    Harness {
        dispatcher: CalculationDispatcher::new(cache.clone(), queue.clone(), fields),
        cache,
        queue,
    }
}

#[tokio::test]
async fn back_to_back_requests_submit_one_job() {
    let field = field(UserId::random(), "terrace");
    let field_id = field.id;
    let h = harness(Arc::new(InMemoryFieldRepository::with_fields([field])));

    let first = h.dispatcher.request_recompute(&field_id).await.expect("first");
    let second = h.dispatcher.request_recompute(&field_id).await.expect("second");

    assert_eq!(first, DispatchOutcome::Submitted);
    assert_eq!(second, DispatchOutcome::AlreadyQueued);
    assert_eq!(h.queue.submitted(), vec![field_id]);
    assert_eq!(h.cache.get(&field_id).await.expect("status"), JobStatus::Queued);
}

#[tokio::test]
async fn concurrent_requests_submit_one_job() {
    let field = field(UserId::random(), "terrace");
    let field_id = field.id;
    let h = harness(Arc::new(InMemoryFieldRepository::with_fields([field])));

    let (a, b) = tokio::join!(
        h.dispatcher.request_recompute(&field_id),
        h.dispatcher.request_recompute(&field_id)
    );

    let outcomes = [a.expect("a"), b.expect("b")];
    let submitted = outcomes
        .iter()
        .filter(|o| **o == DispatchOutcome::Submitted)
        .count();
    assert_eq!(submitted, 1);
    assert_eq!(h.queue.submitted().len(), 1);
}

#[rstest]
#[case(JobStatus::None)]
#[case(JobStatus::Done)]
#[case(JobStatus::Failed)]
#[tokio::test]
async fn settled_statuses_accept_a_new_job(#[case] settled: JobStatus) {
    let field = field(UserId::random(), "terrace");
    let field_id = field.id;
    let h = harness(Arc::new(InMemoryFieldRepository::with_fields([field])));
    h.cache.set(&field_id, settled).await.expect("seed status");

    let outcome = h.dispatcher.request_recompute(&field_id).await.expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::Submitted);
}

#[tokio::test]
async fn processing_field_is_queued_again() {
    let field = field(UserId::random(), "terrace");
    let field_id = field.id;
    let h = harness(Arc::new(InMemoryFieldRepository::with_fields([field])));
    h.cache
        .set(&field_id, JobStatus::Processing)
        .await
        .expect("seed status");

    let outcome = h.dispatcher.request_recompute(&field_id).await.expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::Submitted);
    assert_eq!(h.cache.get(&field_id).await.expect("status"), JobStatus::Queued);
}

#[tokio::test]
async fn non_serviceable_field_is_done_without_a_job() {
    let mut field = field(UserId::random(), "outside");
    field.in_covered_area = false;
    let field_id = field.id;
    let h = harness(Arc::new(InMemoryFieldRepository::with_fields([field])));

    let outcome = h.dispatcher.request_recompute(&field_id).await.expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::NotServiceable);
    assert!(h.queue.submitted().is_empty());
    assert_eq!(h.cache.get(&field_id).await.expect("status"), JobStatus::Done);
}
