//! Delivery queue integration tests.
//!
//! These tests drive the queue through identity resolution, transport
//! failures and transport calls that are still in flight while other
//! operations run.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use pulse_activity::{Activity, EventFactory, StaticPageEnvironment};
use pulse_common::{PulseError, TrackerOptions};
use pulse_queue::{DeliveryQueue, Identity, IdentityError, Transport, TransportError};
use tokio::sync::Notify;

const URL: &str = "http://collector.test/api/v1/track";

/// Records every batch and answers with scripted outcomes (success once the
/// script runs out).
#[derive(Default)]
struct RecordingTransport {
    batches: StdMutex<Vec<Vec<Activity>>>,
    outcomes: StdMutex<VecDeque<Option<u16>>>,
}

impl RecordingTransport {
    fn failing_once(status: u16) -> Self {
        let transport = Self::default();
        transport.outcomes.lock().unwrap().push_back(Some(status));
        transport
    }

    fn batches(&self) -> Vec<Vec<Activity>> {
        self.batches.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, url: &str, payloads: &[Activity]) -> Result<(), TransportError> {
        assert_eq!(url, URL);
        assert!(!payloads.is_empty(), "transport called with an empty batch");
        self.batches.lock().unwrap().push(payloads.to_vec());

        match self.outcomes.lock().unwrap().pop_front().flatten() {
            None => Ok(()),
            Some(status) => Err(TransportError::DeliveryFailed {
                status,
                body: "unavailable".to_string(),
            }),
        }
    }
}

/// Holds each call open until released, so the test can act while a
/// batch is in flight.
struct GatedTransport {
    started: Notify,
    release: Notify,
    fail: bool,
    batches: StdMutex<Vec<Vec<Activity>>>,
}

impl GatedTransport {
    fn new(fail: bool) -> Self {
        Self {
            started: Notify::new(),
            release: Notify::new(),
            fail,
            batches: StdMutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn deliver(&self, _url: &str, payloads: &[Activity]) -> Result<(), TransportError> {
        self.batches.lock().unwrap().push(payloads.to_vec());
        self.started.notify_one();
        self.release.notified().await;

        if self.fail {
            Err(TransportError::DeliveryFailed {
                status: 502,
                body: "bad gateway".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn payload(depth: u32) -> Activity {
    let options = TrackerOptions::new("sp-34534", "urn:test.no:pagetest01");
    let factory = EventFactory::new(&options, Arc::new(StaticPageEnvironment::default()));
    factory.track_scroll(depth, None).into_activity().unwrap()
}

/// Scroll depth used to tell payloads apart.
fn depth(activity: &Activity) -> u32 {
    activity.result.as_ref().and_then(|r| r.location).unwrap()
}

fn depths(activities: &[Activity]) -> Vec<u32> {
    activities.iter().map(depth).collect()
}

// =============================================================================
// Identity gating
// =============================================================================

#[tokio::test]
async fn test_send_without_identity_queues_payload() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::new(URL, transport.clone());

    assert!(queue.send(payload(1)).await.is_ok());

    assert_eq!(queue.len().await, 1);
    assert_eq!(transport.calls(), 0);
    assert!(queue.flush_requested().await);
    assert_eq!(queue.snapshot().await[0].identity(), None);
}

#[tokio::test]
async fn test_resolution_flushes_deferred_send() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::new(URL, transport.clone());
    queue.send(payload(1)).await.unwrap();

    queue.resolve_identity(Ok("user-42".to_string())).await.unwrap();

    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].identity(), Some("user-42"));
    assert!(queue.is_empty().await);
    assert_eq!(queue.identity().await, Identity::Resolved("user-42".into()));
    assert!(!queue.flush_requested().await);
}

#[tokio::test]
async fn test_enqueued_payloads_flush_in_order_after_resolution() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::new(URL, transport.clone());

    for n in 1..=4 {
        queue.enqueue(payload(n)).await;
    }
    queue.flush().await.unwrap();
    assert_eq!(transport.calls(), 0);

    queue.resolve_identity(Ok("user-42".to_string())).await.unwrap();

    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(depths(&batches[0]), vec![1, 2, 3, 4]);
    assert!(batches[0].iter().all(|p| p.identity() == Some("user-42")));
}

#[tokio::test]
async fn test_enqueue_alone_does_not_request_flush() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::new(URL, transport.clone());
    queue.enqueue(payload(1)).await;

    queue.resolve_identity(Ok("user-42".to_string())).await.unwrap();

    assert_eq!(transport.calls(), 0);
    assert_eq!(queue.len().await, 1);

    queue.flush().await.unwrap();
    assert_eq!(transport.calls(), 1);
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_flush_empty_queue_without_identity_requests_nothing() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::new(URL, transport.clone());

    queue.flush().await.unwrap();

    assert!(!queue.flush_requested().await);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_identity_injected_at_flush_time() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::new(URL, transport.clone());
    queue.enqueue(payload(1)).await;

    assert!(queue.snapshot().await.iter().all(|p| p.identity().is_none()));

    queue.resolve_identity(Ok("user-7".to_string())).await.unwrap();
    queue.flush().await.unwrap();

    assert_eq!(transport.batches()[0][0].identity(), Some("user-7"));
}

// =============================================================================
// Resolution outcomes
// =============================================================================

#[tokio::test]
async fn test_resolution_failure_is_reported() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::new(URL, transport.clone());
    queue.send(payload(1)).await.unwrap();

    let result = queue
        .resolve_identity(Err(IdentityError("no cookie".to_string())))
        .await;

    assert_eq!(
        result,
        Err(PulseError::IdentityResolution("no cookie".to_string()))
    );
    assert_eq!(queue.identity().await, Identity::Failed("no cookie".into()));

    // Nothing is ever sent anonymously.
    queue.send(payload(2)).await.unwrap();
    queue.flush().await.unwrap();
    assert_eq!(transport.calls(), 0);
    assert_eq!(queue.len().await, 2);
}

#[tokio::test]
async fn test_resolution_accepted_once() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::new(URL, transport);

    queue.resolve_identity(Ok("user-42".to_string())).await.unwrap();
    let second = queue.resolve_identity(Ok("user-43".to_string())).await;

    assert!(matches!(second, Err(PulseError::Internal(_))));
    assert_eq!(queue.identity().await, Identity::Resolved("user-42".into()));
}

#[tokio::test]
async fn test_failed_deferred_flush_keeps_payloads() {
    let transport = Arc::new(RecordingTransport::failing_once(503));
    let queue = DeliveryQueue::new(URL, transport.clone());
    queue.send(payload(1)).await.unwrap();
    queue.send(payload(2)).await.unwrap();

    assert!(queue.resolve_identity(Ok("user-42".to_string())).await.is_ok());

    assert_eq!(transport.calls(), 1);
    assert_eq!(depths(&queue.snapshot().await), vec![1, 2]);
}

// =============================================================================
// Resolved identity
// =============================================================================

#[tokio::test]
async fn test_send_with_identity_delivers_single_payload() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::with_identity(URL, transport.clone(), "user-42");

    queue.send(payload(5)).await.unwrap();

    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(depths(&batches[0]), vec![5]);
    assert_eq!(batches[0][0].identity(), Some("user-42"));
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_failed_send_requeues_payload() {
    let transport = Arc::new(RecordingTransport::failing_once(500));
    let queue = DeliveryQueue::with_identity(URL, transport.clone(), "user-42");

    let result = queue.send(payload(1)).await;

    match result {
        Err(PulseError::Delivery(msg)) => assert!(msg.contains("500")),
        other => panic!("Expected delivery error, got {other:?}"),
    }
    assert_eq!(queue.len().await, 1);
    assert_eq!(queue.in_flight().await, 0);
}

#[tokio::test]
async fn test_failed_send_goes_to_tail() {
    let transport = Arc::new(RecordingTransport::failing_once(500));
    let queue = DeliveryQueue::with_identity(URL, transport.clone(), "user-42");
    queue.enqueue(payload(1)).await;

    assert!(queue.send(payload(2)).await.is_err());

    assert_eq!(depths(&queue.snapshot().await), vec![1, 2]);
}

#[tokio::test]
async fn test_failed_flush_restores_queue_in_order() {
    let transport = Arc::new(RecordingTransport::failing_once(503));
    let queue = DeliveryQueue::with_identity(URL, transport.clone(), "user-42");
    queue.enqueue(payload(1)).await;
    queue.enqueue(payload(2)).await;

    let result = queue.flush().await;

    assert!(matches!(result, Err(PulseError::Delivery(_))));
    assert_eq!(depths(&queue.snapshot().await), vec![1, 2]);

    // The next flush retries the same payloads.
    queue.flush().await.unwrap();
    assert_eq!(depths(&transport.batches()[1]), vec![1, 2]);
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn test_flush_empty_queue_is_noop() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = DeliveryQueue::with_identity(URL, transport.clone(), "user-42");

    queue.flush().await.unwrap();
    queue.flush().await.unwrap();

    assert_eq!(transport.calls(), 0);
}

// =============================================================================
// In-flight interleaving
// =============================================================================

#[tokio::test]
async fn test_payload_queued_during_flush_survives_success() {
    let transport = Arc::new(GatedTransport::new(false));
    let queue = DeliveryQueue::with_identity(URL, transport.clone(), "user-42");
    queue.enqueue(payload(1)).await;
    queue.enqueue(payload(2)).await;

    let flushing = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.flush().await })
    };
    transport.started.notified().await;

    assert_eq!(queue.in_flight().await, 2);
    assert!(queue.is_empty().await);
    queue.enqueue(payload(3)).await;

    transport.release.notify_one();
    flushing.await.unwrap().unwrap();

    assert_eq!(depths(&transport.batches.lock().unwrap()[0]), vec![1, 2]);
    assert_eq!(depths(&queue.snapshot().await), vec![3]);
    assert_eq!(queue.in_flight().await, 0);
}

#[tokio::test]
async fn test_failed_batch_goes_behind_payloads_queued_during_flush() {
    let transport = Arc::new(GatedTransport::new(true));
    let queue = DeliveryQueue::with_identity(URL, transport.clone(), "user-42");
    queue.enqueue(payload(1)).await;
    queue.enqueue(payload(2)).await;

    let flushing = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.flush().await })
    };
    transport.started.notified().await;
    queue.enqueue(payload(3)).await;

    transport.release.notify_one();
    assert!(flushing.await.unwrap().is_err());

    assert_eq!(depths(&queue.snapshot().await), vec![3, 1, 2]);
}

// =============================================================================
// Cancelled deliveries
// =============================================================================

#[tokio::test]
async fn test_timed_out_flush_requeues_batch() {
    let transport = Arc::new(GatedTransport::new(false));
    let queue = DeliveryQueue::with_identity(URL, transport.clone(), "user-42");
    queue.enqueue(payload(1)).await;
    queue.enqueue(payload(2)).await;

    let outcome = tokio::time::timeout(Duration::from_millis(50), queue.flush()).await;

    assert!(outcome.is_err(), "flush should still be waiting on the transport");
    assert_eq!(transport.batches.lock().unwrap().len(), 1);
    assert_eq!(depths(&queue.snapshot().await), vec![1, 2]);
    assert_eq!(queue.in_flight().await, 0);
}

#[tokio::test]
async fn test_aborted_send_requeues_payload_at_tail() {
    let transport = Arc::new(GatedTransport::new(false));
    let queue = DeliveryQueue::with_identity(URL, transport.clone(), "user-42");

    let sending = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.send(payload(1)).await })
    };
    transport.started.notified().await;
    assert_eq!(queue.in_flight().await, 1);
    queue.enqueue(payload(2)).await;

    sending.abort();
    assert!(sending.await.unwrap_err().is_cancelled());

    assert_eq!(depths(&queue.snapshot().await), vec![2, 1]);
    assert_eq!(queue.in_flight().await, 0);
}

#[tokio::test]
async fn test_requeued_batch_is_delivered_by_next_flush() {
    let gated = Arc::new(GatedTransport::new(false));
    let queue = DeliveryQueue::with_identity(URL, gated.clone(), "user-42");
    queue.enqueue(payload(1)).await;

    let outcome = tokio::time::timeout(Duration::from_millis(50), queue.flush()).await;
    assert!(outcome.is_err());

    gated.release.notify_one();
    queue.flush().await.unwrap();

    let batches = gated.batches.lock().unwrap().clone();
    assert_eq!(batches.len(), 2);
    assert_eq!(depths(&batches[1]), vec![1]);
    assert!(queue.is_empty().await);
}
