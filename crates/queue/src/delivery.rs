//! Delivery queue.
//!
//! Holds payloads until the user identity is known, injects the identity at
//! send time and restores payloads whose delivery failed.
//!
//! The lock is never held across a transport call. A flush moves the live
//! queue into a local in-flight batch in one critical section, so payloads
//! queued while the transport call is outstanding belong to a later flush,
//! whatever the outcome of this one.
//!
//! An in-flight batch is owned by an `InFlightBatch` guard. Unless the
//! transport acknowledges it, the guard puts the batch back at the tail of
//! the queue, including when the delivering future is dropped mid-call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pulse_activity::Activity;
use pulse_common::{PulseError, PulseResult};
use tracing::{debug, error, warn};

use crate::error::IdentityError;
use crate::transport::Transport;

/// Resolution state of the user identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    /// Not resolved yet. Payloads are held back.
    #[default]
    Unresolved,
    /// Resolved. Terminal.
    Resolved(String),
    /// Resolution failed. Terminal; payloads are never sent.
    Failed(String),
}

impl Identity {
    /// The identity, when resolved.
    #[must_use]
    pub fn as_resolved(&self) -> Option<&str> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Unresolved | Self::Failed(_) => None,
        }
    }

    /// Whether resolution has finished, successfully or not.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    /// Live queue, in arrival order.
    pending: Vec<Activity>,
    identity: Identity,
    /// Set when a send or flush was deferred for lack of identity.
    flush_requested: bool,
    /// Payloads held by outstanding transport calls.
    in_flight: usize,
}

fn lock(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Payloads handed to the transport and not yet acknowledged.
struct InFlightBatch {
    state: Arc<Mutex<QueueState>>,
    payloads: Vec<Activity>,
    settled: bool,
}

impl InFlightBatch {
    /// Take ownership of `payloads`; the caller has already counted them
    /// in `in_flight`.
    fn new(state: Arc<Mutex<QueueState>>, payloads: Vec<Activity>) -> Self {
        Self {
            state,
            payloads,
            settled: false,
        }
    }

    fn payloads(&self) -> &[Activity] {
        &self.payloads
    }

    fn payloads_mut(&mut self) -> &mut [Activity] {
        &mut self.payloads
    }

    /// Settle the batch: drop it when delivered, requeue it otherwise.
    fn complete(mut self, delivered: bool) {
        self.release(delivered);
    }

    fn release(&mut self, delivered: bool) {
        if self.settled {
            return;
        }
        self.settled = true;

        let mut state = lock(&self.state);
        state.in_flight = state.in_flight.saturating_sub(self.payloads.len());
        if !delivered {
            state.pending.append(&mut self.payloads);
        }
    }
}

impl Drop for InFlightBatch {
    fn drop(&mut self) {
        if !self.settled {
            warn!(
                batch_size = self.payloads.len(),
                "Delivery abandoned before completion, requeueing payloads"
            );
            self.release(false);
        }
    }
}

/// Identity-gated payload queue in front of a [`Transport`].
#[derive(Clone)]
pub struct DeliveryQueue {
    url: Arc<str>,
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<QueueState>>,
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl DeliveryQueue {
    /// Create a queue whose identity is not resolved yet.
    #[must_use]
    pub fn new(url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self::with_state(url.into(), transport, Identity::Unresolved)
    }

    /// Create a queue with an already known identity.
    #[must_use]
    pub fn with_identity(
        url: impl Into<String>,
        transport: Arc<dyn Transport>,
        identity: impl Into<String>,
    ) -> Self {
        Self::with_state(url.into(), transport, Identity::Resolved(identity.into()))
    }

    fn with_state(url: String, transport: Arc<dyn Transport>, identity: Identity) -> Self {
        Self {
            url: url.into(),
            transport,
            state: Arc::new(Mutex::new(QueueState {
                identity,
                ..QueueState::default()
            })),
        }
    }

    /// Collection endpoint this queue delivers to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Append a payload to the queue. Nothing is sent.
    pub async fn enqueue(&self, payload: Activity) {
        lock(&self.state).pending.push(payload);
    }

    /// Send a single payload.
    ///
    /// Without an identity the payload is queued and `Ok` is returned at
    /// once; it goes out with the flush that follows resolution. On
    /// transport failure the payload is appended to the tail of the queue
    /// and the error is returned.
    pub async fn send(&self, mut payload: Activity) -> PulseResult<()> {
        let identity = {
            let mut state = lock(&self.state);
            let resolved = state.identity.as_resolved().map(str::to_owned);
            let Some(identity) = resolved else {
                debug!("Identity unresolved, queueing object");
                state.pending.push(payload);
                state.flush_requested = true;
                return Ok(());
            };
            state.in_flight += 1;
            identity
        };

        payload.inject_identity(&identity);
        debug!(activity_type = %payload.kind, "Sending object");

        let batch = InFlightBatch::new(self.state.clone(), vec![payload]);
        let result = self.transport.deliver(&self.url, batch.payloads()).await;
        batch.complete(result.is_ok());

        result.map_err(|e| {
            warn!(error = %e, "Failed to send object");
            e.into()
        })
    }

    /// Deliver the whole queue as one batch.
    ///
    /// An empty queue is a no-op. Without an identity the flush is deferred
    /// until resolution and `Ok` is returned at once. On transport failure
    /// the batch is appended back, behind anything queued meanwhile.
    pub async fn flush(&self) -> PulseResult<()> {
        let (identity, payloads) = {
            let mut state = lock(&self.state);
            if state.pending.is_empty() {
                return Ok(());
            }
            let resolved = state.identity.as_resolved().map(str::to_owned);
            let Some(identity) = resolved else {
                debug!(queued = state.pending.len(), "Identity unresolved, deferring flush");
                state.flush_requested = true;
                return Ok(());
            };
            let payloads = std::mem::take(&mut state.pending);
            state.in_flight += payloads.len();
            (identity, payloads)
        };

        let mut batch = InFlightBatch::new(self.state.clone(), payloads);
        for payload in batch.payloads_mut() {
            payload.inject_identity(&identity);
        }

        let batch_size = batch.payloads().len();
        debug!(batch_size, "Sending queue");

        let result = self.transport.deliver(&self.url, batch.payloads()).await;
        batch.complete(result.is_ok());

        result.map_err(|e| {
            warn!(batch_size, error = %e, "Failed to send queue");
            e.into()
        })
    }

    /// Record the outcome of identity resolution.
    ///
    /// Accepted once. On success, a deferred flush runs before this returns;
    /// its delivery error is logged and dropped, the payloads stay queued.
    /// On failure the identity stays unusable and the error is returned.
    pub async fn resolve_identity(
        &self,
        outcome: Result<String, IdentityError>,
    ) -> PulseResult<()> {
        let flush_requested = {
            let mut state = lock(&self.state);
            if state.identity.is_settled() {
                return Err(PulseError::Internal(
                    "identity has already been resolved".to_string(),
                ));
            }

            match outcome {
                Ok(identity) => {
                    debug!(user_id = %identity, "Identity resolved");
                    state.identity = Identity::Resolved(identity);
                    std::mem::take(&mut state.flush_requested)
                }
                Err(e) => {
                    error!(error = %e, queued = state.pending.len(), "Identity resolution failed");
                    state.identity = Identity::Failed(e.0.clone());
                    return Err(e.into());
                }
            }
        };

        if flush_requested {
            if let Err(e) = self.flush().await {
                warn!(error = %e, "Deferred queue flush failed");
            }
        }

        Ok(())
    }

    /// Current identity state.
    pub async fn identity(&self) -> Identity {
        lock(&self.state).identity.clone()
    }

    /// Number of queued payloads, excluding in-flight ones.
    pub async fn len(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Whether the live queue is empty.
    pub async fn is_empty(&self) -> bool {
        lock(&self.state).pending.is_empty()
    }

    /// Number of payloads held by outstanding transport calls.
    pub async fn in_flight(&self) -> usize {
        lock(&self.state).in_flight
    }

    /// Whether a flush is waiting for identity resolution.
    pub async fn flush_requested(&self) -> bool {
        lock(&self.state).flush_requested
    }

    /// Copy of the live queue, in order.
    pub async fn snapshot(&self) -> Vec<Activity> {
        lock(&self.state).pending.clone()
    }
}
