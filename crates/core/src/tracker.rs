//! Tracker: configuration, event construction and delivery for one page.

use std::sync::Arc;

use pulse_activity::{Activity, EventFactory, PageEnvironment, StaticPageEnvironment, TrackedEvent};
use pulse_common::{IdGenerator, PulseError, PulseResult, TrackerOptions};
use pulse_queue::{
    DeliveryQueue, GeneratedUserContext, HttpTransport, Identity, Transport, UserContext,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Builder for [`Tracker`].
#[must_use]
pub struct TrackerBuilder {
    options: TrackerOptions,
    transport: Option<Arc<dyn Transport>>,
    user_context: Option<Arc<dyn UserContext>>,
    environment: Option<Arc<dyn PageEnvironment>>,
}

impl TrackerBuilder {
    /// Override the transport. Defaults to [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Override identity resolution. Defaults to [`GeneratedUserContext`].
    /// Ignored when `userId` is configured.
    pub fn user_context(mut self, user_context: Arc<dyn UserContext>) -> Self {
        self.user_context = Some(user_context);
        self
    }

    /// Source of page and device attributes. Defaults to
    /// [`StaticPageEnvironment::default`].
    pub fn environment(mut self, environment: Arc<dyn PageEnvironment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Validate the options and start the tracker.
    ///
    /// Without a configured `userId`, identity resolution is spawned on the
    /// current tokio runtime; payloads are held back until it completes.
    pub fn build(self) -> PulseResult<Tracker> {
        self.options.check_required()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                HttpTransport::new().map_err(|e| PulseError::Internal(e.to_string()))?,
            ),
        };
        let environment = self
            .environment
            .unwrap_or_else(|| Arc::new(StaticPageEnvironment::default()));

        let id = IdGenerator::new().generate();
        let events = EventFactory::new(&self.options, environment);

        let (queue, resolution) = match &self.options.user_id {
            Some(user_id) => (
                DeliveryQueue::with_identity(self.options.url.clone(), transport, user_id.clone()),
                None,
            ),
            None => {
                let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
                    PulseError::Internal(format!("identity resolution needs a tokio runtime: {e}"))
                })?;
                let queue = DeliveryQueue::new(self.options.url.clone(), transport);
                let user_context = self
                    .user_context
                    .unwrap_or_else(|| Arc::new(GeneratedUserContext::new()));

                debug!(tracker_id = %id, "Fetching userId");
                let handle = runtime.spawn(resolve_identity(queue.clone(), user_context));
                (queue, Some(handle))
            }
        };

        info!(
            tracker_id = %id,
            client_id = %self.options.client_id,
            page_id = %self.options.page_id,
            url = %self.options.url,
            "Tracker started"
        );

        Ok(Tracker {
            id,
            options: self.options,
            events,
            queue,
            resolution: Mutex::new(resolution),
        })
    }
}

async fn resolve_identity(queue: DeliveryQueue, user_context: Arc<dyn UserContext>) {
    let outcome = user_context.resolve().await;
    // The queue logs the failure and keeps it as its identity state.
    let _ = queue.resolve_identity(outcome).await;
}

/// Tracks activity on one page and delivers it to the collection endpoint.
pub struct Tracker {
    id: String,
    options: TrackerOptions,
    events: EventFactory,
    queue: DeliveryQueue,
    resolution: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("id", &self.id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Start building a tracker.
    pub fn builder(options: TrackerOptions) -> TrackerBuilder {
        TrackerBuilder {
            options,
            transport: None,
            user_context: None,
            environment: None,
        }
    }

    /// Tracker with the default transport, user context and environment.
    pub fn new(options: TrackerOptions) -> PulseResult<Self> {
        Self::builder(options).build()
    }

    /// Instance id, as it appears in log lines.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Options the tracker was built with.
    #[must_use]
    pub const fn options(&self) -> &TrackerOptions {
        &self.options
    }

    /// Event constructors for this page.
    #[must_use]
    pub const fn events(&self) -> &EventFactory {
        &self.events
    }

    /// The underlying delivery queue.
    #[must_use]
    pub const fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    /// Validate and send an event.
    ///
    /// Returns `Ok` right away when the identity is still unresolved; the
    /// event is delivered by the flush that follows resolution.
    pub async fn send_event(&self, event: TrackedEvent) -> PulseResult<()> {
        let payload = event.into_activity()?;
        self.send(payload).await
    }

    /// Validate an event and add it to the queue without sending.
    pub async fn queue_event(&self, event: TrackedEvent) -> PulseResult<()> {
        let payload = event.into_activity()?;
        self.add_to_queue(payload).await;
        Ok(())
    }

    /// Send a prepared payload.
    pub async fn send(&self, payload: Activity) -> PulseResult<()> {
        self.queue.send(payload).await
    }

    /// Add a prepared payload to the queue.
    pub async fn add_to_queue(&self, payload: Activity) {
        self.queue.enqueue(payload).await;
    }

    /// Send everything queued as one batch.
    pub async fn flush(&self) -> PulseResult<()> {
        self.queue.flush().await
    }

    /// Wait for identity resolution and report its outcome.
    ///
    /// Includes the flush triggered by resolution, if one was pending.
    pub async fn wait_for_identity(&self) -> PulseResult<String> {
        {
            let mut resolution = self.resolution.lock().await;
            if let Some(handle) = resolution.as_mut() {
                let joined = handle.await;
                *resolution = None;
                joined.map_err(|e| {
                    PulseError::Internal(format!("identity resolution task failed: {e}"))
                })?;
            }
        }

        match self.queue.identity().await {
            Identity::Resolved(id) => Ok(id),
            Identity::Failed(reason) => Err(PulseError::IdentityResolution(reason)),
            Identity::Unresolved => Err(PulseError::Internal(
                "identity resolution was not started".to_string(),
            )),
        }
    }
}
