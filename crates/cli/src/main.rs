//! Sends a single page-load event to a collection endpoint.
//!
//! Options come from `config/*.toml` and `PULSE_*` environment variables.
//!
//! ```text
//! pulse-track <page-url> [title]
//! ```

use std::sync::Arc;

use anyhow::Context;
use pulse_activity::StaticPageEnvironment;
use pulse_common::{LogFormat, TrackerOptions, init_tracing};
use pulse_core::Tracker;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = if std::env::var("PULSE_LOG_JSON").is_ok() {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing("pulse=debug", format);

    let mut args = std::env::args().skip(1);
    let page_url = args.next().context("usage: pulse-track <page-url> [title]")?;
    let title = args.next();

    let options = TrackerOptions::load().context("Failed to load tracker options")?;
    let environment = StaticPageEnvironment::new(page_url, title.clone().unwrap_or_default());

    let tracker = Tracker::builder(options)
        .environment(Arc::new(environment))
        .build()?;

    let event = tracker.events().track_page_load(title.as_deref(), None);
    tracker.send_event(event).await?;

    let user_id = tracker.wait_for_identity().await?;
    info!(user_id = %user_id, "Identity resolved");

    // Covers a failed deferred flush: the payload is still queued.
    if let Err(e) = tracker.flush().await {
        warn!(error = %e, queued = tracker.queue().len().await, "Delivery failed");
        return Err(e.into());
    }

    info!(url = %tracker.options().url, "Page load delivered");
    Ok(())
}
