//! Visit recorder: the event-driven write path into the history store.
//!
//! Browser navigation and focus events fire several times for one logical
//! visit (tab activation, URL change, load complete). The recorder
//! collapses those bursts with a short per-URL debounce window while still
//! counting genuinely repeated visits once the window expires.
//!
//! The debounce state machine is pure and single-threaded. Concurrent
//! event sources are serialized through a single-consumer mpsc queue into
//! one actor task that owns the state, so events are processed strictly
//! in arrival order without any locking.

use tabtrail_core::{Store, url};
use tokio::sync::{mpsc, oneshot};

const EVENT_QUEUE_DEPTH: usize = 256;

/// Per-URL debounce state machine.
///
/// Two states: idle, or cooling down for one URL until a deadline. An
/// event is accepted when idle, when its URL differs from the cooldown
/// URL, or when the deadline has passed; acceptance starts a new cooldown
/// for that URL.
#[derive(Debug)]
pub struct Debounce {
    window_ms: i64,
    cooldown: Option<(String, i64)>,
}

impl Debounce {
    pub fn new(window_ms: i64) -> Self {
        Self { window_ms, cooldown: None }
    }

    /// Observe an event for `url` at `now_ms`; returns whether it is
    /// accepted. Accepting transitions to `Cooldown(url, now + window)`.
    pub fn observe(&mut self, url: &str, now_ms: i64) -> bool {
        if let Some((cooling_url, until)) = &self.cooldown
            && cooling_url == url
            && now_ms < *until
        {
            return false;
        }
        self.cooldown = Some((url.to_string(), now_ms + self.window_ms));
        true
    }
}

struct VisitEvent {
    url: String,
    title: String,
    favicon_url: Option<String>,
    ack: oneshot::Sender<bool>,
}

/// Handle for submitting visit events to the recorder actor.
///
/// Cheap to clone; every clone feeds the same queue.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<VisitEvent>,
}

impl RecorderHandle {
    /// Submit a navigation event.
    ///
    /// Returns whether the event was accepted and recorded. Ineligible
    /// URLs, debounced repeats, and store faults all report `false`;
    /// faults are logged, never propagated to the event source.
    pub async fn record_visit(&self, url: &str, title: &str, favicon_hint: Option<&str>) -> bool {
        let (ack, accepted) = oneshot::channel();
        let event = VisitEvent {
            url: url.to_string(),
            title: title.to_string(),
            favicon_url: favicon_hint.map(str::to_string),
            ack,
        };

        if self.tx.send(event).await.is_err() {
            tracing::warn!("visit recorder is gone; dropping event");
            return false;
        }

        accepted.await.unwrap_or(false)
    }
}

/// Spawn the recorder actor over `store` with the given debounce window.
pub fn spawn(store: Store, window_ms: i64) -> RecorderHandle {
    let (tx, mut rx) = mpsc::channel::<VisitEvent>(EVENT_QUEUE_DEPTH);

    tokio::spawn(async move {
        let mut debounce = Debounce::new(window_ms);
        while let Some(event) = rx.recv().await {
            let accepted = handle_event(&store, &mut debounce, &event).await;
            // Receiver may have abandoned the await; the write above has
            // already run to completion either way.
            let _ = event.ack.send(accepted);
        }
    });

    RecorderHandle { tx }
}

async fn handle_event(store: &Store, debounce: &mut Debounce, event: &VisitEvent) -> bool {
    let normalized = match url::normalize(&event.url) {
        Ok(parsed) => parsed.to_string(),
        Err(e) => {
            tracing::debug!(url = %event.url, error = %e, "ignoring ineligible navigation event");
            return false;
        }
    };

    let now = chrono::Utc::now().timestamp_millis();
    if !debounce.observe(&normalized, now) {
        tracing::debug!(url = %normalized, "debounced repeat visit");
        return false;
    }

    match store
        .upsert_visit_at(&normalized, &event.title, event.favicon_url.as_deref(), now)
        .await
    {
        Ok(record) => {
            tracing::debug!(url = %record.url, visit_count = record.visit_count, "visit recorded");
            true
        }
        Err(e) => {
            tracing::warn!(url = %normalized, error = %e, "failed to record visit");
            false
        }
    }
}
