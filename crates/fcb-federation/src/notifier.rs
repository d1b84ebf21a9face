use fcb_core::{EventNotifier, PeerClient};
use fcb_schemas::{MemberId, OrderEvent, PeerRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Delivers provider-side order events to the requesting member over the
/// peer transport.
///
/// `push_event` is called while the provider holds the order's lock, so the
/// send happens on a spawned task. Delivery retries with linear backoff; a
/// duplicate arriving at the requester is discarded there, so retrying can
/// only help. After the last attempt the event is dropped with an error
/// log; the requester's copy stays PENDING until an operator intervenes or
/// the provider emits a newer event.
pub struct RemoteEventNotifier {
    client: Arc<dyn PeerClient>,
    attempts: u32,
    backoff: Duration,
}

impl RemoteEventNotifier {
    pub fn new(client: Arc<dyn PeerClient>) -> Self {
        Self {
            client,
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }
}

impl EventNotifier for RemoteEventNotifier {
    fn push_event(&self, requester: &MemberId, event: OrderEvent) {
        let client = self.client.clone();
        let requester = requester.clone();
        let attempts = self.attempts;
        let backoff = self.backoff;

        tokio::spawn(async move {
            for attempt in 1..=attempts {
                let request = PeerRequest::NotifyEvent {
                    event: event.clone(),
                };
                match client.call(&requester, request).await {
                    Ok(_) => return,
                    Err(err) => {
                        warn!(
                            requester = %requester,
                            order_id = %event.order_id,
                            attempt,
                            error = %err,
                            "order event delivery failed"
                        );
                        if attempt < attempts {
                            tokio::time::sleep(backoff * attempt).await;
                        }
                    }
                }
            }
            error!(
                requester = %requester,
                order_id = %event.order_id,
                "giving up on order event delivery"
            );
        });
    }
}
