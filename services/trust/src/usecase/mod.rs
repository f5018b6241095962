pub mod auth_flow;
pub mod code;
pub mod device;
pub mod identity;
pub mod session;

use crate::domain::repository::TrustEventSink;
use crate::domain::types::TrustEvent;

/// Publish after a committed transition. Sink failures never reach the caller.
pub(crate) async fn emit<E: TrustEventSink>(events: &E, event: TrustEvent) {
    if let Err(e) = events.publish(&event).await {
        tracing::warn!(
            error = %e,
            kind = event.kind.as_str(),
            event_id = %event.id,
            "failed to publish trust event"
        );
    }
}
