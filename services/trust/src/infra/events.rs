use anyhow::Context as _;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use serde::Deserialize;

use warden_trust_schema::outbox_events;

use crate::domain::repository::TrustEventSink;
use crate::domain::types::TrustEvent;
use crate::error::TrustServiceError;

/// Persists events to `outbox_events` for an external relay to deliver.
#[derive(Clone)]
pub struct OutboxEventSink {
    pub db: DatabaseConnection,
}

impl TrustEventSink for OutboxEventSink {
    async fn publish(&self, event: &TrustEvent) -> Result<(), TrustServiceError> {
        let payload = serde_json::to_value(event).context("serialize trust event")?;
        let now = Utc::now();
        outbox_events::ActiveModel {
            id: Set(event.id),
            kind: Set(event.kind.as_str().to_owned()),
            payload: Set(payload),
            idempotency_key: Set(event.idempotency_key()),
            attempts: Set(0),
            last_error: Set(None),
            created_at: Set(now),
            next_attempt_at: Set(now),
            processed_at: Set(None),
            failed_at: Set(None),
        }
        .insert(&self.db)
        .await
        .context("insert trust event into outbox")?;
        Ok(())
    }
}

/// Writes events to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl TrustEventSink for LogEventSink {
    async fn publish(&self, event: &TrustEvent) -> Result<(), TrustServiceError> {
        let payload = serde_json::to_string(event).context("serialize trust event")?;
        tracing::info!(
            target: "trust_events",
            kind = event.kind.as_str(),
            event = %payload,
            "trust event"
        );
        Ok(())
    }
}

/// `EVENT_SINK` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSinkKind {
    #[default]
    Outbox,
    Log,
}

/// Sink selected at startup.
#[derive(Clone)]
pub enum EventSink {
    Outbox(OutboxEventSink),
    Log(LogEventSink),
}

impl EventSink {
    pub fn new(kind: EventSinkKind, db: &DatabaseConnection) -> Self {
        match kind {
            EventSinkKind::Outbox => Self::Outbox(OutboxEventSink { db: db.clone() }),
            EventSinkKind::Log => Self::Log(LogEventSink),
        }
    }
}

impl TrustEventSink for EventSink {
    async fn publish(&self, event: &TrustEvent) -> Result<(), TrustServiceError> {
        match self {
            Self::Outbox(sink) => sink.publish(event).await,
            Self::Log(sink) => sink.publish(event).await,
        }
    }
}
