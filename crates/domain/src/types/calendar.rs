//! Calendar sync records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;

/// Outcome of pushing a structured event to a calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
    Conflict,
}

impl_domain_status_conversions!(SyncStatus {
    Pending => "pending",
    Synced => "synced",
    Failed => "failed",
    Conflict => "conflict",
});

/// Record returned by a calendar sink for one structured event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub calendar_provider: String,
    pub calendar_id: String,
    pub provider_event_id: Option<String>,
    pub structured_event_id: Uuid,
    pub sync_status: SyncStatus,
    pub last_sync: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl CalendarEvent {
    /// Successful sync stamped with the current time
    pub fn synced(
        calendar_provider: impl Into<String>,
        calendar_id: impl Into<String>,
        provider_event_id: impl Into<String>,
        structured_event_id: Uuid,
    ) -> Self {
        Self {
            calendar_provider: calendar_provider.into(),
            calendar_id: calendar_id.into(),
            provider_event_id: Some(provider_event_id.into()),
            structured_event_id,
            sync_status: SyncStatus::Synced,
            last_sync: Some(Utc::now()),
            error_message: None,
        }
    }

    /// Failed sync carrying the provider's error
    pub fn failed(
        calendar_provider: impl Into<String>,
        calendar_id: impl Into<String>,
        structured_event_id: Uuid,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            calendar_provider: calendar_provider.into(),
            calendar_id: calendar_id.into(),
            provider_event_id: None,
            structured_event_id,
            sync_status: SyncStatus::Failed,
            last_sync: Some(Utc::now()),
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.sync_status == SyncStatus::Synced
    }
}
