//! Subscription registry — in-memory store of browser push subscriptions.
//!
//! Keyed by endpoint: a browser re-subscribing with the same endpoint replaces
//! its earlier record in place rather than adding a duplicate. Records live
//! for the lifetime of the process; the dispatch service prunes endpoints the
//! push service reports as gone.

use tokio::sync::RwLock;

use beacon_common::error::AppError;
use beacon_common::types::{PushSubscriptionRecord, RegisterOutcome};

/// Insertion-ordered registry of push subscriptions.
///
/// Every operation is a single critical section with no await point while the
/// lock is held, so concurrent registrations for the same endpoint cannot
/// interleave.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    records: RwLock<Vec<PushSubscriptionRecord>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any existing record with the same endpoint.
    pub async fn register(
        &self,
        record: PushSubscriptionRecord,
    ) -> Result<RegisterOutcome, AppError> {
        record.validate()?;

        let mut records = self.records.write().await;
        let outcome = match records.iter_mut().find(|r| r.endpoint == record.endpoint) {
            Some(existing) => {
                *existing = record;
                RegisterOutcome::Replaced
            }
            None => {
                records.push(record);
                RegisterOutcome::Created
            }
        };

        let total = records.len();
        drop(records);

        match outcome {
            RegisterOutcome::Created => {
                tracing::info!(total, "New subscription added");
            }
            RegisterOutcome::Replaced => {
                tracing::debug!(total, "Subscription replaced");
            }
        }

        Ok(outcome)
    }

    /// Snapshot of all records in insertion order.
    pub async fn list(&self) -> Vec<PushSubscriptionRecord> {
        self.records.read().await.clone()
    }

    /// Remove the record for `endpoint`. Returns whether one existed.
    pub async fn remove(&self, endpoint: &str) -> bool {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.endpoint != endpoint);
        before != records.len()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
