//! Pending evaluation table

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::error::ExecutionError;

pub type EvalOutcome = Result<JsonValue, ExecutionError>;

/// An evaluation relayed to the sandbox and not yet answered
#[derive(Debug)]
pub struct PendingEvaluation {
    pub correlation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    responder: oneshot::Sender<EvalOutcome>,
    expiry: Option<AbortHandle>,
}

impl PendingEvaluation {
    pub fn new(
        correlation_id: Uuid,
        timeout: Duration,
        responder: oneshot::Sender<EvalOutcome>,
    ) -> Self {
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|delta| created_at.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            correlation_id,
            created_at,
            expires_at,
            responder,
            expiry: None,
        }
    }

    /// Resolve the caller and cancel the expiry timer.
    ///
    /// Returns false if the caller stopped waiting.
    pub fn complete(self, outcome: EvalOutcome) -> bool {
        if let Some(expiry) = self.expiry {
            expiry.abort();
        }
        self.responder.send(outcome).is_ok()
    }

    /// Resolve the caller from the expiry timer itself
    pub fn expire(self, outcome: EvalOutcome) -> bool {
        self.responder.send(outcome).is_ok()
    }
}

/// Correlation id → pending evaluation
///
/// `take_if_present` is an atomic lookup-and-remove, so whichever of the
/// result path and the timeout path takes an entry first is the only one that
/// resolves its caller.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: Mutex<HashMap<Uuid, PendingEvaluation>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: PendingEvaluation) {
        self.entries.lock().insert(entry.correlation_id, entry);
    }

    /// Attach the expiry timer to a still-pending entry.
    ///
    /// Returns false when the entry is already gone.
    pub fn arm(&self, id: &Uuid, expiry: AbortHandle) -> bool {
        match self.entries.lock().get_mut(id) {
            Some(entry) => {
                entry.expiry = Some(expiry);
                true
            }
            None => false,
        }
    }

    pub fn take_if_present(&self, id: &Uuid) -> Option<PendingEvaluation> {
        self.entries.lock().remove(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_if_present_consumes_once() {
        let table = PendingTable::new();
        let id = Uuid::new_v4();
        let (tx, mut rx) = oneshot::channel();

        table.insert(PendingEvaluation::new(id, Duration::from_secs(5), tx));
        assert!(table.contains(&id));

        let entry = table.take_if_present(&id).unwrap();
        assert!(table.take_if_present(&id).is_none());
        assert!(table.is_empty());

        assert!(entry.complete(Ok(json!(2))));
        assert_eq!(rx.try_recv().unwrap(), Ok(json!(2)));
    }

    #[test]
    fn test_expiry_window() {
        let (tx, _rx) = oneshot::channel();
        let entry = PendingEvaluation::new(Uuid::new_v4(), Duration::from_secs(5), tx);
        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_arm_missing_entry() {
        let table = PendingTable::new();
        let handle = tokio::spawn(async {}).abort_handle();
        assert!(!table.arm(&Uuid::new_v4(), handle));
    }

    #[test]
    fn test_complete_after_caller_gone() {
        let (tx, rx) = oneshot::channel();
        drop(rx);
        let entry = PendingEvaluation::new(Uuid::new_v4(), Duration::from_secs(1), tx);
        assert!(!entry.complete(Ok(JsonValue::Null)));
    }
}
