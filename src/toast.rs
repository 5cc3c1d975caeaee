//! Transient notifications that expire a fixed time after creation.

use serde::{Deserialize, Serialize};

pub const TOAST_LIFETIME_MS: i64 = 5_000;

/// Creation time plus a per-queue sequence number, so two toasts created in the
/// same millisecond still get distinct, ordered ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ToastId {
    pub created_at_ms: i64,
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub expires_at_ms: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    next_sequence: u64,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, message: impl Into<String>, now_ms: i64) -> ToastId {
        let id = ToastId {
            created_at_ms: now_ms,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.toasts.push(Toast {
            id,
            message: message.into(),
            expires_at_ms: now_ms.saturating_add(TOAST_LIFETIME_MS),
        });
        id
    }

    /// Drops every toast whose lifetime has elapsed at `now_ms`.
    pub fn expire(&mut self, now_ms: i64) -> usize {
        let due: Vec<ToastId> = self
            .toasts
            .iter()
            .filter(|toast| toast.expires_at_ms <= now_ms)
            .map(|toast| toast.id)
            .collect();
        for id in &due {
            self.remove(*id);
        }
        due.len()
    }

    pub fn visible(&mut self, now_ms: i64) -> Vec<Toast> {
        self.expire(now_ms);
        self.toasts.clone()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    fn remove(&mut self, id: ToastId) {
        self.toasts.retain(|toast| toast.id != id);
    }
}
