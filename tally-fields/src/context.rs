//! Processing Context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether records are being inserted or modified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Create,
    Update,
}

/// Context passed to hooks during a write
///
/// One context covers one batch: every record in the batch gets the same
/// timestamp, and auto-increment numbers are handed out in record order.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    pub now: DateTime<Utc>,
    pub user_id: Option<String>,
    next_sequence: i64,
}

impl ProcessContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            user_id: None,
            next_sequence: 1,
        }
    }

    /// Context stamped with the current wall-clock time
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// First number handed out to an auto-increment field
    pub fn with_sequence_start(mut self, start: i64) -> Self {
        self.next_sequence = start;
        self
    }

    pub fn peek_sequence(&self) -> i64 {
        self.next_sequence
    }

    pub fn take_sequence(&mut self) -> i64 {
        let n = self.next_sequence;
        self.next_sequence += 1;
        n
    }
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self::now()
    }
}
