//! Stable field-number ledger.
//!
//! Proto field numbers must not change when a schema is edited, or existing
//! wire traffic breaks. Re-deriving numbers from field positions would
//! renumber everything after an insertion or removal, so numbering goes
//! through this ledger instead: every message keeps a name → number map,
//! a number is assigned the first time a field name is seen, and numbers
//! are never reused or reordered. Callers persist the ledger (it is plain
//! serde data) and feed it back into the next compilation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLedger {
    /// Keyed by message path (`GetUserResponse.User` for nested messages).
    messages: IndexMap<String, MessageLedger>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct MessageLedger {
    fields: IndexMap<String, u32>,
}

impl FieldLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number for `field` in `message`, assigning the next free number on
    /// first sight. Numbers start at 1 and strictly increase.
    pub fn number(&mut self, message: &str, field: &str) -> u32 {
        let entry = self.messages.entry(message.to_string()).or_default();
        if let Some(&number) = entry.fields.get(field) {
            return number;
        }
        let next = entry.fields.values().copied().max().unwrap_or(0) + 1;
        entry.fields.insert(field.to_string(), next);
        next
    }

    /// Numbers recorded for `message` whose field no longer exists; these
    /// are emitted as `reserved` so they can never be reassigned.
    pub fn reserved_numbers(&self, message: &str, live: &[String]) -> Vec<u32> {
        let Some(entry) = self.messages.get(message) else {
            return Vec::new();
        };
        let mut retired: Vec<u32> = entry
            .fields
            .iter()
            .filter(|(name, _)| !live.iter().any(|l| l == *name))
            .map(|(_, &number)| number)
            .collect();
        retired.sort_unstable();
        retired
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
