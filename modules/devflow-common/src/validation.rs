use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field-level validation failures: field name → messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    /// Human-readable summary, one line per field.
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Check a trimmed string's character count against inclusive bounds.
    pub fn check_len(
        &mut self,
        field: &str,
        value: &str,
        min: usize,
        max: Option<usize>,
        too_short: &str,
        too_long: &str,
    ) {
        let len = value.trim().chars().count();
        if len < min {
            self.push(field, too_short);
        }
        if let Some(max) = max {
            if len > max {
                self.push(field, too_long);
            }
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Input schemas implement this to reject malformed params before any store
/// access happens.
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}
