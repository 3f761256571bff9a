//! Step cursor and per-step display status

use serde::Serialize;

use super::results::ResultStore;
use crate::errors::ValidationError;

/// Index of the focused step within the visible step list.
///
/// The index is kept in `0..len` whenever the list is non-empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCursor {
    index: usize,
}

impl StepCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Move to `index`, rejecting positions outside the visible list
    pub fn focus(&mut self, index: usize, len: usize) -> Result<(), ValidationError> {
        if index >= len {
            return Err(ValidationError::StepOutOfRange { index, len });
        }
        self.index = index;
        Ok(())
    }

    /// Advance one position, capped at the last visible step
    pub fn advance(&mut self, len: usize) {
        if self.index + 1 < len {
            self.index += 1;
        }
    }

    /// Pull the index back into range after the visible list shrank
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.index = 0;
        } else if self.index >= len {
            self.index = len - 1;
        }
    }
}

/// Observable status of one visible step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Active,
    Success,
    Error,
}

impl StepStatus {
    /// Status of the step at `position` given the cursor and recorded results.
    ///
    /// A recorded result wins; `Active` is only for the cursor step without one.
    pub fn of(step_id: &str, position: usize, cursor: &StepCursor, results: &ResultStore) -> Self {
        match results.get(step_id) {
            Some(result) if result.success() => StepStatus::Success,
            Some(_) => StepStatus::Error,
            None if position == cursor.index() => StepStatus::Active,
            None => StepStatus::Pending,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            StepStatus::Pending => "○",
            StepStatus::Active => "▶",
            StepStatus::Success => "✓",
            StepStatus::Error => "✗",
        }
    }
}
