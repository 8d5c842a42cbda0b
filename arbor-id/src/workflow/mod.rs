//! Identification attempt workflow
//!
//! One attempt progresses through defined states:
//! IDLE → UPLOADING → UPLOADED → CLASSIFYING → NORMALIZED → RECORDED
//!
//! with failure exits UPLOAD_FAILED, CLASSIFICATION_FAILED and
//! NORMALIZATION_FAILED. Every failure state is terminal for the attempt;
//! there is no auto-retry; a new attempt is a fresh state machine.
//! Promotion into the collection is a separate explicit step available
//! only after RECORDED.

pub mod orchestrator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use orchestrator::{AttemptError, CompletedIdentification, IdentifyOrchestrator};

/// Identification attempt state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptState {
    /// Attempt created, nothing started
    Idle,
    /// Image bytes travelling to the media store
    Uploading,
    /// Stable image URL obtained
    Uploaded,
    /// Recognition provider request in flight
    Classifying,
    /// Canonical record produced from the provider response
    Normalized,
    /// Record appended to the history ledger (terminal success)
    Recorded,
    /// Media store upload failed (terminal)
    UploadFailed,
    /// Provider call failed; the upload result stands alone (terminal)
    ClassificationFailed,
    /// Provider answered but produced no usable record (terminal)
    NormalizationFailed,
}

impl AttemptState {
    /// Whether the attempt has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Recorded
                | AttemptState::UploadFailed
                | AttemptState::ClassificationFailed
                | AttemptState::NormalizationFailed
        )
    }
}

/// State transition journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub attempt_id: Uuid,
    pub old_state: AttemptState,
    pub new_state: AttemptState,
    pub transitioned_at: DateTime<Utc>,
}

/// One identification attempt (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyAttempt {
    pub attempt_id: Uuid,
    pub state: AttemptState,
    pub started_at: DateTime<Utc>,
    /// Set once a terminal state is reached
    pub ended_at: Option<DateTime<Utc>>,
}

impl IdentifyAttempt {
    pub fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            state: AttemptState::Idle,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new state
    pub fn transition_to(&mut self, new_state: AttemptState) -> StateTransition {
        let transition = StateTransition {
            attempt_id: self.attempt_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl Default for IdentifyAttempt {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress events emitted while an attempt runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttemptEvent {
    StateChanged {
        attempt_id: Uuid,
        old_state: AttemptState,
        new_state: AttemptState,
    },
    ImageUploaded {
        attempt_id: Uuid,
        url: String,
    },
    Identified {
        attempt_id: Uuid,
        scientific_name: String,
        confidence: f64,
    },
    AttemptFailed {
        attempt_id: Uuid,
        state: AttemptState,
        message: String,
    },
}
