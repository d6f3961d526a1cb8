//! User confirmation gate consumed before bulk or destructive operations.
//!
//! The gate is blocking from the user's perspective and async from the
//! engine's. A declined prompt makes the whole operation a no-op, never a
//! partial action.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Async yes/no prompt surface. The dashboard wires its dialog here.
#[async_trait]
pub trait ConfirmGate: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Approves everything. Headless and demo use.
pub struct AutoConfirm;

#[async_trait]
impl ConfirmGate for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Scripted gate for tests: answers are consumed in prompt order, and an
/// unexpected prompt panics.
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<bool>>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ConfirmGate for ScriptedConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected confirmation prompt: {prompt}"))
    }
}
