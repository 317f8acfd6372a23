//! In-memory remote store for engine and gateway tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::record::NotePayload;
use super::remote::RemoteStore;
use crate::error::NotesError;

pub struct StubRemote {
    calls: AtomicUsize,
    delivered: Mutex<Vec<String>>,
    reject_all: bool,
    reject_matching: Option<String>,
    delay: Duration,
}

impl StubRemote {
    pub fn accepting() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
            reject_all: false,
            reject_matching: None,
            delay: Duration::ZERO,
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_all: true,
            ..Self::accepting()
        }
    }

    /// Reject notes whose text contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.reject_matching = Some(needle.to_string());
        self
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn delivered_keys(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStore for StubRemote {
    async fn deliver(&self, key: &str, payload: &NotePayload) -> Result<(), NotesError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let rejected = self.reject_all
            || self
                .reject_matching
                .as_deref()
                .is_some_and(|needle| payload.note.contains(needle));
        if rejected {
            return Err(NotesError::DeliveryFailed(
                "remote store returned 503 Service Unavailable".to_string(),
            ));
        }

        self.delivered.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
