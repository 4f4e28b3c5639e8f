//! Recording notifier.

use clinic_core::providers::Notifier;
use clinic_core::{NotifyError, ReviewInvitationEmail};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A review invitation captured by [`MockNotifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentInvitation {
    /// Recipient address
    pub to: String,
    /// Rendered message
    pub email: ReviewInvitationEmail,
}

/// Notifier that records what it was asked to send.
///
/// Clones share the same record.
#[derive(Clone, Debug, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<SentInvitation>>>,
    failing: Arc<AtomicBool>,
}

impl MockNotifier {
    /// Create a notifier that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Invitations accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentInvitation> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait until at least `count` invitations were accepted, or give up after `timeout`.
    ///
    /// Sends happen on detached tasks, so tests poll for them.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<SentInvitation> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.sent();
            if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Notifier for MockNotifier {
    async fn send_review_invitation(
        &self,
        to: &str,
        email: &ReviewInvitationEmail,
    ) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("mock notifier set to fail".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentInvitation {
                to: to.to_string(),
                email: email.clone(),
            });
        Ok(())
    }
}
