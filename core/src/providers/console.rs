//! Console notifier for development.

use crate::notifications::{NotifyError, ReviewInvitationEmail};
use crate::providers::Notifier;
use tracing::info;

/// Logs notifications instead of sending them.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    async fn send_review_invitation(
        &self,
        to: &str,
        email: &ReviewInvitationEmail,
    ) -> Result<(), NotifyError> {
        info!(
            to = %to,
            subject = %email.subject,
            review_link = %email.review_link,
            "Review invitation (development mode)"
        );
        Ok(())
    }
}
