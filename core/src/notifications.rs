//! Review invitation messages.

use crate::types::ReviewInvitation;
use thiserror::Error;

/// Failure to deliver a notification.
///
/// Delivery is best effort: these errors are logged by the caller and never
/// surface to the client that triggered them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Recipient or sender address could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Message could not be assembled.
    #[error("Failed to build message: {0}")]
    Build(String),

    /// Transport rejected or failed to deliver the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Rendered review invitation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewInvitationEmail {
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text_body: String,
    /// HTML body
    pub html_body: String,
    /// Link to the review form
    pub review_link: String,
}

impl ReviewInvitationEmail {
    /// Render the invitation for a completed appointment.
    #[must_use]
    pub fn render(invitation: &ReviewInvitation, base_url: &str) -> Self {
        let review_link = format!(
            "{}/appointments/{}/review",
            base_url.trim_end_matches('/'),
            invitation.appointment_id
        );

        let text_body = format!(
            "Hello!\n\n\
             Thank you for your recent visit. How did it go?\n\
             Rate your appointment here:\n\
             {review_link}\n\n\
             Your feedback helps other patients choose a doctor."
        );

        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>How was your visit?</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">How was your visit?</h2>
        <p>Thank you for your recent visit. Please take a minute to rate your appointment.</p>
        <p style="margin: 30px 0;">
            <a href="{review_link}"
               style="display: inline-block; background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">
                Leave a review
            </a>
        </p>
        <p style="color: #666; font-size: 12px; margin-top: 40px;">
            Or copy and paste this link into your browser:<br>
            {review_link}
        </p>
    </div>
</body>
</html>"#
        );

        Self {
            subject: "How was your visit? Leave a review".to_string(),
            text_body,
            html_body,
            review_link,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{AppointmentId, ClientId, ProviderId};
    use chrono::{TimeZone, Utc};

    #[test]
    fn links_to_the_appointment_review() {
        let invitation = ReviewInvitation {
            appointment_id: AppointmentId(42),
            client_id: ClientId(1),
            provider_id: ProviderId(2),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };

        let email = ReviewInvitationEmail::render(&invitation, "https://clinic.example/");

        assert_eq!(email.review_link, "https://clinic.example/appointments/42/review");
        assert!(email.text_body.contains(&email.review_link));
        assert!(email.html_body.contains(&email.review_link));
    }
}
