//! Review invitation delivery.

use crate::config::MailConfig;
use clinic_core::providers::{ConsoleNotifier, Notifier};
use clinic_core::{NotifyError, ReviewInvitationEmail};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

/// SMTP notifier using Lettre.
///
/// Sends the plain-text and HTML renderings of an invitation as one
/// `multipart/alternative` message over STARTTLS.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Create a notifier for an SMTP relay.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidAddress`] for a bad sender and
    /// [`NotifyError::Build`] if the relay cannot be configured.
    pub fn new(host: &str, config: &MailConfig) -> Result<Self, NotifyError> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::InvalidAddress(format!("{}: {e}", config.from_email)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotifyError::Build(format!("SMTP relay error: {e}")))?
            .port(config.smtp_port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: Arc::new(builder.build()),
            from,
        })
    }
}

/// Assemble a `multipart/alternative` invitation.
fn build_message(from: &Mailbox, to: &str, email: &ReviewInvitationEmail) -> Result<Message, NotifyError> {
    let to = to
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::InvalidAddress(format!("{to}: {e}")))?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.as_str())
        .multipart(MultiPart::alternative_plain_html(
            email.text_body.clone(),
            email.html_body.clone(),
        ))
        .map_err(|e| NotifyError::Build(e.to_string()))
}

impl Notifier for SmtpNotifier {
    async fn send_review_invitation(
        &self,
        to: &str,
        email: &ReviewInvitationEmail,
    ) -> Result<(), NotifyError> {
        let message = build_message(&self.from, to, email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }
}

/// The notifier the server runs with.
#[derive(Clone)]
pub enum AppNotifier {
    /// Log invitations (no SMTP host configured)
    Console(ConsoleNotifier),
    /// Send invitations over SMTP
    Smtp(SmtpNotifier),
}

impl AppNotifier {
    /// SMTP when a host is configured, console otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the SMTP notifier cannot be built.
    pub fn from_config(config: &MailConfig) -> Result<Self, NotifyError> {
        match &config.smtp_host {
            Some(host) => Ok(Self::Smtp(SmtpNotifier::new(host, config)?)),
            None => Ok(Self::Console(ConsoleNotifier::new())),
        }
    }

    /// Short name for startup logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Console(_) => "console",
            Self::Smtp(_) => "smtp",
        }
    }
}

impl Notifier for AppNotifier {
    async fn send_review_invitation(
        &self,
        to: &str,
        email: &ReviewInvitationEmail,
    ) -> Result<(), NotifyError> {
        match self {
            Self::Console(notifier) => notifier.send_review_invitation(to, email).await,
            Self::Smtp(notifier) => notifier.send_review_invitation(to, email).await,
        }
    }
}
