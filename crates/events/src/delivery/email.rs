//! Email delivery via SMTP.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport and sends exactly
//! one plain-text message per [`MailSender::send`] call. It never retries;
//! retry policy belongs to the caller. Configuration is loaded from
//! environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and no mailer should be
//! constructed.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailDeliveryError {
    /// SMTP transport-level failure (connection, authentication, timeout, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// A non-SMTP sender could not reach its backend.
    #[error("Mail service unavailable: {0}")]
    Unavailable(String),
}

impl MailDeliveryError {
    /// Whether sending the same message again could succeed.
    ///
    /// Only transport faults are transient; a bad address or an unbuildable
    /// message fails the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MailDeliveryError::Transport(_) | MailDeliveryError::Unavailable(_)
        )
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (submission, STARTTLS-capable).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "Onboard <noreply@onboard.local>";

/// Default per-command SMTP timeout in seconds.
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" mailbox, optionally with a display name.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
    /// Per-command SMTP timeout in seconds.
    pub timeout_secs: u64,
    /// Upgrade with STARTTLS when the server offers it (never implicit TLS).
    pub starttls: bool,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable            | Required | Default                           |
    /// |---------------------|----------|-----------------------------------|
    /// | `SMTP_HOST`         | yes      | --                                |
    /// | `SMTP_PORT`         | no       | `587`                             |
    /// | `SMTP_FROM`         | no       | `Onboard <noreply@onboard.local>` |
    /// | `SMTP_USER`         | no       | --                                |
    /// | `SMTP_PASSWORD`     | no       | --                                |
    /// | `SMTP_TIMEOUT_SECS` | no       | `30`                              |
    /// | `SMTP_STARTTLS`     | no       | `true`                            |
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `var`.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let smtp_host = var("SMTP_HOST").filter(|h| !h.is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: var("SMTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: var("SMTP_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: var("SMTP_USER"),
            smtp_password: var("SMTP_PASSWORD"),
            timeout_secs: var("SMTP_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(DEFAULT_SMTP_TIMEOUT_SECS),
            starttls: var("SMTP_STARTTLS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        })
    }
}

// ---------------------------------------------------------------------------
// MailSender
// ---------------------------------------------------------------------------

/// The `Message-ID` header of a sent email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sends a single email per call.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str)
        -> Result<MessageId, MailDeliveryError>;
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

/// [`MailSender`] over an SMTP relay.
///
/// The connection starts in plaintext and, when [`EmailConfig::starttls`]
/// is set, upgrades with STARTTLS if the server offers it. Implicit TLS is
/// never used.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport from `config`. No connection is opened until the
    /// first send.
    pub fn new(config: &EmailConfig) -> Result<Self, MailDeliveryError> {
        let from: Mailbox = config.from_address.parse()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if config.starttls {
            let tls = TlsParameters::new(config.smtp_host.clone())?;
            builder = builder.tls(Tls::Opportunistic(tls));
        }

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        tracing::info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            starttls = config.starttls,
            from = %from,
            "SMTP mailer configured"
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    /// Assemble a plain-text message with a fresh `Message-ID`.
    fn build_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(Message, MessageId), MailDeliveryError> {
        let to: Mailbox = to.parse()?;
        let message_id = MessageId(format!(
            "<{}@{}>",
            Uuid::new_v4(),
            self.from.email.domain()
        ));

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .message_id(Some(message_id.0.clone()))
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailDeliveryError::Build(e.to_string()))?;

        Ok((message, message_id))
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<MessageId, MailDeliveryError> {
        let (message, message_id) = self.build_message(to, subject, body)?;

        self.transport.send(message).await?;

        tracing::info!(to, message_id = %message_id, "Email sent");
        Ok(message_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
