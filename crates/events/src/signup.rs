//! Welcome email workflow for `user/signup` events.
//!
//! [`WelcomeEmailHandler`] runs two steps per event:
//!
//! 1. `get-user-email` -- resolve the user through the [`UserDirectory`].
//!    A missing user is non-retriable: the account is gone and asking again
//!    will not bring it back.
//! 2. `send-welcome-email` -- send the fixed welcome message through the
//!    [`MailSender`]. Transport faults are retried under the handler's
//!    [`RetryPolicy`].
//!
//! Every failure ends as `{ success: false }`; nothing propagates to the
//! bus or to the request that published the event.

use std::sync::Arc;

use async_trait::async_trait;
use onboard_core::event_types::EVENT_USER_SIGNUP;
use onboard_db::models::user::User;
use serde::{Deserialize, Serialize};

use crate::bus::{EventHandler, PlatformEvent, WorkflowResult};
use crate::delivery::email::{MailSender, MessageId};
use crate::directory::UserDirectory;
use crate::workflow::{run_step, RetryPolicy, StepError, StepFailure};

/// Subject line of the welcome email.
pub const WELCOME_SUBJECT: &str = "Welcome to the app";

/// Body of the welcome email.
pub const WELCOME_BODY: &str = "Hi,\n\n\
Thanks for signing up. We are glad to have you onboard..!!!\n";

/// Handler name used in logs and registration.
pub const HANDLER_NAME: &str = "on-user-signup";

const STEP_GET_USER: &str = "get-user-email";
const STEP_SEND_WELCOME: &str = "send-welcome-email";

// ---------------------------------------------------------------------------
// SignupEvent
// ---------------------------------------------------------------------------

/// Payload of a `user/signup` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupEvent {
    pub email: String,
}

impl SignupEvent {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }

    /// Decode the payload of a published event.
    pub fn from_event(event: &PlatformEvent) -> Result<Self, serde_json::Error> {
        Self::deserialize(&event.data)
    }
}

impl From<SignupEvent> for PlatformEvent {
    fn from(signup: SignupEvent) -> Self {
        PlatformEvent::new(EVENT_USER_SIGNUP).with_data(serde_json::json!({ "email": signup.email }))
    }
}

// ---------------------------------------------------------------------------
// WelcomeEmailHandler
// ---------------------------------------------------------------------------

/// Sends a welcome email to every newly registered user.
pub struct WelcomeEmailHandler {
    directory: Arc<dyn UserDirectory>,
    mailer: Arc<dyn MailSender>,
    policy: RetryPolicy,
}

impl WelcomeEmailHandler {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        mailer: Arc<dyn MailSender>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            directory,
            mailer,
            policy,
        }
    }

    /// Run the workflow for one signup to a terminal result.
    pub async fn run(&self, signup: &SignupEvent) -> WorkflowResult {
        match self.execute(signup).await {
            Ok(message_id) => {
                tracing::info!(
                    email = %signup.email,
                    message_id = %message_id,
                    "Welcome email delivered"
                );
                WorkflowResult::succeeded()
            }
            Err(failure) => {
                tracing::error!(
                    email = %signup.email,
                    step = %failure.step,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "Signup workflow failed"
                );
                WorkflowResult::failed()
            }
        }
    }

    async fn execute(&self, signup: &SignupEvent) -> Result<MessageId, StepFailure> {
        let user = run_step(STEP_GET_USER, &self.policy, || {
            self.resolve_user(&signup.email)
        })
        .await?;

        run_step(STEP_SEND_WELCOME, &self.policy, || {
            self.send_welcome(&user.email)
        })
        .await
    }

    async fn resolve_user(&self, email: &str) -> Result<User, StepError> {
        match self.directory.find_by_email(email).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(StepError::NonRetriable(
                "User no longer exists in our database".into(),
            )),
            Err(e) => Err(StepError::Retriable(e.to_string())),
        }
    }

    async fn send_welcome(&self, to: &str) -> Result<MessageId, StepError> {
        self.mailer
            .send(to, WELCOME_SUBJECT, WELCOME_BODY)
            .await
            .map_err(|e| {
                if e.is_transient() {
                    StepError::Retriable(e.to_string())
                } else {
                    StepError::NonRetriable(e.to_string())
                }
            })
    }
}

#[async_trait]
impl EventHandler for WelcomeEmailHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    async fn handle(&self, event: &PlatformEvent) -> WorkflowResult {
        match SignupEvent::from_event(event) {
            Ok(signup) => {
                tracing::debug!(
                    email = %signup.email,
                    user_id = ?event.actor_user_id,
                    "Handling signup event"
                );
                self.run(&signup).await
            }
            Err(e) => {
                tracing::error!(
                    event_type = %event.event_type,
                    error = %e,
                    "Malformed signup event payload"
                );
                WorkflowResult::failed()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::delivery::email::MailDeliveryError;
    use crate::directory::DirectoryError;

    fn user(email: &str) -> User {
        let now = chrono::Utc::now();
        User {
            id: 1,
            email: email.to_string(),
            password_hash: "$argon2id$test".to_string(),
            role: "user".to_string(),
            skills: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    /// Directory over a fixed set of users that fails the first
    /// `failures` lookups.
    struct FakeDirectory {
        users: HashMap<String, User>,
        failures: u32,
        lookups: AtomicU32,
    }

    impl FakeDirectory {
        fn with(emails: &[&str]) -> Self {
            Self {
                users: emails.iter().map(|e| (e.to_string(), user(e))).collect(),
                failures: 0,
                lookups: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl UserDirectory for FakeDirectory {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
            let n = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err(DirectoryError::Unavailable("connection reset".into()));
            }
            Ok(self.users.get(email).cloned())
        }
    }

    enum Failure {
        Transient,
        Permanent,
    }

    /// Mailer that fails the first `failures` attempts, then records sends.
    struct ScriptedMailer {
        failures: u32,
        failure: Failure,
        attempts: AtomicU32,
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl ScriptedMailer {
        fn failing(failures: u32, failure: Failure) -> Self {
            Self {
                failures,
                failure,
                attempts: AtomicU32::new(0),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn healthy() -> Self {
            Self::failing(0, Failure::Transient)
        }

        fn sent(&self) -> Vec<(String, String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailSender for ScriptedMailer {
        async fn send(
            &self,
            to: &str,
            subject: &str,
            body: &str,
        ) -> Result<MessageId, MailDeliveryError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err(match self.failure {
                    Failure::Transient => MailDeliveryError::Unavailable("421 try later".into()),
                    Failure::Permanent => MailDeliveryError::Build("bad message".into()),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(MessageId::new(format!("<{n}@test>")))
        }
    }

    fn handler(
        directory: Arc<FakeDirectory>,
        mailer: Arc<ScriptedMailer>,
    ) -> WelcomeEmailHandler {
        WelcomeEmailHandler::new(directory, mailer, RetryPolicy::immediate(2))
    }

    #[tokio::test]
    async fn existing_user_receives_exactly_one_welcome_email() {
        let directory = Arc::new(FakeDirectory::with(&["ada@example.com"]));
        let mailer = Arc::new(ScriptedMailer::healthy());

        let result = handler(directory.clone(), mailer.clone())
            .run(&SignupEvent::new("ada@example.com"))
            .await;

        assert_eq!(result, WorkflowResult::succeeded());
        assert_eq!(
            mailer.sent(),
            vec![(
                "ada@example.com".to_string(),
                WELCOME_SUBJECT.to_string(),
                WELCOME_BODY.to_string()
            )]
        );
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_user_fails_after_a_single_lookup() {
        let directory = Arc::new(FakeDirectory::with(&[]));
        let mailer = Arc::new(ScriptedMailer::healthy());

        let result = handler(directory.clone(), mailer.clone())
            .run(&SignupEvent::new("ghost@example.com"))
            .await;

        assert_eq!(result, WorkflowResult::failed());
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(mailer.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_mail_failures_recover_on_third_attempt() {
        let directory = Arc::new(FakeDirectory::with(&["ada@example.com"]));
        let mailer = Arc::new(ScriptedMailer::failing(2, Failure::Transient));

        let result = handler(directory, mailer.clone())
            .run(&SignupEvent::new("ada@example.com"))
            .await;

        assert_eq!(result, WorkflowResult::succeeded());
        assert_eq!(mailer.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_mail_retries_fail_without_a_send() {
        let directory = Arc::new(FakeDirectory::with(&["ada@example.com"]));
        let mailer = Arc::new(ScriptedMailer::failing(u32::MAX, Failure::Transient));

        let result = handler(directory, mailer.clone())
            .run(&SignupEvent::new("ada@example.com"))
            .await;

        assert_eq!(result, WorkflowResult::failed());
        assert_eq!(mailer.attempts.load(Ordering::SeqCst), 3);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn permanent_mail_failure_is_not_retried() {
        let directory = Arc::new(FakeDirectory::with(&["ada@example.com"]));
        let mailer = Arc::new(ScriptedMailer::failing(u32::MAX, Failure::Permanent));

        let result = handler(directory, mailer.clone())
            .run(&SignupEvent::new("ada@example.com"))
            .await;

        assert_eq!(result, WorkflowResult::failed());
        assert_eq!(mailer.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn directory_outage_is_retried() {
        let mut directory = FakeDirectory::with(&["ada@example.com"]);
        directory.failures = 1;
        let directory = Arc::new(directory);
        let mailer = Arc::new(ScriptedMailer::healthy());

        let result = handler(directory.clone(), mailer.clone())
            .run(&SignupEvent::new("ada@example.com"))
            .await;

        assert_eq!(result, WorkflowResult::succeeded());
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn persistent_directory_outage_exhausts_budget_without_mail() {
        let mut directory = FakeDirectory::with(&["ada@example.com"]);
        directory.failures = u32::MAX;
        let directory = Arc::new(directory);
        let mailer = Arc::new(ScriptedMailer::healthy());

        let result = handler(directory.clone(), mailer.clone())
            .run(&SignupEvent::new("ada@example.com"))
            .await;

        assert_eq!(result, WorkflowResult::failed());
        // retries + 1 lookups under `RetryPolicy::immediate(2)`.
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 3);
        assert_eq!(mailer.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handle_decodes_signup_payload() {
        let directory = Arc::new(FakeDirectory::with(&["ada@example.com"]));
        let mailer = Arc::new(ScriptedMailer::healthy());
        let handler = handler(directory, mailer.clone());

        let event: PlatformEvent = SignupEvent::new("ada@example.com").into();
        assert_eq!(event.event_type, EVENT_USER_SIGNUP);

        assert_eq!(handler.handle(&event).await, WorkflowResult::succeeded());
        assert_eq!(mailer.sent()[0].0, "ada@example.com");
    }

    #[tokio::test]
    async fn malformed_payload_fails_without_lookup() {
        let directory = Arc::new(FakeDirectory::with(&["ada@example.com"]));
        let mailer = Arc::new(ScriptedMailer::healthy());
        let handler = handler(directory.clone(), mailer);

        let event =
            PlatformEvent::new(EVENT_USER_SIGNUP).with_data(serde_json::json!({"mail": 42}));

        assert_eq!(handler.handle(&event).await, WorkflowResult::failed());
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn welcome_body_is_multi_line() {
        assert!(WELCOME_BODY.starts_with("Hi,\n\n"));
        assert!(WELCOME_BODY.contains("Thanks for signing up."));
    }
}
