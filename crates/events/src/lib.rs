//! Onboard event bus and signup side-effect pipeline.
//!
//! - [`EventBus`] -- in-process publish/subscribe dispatcher; every handler
//!   invocation runs on its own tokio task.
//! - [`PlatformEvent`] -- the canonical event envelope.
//! - [`SignupEvent`] -- typed payload of `user/signup`.
//! - [`workflow`] -- step runner with retriable / non-retriable errors.
//! - [`UserDirectory`] -- user lookup seam, backed by Postgres in production.
//! - [`delivery`] -- SMTP mail sender.
//! - [`WelcomeEmailHandler`] -- turns a signup event into a welcome email.

pub mod bus;
pub mod delivery;
pub mod directory;
pub mod signup;
pub mod workflow;

pub use bus::{Dispatch, EventBus, EventHandler, PlatformEvent, WorkflowResult};
pub use delivery::email::{EmailConfig, MailDeliveryError, MailSender, MessageId, SmtpMailer};
pub use directory::{DirectoryError, PgUserDirectory, UserDirectory};
pub use signup::{SignupEvent, WelcomeEmailHandler, WELCOME_BODY, WELCOME_SUBJECT};
pub use workflow::{run_step, RetryPolicy, StepError, StepFailure};
