//! In-process event dispatcher.
//!
//! [`EventBus`] maps event names to [`EventHandler`]s. Publishing an event
//! spawns one tokio task per registered handler and returns immediately,
//! so the publisher never waits on handler work. The bus is constructed
//! explicitly at startup and shared as `Arc<EventBus>`.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use onboard_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// An immutable notification that something happened.
///
/// Serializes as `{ "eventType": ..., "data": ..., "timestamp": ... }`.
/// Constructed via [`PlatformEvent::new`] and enriched with
/// [`with_data`](PlatformEvent::with_data) and
/// [`with_actor`](PlatformEvent::with_actor).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformEvent {
    /// Event name, e.g. `"user/signup"`. Handlers are routed by exact match.
    pub event_type: String,

    /// Event-specific JSON payload.
    #[serde(default)]
    pub data: serde_json::Value,

    /// Optional id of the user that triggered the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_user_id: Option<DbId>,

    /// When the event was created (UTC).
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    /// Create a new event with an empty object payload.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: serde_json::Value::Object(Default::default()),
            actor_user_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Attach the acting user to the event.
    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Terminal outcome of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowResult {
    pub success: bool,
}

impl WorkflowResult {
    pub const fn succeeded() -> Self {
        Self { success: true }
    }

    pub const fn failed() -> Self {
        Self { success: false }
    }
}

/// A subscriber invoked for every published event of the type it was
/// registered under.
///
/// Implementations must turn every failure into a [`WorkflowResult`];
/// a panic is caught by the bus and reported as a failure.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    async fn handle(&self, event: &PlatformEvent) -> WorkflowResult;
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Receipt returned by [`EventBus::publish`].
///
/// Holds one task handle per dispatched handler, in registration order.
/// Dropping it detaches the tasks; they still run to completion.
#[derive(Debug)]
pub struct Dispatch {
    handles: Vec<JoinHandle<WorkflowResult>>,
}

impl Dispatch {
    fn empty() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Number of handler tasks spawned for the event.
    pub fn handler_count(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every handler task and collect their results.
    pub async fn join(self) -> Vec<WorkflowResult> {
        let mut results = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "Event handler task did not complete");
                    WorkflowResult::failed()
                }
            };
            results.push(result);
        }
        results
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

type HandlerMap = HashMap<String, Vec<Arc<dyn EventHandler>>>;

/// In-process publish/subscribe dispatcher.
///
/// # Usage
///
/// ```ignore
/// let bus = Arc::new(EventBus::new());
/// bus.register("user/signup", Arc::new(handler));
///
/// // Returns as soon as the handler tasks are spawned.
/// bus.publish(PlatformEvent::new("user/signup").with_data(json!({"email": email})));
/// ```
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HandlerMap>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every future event named `event_type`.
    ///
    /// Any number of handlers may share an event type.
    pub fn register(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let event_type = event_type.into();
        tracing::info!(event_type = %event_type, handler = handler.name(), "Registered event handler");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    /// Number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Publish an event to every handler registered for its type.
    ///
    /// Each handler runs on its own task; this call never waits for them.
    /// With no registered handler the event is dropped. Outside a tokio
    /// runtime nothing can be spawned, so the event is dropped as well.
    pub fn publish(&self, event: PlatformEvent) -> Dispatch {
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            tracing::debug!(event_type = %event.event_type, "No handlers registered, event dropped");
            return Dispatch::empty();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                event_type = %event.event_type,
                "Published outside a tokio runtime, event dropped"
            );
            return Dispatch::empty();
        };

        let event = Arc::new(event);
        let handles = handlers
            .into_iter()
            .map(|handler| runtime.spawn(run_handler(handler, Arc::clone(&event))))
            .collect();

        Dispatch { handles }
    }
}

/// Run one handler to completion, converting a panic into a failed result.
async fn run_handler(handler: Arc<dyn EventHandler>, event: Arc<PlatformEvent>) -> WorkflowResult {
    match AssertUnwindSafe(handler.handle(&event)).catch_unwind().await {
        Ok(result) => {
            tracing::info!(
                handler = handler.name(),
                event_type = %event.event_type,
                success = result.success,
                "Event handler finished"
            );
            result
        }
        Err(_) => {
            tracing::error!(
                handler = handler.name(),
                event_type = %event.event_type,
                "Event handler panicked"
            );
            WorkflowResult::failed()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
