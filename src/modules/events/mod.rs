//! Event system for the solve lifecycle.
//!
//! Provides hooks for logging and custom reactions around task submission,
//! polling, and completion. Handlers only observe; the outcome of a solve
//! call is always returned to its caller.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Task accepted by the remote service.
#[derive(Debug, Clone)]
pub struct SubmittedEvent {
    pub provider: &'static str,
    pub task_type: String,
    pub task_id: String,
    pub timestamp: DateTime<Utc>,
}

/// One result poll completed without error.
#[derive(Debug, Clone)]
pub struct PolledEvent {
    pub provider: &'static str,
    pub task_id: String,
    pub attempt: usize,
    pub ready: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SolvedEvent {
    pub provider: &'static str,
    pub task_id: String,
    pub polls: usize,
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FailedEvent {
    pub provider: &'static str,
    pub task_id: Option<String>,
    pub error: String,
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum SolveEvent {
    Submitted(SubmittedEvent),
    Polled(PolledEvent),
    Solved(SolvedEvent),
    Failed(FailedEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &SolveEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Dispatcher with the [`LoggingHandler`] already registered.
    pub fn with_logging() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register_handler(Arc::new(LoggingHandler));
        dispatcher
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: SolveEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &SolveEvent) {
        match event {
            SolveEvent::Submitted(submitted) => {
                log::debug!(
                    "{} -> {} accepted as task {}",
                    submitted.provider,
                    submitted.task_type,
                    submitted.task_id
                );
            }
            SolveEvent::Polled(polled) => {
                log::trace!(
                    "{} poll #{} for task {} ready={}",
                    polled.provider,
                    polled.attempt,
                    polled.task_id,
                    polled.ready
                );
            }
            SolveEvent::Solved(solved) => {
                log::info!(
                    "{} solved task {} after {} polls ({:.2}s)",
                    solved.provider,
                    solved.task_id,
                    solved.polls,
                    solved.elapsed.as_secs_f64()
                );
            }
            SolveEvent::Failed(failed) => {
                // the caller already holds this error
                log::trace!(
                    "{} task {} failed after {:.2}s: {}",
                    failed.provider,
                    failed.task_id.as_deref().unwrap_or("<unsubmitted>"),
                    failed.elapsed.as_secs_f64(),
                    failed.error
                );
            }
        }
    }
}
