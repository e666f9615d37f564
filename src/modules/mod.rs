//! Cross-cutting services module
//!
//! Observability hooks around the solve lifecycle.

pub mod events;

pub use events::{
    EventDispatcher, EventHandler, FailedEvent, LoggingHandler, PolledEvent, SolveEvent,
    SolvedEvent, SubmittedEvent,
};
