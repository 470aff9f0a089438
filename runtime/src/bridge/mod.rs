//! Async Event Bridge: request/response over asynchronous transports.
//!
//! Two patterns share one rule: bounded polling at a fixed interval under a
//! fixed timeout, with no backoff. The wait is a `tokio::time::interval` inside
//! `tokio::time::timeout`, so dropping the caller's future (client disconnect,
//! request timeout) cancels it. The in-flight publish or execution is never
//! cancelled on timeout; it is simply abandoned.
//!
//! - [`PubSubBridge`]: publish `{correlation_id, ...}`, pull until the reply
//!   with the same correlation id shows up (504 on timeout)
//! - [`WorkflowBridge`]: start an execution, poll it to a terminal state
//!   (408 on timeout)

mod pubsub;
mod workflow;

pub use pubsub::PubSubBridge;
pub use workflow::WorkflowBridge;

/// Reply error texts that mean "no such resource".
const NOT_FOUND_MARKERS: [&str; 2] = ["not found", "does not exist"];

fn is_not_found(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    NOT_FOUND_MARKERS.iter().any(|marker| message.contains(marker))
}
