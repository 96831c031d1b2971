//! Delivery
//!
//! Outbound side of the signal backtesting bot: bounded-retry policy for
//! collaborator HTTP calls, per-subscriber result notification, and
//! best-effort LLM annotation of winning strategies.

pub mod annotator;
pub mod format;
pub mod notifier;
pub mod retry;

pub use annotator::LlmAnnotator;
pub use format::{outcome_message, placeholder_annotation};
pub use notifier::{DeliveryReport, Subscriber, SubscriberChannel, SubscriberNotifier};
pub use retry::RetryPolicy;
