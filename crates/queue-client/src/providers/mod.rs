//! Queue transport implementations.
//!
//! This module contains concrete implementations of the `QueueTransport`
//! trait for different queue backends.

pub mod memory;
pub mod sqs;

pub use memory::{InMemoryTransport, HANDLE_PREFIX};
pub use sqs::SqsTransport;
