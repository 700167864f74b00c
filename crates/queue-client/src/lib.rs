//! # Queue Client
//!
//! Minimal, safe client for managed at-least-once message queues.
//!
//! This library provides:
//! - Five queue operations: create queue, send, bounded receive, delete by
//!   receipt, delete queue
//! - Local validation of every input before any remote call
//! - Per-operation deadlines and cancellation
//! - Scoped disposal that releases the transport on every exit path
//! - An Amazon SQS transport and an in-memory transport for tests
//!
//! ## Module Organization
//!
//! - [error] - Error taxonomy for all queue operations
//! - [message] - Queue and message identifiers, received messages
//! - [provider] - Provider types and configuration
//! - [transport] - The transport capability consumed by the client
//! - [client] - The client façade and factory
//! - [providers] - Transport implementations
//!
//! ## Example
//!
//! ```no_run
//! use queue_client::QueueClientFactory;
//!
//! # async fn example() -> Result<(), queue_client::QueueError> {
//! let client = QueueClientFactory::create_test_client();
//!
//! let queue = client.create_queue("orders").await?;
//! client.send_message(&queue, "order-42").await?;
//!
//! if let Some(message) = client.receive_message(&queue).await? {
//!     client.delete_message(&queue, &message.receipt).await?;
//! }
//!
//! client.delete_queue(&queue).await?;
//! client.close();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;
pub mod transport;

// Re-export commonly used types at crate root for convenience
pub use client::{OperationContext, QueueClient, QueueClientFactory};
pub use error::{ConfigurationError, ErrorKind, QueueError, TransportError, ValidationError};
pub use message::{
    MessageBody, MessageId, QueueHandle, QueueName, ReceiptToken, ReceivedMessage, Timestamp,
};
pub use provider::{AwsSqsConfig, ClientConfig, InMemoryConfig, ProviderConfig, ProviderType};
pub use providers::{InMemoryTransport, SqsTransport};
pub use transport::QueueTransport;

pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
