//! Transport capability consumed by the queue client.
//!
//! A transport performs the five remote operations one-to-one. It reports
//! failures as [`TransportError`]; normalising those into the client's error
//! taxonomy is the client's job, not the transport's.

use crate::error::TransportError;
use crate::message::{MessageBody, MessageId, QueueHandle, QueueName, ReceiptToken, ReceivedMessage};
use crate::provider::ProviderType;
use async_trait::async_trait;
use std::time::Duration;

/// Interface implemented by specific queue transports (SQS, in-memory, ...)
///
/// Implementations must be safe for concurrent use: the client shares one
/// transport between all callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Provision a queue and return its handle
    async fn create_queue(&self, name: &QueueName) -> Result<QueueHandle, TransportError>;

    /// Publish a message
    async fn send_message(
        &self,
        queue: &QueueHandle,
        body: &MessageBody,
    ) -> Result<MessageId, TransportError>;

    /// Wait up to `wait` for at most one message
    async fn receive_message(
        &self,
        queue: &QueueHandle,
        wait: Duration,
    ) -> Result<Option<ReceivedMessage>, TransportError>;

    /// Acknowledge the delivery identified by `receipt`
    async fn delete_message(
        &self,
        queue: &QueueHandle,
        receipt: &ReceiptToken,
    ) -> Result<(), TransportError>;

    /// Remove the queue and all of its messages
    async fn delete_queue(&self, queue: &QueueHandle) -> Result<(), TransportError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// Largest message body, in bytes, the transport accepts
    fn max_message_size(&self) -> usize {
        self.provider_type().max_message_size()
    }

    /// Release the underlying connection. Called at most once by the client.
    fn release(&self) -> Result<(), TransportError>;
}
