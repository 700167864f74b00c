//! Queue client façade and factory.
//!
//! [`QueueClient`] validates inputs, applies deadlines and cancellation, and
//! normalises transport failures. It keeps no queue or message state of its
//! own; the only state is the one-way `closed` flag.

use crate::error::{ConfigurationError, QueueError, TransportError};
use crate::message::{MessageBody, QueueHandle, QueueName, ReceiptToken, ReceivedMessage};
use crate::provider::{ClientConfig, InMemoryConfig, ProviderConfig, ProviderType};
use crate::providers::{InMemoryTransport, SqsTransport};
use crate::transport::QueueTransport;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

// ============================================================================
// Operation Context
// ============================================================================

/// Caller-supplied deadline and cancellation signal for one operation
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    timeout: Option<Duration>,
    cancellation: Option<CancellationToken>,
}

impl OperationContext {
    /// Create a context that falls back to the client's configured deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the operation with `Timeout` once `timeout` has elapsed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abort the operation with `Cancelled` once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

// ============================================================================
// Queue Client
// ============================================================================

/// Minimal, safe façade over a remote at-least-once message queue.
///
/// The client is `Send + Sync` and may be shared between tasks behind an
/// [`Arc`]; concurrent calls are independent remote calls with no ordering
/// between them. Dropping the client releases the transport.
pub struct QueueClient {
    transport: Box<dyn QueueTransport>,
    config: ClientConfig,
    closed: AtomicBool,
}

impl QueueClient {
    /// Create new queue client that owns `transport`
    pub fn new(transport: Box<dyn QueueTransport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Get provider type
    pub fn provider_type(&self) -> ProviderType {
        self.transport.provider_type()
    }

    /// Configuration the client was created with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Provision a queue and return its handle
    pub async fn create_queue(&self, name: impl AsRef<str>) -> Result<QueueHandle, QueueError> {
        self.create_queue_with_context(name, &OperationContext::default())
            .await
    }

    #[instrument(skip_all, fields(operation = "create_queue", queue_name = %name.as_ref()))]
    pub async fn create_queue_with_context(
        &self,
        name: impl AsRef<str>,
        context: &OperationContext,
    ) -> Result<QueueHandle, QueueError> {
        self.ensure_open("create_queue")?;
        let name = QueueName::new(name.as_ref())?;

        let handle = self
            .guard("create_queue", context, self.transport.create_queue(&name))
            .await?;

        info!(queue = %handle, "Queue created");
        Ok(handle)
    }

    /// Publish a message. Delivery is at-least-once.
    ///
    /// A transport error does not prove the message was not accepted, so
    /// consumers must tolerate duplicates.
    pub async fn send_message(
        &self,
        queue: impl AsRef<str>,
        body: impl AsRef<str>,
    ) -> Result<(), QueueError> {
        self.send_message_with_context(queue, body, &OperationContext::default())
            .await
    }

    #[instrument(skip_all, fields(operation = "send_message", queue = %queue.as_ref()))]
    pub async fn send_message_with_context(
        &self,
        queue: impl AsRef<str>,
        body: impl AsRef<str>,
        context: &OperationContext,
    ) -> Result<(), QueueError> {
        self.ensure_open("send_message")?;
        let queue = QueueHandle::new(queue.as_ref())?;
        let body = MessageBody::new(body.as_ref())?;
        body.ensure_max_size(self.transport.max_message_size())?;

        let message_id = self
            .guard(
                "send_message",
                context,
                self.transport.send_message(&queue, &body),
            )
            .await?;

        debug!(message_id = %message_id, size = body.len(), "Message sent");
        Ok(())
    }

    /// Wait up to the configured receive wait for at most one message.
    ///
    /// `Ok(None)` means the queue had nothing to deliver within the wait.
    pub async fn receive_message(
        &self,
        queue: impl AsRef<str>,
    ) -> Result<Option<ReceivedMessage>, QueueError> {
        self.receive_message_with_context(queue, &OperationContext::default())
            .await
    }

    #[instrument(skip_all, fields(operation = "receive_message", queue = %queue.as_ref()))]
    pub async fn receive_message_with_context(
        &self,
        queue: impl AsRef<str>,
        context: &OperationContext,
    ) -> Result<Option<ReceivedMessage>, QueueError> {
        self.ensure_open("receive_message")?;
        let queue = QueueHandle::new(queue.as_ref())?;
        let wait = self.config.receive_wait();

        let received = self
            .guard(
                "receive_message",
                context,
                self.transport.receive_message(&queue, wait),
            )
            .await?;

        match received {
            Some(ref message) => debug!(
                message_id = %message.message_id,
                delivery_count = message.delivery_count,
                "Message received"
            ),
            None => debug!(wait_ms = wait.as_millis() as u64, "No message available"),
        }

        Ok(received)
    }

    /// Acknowledge the delivery identified by `receipt`
    pub async fn delete_message(
        &self,
        queue: impl AsRef<str>,
        receipt: impl AsRef<str>,
    ) -> Result<(), QueueError> {
        self.delete_message_with_context(queue, receipt, &OperationContext::default())
            .await
    }

    #[instrument(skip_all, fields(operation = "delete_message", queue = %queue.as_ref()))]
    pub async fn delete_message_with_context(
        &self,
        queue: impl AsRef<str>,
        receipt: impl AsRef<str>,
        context: &OperationContext,
    ) -> Result<(), QueueError> {
        self.ensure_open("delete_message")?;
        let queue = QueueHandle::new(queue.as_ref())?;
        let receipt = ReceiptToken::new(receipt.as_ref())?;

        self.guard(
            "delete_message",
            context,
            self.transport.delete_message(&queue, &receipt),
        )
        .await?;

        debug!("Message deleted");
        Ok(())
    }

    /// Irreversibly remove the queue and its undelivered messages
    pub async fn delete_queue(&self, queue: impl AsRef<str>) -> Result<(), QueueError> {
        self.delete_queue_with_context(queue, &OperationContext::default())
            .await
    }

    #[instrument(skip_all, fields(operation = "delete_queue", queue = %queue.as_ref()))]
    pub async fn delete_queue_with_context(
        &self,
        queue: impl AsRef<str>,
        context: &OperationContext,
    ) -> Result<(), QueueError> {
        self.ensure_open("delete_queue")?;
        let queue = QueueHandle::new(queue.as_ref())?;

        self.guard("delete_queue", context, self.transport.delete_queue(&queue))
            .await?;

        info!(queue = %queue, "Queue deleted");
        Ok(())
    }

    /// Release the transport. Safe to call any number of times; never fails.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Queue client already closed");
            return;
        }

        match self.transport.release() {
            Ok(()) => info!(provider = %self.transport.provider_type(), "Queue client closed"),
            Err(e) => warn!(error = %e, "Failed to release queue transport"),
        }
    }

    /// Run `body` against this client and close it on every exit path.
    ///
    /// The client is closed when `body` completes, when it panics, and when
    /// the returned future is dropped before completion.
    pub async fn scoped<F, Fut, T>(self, body: F) -> T
    where
        F: FnOnce(Arc<QueueClient>) -> Fut,
        Fut: Future<Output = T>,
    {
        let client = Arc::new(self);
        let _guard = CloseGuard {
            client: Arc::clone(&client),
        };

        body(client).await
    }

    fn ensure_open(&self, operation: &str) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed {
                operation: operation.to_string(),
            });
        }

        Ok(())
    }

    /// Drive a transport call under the context's deadline and cancellation
    async fn guard<T, F>(
        &self,
        operation: &str,
        context: &OperationContext,
        call: F,
    ) -> Result<T, QueueError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let deadline = context.timeout.or_else(|| self.config.operation_timeout());

        let bounded = async {
            match deadline {
                Some(duration) => match tokio::time::timeout(duration, call).await {
                    Ok(result) => result.map_err(QueueError::from),
                    Err(_) => Err(QueueError::Timeout {
                        operation: operation.to_string(),
                        duration,
                    }),
                },
                None => call.await.map_err(QueueError::from),
            }
        };

        let result = match context.cancellation {
            Some(ref token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(QueueError::Cancelled {
                    operation: operation.to_string(),
                }),
                result = bounded => result,
            },
            None => bounded.await,
        };

        if let Err(ref e) = result {
            warn!(operation, kind = ?e.kind(), error = %e, "Queue operation failed");
        }

        result
    }
}

impl Drop for QueueClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for QueueClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueClient")
            .field("provider", &self.transport.provider_type())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Closes the client when the enclosing scope is left
struct CloseGuard {
    client: Arc<QueueClient>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.client.close();
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Factory for creating queue clients with appropriate transports
pub struct QueueClientFactory;

impl QueueClientFactory {
    /// Create queue client from configuration
    pub fn create_client(config: ClientConfig) -> Result<QueueClient, QueueError> {
        config.validate()?;

        let transport: Box<dyn QueueTransport> = match config.provider {
            ProviderConfig::InMemory(ref memory_config) => {
                Box::new(InMemoryTransport::new(memory_config.clone()))
            }
            ProviderConfig::AwsSqs(ref sqs_config) => Box::new(
                SqsTransport::new(sqs_config.clone()).map_err(|e| {
                    ConfigurationError::Invalid {
                        message: e.to_string(),
                    }
                })?,
            ),
        };

        info!(provider = %transport.provider_type(), "Queue client created");
        Ok(QueueClient::new(transport, config))
    }

    /// Create test client with in-memory transport
    pub fn create_test_client() -> QueueClient {
        let transport = InMemoryTransport::new(InMemoryConfig::default());
        QueueClient::new(Box::new(transport), ClientConfig::default())
    }
}
