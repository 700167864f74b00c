//! In-memory queue transport for testing and development.
//!
//! This module provides a fully functional in-memory queue that:
//! - Implements visibility timeouts and message retention
//! - Issues single-use receipt tokens per delivery
//! - Supports bounded receive waits woken by new messages
//! - Provides thread-safe concurrent access
//!
//! Cloning an [`InMemoryTransport`] yields another handle onto the same
//! storage, which lets tests keep observing a transport after handing it to
//! a client.

use crate::error::TransportError;
use crate::message::{
    MessageBody, MessageId, QueueHandle, QueueName, ReceiptToken, ReceivedMessage, Timestamp,
};
use crate::provider::{InMemoryConfig, ProviderType};
use crate::transport::QueueTransport;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

const PROVIDER: &str = "InMemory";

/// Prefix of every handle issued by this transport
pub const HANDLE_PREFIX: &str = "memory://queues/";

/// Upper bound between availability checks while a receive is waiting.
/// Sends wake waiters directly; the poll catches delayed and expired messages.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Thread-safe storage for all queues
#[derive(Default)]
struct QueueStorage {
    queues: HashMap<QueueHandle, InMemoryQueue>,
}

/// Internal queue state for a single queue
#[derive(Default)]
struct InMemoryQueue {
    /// Messages waiting for delivery
    ready: VecDeque<StoredMessage>,
    /// Deliveries currently hidden from other receivers, keyed by receipt
    in_flight: HashMap<ReceiptToken, InFlightMessage>,
}

impl InMemoryQueue {
    fn len(&self) -> usize {
        self.ready.len() + self.in_flight.len()
    }

    /// Return deliveries whose visibility window lapsed to the ready queue
    fn restore_expired_deliveries(&mut self, now: &Timestamp) {
        let expired: Vec<ReceiptToken> = self
            .in_flight
            .iter()
            .filter(|(_, delivery)| *now >= delivery.visible_until)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(delivery) = self.in_flight.remove(&receipt) {
                debug!(message_id = %delivery.message.message_id, "Visibility timeout lapsed");
                self.ready.push_back(delivery.message);
            }
        }
    }

    /// Drop messages past retention, including ones still in flight
    fn discard_expired_messages(&mut self, now: &Timestamp) {
        self.ready.retain(|message| !message.is_expired(now));
        self.in_flight
            .retain(|_, delivery| !delivery.message.is_expired(now));
    }

    /// Bring the queue up to date with `now` before it is inspected
    fn prune(&mut self, now: &Timestamp) {
        self.restore_expired_deliveries(now);
        self.discard_expired_messages(now);
    }

    /// Hide the first available message and hand out a fresh receipt for it
    fn take_next(&mut self, now: &Timestamp, visibility: Duration) -> Option<ReceivedMessage> {
        self.prune(now);

        let position = self
            .ready
            .iter()
            .position(|message| message.is_available(now))?;
        let mut message = self.ready.remove(position)?;
        message.delivery_count += 1;

        let receipt = ReceiptToken::generate();
        let visible_until = now.plus(visibility);
        let received = ReceivedMessage {
            message_id: message.message_id.clone(),
            body: message.body.clone(),
            receipt: receipt.clone(),
            delivery_count: message.delivery_count,
            received_at: now.clone(),
            visible_until: Some(visible_until.clone()),
        };

        self.in_flight.insert(
            receipt,
            InFlightMessage {
                message,
                visible_until,
            },
        );

        Some(received)
    }
}

/// A message stored in the queue with metadata
#[derive(Clone)]
struct StoredMessage {
    message_id: MessageId,
    body: MessageBody,
    available_at: Timestamp,
    expires_at: Timestamp,
    delivery_count: u32,
}

impl StoredMessage {
    fn new(body: MessageBody, config: &InMemoryConfig) -> Self {
        let now = Timestamp::now();
        Self {
            message_id: MessageId::new(),
            body,
            available_at: now.plus(config.delivery_delay()),
            expires_at: now.plus(config.message_retention()),
            delivery_count: 0,
        }
    }

    /// Check if message outlived the retention period
    fn is_expired(&self, now: &Timestamp) -> bool {
        *now >= self.expires_at
    }

    /// Check if message is available for receiving
    fn is_available(&self, now: &Timestamp) -> bool {
        *now >= self.available_at
    }
}

/// A message currently being processed
struct InFlightMessage {
    message: StoredMessage,
    visible_until: Timestamp,
}

// ============================================================================
// InMemoryTransport
// ============================================================================

/// In-memory queue transport implementation
#[derive(Clone)]
pub struct InMemoryTransport {
    storage: Arc<RwLock<QueueStorage>>,
    config: InMemoryConfig,
    arrivals: Arc<Notify>,
    released: Arc<AtomicBool>,
    operations: Arc<AtomicUsize>,
}

impl InMemoryTransport {
    /// Create new in-memory transport with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(QueueStorage::default())),
            config,
            arrivals: Arc::new(Notify::new()),
            released: Arc::new(AtomicBool::new(false)),
            operations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of queue operations that reached this transport
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Messages held by a queue, visible or in flight
    pub fn queue_depth(&self, queue: &QueueHandle) -> Option<usize> {
        let mut storage = self.write().ok()?;
        let queue_state = storage.queues.get_mut(queue)?;
        queue_state.prune(&Timestamp::now());
        Some(queue_state.len())
    }

    /// Check whether `release` has been called
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), TransportError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.ensure_not_released()
    }

    fn ensure_not_released(&self) -> Result<(), TransportError> {
        if self.is_released() {
            return Err(TransportError::new(
                PROVIDER,
                "TransportReleased",
                "the transport has been released",
            ));
        }

        Ok(())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, QueueStorage>, TransportError> {
        self.storage.write().map_err(|_| poisoned())
    }

    fn try_receive(&self, queue: &QueueHandle) -> Result<Option<ReceivedMessage>, TransportError> {
        self.ensure_not_released()?;

        let mut storage = self.write()?;
        let queue_state = storage
            .queues
            .get_mut(queue)
            .ok_or_else(|| queue_not_found(queue))?;

        Ok(queue_state.take_next(&Timestamp::now(), self.config.visibility_timeout()))
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

fn queue_not_found(queue: &QueueHandle) -> TransportError {
    TransportError::new(
        PROVIDER,
        "QueueDoesNotExist",
        format!("The specified queue does not exist: {}", queue),
    )
}

fn poisoned() -> TransportError {
    TransportError::new(PROVIDER, "StoragePoisoned", "queue storage lock poisoned")
}

#[async_trait]
impl QueueTransport for InMemoryTransport {
    async fn create_queue(&self, name: &QueueName) -> Result<QueueHandle, TransportError> {
        self.begin()?;

        let handle = QueueHandle::new(format!("{}{}", HANDLE_PREFIX, name))
            .map_err(|e| TransportError::new(PROVIDER, "InvalidParameterValue", e.to_string()))?;

        let mut storage = self.write()?;
        if storage.queues.contains_key(&handle) {
            debug!(queue = %handle, "Queue already exists, returning existing handle");
        } else {
            storage.queues.insert(handle.clone(), InMemoryQueue::default());
        }

        Ok(handle)
    }

    async fn send_message(
        &self,
        queue: &QueueHandle,
        body: &MessageBody,
    ) -> Result<MessageId, TransportError> {
        self.begin()?;

        let message = StoredMessage::new(body.clone(), &self.config);
        let message_id = message.message_id.clone();

        {
            let mut storage = self.write()?;
            let queue_state = storage
                .queues
                .get_mut(queue)
                .ok_or_else(|| queue_not_found(queue))?;

            queue_state.prune(&Timestamp::now());
            if queue_state.len() >= self.config.max_queue_size {
                return Err(TransportError::new(
                    PROVIDER,
                    "QueueFull",
                    format!(
                        "queue {} holds the maximum of {} messages",
                        queue, self.config.max_queue_size
                    ),
                )
                .transient());
            }

            queue_state.ready.push_back(message);
        }

        self.arrivals.notify_waiters();
        Ok(message_id)
    }

    async fn receive_message(
        &self,
        queue: &QueueHandle,
        wait: Duration,
    ) -> Result<Option<ReceivedMessage>, TransportError> {
        self.begin()?;

        let deadline = tokio::time::Instant::now() + wait;
        loop {
            // Register interest before checking so a concurrent send is not missed
            let arrival = self.arrivals.notified();

            if let Some(message) = self.try_receive(queue)? {
                return Ok(Some(message));
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let pause = (deadline - now).min(POLL_INTERVAL);
            let _ = tokio::time::timeout(pause, arrival).await;
        }
    }

    async fn delete_message(
        &self,
        queue: &QueueHandle,
        receipt: &ReceiptToken,
    ) -> Result<(), TransportError> {
        self.begin()?;

        let mut storage = self.write()?;
        let queue_state = storage
            .queues
            .get_mut(queue)
            .ok_or_else(|| queue_not_found(queue))?;

        if queue_state.in_flight.remove(receipt).is_none() {
            debug!(queue = %queue, "Receipt is stale or already used, ignoring");
        }

        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueHandle) -> Result<(), TransportError> {
        self.begin()?;

        let removed = self.write()?.queues.remove(queue);
        if removed.is_none() {
            return Err(queue_not_found(queue));
        }

        // Waiting receivers observe the deletion on their next check
        self.arrivals.notify_waiters();
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }

    fn release(&self) -> Result<(), TransportError> {
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}
