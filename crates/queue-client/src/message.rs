//! Message types for queue operations including core domain identifiers.
//!
//! Every identifier the client accepts from callers is wrapped in a type that
//! can only be constructed from a non-empty value. Validation happens here,
//! before any transport call is made.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Name requested when provisioning a queue
///
/// Only emptiness is checked locally; provider-specific naming rules are
/// enforced by the remote service and surface as transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        require_non_empty("queue_name", &name)?;
        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Opaque address of a provisioned queue
///
/// Returned by `create_queue` and passed back, unmodified, to every other
/// operation on the same queue. For SQS this is the queue URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueHandle(String);

impl QueueHandle {
    /// Create new queue handle with validation
    pub fn new(handle: impl Into<String>) -> Result<Self, ValidationError> {
        let handle = handle.into();
        require_non_empty("queue", &handle)?;
        Ok(Self(handle))
    }

    /// Get queue handle as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for QueueHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueHandle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Text payload of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBody(String);

impl MessageBody {
    /// Create new message body with validation
    pub fn new(body: impl Into<String>) -> Result<Self, ValidationError> {
        let body = body.into();
        require_non_empty("body", &body)?;
        Ok(Self(body))
    }

    /// Reject bodies larger than the given byte limit
    pub fn ensure_max_size(&self, max_size: usize) -> Result<(), ValidationError> {
        if self.0.len() > max_size {
            return Err(ValidationError::OutOfRange {
                field: "body".to_string(),
                message: format!("{} bytes exceeds maximum of {}", self.0.len(), max_size),
            });
        }

        Ok(())
    }

    /// Get message body as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Size of the body in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: empty bodies cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the body and return the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for MessageBody {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-time token identifying a specific delivery of a message
///
/// Valid only for the visibility window of the receive that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptToken(String);

impl ReceiptToken {
    /// Create new receipt token with validation
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        require_non_empty("receipt", &token)?;
        Ok(Self(token))
    }

    /// Generate a fresh random receipt token
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get receipt token as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ReceiptToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReceiptToken {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifier assigned to a message by the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        require_non_empty("message_id", s)?;
        Ok(Self(s.to_string()))
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Timestamp offset from this one by a std duration
    pub fn plus(&self, offset: std::time::Duration) -> Self {
        let delta = chrono::Duration::from_std(offset).unwrap_or(chrono::Duration::MAX);
        Self(
            self.0
                .checked_add_signed(delta)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = s.parse::<DateTime<Utc>>()?;
        Ok(Self::from_datetime(dt))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// A single delivery of a message returned by `receive_message`
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub body: MessageBody,
    pub receipt: ReceiptToken,
    /// Number of times this message has been delivered, starting at 1
    pub delivery_count: u32,
    pub received_at: Timestamp,
    /// End of the visibility window, when the transport reports it
    pub visible_until: Option<Timestamp>,
}

impl ReceivedMessage {
    /// Check whether the visibility window of this delivery has lapsed
    pub fn is_visibility_expired(&self) -> bool {
        match self.visible_until {
            Some(ref until) => Timestamp::now() >= *until,
            None => false,
        }
    }

    /// Check whether this delivery is a redelivery
    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
