//! Tests for message types.

use super::*;
use std::time::Duration;

#[test]
fn test_identifiers_reject_empty_values() {
    assert!(QueueName::new("").is_err());
    assert!(QueueHandle::new("").is_err());
    assert!(MessageBody::new("").is_err());
    assert!(ReceiptToken::new("").is_err());
    assert!("".parse::<MessageId>().is_err());
}

#[test]
fn test_identifiers_accept_any_non_empty_value() {
    // Provider naming rules are not enforced locally
    assert!(QueueName::new("orders").is_ok());
    assert!(QueueName::new("orders.fifo").is_ok());
    assert!(QueueName::new(" ").is_ok());
    assert!(QueueHandle::new("https://sqs.us-east-1.amazonaws.com/123456789012/orders").is_ok());
    assert!(ReceiptToken::new("AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a").is_ok());
}

#[test]
fn test_empty_value_reports_field() {
    match ReceiptToken::new("") {
        Err(ValidationError::Required { field }) => assert_eq!(field, "receipt"),
        other => panic!("Expected Required error, got: {:?}", other),
    }
}

#[test]
fn test_message_body_size_limit() {
    let body = MessageBody::new("x".repeat(16)).unwrap();

    assert!(body.ensure_max_size(16).is_ok());
    assert!(matches!(
        body.ensure_max_size(15),
        Err(ValidationError::OutOfRange { .. })
    ));
}

#[test]
fn test_message_id_generation() {
    let id1 = MessageId::new();
    let id2 = MessageId::new();
    assert_ne!(id1, id2);
    assert!(!id1.as_str().is_empty());
}

#[test]
fn test_timestamp_plus() {
    let start = Timestamp::now();
    let later = start.plus(Duration::from_secs(30));

    assert!(later > start);
    assert_eq!(
        (later.as_datetime() - start.as_datetime()).num_seconds(),
        30
    );
}

#[test]
fn test_received_message_visibility() {
    let received = ReceivedMessage {
        message_id: MessageId::new(),
        body: MessageBody::new("order-42").unwrap(),
        receipt: ReceiptToken::new("receipt").unwrap(),
        delivery_count: 2,
        received_at: Timestamp::now(),
        visible_until: Some(Timestamp::now().plus(Duration::from_secs(300))),
    };

    assert!(!received.is_visibility_expired());
    assert!(received.is_redelivery());
}

#[test]
fn test_received_message_serializes_as_plain_strings() {
    let received = ReceivedMessage {
        message_id: "m-1".parse().unwrap(),
        body: MessageBody::new("order-42").unwrap(),
        receipt: ReceiptToken::new("r-1").unwrap(),
        delivery_count: 1,
        received_at: Timestamp::now(),
        visible_until: None,
    };

    let json = serde_json::to_value(&received).unwrap();
    assert_eq!(json["body"], "order-42");
    assert_eq!(json["receipt"], "r-1");
    assert_eq!(json["message_id"], "m-1");
}
