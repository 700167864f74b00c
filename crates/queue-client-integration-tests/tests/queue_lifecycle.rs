//! Integration tests for the queue lifecycle through the public client
//!
//! These tests verify:
//! - Create, send, receive, delete round trips
//! - At-least-once redelivery once the visibility window lapses
//! - Isolation between queues
//! - Configuration loaded from a file

mod common;

use common::{memory_client, memory_client_with};
use queue_client::{
    ClientConfig, ErrorKind, InMemoryConfig, ProviderType, QueueClientFactory, QueueError,
};
use std::io::Write;
use std::time::Duration;

/// Verify a message sent to a new queue is received once and acknowledged
#[tokio::test]
async fn test_round_trip_through_memory_transport() {
    let client = memory_client();

    let queue = client.create_queue("TestSqsQueue").await.unwrap();
    client
        .send_message(&queue, "Hello from queue-client")
        .await
        .unwrap();

    let message = client.receive_message(&queue).await.unwrap().unwrap();
    assert_eq!(message.body.as_str(), "Hello from queue-client");
    assert_eq!(message.delivery_count, 1);
    assert!(!message.is_redelivery());

    client.delete_message(&queue, &message.receipt).await.unwrap();
    assert!(client.receive_message(&queue).await.unwrap().is_none());

    client.delete_queue(&queue).await.unwrap();
}

/// Verify messages come back in the order they were sent
#[tokio::test]
async fn test_messages_received_in_send_order() {
    let client = memory_client();
    let queue = client.create_queue("ordered").await.unwrap();

    for body in ["first", "second", "third"] {
        client.send_message(&queue, body).await.unwrap();
    }

    let mut received = Vec::new();
    while let Some(message) = client.receive_message(&queue).await.unwrap() {
        client.delete_message(&queue, &message.receipt).await.unwrap();
        received.push(message.body.into_string());
    }

    assert_eq!(received, vec!["first", "second", "third"]);
}

/// Verify an unacknowledged message is delivered again
#[tokio::test]
async fn test_unacknowledged_message_is_redelivered() {
    let client = memory_client_with(InMemoryConfig {
        visibility_timeout_seconds: 1,
        ..InMemoryConfig::default()
    });
    let queue = client.create_queue("redelivery").await.unwrap();
    client.send_message(&queue, "retry me").await.unwrap();

    let first = client.receive_message(&queue).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let second = client.receive_message(&queue).await.unwrap().unwrap();

    assert_eq!(first.message_id, second.message_id);
    assert_eq!(second.delivery_count, 2);
    assert!(second.is_redelivery());
    assert_ne!(first.receipt, second.receipt);

    // The lapsed receipt no longer acknowledges anything
    client.delete_message(&queue, &first.receipt).await.unwrap();
    client.delete_message(&queue, &second.receipt).await.unwrap();
    assert!(client.receive_message(&queue).await.unwrap().is_none());
}

/// Verify queues do not share messages
#[tokio::test]
async fn test_queues_are_isolated() {
    let client = memory_client();
    let orders = client.create_queue("orders").await.unwrap();
    let invoices = client.create_queue("invoices").await.unwrap();

    client.send_message(&orders, "order-1").await.unwrap();

    assert!(client.receive_message(&invoices).await.unwrap().is_none());
    let message = client.receive_message(&orders).await.unwrap().unwrap();
    assert_eq!(message.body.as_str(), "order-1");
}

/// Verify operations on a deleted queue report a transport failure
#[tokio::test]
async fn test_deleted_queue_rejects_operations() {
    let client = memory_client();
    let queue = client.create_queue("short-lived").await.unwrap();
    client.delete_queue(&queue).await.unwrap();

    let error = client.send_message(&queue, "late").await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::TransportFailure);
    match error {
        QueueError::TransportFailure { code, .. } => assert_eq!(code, "QueueDoesNotExist"),
        other => panic!("Expected TransportFailure, got: {:?}", other),
    }
}

/// Verify invalid arguments are rejected before any transport call
#[tokio::test]
async fn test_invalid_arguments() {
    let client = memory_client();
    let queue = client.create_queue("validation").await.unwrap();

    let errors = vec![
        client.create_queue("").await.unwrap_err(),
        client.send_message(&queue, "").await.unwrap_err(),
        client.send_message("", "body").await.unwrap_err(),
        client.delete_message(&queue, "").await.unwrap_err(),
        client.delete_queue("").await.unwrap_err(),
    ];

    for error in errors {
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert!(!error.is_transient());
    }
}

/// Verify a client built from a configuration file uses its settings
#[tokio::test]
async fn test_client_from_configuration_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "receive_wait_seconds: 1\noperation_timeout_seconds: 5\nprovider:\n  type: in_memory\n  visibility_timeout_seconds: 10\n"
    )
    .unwrap();

    let config = ClientConfig::load(Some(file.path())).unwrap();
    let client = QueueClientFactory::create_client(config).unwrap();

    assert_eq!(client.provider_type(), ProviderType::InMemory);
    assert_eq!(client.config().receive_wait(), Duration::from_secs(1));

    let queue = client.create_queue("configured").await.unwrap();
    client.send_message(&queue, "payload").await.unwrap();
    let message = client.receive_message(&queue).await.unwrap().unwrap();
    assert!(message.visible_until.is_some());
}

/// Verify many tasks can share a client
#[tokio::test]
async fn test_concurrent_producers_and_consumer() {
    let client = std::sync::Arc::new(memory_client());
    let queue = client.create_queue("concurrent").await.unwrap();

    let mut producers = Vec::new();
    for i in 0..20 {
        let client = std::sync::Arc::clone(&client);
        let queue = queue.clone();
        producers.push(tokio::spawn(async move {
            client
                .send_message(&queue, format!("message-{}", i))
                .await
                .unwrap();
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let mut bodies = Vec::new();
    while let Some(message) = client.receive_message(&queue).await.unwrap() {
        client.delete_message(&queue, &message.receipt).await.unwrap();
        bodies.push(message.body.into_string());
    }

    bodies.sort();
    let mut expected: Vec<String> = (0..20).map(|i| format!("message-{}", i)).collect();
    expected.sort();
    assert_eq!(bodies, expected);
}
