//! Common test utilities for queue-client integration tests
//!
//! This module provides:
//! - Client builders for the in-memory and SQS transports
//! - Canned SQS query API responses for `wiremock`

#![allow(dead_code)]

use queue_client::{
    AwsSqsConfig, ClientConfig, InMemoryConfig, ProviderConfig, QueueClient, QueueClientFactory,
};
use wiremock::{MockServer, ResponseTemplate};

pub const ACCESS_KEY: &str = "AKIDEXAMPLE";
pub const SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

// ============================================================================
// Client Builders
// ============================================================================

/// Client over the in-memory transport with a one second receive wait
pub fn memory_client() -> QueueClient {
    memory_client_with(InMemoryConfig::default())
}

pub fn memory_client_with(memory: InMemoryConfig) -> QueueClient {
    let config = ClientConfig {
        provider: ProviderConfig::InMemory(memory),
        receive_wait_seconds: 1,
        operation_timeout_seconds: Some(10),
    };

    QueueClientFactory::create_client(config).unwrap()
}

/// Client over the SQS transport pointed at a mock server
pub fn sqs_client(server: &MockServer) -> QueueClient {
    let sqs = AwsSqsConfig::new("us-east-1")
        .with_endpoint(server.uri())
        .with_credentials(ACCESS_KEY, SECRET_KEY);
    let config = ClientConfig {
        provider: ProviderConfig::AwsSqs(sqs),
        receive_wait_seconds: 1,
        operation_timeout_seconds: Some(10),
    };

    QueueClientFactory::create_client(config).unwrap()
}

// ============================================================================
// SQS Responses
// ============================================================================

pub fn queue_url(server: &MockServer, name: &str) -> String {
    format!("{}/000000000000/{}", server.uri(), name)
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/xml")
        .set_body_string(body)
}

pub fn create_queue_response(url: &str) -> ResponseTemplate {
    xml(format!(
        "<CreateQueueResponse><CreateQueueResult><QueueUrl>{}</QueueUrl></CreateQueueResult>\
         <ResponseMetadata><RequestId>7a62c49f-347e-4fc4-9331-6e8e7a96aa73</RequestId></ResponseMetadata>\
         </CreateQueueResponse>",
        url
    ))
}

pub fn send_message_response(message_id: &str) -> ResponseTemplate {
    xml(format!(
        "<SendMessageResponse><SendMessageResult>\
         <MD5OfMessageBody>fafb00f5732ab283681e124bf8747ed1</MD5OfMessageBody>\
         <MessageId>{}</MessageId></SendMessageResult></SendMessageResponse>",
        message_id
    ))
}

pub fn receive_message_response(
    message_id: &str,
    receipt: &str,
    body: &str,
    receive_count: u32,
) -> ResponseTemplate {
    xml(format!(
        "<ReceiveMessageResponse><ReceiveMessageResult><Message>\
         <MessageId>{}</MessageId><ReceiptHandle>{}</ReceiptHandle><Body>{}</Body>\
         <Attribute><Name>ApproximateReceiveCount</Name><Value>{}</Value></Attribute>\
         </Message></ReceiveMessageResult></ReceiveMessageResponse>",
        message_id, receipt, body, receive_count
    ))
}

pub fn empty_receive_response() -> ResponseTemplate {
    xml("<ReceiveMessageResponse><ReceiveMessageResult/></ReceiveMessageResponse>".to_string())
}

pub fn empty_response(action: &str) -> ResponseTemplate {
    xml(format!(
        "<{0}Response><ResponseMetadata><RequestId>b5293cb5-d306-4a17-9048-b263635abe42</RequestId>\
         </ResponseMetadata></{0}Response>",
        action
    ))
}

pub fn error_response(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_string(format!(
        "<ErrorResponse><Error><Type>Sender</Type><Code>{}</Code><Message>{}</Message></Error>\
         <RequestId>42d59b56-7407-4c4a-be0f-4c88daeea257</RequestId></ErrorResponse>",
        code, message
    ))
}
