//! Amazon SQS transport using the HTTP query API.
//!
//! Requests go straight to the SQS query endpoint over `reqwest` instead of
//! through the AWS SDK, which keeps the transport small and lets unit tests
//! run against a mocked HTTP server.
//!
//! ## Protocol
//!
//! Every action is a form-encoded `POST` to the service endpoint carrying
//! `Action`, `Version=2012-11-05` and the action parameters. The queue URL
//! returned by `CreateQueue` is used as the queue handle and passed back as
//! `QueueUrl` on every later call. Responses and errors are XML.
//!
//! ## Authentication
//!
//! Requests are signed with AWS Signature Version 4. Credentials come from
//! the configuration when present, otherwise from the standard environment
//! variables:
//! - `AWS_ACCESS_KEY_ID`
//! - `AWS_SECRET_ACCESS_KEY`
//! - `AWS_SESSION_TOKEN` (optional)
//!
//! Without credentials the transport can still be constructed, but every
//! call fails with code `MissingCredentials`.

use crate::error::TransportError;
use crate::message::{
    MessageBody, MessageId, QueueHandle, QueueName, ReceiptToken, ReceivedMessage, Timestamp,
};
use crate::provider::{AwsSqsConfig, ProviderType, SQS_MAX_WAIT_SECONDS};
use crate::transport::QueueTransport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client as HttpClient;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

#[cfg(test)]
#[path = "sqs_tests.rs"]
mod tests;

const PROVIDER: &str = "AwsSqs";
const API_VERSION: &str = "2012-11-05";
const SERVICE: &str = "sqs";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Error codes SQS uses when a caller is being throttled
/// Element whose text is the message payload and must not be trimmed
const BODY_ELEMENT: &str = "Body";

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestThrottled",
    "AWS.SimpleQueueService.RequestThrottled",
    "ServiceUnavailable",
];

// ============================================================================
// Credentials
// ============================================================================

/// Static AWS credentials used for request signing
#[derive(Clone)]
struct Credentials {
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
    session_token: Option<Zeroizing<String>>,
}

impl Credentials {
    /// Resolve credentials from the configuration, then the environment
    fn resolve(config: &AwsSqsConfig) -> Option<Self> {
        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            return Some(Self {
                access_key_id: access_key_id.clone(),
                secret_access_key: Zeroizing::new(secret_access_key.clone()),
                session_token: config.session_token.clone().map(Zeroizing::new),
            });
        }

        let access_key_id = non_empty_env("AWS_ACCESS_KEY_ID")?;
        let secret_access_key = non_empty_env("AWS_SECRET_ACCESS_KEY")?;
        Some(Self {
            access_key_id,
            secret_access_key: Zeroizing::new(secret_access_key),
            session_token: non_empty_env("AWS_SESSION_TOKEN").map(Zeroizing::new),
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

// ============================================================================
// AWS Signature V4 Signing
// ============================================================================

type HmacSha256 = Hmac<Sha256>;

/// AWS Signature Version 4 signer for request authentication
///
/// Implements the AWS Signature V4 signing process:
/// 1. Create canonical request (method, URI, query, headers, payload)
/// 2. Create string to sign (algorithm, timestamp, scope, request hash)
/// 3. Derive signing key (4-level HMAC chain)
/// 4. Calculate signature and build Authorization header
#[derive(Clone)]
struct AwsV4Signer {
    credentials: Credentials,
    region: String,
    service: String,
}

impl AwsV4Signer {
    fn new(credentials: Credentials, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Sign an HTTP request with AWS Signature V4
    ///
    /// Returns the headers to add to the request: `Authorization`,
    /// `x-amz-date` and, for temporary credentials, `x-amz-security-token`.
    /// The `host` value must match the `Host` header the HTTP client sends.
    fn sign_request(
        &self,
        method: &str,
        host: &str,
        path: &str,
        query_params: &[(String, String)],
        body: &str,
        timestamp: &DateTime<Utc>,
    ) -> Result<Vec<(&'static str, String)>, TransportError> {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        let mut canonical_query_string = query_params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>();
        canonical_query_string.sort();
        let canonical_query_string = canonical_query_string.join("&");

        // Canonical headers must be sorted by name
        let mut canonical_headers = format!("host:{}\nx-amz-date:{}\n", host, amz_date);
        let mut signed_headers = String::from("host;x-amz-date");
        if let Some(ref token) = self.credentials.session_token {
            canonical_headers.push_str(&format!("x-amz-security-token:{}\n", token.as_str()));
            signed_headers.push_str(";x-amz-security-token");
        }

        let payload_hash = hex::encode(Sha256::digest(body.as_bytes()));

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method, path, canonical_query_string, canonical_headers, signed_headers, payload_hash
        );

        let algorithm = "AWS4-HMAC-SHA256";
        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            algorithm,
            amz_date,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = self.signing_key(&date_stamp)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            algorithm, self.credentials.access_key_id, credential_scope, signed_headers, signature
        );

        let mut headers = vec![("Authorization", authorization), ("x-amz-date", amz_date)];
        if let Some(ref token) = self.credentials.session_token {
            headers.push(("x-amz-security-token", token.as_str().to_string()));
        }

        Ok(headers)
    }

    /// Derive the signing key through the 4-level HMAC chain
    ///
    /// kSecret = "AWS4" + secret, kDate = HMAC(kSecret, date),
    /// kRegion = HMAC(kDate, region), kService = HMAC(kRegion, service),
    /// kSigning = HMAC(kService, "aws4_request")
    fn signing_key(&self, date_stamp: &str) -> Result<Zeroizing<Vec<u8>>, TransportError> {
        let k_secret = Zeroizing::new(format!(
            "AWS4{}",
            self.credentials.secret_access_key.as_str()
        ));
        let k_date = Zeroizing::new(hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes())?);
        let k_region = Zeroizing::new(hmac_sha256(&k_date, self.region.as_bytes())?);
        let k_service = Zeroizing::new(hmac_sha256(&k_region, self.service.as_bytes())?);
        Ok(Zeroizing::new(hmac_sha256(&k_service, b"aws4_request")?))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, TransportError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| TransportError::new(PROVIDER, "SigningFailed", e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

// ============================================================================
// XML Parsing
// ============================================================================

/// Flatten an XML document into `(element, text)` pairs in document order.
///
/// Each text node is paired with the local name of its innermost element.
/// SQS responses are shallow enough that this is all the structure needed.
/// Text is trimmed except inside `Body`, whose content is returned verbatim.
fn collect_text(xml: &str) -> Result<Vec<(String, String)>, TransportError> {
    let mut reader = Reader::from_str(xml);

    let mut open: Vec<String> = Vec::new();
    let mut pairs = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                open.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                open.pop();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(malformed)?;
                if let Some(name) = open.last() {
                    if name == BODY_ELEMENT {
                        pairs.push((name.clone(), text.into_owned()));
                    } else if !text.trim().is_empty() {
                        pairs.push((name.clone(), text.trim().to_string()));
                    }
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                if let Some(name) = open.last() {
                    pairs.push((name.clone(), text));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(pairs)
}

fn first_text<'a>(pairs: &'a [(String, String)], element: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| name == element)
        .map(|(_, text)| text.as_str())
}

fn malformed(error: impl fmt::Display) -> TransportError {
    TransportError::new(
        PROVIDER,
        "MalformedResponse",
        format!("XML parsing error: {}", error),
    )
}

fn missing_element(element: &str) -> TransportError {
    TransportError::new(
        PROVIDER,
        "MalformedResponse",
        format!("{} not found in response", element),
    )
}

fn parse_queue_url_response(xml: &str) -> Result<QueueHandle, TransportError> {
    let pairs = collect_text(xml)?;
    let url = first_text(&pairs, "QueueUrl").ok_or_else(|| missing_element("QueueUrl"))?;
    QueueHandle::new(url).map_err(malformed)
}

fn parse_send_message_response(xml: &str) -> Result<MessageId, TransportError> {
    let pairs = collect_text(xml)?;
    let id = first_text(&pairs, "MessageId").ok_or_else(|| missing_element("MessageId"))?;
    id.parse().map_err(malformed)
}

fn parse_receive_message_response(
    xml: &str,
    visibility: Option<Duration>,
) -> Result<Option<ReceivedMessage>, TransportError> {
    let pairs = collect_text(xml)?;

    let Some(receipt) = first_text(&pairs, "ReceiptHandle") else {
        return Ok(None);
    };

    let message_id = first_text(&pairs, "MessageId")
        .ok_or_else(|| missing_element("MessageId"))?
        .parse()
        .map_err(malformed)?;
    let body = MessageBody::new(first_text(&pairs, BODY_ELEMENT).unwrap_or_default())
        .map_err(malformed)?;
    let receipt = ReceiptToken::new(receipt).map_err(malformed)?;

    // Attributes arrive as <Name>ApproximateReceiveCount</Name><Value>n</Value>
    let delivery_count = pairs
        .windows(2)
        .find(|pair| pair[0].0 == "Name" && pair[0].1 == "ApproximateReceiveCount")
        .filter(|pair| pair[1].0 == "Value")
        .and_then(|pair| pair[1].1.parse::<u32>().ok())
        .unwrap_or(1);

    let received_at = Timestamp::now();
    let visible_until = visibility.map(|v| received_at.plus(v));

    Ok(Some(ReceivedMessage {
        message_id,
        body,
        receipt,
        delivery_count,
        received_at,
        visible_until,
    }))
}

fn parse_error_response(xml: &str, status: u16) -> TransportError {
    let pairs = collect_text(xml).unwrap_or_default();
    let code = first_text(&pairs, "Code").unwrap_or("Unknown").to_string();
    let message = first_text(&pairs, "Message")
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with HTTP status {}", status));

    let transient = status >= 500 || THROTTLING_CODES.contains(&code.as_str());
    let error = TransportError::new(PROVIDER, code, message).with_status(status);
    if transient {
        error.transient()
    } else {
        error
    }
}

fn map_http_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::new(PROVIDER, "RequestTimeout", format!("Request timeout: {}", error))
            .transient()
    } else if error.is_connect() {
        TransportError::new(
            PROVIDER,
            "ConnectionFailed",
            format!("Connection failed: {}", error),
        )
        .transient()
    } else {
        TransportError::new(
            PROVIDER,
            "NetworkError",
            format!("HTTP request failed: {}", error),
        )
        .transient()
    }
}

// ============================================================================
// SqsTransport
// ============================================================================

/// Amazon SQS transport implementation
///
/// Safe to share between tasks. The HTTP client is pooled and cloned per
/// request; `release` drops it, after which every call fails with
/// `TransportReleased`.
pub struct SqsTransport {
    http_client: RwLock<Option<HttpClient>>,
    signer: Option<AwsV4Signer>,
    config: AwsSqsConfig,
    endpoint: Url,
}

impl SqsTransport {
    /// Create new SQS transport
    ///
    /// Fails only when the endpoint is not a valid URL or the HTTP client
    /// cannot be built. Missing credentials are reported per call.
    pub fn new(config: AwsSqsConfig) -> Result<Self, TransportError> {
        let endpoint = match config.endpoint {
            Some(ref endpoint) => endpoint.clone(),
            None => format!("https://sqs.{}.amazonaws.com", config.region),
        };
        let endpoint = Url::parse(&endpoint).map_err(|e| {
            TransportError::new(
                PROVIDER,
                "InvalidEndpoint",
                format!("endpoint '{}' is not a valid URL: {}", endpoint, e),
            )
        })?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                TransportError::new(
                    PROVIDER,
                    "ClientBuildFailed",
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        let signer = Credentials::resolve(&config)
            .map(|credentials| AwsV4Signer::new(credentials, config.region.clone(), SERVICE));
        if signer.is_none() {
            warn!(region = %config.region, "No AWS credentials found; SQS calls will fail");
        }

        debug!(endpoint = %endpoint, region = %config.region, "SQS transport created");
        Ok(Self {
            http_client: RwLock::new(Some(http_client)),
            signer,
            config,
            endpoint,
        })
    }

    /// Endpoint every request is sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Check whether credentials were found for signing
    pub fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }

    fn http_client(&self) -> Result<HttpClient, TransportError> {
        let guard = self
            .http_client
            .read()
            .map_err(|_| TransportError::new(PROVIDER, "StatePoisoned", "client lock poisoned"))?;

        guard.clone().ok_or_else(|| {
            TransportError::new(
                PROVIDER,
                "TransportReleased",
                "the transport has been released",
            )
        })
    }

    /// Host as it appears in the `Host` header, including non-default ports
    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Sign and send one query-protocol action, returning the XML body
    async fn make_request(
        &self,
        action: &str,
        params: Vec<(&str, String)>,
        extra_timeout: Duration,
    ) -> Result<String, TransportError> {
        let http_client = self.http_client()?;
        let signer = self.signer.as_ref().ok_or_else(|| {
            TransportError::new(
                PROVIDER,
                "MissingCredentials",
                "no AWS credentials configured or found in the environment",
            )
        })?;

        let body = [("Action", action.to_string()), ("Version", API_VERSION.to_string())]
            .into_iter()
            .chain(params)
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&");

        let headers = signer.sign_request(
            "POST",
            &self.host(),
            self.endpoint.path(),
            &[],
            &body,
            &Utc::now(),
        )?;

        let mut request = http_client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .timeout(Duration::from_secs(self.config.request_timeout_seconds) + extra_timeout)
            .body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        debug!(action, "Sending SQS request");
        let response = request.send().await.map_err(map_http_error)?;

        let status = response.status();
        let response_body = response.text().await.map_err(map_http_error)?;

        if !status.is_success() {
            let error = parse_error_response(&response_body, status.as_u16());
            debug!(action, status = status.as_u16(), code = %error.code, "SQS request failed");
            return Err(error);
        }

        Ok(response_body)
    }
}

impl fmt::Debug for SqsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqsTransport")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint.as_str())
            .field("has_credentials", &self.has_credentials())
            .finish()
    }
}

#[async_trait]
impl QueueTransport for SqsTransport {
    async fn create_queue(&self, name: &QueueName) -> Result<QueueHandle, TransportError> {
        let response = self
            .make_request(
                "CreateQueue",
                vec![("QueueName", name.as_str().to_string())],
                Duration::ZERO,
            )
            .await?;

        parse_queue_url_response(&response)
    }

    async fn send_message(
        &self,
        queue: &QueueHandle,
        body: &MessageBody,
    ) -> Result<MessageId, TransportError> {
        let response = self
            .make_request(
                "SendMessage",
                vec![
                    ("QueueUrl", queue.as_str().to_string()),
                    ("MessageBody", body.as_str().to_string()),
                ],
                Duration::ZERO,
            )
            .await?;

        parse_send_message_response(&response)
    }

    async fn receive_message(
        &self,
        queue: &QueueHandle,
        wait: Duration,
    ) -> Result<Option<ReceivedMessage>, TransportError> {
        let wait_seconds = wait.as_secs().min(SQS_MAX_WAIT_SECONDS);

        let mut params = vec![
            ("QueueUrl", queue.as_str().to_string()),
            ("MaxNumberOfMessages", "1".to_string()),
            ("WaitTimeSeconds", wait_seconds.to_string()),
            ("AttributeName.1", "ApproximateReceiveCount".to_string()),
        ];
        if let Some(visibility) = self.config.visibility_timeout_seconds {
            params.push(("VisibilityTimeout", visibility.to_string()));
        }

        let response = self
            .make_request(
                "ReceiveMessage",
                params,
                Duration::from_secs(wait_seconds),
            )
            .await?;

        let visibility = self
            .config
            .visibility_timeout_seconds
            .map(|seconds| Duration::from_secs(u64::from(seconds)));
        parse_receive_message_response(&response, visibility)
    }

    async fn delete_message(
        &self,
        queue: &QueueHandle,
        receipt: &ReceiptToken,
    ) -> Result<(), TransportError> {
        self.make_request(
            "DeleteMessage",
            vec![
                ("QueueUrl", queue.as_str().to_string()),
                ("ReceiptHandle", receipt.as_str().to_string()),
            ],
            Duration::ZERO,
        )
        .await?;

        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueHandle) -> Result<(), TransportError> {
        self.make_request(
            "DeleteQueue",
            vec![("QueueUrl", queue.as_str().to_string())],
            Duration::ZERO,
        )
        .await?;

        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::AwsSqs
    }

    fn release(&self) -> Result<(), TransportError> {
        let mut guard = self
            .http_client
            .write()
            .map_err(|_| TransportError::new(PROVIDER, "StatePoisoned", "client lock poisoned"))?;

        if guard.take().is_some() {
            debug!(endpoint = %self.endpoint, "SQS transport released");
        }

        Ok(())
    }
}
