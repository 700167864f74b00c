//! # Queue Client CLI
//!
//! Command-line interface for the queue client.
//!
//! This module provides CLI commands for:
//! - Running each queue operation against the configured transport
//! - A create, send, receive, delete round trip used as a smoke test
//! - Printing the resolved configuration
//! - Generating shell completions
//!
//! Configuration comes from the file given by `--config` (or
//! `QUEUE_CLIENT_CONFIG`) overlaid with `QUEUE_CLIENT__*` environment
//! variables. Without either, commands run against the in-memory transport,
//! whose queues only live as long as the process.

use clap::{CommandFactory, Parser, Subcommand};
use queue_client::{
    ClientConfig, ConfigurationError, QueueClient, QueueClientFactory, QueueError, QueueHandle,
    ReceivedMessage,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// CLI Structure
// ============================================================================

/// Queue client CLI - drive a managed message queue from the shell
#[derive(Parser, Debug)]
#[command(name = "queue-client")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Create queues, send, receive and delete messages")]
#[command(
    long_about = "Runs queue operations against Amazon SQS or the in-memory transport, as selected by the configuration"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "QUEUE_CLIENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level, ignored when RUST_LOG is set
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Output format for command results
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a queue and print its handle
    CreateQueue {
        /// Queue name
        name: String,
    },

    /// Send a message to a queue
    Send {
        /// Queue handle returned by create-queue
        queue: String,

        /// Message body
        body: String,
    },

    /// Receive at most one message from a queue
    Receive {
        /// Queue handle returned by create-queue
        queue: String,

        /// Delete the message after receiving it
        #[arg(short, long)]
        delete: bool,
    },

    /// Delete a received message by its receipt
    DeleteMessage {
        /// Queue handle returned by create-queue
        queue: String,

        /// Receipt printed by receive
        receipt: String,
    },

    /// Delete a queue and all of its messages
    DeleteQueue {
        /// Queue handle returned by create-queue
        queue: String,
    },

    /// Create a queue, send, receive and delete a message, then delete the queue
    Roundtrip {
        /// Name of the temporary queue
        #[arg(long, default_value = "TestSqsQueue")]
        queue_name: String,

        /// Body of the test message
        #[arg(long, default_value = "Hello from queue-client")]
        body: String,

        /// Number of receive attempts before giving up
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
        attempts: u32,
    },

    /// Show the resolved configuration
    Config {
        /// Output format for configuration
        #[arg(short = 'f', long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Output format options
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// Configuration format options
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Queue operation failed: {0}")]
    Queue(QueueError),

    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Queue(_) => 2,
            Self::CommandFailed { .. } => 3,
            Self::Io(_) => 4,
        }
    }
}

impl From<QueueError> for CliError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Configuration(e) => Self::Configuration(e),
            other => Self::Queue(other),
        }
    }
}

fn render_failed(error: impl std::fmt::Display) -> CliError {
    CliError::CommandFailed {
        message: format!("failed to render output: {}", error),
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let mut stdout = std::io::stdout();
    execute(cli, &mut stdout).await
}

/// Run a parsed command, writing its result to `out`
pub async fn execute<W: Write>(cli: Cli, out: &mut W) -> Result<(), CliError> {
    let Cli {
        config: config_path,
        output,
        command,
        ..
    } = cli;

    match command {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "queue-client", out);
            Ok(())
        }
        Commands::Config { format } => {
            let config = load_configuration(config_path.as_deref())?;
            execute_config_command(&config, format, out)
        }
        Commands::CreateQueue { name } => {
            let client = connect(config_path.as_deref())?;
            let queue = client.create_queue(&name).await?;
            emit(
                out,
                &output,
                queue.as_str(),
                &serde_json::json!({ "queue": queue }),
            )
        }
        Commands::Send { queue, body } => {
            let client = connect(config_path.as_deref())?;
            client.send_message(&queue, &body).await?;
            emit(
                out,
                &output,
                "sent",
                &serde_json::json!({ "queue": queue, "sent": true }),
            )
        }
        Commands::Receive { queue, delete } => {
            let client = connect(config_path.as_deref())?;
            execute_receive_command(&client, &queue, delete, &output, out).await
        }
        Commands::DeleteMessage { queue, receipt } => {
            let client = connect(config_path.as_deref())?;
            client.delete_message(&queue, &receipt).await?;
            emit(
                out,
                &output,
                "deleted",
                &serde_json::json!({ "queue": queue, "deleted": true }),
            )
        }
        Commands::DeleteQueue { queue } => {
            let client = connect(config_path.as_deref())?;
            client.delete_queue(&queue).await?;
            emit(
                out,
                &output,
                "deleted",
                &serde_json::json!({ "queue": queue, "deleted": true }),
            )
        }
        Commands::Roundtrip {
            queue_name,
            body,
            attempts,
        } => {
            let client = connect(config_path.as_deref())?;
            let report = execute_roundtrip_command(client, queue_name, body, attempts).await?;
            emit(out, &output, &report.summary(), &report)
        }
    }
}

// ============================================================================
// Setup
// ============================================================================

/// Initialize logging based on CLI arguments
///
/// Logs go to stderr so that stdout carries only command results.
fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .map_err(|e| ConfigurationError::Invalid {
            message: format!("invalid log level '{}': {}", cli.log_level, e),
        })?;

    let json_layer = cli.json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!cli.json_logs)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| CliError::CommandFailed {
            message: format!("failed to initialize logging: {}", e),
        })
}

/// Load configuration from file and environment
fn load_configuration(config_path: Option<&Path>) -> Result<ClientConfig, ConfigurationError> {
    let config = ClientConfig::load(config_path)?;

    info!(
        path = ?config_path,
        provider = %config.provider_type(),
        "Configuration loaded"
    );
    Ok(config)
}

fn connect(config_path: Option<&Path>) -> Result<QueueClient, CliError> {
    let config = load_configuration(config_path)?;
    Ok(QueueClientFactory::create_client(config)?)
}

fn emit<W: Write, T: Serialize>(
    out: &mut W,
    format: &OutputFormat,
    text: &str,
    value: &T,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => writeln!(out, "{}", text)?,
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).map_err(render_failed)?;
            writeln!(out, "{}", json)?;
        }
    }

    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Execute config command
fn execute_config_command<W: Write>(
    config: &ClientConfig,
    format: ConfigFormat,
    out: &mut W,
) -> Result<(), CliError> {
    debug!(format = ?format, "Rendering configuration");

    let rendered = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(render_failed)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(render_failed)?,
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(render_failed)?,
    };

    write!(out, "{}", rendered)?;
    if !rendered.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}

/// Execute receive command
async fn execute_receive_command<W: Write>(
    client: &QueueClient,
    queue: &str,
    delete: bool,
    output: &OutputFormat,
    out: &mut W,
) -> Result<(), CliError> {
    let Some(message) = client.receive_message(queue).await? else {
        return emit(
            out,
            output,
            "no message available",
            &serde_json::json!({ "message": null }),
        );
    };

    if delete {
        client.delete_message(queue, &message.receipt).await?;
    }

    let text = format!(
        "message_id: {}\nreceipt: {}\ndelivery_count: {}\ndeleted: {}\nbody: {}",
        message.message_id, message.receipt, message.delivery_count, delete, message.body
    );
    emit(
        out,
        output,
        &text,
        &serde_json::json!({ "message": message, "deleted": delete }),
    )
}

/// Outcome of a successful round trip
#[derive(Debug, Clone, Serialize)]
pub struct RoundtripReport {
    pub queue: String,
    pub message_id: String,
    pub body: String,
    pub receive_attempts: u32,
    pub delivery_count: u32,
}

impl RoundtripReport {
    fn summary(&self) -> String {
        format!(
            "roundtrip complete: message {} received from {} after {} attempt(s)",
            self.message_id, self.queue, self.receive_attempts
        )
    }
}

/// Execute roundtrip command
///
/// The queue is deleted and the client closed whether or not the exchange
/// succeeds.
pub async fn execute_roundtrip_command(
    client: QueueClient,
    queue_name: String,
    body: String,
    attempts: u32,
) -> Result<RoundtripReport, CliError> {
    info!(queue_name = %queue_name, attempts, "Starting roundtrip");

    client
        .scoped(|client| async move {
            let queue = client.create_queue(&queue_name).await?;

            let exchanged = exchange(&client, &queue, &body, attempts).await;
            let teardown = client.delete_queue(&queue).await;
            if let Err(ref e) = teardown {
                warn!(queue = %queue, error = %e, "Failed to delete roundtrip queue");
            }

            let (message, receive_attempts) = exchanged?;
            teardown?;

            Ok(RoundtripReport {
                queue: queue.to_string(),
                message_id: message.message_id.to_string(),
                body: message.body.into_string(),
                receive_attempts,
                delivery_count: message.delivery_count,
            })
        })
        .await
}

/// Send one message and poll until it comes back, then acknowledge it
async fn exchange(
    client: &QueueClient,
    queue: &QueueHandle,
    body: &str,
    attempts: u32,
) -> Result<(ReceivedMessage, u32), CliError> {
    client.send_message(queue, body).await?;

    for attempt in 1..=attempts {
        let Some(message) = client.receive_message(queue).await? else {
            debug!(attempt, "No message received yet");
            continue;
        };

        client.delete_message(queue, &message.receipt).await?;

        if message.body.as_str() != body {
            return Err(CliError::CommandFailed {
                message: format!(
                    "received unexpected message {} from {}",
                    message.message_id, queue
                ),
            });
        }

        return Ok((message, attempt));
    }

    Err(CliError::CommandFailed {
        message: format!("no message received after {} attempt(s)", attempts),
    })
}
