use queue_client_cli::run_cli;
use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(e) = run_cli().await {
        error!("CLI error: {}", e);
        eprintln!("Error: {}", e);

        // 1 configuration, 2 queue operation, 3 command failed, 4 I/O
        std::process::exit(e.exit_code());
    }
}
