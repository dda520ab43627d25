//! Minimal echo client: connects to the echo server demo and issues a
//! handful of `echo` calls, printing each response.

use linerpc::client::Client;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let client = Client::connect("127.0.0.1", 7878).await?;

    for message in ["hello", "world", "linerpc"] {
        let response = client.call("echo", json!([message])).await?;
        if response.is_err() {
            tracing::error!(error = ?response.error, "echo call failed");
        } else {
            println!("echo({message}) -> {}", response.result);
        }
    }

    client.close().await;
    Ok(())
}
