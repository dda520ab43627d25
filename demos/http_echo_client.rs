//! One-shot HTTP/1.0 echo client: POSTs a single `echo` call at an
//! HTTP-fronted JSON-RPC server and prints the result. There is no
//! corresponding HTTP server demo in this crate — the HTTP transport
//! is client-only (§4.G); point this at any server that accepts a
//! single JSON-RPC request as an HTTP/1.0 body and answers in kind.

use std::env;
use std::net::SocketAddr;

use linerpc::http_client::{HttpClient, HttpClientConfig};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let addr: SocketAddr = env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:7879".to_string())
        .parse()?;

    let client = HttpClient::new(HttpClientConfig::default());
    let response = client.call(addr, "echo", json!(["hello over http"])).await?;

    if response.is_err() {
        tracing::error!(error = ?response.error, "echo call failed");
    } else {
        println!("echo(\"hello over http\") -> {}", response.result);
    }

    Ok(())
}
