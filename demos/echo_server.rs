//! Minimal echo server: registers one method, `echo`, that returns its
//! single string argument unchanged.

use linerpc::rpc_handler;
use linerpc::server::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut server = Server::new(["127.0.0.1:7878"]).await?;
    rpc_handler!(server.registry(), "echo", |message: String| -> String {
        Ok(message)
    });

    tracing::info!(addrs = ?server.local_addrs(), "listening");
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    server.close().await;
    Ok(())
}
