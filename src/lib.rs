//! linerpc - a JSON-RPC 2.0 implementation over pluggable transports
//!
//! This crate provides a JSON-RPC 2.0 server and client with a typed
//! marshalling layer, built on two transports: a raw, line-framed TCP
//! stream and a one-shot HTTP/1.0 POST.
//!
//! # Architecture
//!
//! The crate is organized in layers:
//!
//! - **Message layer** (`message`): the wire types, `Request`/`Response`/`RequestId`
//! - **Marshalling layer** (`marshal`): `FromParam`/`ToParam` conversions between
//!   `serde_json::Value` and native argument/return types
//! - **Registry** (`registry`): the name -> handler method table
//! - **Server** (`server`): connection handling and protocol validation for the
//!   stream transport
//! - **Client** (`client`): request/response correlation for the stream transport
//! - **HTTP client** (`http_client`): the one-shot HTTP/1.0 transport
//! - **Errors** (`error`): the failure taxonomy shared across every layer
//!
//! # Quick start
//!
//! ```no_run
//! use linerpc::rpc_handler;
//! use linerpc::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(["127.0.0.1:7878"]).await?;
//!     rpc_handler!(server.registry(), "rpc", |a: i64, b: i64| -> String {
//!         Ok(format!("a: {a}, b: {b}"))
//!     });
//!     server.start().await?;
//!     Ok(())
//! }
//! ```
//!
//! ```no_run
//! use linerpc::client::Client;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1", 7878).await?;
//!     let response = client.call("rpc", json!([1, 2])).await?;
//!     println!("{}", response.result);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod handler_macro;
pub mod http_client;
pub mod marshal;
pub mod message;
pub mod registry;
pub mod server;

pub use client::Client;
pub use error::{ClientError, HttpClientError, MarshalError, RpcError, ServerError, TransportError};
pub use http_client::{HttpClient, HttpClientConfig};
pub use message::{Request, RequestId, Response};
pub use registry::MethodRegistry;
pub use server::{Server, ServerConfig};
