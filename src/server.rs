//! The server engine (§4.D) and its stream-transport binding (§4.E).
//!
//! [`Server`] resolves a set of addresses, binds a `TcpListener` on
//! every endpoint that resolves, and spawns one task per accepted
//! connection. Each connection runs [`handle_connection`]: read a
//! line, parse it, validate it against the protocol rules, dispatch to
//! the method registry, and write back exactly one framed reply —
//! regardless of whether the handler succeeded.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::{RpcError, ServerError, TransportError};
use crate::message::{Request, RequestId, Response};
use crate::registry::MethodRegistry;

/// Configuration for the server engine (§3 "Configuration").
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum bytes in one line before the connection is dropped
    /// (§4.D "Maximum request size").
    pub max_line_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 128 * 1024,
        }
    }
}

/// An address to listen on, accepted in any of the shapes §4.E allows.
#[derive(Debug, Clone)]
pub enum Address {
    /// A bare host string, optionally already carrying `:port`
    /// (resolved via DNS).
    Host(String),
    /// An explicit host/port pair (resolved via DNS).
    HostPort(String, u16),
    /// A pre-resolved endpoint — bound directly, no resolution step.
    Resolved(SocketAddr),
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address::Host(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address::Host(s)
    }
}

impl From<(&str, u16)> for Address {
    fn from((host, port): (&str, u16)) -> Self {
        Address::HostPort(host.to_string(), port)
    }
}

impl From<(String, u16)> for Address {
    fn from((host, port): (String, u16)) -> Self {
        Address::HostPort(host, port)
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::Resolved(addr)
    }
}

struct ListenerTask {
    local_addr: SocketAddr,
    stop: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// A JSON-RPC server bound to one or more addresses, dispatching
/// requests through a shared [`MethodRegistry`].
pub struct Server {
    registry: Arc<MethodRegistry>,
    config: ServerConfig,
    listeners: Vec<TcpListener>,
    running: Vec<ListenerTask>,
}

impl Server {
    /// Resolve every address in `addresses` and bind a listener on
    /// each endpoint that resolves. Fails with
    /// [`ServerError::AddressUnresolvable`] if any input resolves to
    /// zero endpoints, or [`ServerError::BindError`] if none of the
    /// resolved endpoints could be bound (§4.E).
    pub async fn new<I, A>(addresses: I) -> Result<Self, ServerError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        Self::with_config(addresses, ServerConfig::default()).await
    }

    pub async fn with_config<I, A>(addresses: I, config: ServerConfig) -> Result<Self, ServerError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        let mut resolved = Vec::new();
        for addr in addresses {
            match addr.into() {
                Address::Resolved(sock) => resolved.push(sock),
                Address::Host(host) => {
                    let endpoints: Vec<SocketAddr> = lookup_host(&host)
                        .await
                        .map_err(|_| ServerError::AddressUnresolvable { host: host.clone() })?
                        .collect();
                    if endpoints.is_empty() {
                        return Err(ServerError::AddressUnresolvable { host });
                    }
                    resolved.extend(endpoints);
                }
                Address::HostPort(host, port) => {
                    let endpoints: Vec<SocketAddr> = lookup_host((host.as_str(), port))
                        .await
                        .map_err(|_| ServerError::AddressUnresolvable {
                            host: format!("{host}:{port}"),
                        })?
                        .collect();
                    if endpoints.is_empty() {
                        return Err(ServerError::AddressUnresolvable {
                            host: format!("{host}:{port}"),
                        });
                    }
                    resolved.extend(endpoints);
                }
            }
        }

        let mut listeners = Vec::new();
        for addr in resolved {
            match TcpListener::bind(addr).await {
                Ok(listener) => listeners.push(listener),
                Err(e) => tracing::warn!(%addr, error = %e, "failed to bind endpoint, continuing"),
            }
        }

        if listeners.is_empty() {
            return Err(ServerError::BindError);
        }

        Ok(Self {
            registry: Arc::new(MethodRegistry::new()),
            config,
            listeners,
            running: Vec::new(),
        })
    }

    pub fn registry(&self) -> Arc<MethodRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn register(&self, name: impl Into<String>, handler: impl crate::registry::Handler + 'static) {
        self.registry.register(name, handler);
    }

    /// The addresses this server is bound to (before or after `start`).
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners
            .iter()
            .filter_map(|l| l.local_addr().ok())
            .collect()
    }

    /// Start accepting connections on every bound listener. Each
    /// accepted connection is spawned as its own task, so connections
    /// proceed concurrently with each other (§5).
    pub async fn start(&mut self) -> Result<(), ServerError> {
        for listener in self.listeners.drain(..) {
            let local_addr = listener.local_addr()?;
            let registry = Arc::clone(&self.registry);
            let config = self.config.clone();
            let stop = Arc::new(Notify::new());
            let stop_for_task = Arc::clone(&stop);

            let handle = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = stop_for_task.notified() => {
                            tracing::debug!(%local_addr, "listener stopping");
                            break;
                        }
                        accepted = listener.accept() => {
                            match accepted {
                                Ok((stream, peer_addr)) => {
                                    let registry = Arc::clone(&registry);
                                    let config = config.clone();
                                    tokio::spawn(async move {
                                        let span = tracing::info_span!("connection", %peer_addr);
                                        let _enter = span.enter();
                                        if let Err(e) = handle_connection(stream, registry, config).await {
                                            tracing::warn!(error = %e, "connection closed with error");
                                        }
                                    });
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, "accept failed");
                                }
                            }
                        }
                    }
                }
            });

            self.running.push(ListenerTask {
                local_addr,
                stop,
                handle,
            });
        }

        Ok(())
    }

    /// Signal every accept loop to stop and wait for them to exit.
    /// In-flight connections are not interrupted — they drain
    /// naturally when their peer disconnects.
    pub async fn stop(&mut self) {
        for task in self.running.drain(..) {
            task.stop.notify_one();
            if let Err(e) = task.handle.await {
                tracing::warn!(addr = %task.local_addr, error = %e, "listener task panicked");
            }
        }
    }

    pub async fn close(&mut self) {
        self.stop().await;
        self.registry.clear();
    }
}

/// Parse and validate one request line, returning either a well-formed
/// [`Request`] or the `(code, message, id)` of the error reply it maps
/// to (§4.D step 3).
fn validate_line(line: &str) -> Result<Request, (i32, String, Option<RequestId>)> {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => return Err((RpcError::PARSE_ERROR, "Invalid JSON".to_string(), None)),
    };

    let id = match value.get("id") {
        Some(id_value) => match serde_json::from_value::<RequestId>(id_value.clone()) {
            Ok(id) => id,
            Err(_) => {
                return Err((
                    RpcError::INVALID_REQUEST,
                    "No id specified".to_string(),
                    None,
                ))
            }
        },
        None => {
            return Err((
                RpcError::INVALID_REQUEST,
                "No id specified".to_string(),
                None,
            ))
        }
    };

    if value.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err((
            RpcError::INVALID_REQUEST,
            "JSON 2.0 required".to_string(),
            Some(id),
        ));
    }

    let method = match value.get("method").and_then(Value::as_str) {
        Some(m) => m.to_string(),
        None => {
            return Err((
                RpcError::INVALID_REQUEST,
                "No method requested".to_string(),
                Some(id),
            ))
        }
    };

    let params = value.get("params").cloned().unwrap_or(Value::Null);
    Ok(Request::new(method, params, id))
}

/// Run the read/dispatch/reply loop for one accepted connection
/// (§4.D). Only transport-level failures return `Err`; protocol,
/// routing, marshalling, and handler errors are all recovered here and
/// sent back to the peer.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Arc<MethodRegistry>,
    config: ServerConfig,
) -> Result<(), TransportError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let line = match read_line_limited(&mut reader, config.max_line_bytes).await? {
            Some(line) => line,
            None => {
                tracing::debug!("peer closed connection");
                return Ok(());
            }
        };
        if line.is_empty() {
            return Ok(());
        }

        let response = match validate_line(&line) {
            Err((code, message, id)) => {
                tracing::warn!(code, message = %message, "protocol error");
                Response::error(code, message, Value::Null, id)
            }
            Ok(request) => dispatch(&registry, request).await,
        };

        let bytes = response
            .to_line()
            .unwrap_or_else(|_| b"{}\r\n".to_vec());
        write_half.write_all(&bytes).await?;
    }
}

async fn dispatch(registry: &MethodRegistry, request: Request) -> Response {
    let handler = match registry.lookup(&request.method) {
        Some(h) => h,
        None => {
            return Response::error(
                RpcError::METHOD_NOT_FOUND,
                "Method not found",
                Value::String(format!("{} is not a registered method.", request.method)),
                Some(request.id),
            );
        }
    };

    tracing::debug!(method = %request.method, id = %request.id, "dispatching request");

    match handler.call(request.params).await {
        Ok(result) => Response::success(result, request.id),
        Err(err) => {
            let (code, message, data) = err.to_wire();
            Response::error(code, message, data, Some(request.id))
        }
    }
}

async fn read_line_limited<R>(reader: &mut R, max: usize) -> Result<Option<String>, TransportError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.len() > max {
        return Err(TransportError::LineTooLong { limit: max });
    }
    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_line_rejects_malformed_json() {
        let err = validate_line("{field: 2, \"field: 3}").unwrap_err();
        assert_eq!(err.0, RpcError::PARSE_ERROR);
        assert_eq!(err.2, None);
    }

    #[test]
    fn validate_line_rejects_missing_id() {
        let err = validate_line(r#"{"jsonrpc":"2.0","method":"ping"}"#).unwrap_err();
        assert_eq!(err.0, RpcError::INVALID_REQUEST);
        assert_eq!(err.1, "No id specified");
    }

    #[test]
    fn validate_line_rejects_wrong_version() {
        let err = validate_line(r#"{"jsonrpc":"1.0","method":"ping","id":1}"#).unwrap_err();
        assert_eq!(err.0, RpcError::INVALID_REQUEST);
        assert_eq!(err.1, "JSON 2.0 required");
        assert_eq!(err.2, Some(RequestId::new_number(1)));
    }

    #[test]
    fn validate_line_rejects_missing_method() {
        let err = validate_line(r#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
        assert_eq!(err.0, RpcError::INVALID_REQUEST);
        assert_eq!(err.1, "No method requested");
    }

    #[test]
    fn validate_line_accepts_well_formed_request() {
        let request = validate_line(r#"{"jsonrpc":"2.0","method":"rpc","params":[1,2],"id":1}"#).unwrap();
        assert_eq!(request.method, "rpc");
        assert_eq!(request.params, json!([1, 2]));
        assert_eq!(request.id, RequestId::new_number(1));
    }

    #[tokio::test]
    async fn dispatch_reports_method_not_found() {
        let registry = MethodRegistry::new();
        let request = Request::new("phantomRpc", json!([]), RequestId::new_number(7));
        let response = dispatch(&registry, request).await;
        assert_eq!(response.error["code"], json!(RpcError::METHOD_NOT_FOUND));
        assert_eq!(
            response.error["data"],
            json!("phantomRpc is not a registered method.")
        );
    }
}
