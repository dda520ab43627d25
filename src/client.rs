//! The client core (§4.F): outbound request identification, response
//! correlation, and the incoming-message demultiplexer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::error::{ClientError, TransportError};
use crate::message::{Request, RequestId, Response};

type PendingMap = Arc<DashMap<String, oneshot::Sender<Response>>>;

/// A connected JSON-RPC client. Requests are correlated with their
/// responses by id; the reader loop runs as a background task for the
/// lifetime of the connection (§4.F).
pub struct Client {
    writer: Arc<Mutex<tokio::net::tcp::OwnedWriteHalf>>,
    next_id: AtomicU64,
    pending: PendingMap,
    reader_task: JoinHandle<()>,
}

impl Client {
    /// Resolve `host:port`, connect, and start the background reader
    /// loop.
    pub async fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(TransportError::Io)?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        let pending: PendingMap = Arc::new(DashMap::new());
        let pending_for_reader = Arc::clone(&pending);

        let reader_task = tokio::spawn(async move {
            reader_loop(read_half, pending_for_reader).await;
        });

        Self {
            writer: Arc::new(Mutex::new(write_half)),
            next_id: AtomicU64::new(1),
            pending,
            reader_task,
        }
    }

    /// Issue a call and await its response (§4.F "call").
    pub async fn call(&self, name: &str, params: Value) -> Result<Response, ClientError> {
        let id = RequestId::new_number(self.next_id.fetch_add(1, Ordering::SeqCst) as i64);
        let request = Request::new(name, params, id.clone());
        let line = request.to_line().map_err(ClientError::Serialize)?;
        self.raw_call_bytes(id, line).await
    }

    /// Identical to [`Client::call`] but the caller supplies the
    /// already-serialized request line, for fault-injection tests
    /// (§4.F "raw-call").
    pub async fn raw_call(&self, id: RequestId, raw_line: Vec<u8>) -> Result<Response, ClientError> {
        self.raw_call_bytes(id, raw_line).await
    }

    async fn raw_call_bytes(&self, id: RequestId, line: Vec<u8>) -> Result<Response, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.as_key(), tx);

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.write_all(&line).await {
                self.pending.remove(&id.as_key());
                return Err(ClientError::Transport(TransportError::Io(e)));
            }
        }

        rx.await.map_err(|_| ClientError::Transport(TransportError::Closed))
    }

    /// Close the connection. The reader loop resolves any still-pending
    /// calls with a transport-closed error before exiting (§4.F
    /// "Cancellation").
    pub async fn close(self) {
        self.reader_task.abort();
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

async fn reader_loop(read_half: tokio::net::tcp::OwnedReadHalf, pending: PendingMap) {
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = match reader.read_until(b'\n', &mut buf).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "client reader loop: transport error");
                break;
            }
        };
        if n == 0 {
            tracing::debug!("client reader loop: connection closed by peer");
            break;
        }

        while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
            buf.pop();
        }

        let response: Response = match serde_json::from_slice(&buf) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "client reader loop: malformed response, dropping");
                continue;
            }
        };

        let Some(ref id) = response.id else {
            tracing::debug!("client reader loop: response has no id, dropping");
            continue;
        };

        match pending.remove(&id.as_key()) {
            Some((_, sender)) => {
                let _ = sender.send(response);
            }
            None => {
                tracing::debug!(id = %id, "client reader loop: no pending request for id, dropping");
            }
        }
    }

    // Drain anything left pending so no caller waits forever.
    let stranded: Vec<String> = pending.iter().map(|e| e.key().clone()).collect();
    for key in stranded {
        if let Some((_, sender)) = pending.remove(&key) {
            drop(sender); // dropping the sender fails the receiver with RecvError
        }
    }
}
