//! The HTTP client transport (§4.G): a one-shot HTTP/1.0 POST carrying
//! a single JSON-RPC request, parsed back into a [`Response`] by hand
//! — no HTTP client library, since the shape of both the request and
//! the accepted response is fixed and small.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::HttpClientError;
use crate::message::{Request, RequestId, Response};

/// Configuration for the HTTP client transport, with the exact
/// defaults called out in §4.G.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// HTTP method used for the request line. §9: the historical
    /// default of GET was a bug; this crate defaults to POST.
    pub method: &'static str,
    pub header_timeout: Duration,
    pub header_max_bytes: usize,
    pub body_timeout: Duration,
    pub body_chunk_bytes: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            method: "POST",
            header_timeout: Duration::from_secs(120),
            header_max_bytes: 8 * 1024,
            body_timeout: Duration::from_secs(12),
            body_chunk_bytes: 4 * 1024,
        }
    }
}

/// A one-shot HTTP/1.0 JSON-RPC client. Each `call` opens its own
/// connection and closes it after reading the response, matching
/// HTTP/1.0's "close after response" semantics (§4.G).
pub struct HttpClient {
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Self {
        Self { config }
    }

    pub async fn call(
        &self,
        addr: SocketAddr,
        name: &str,
        params: Value,
    ) -> Result<Response, HttpClientError> {
        let id = RequestId::new_number(1);
        let request = Request::new(name, params, id);
        let body = serde_json::to_vec(&request)?;

        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|e| HttpClientError::Transport(e.into()))?;

        let date = Utc::now().to_rfc2822();
        let head = format!(
            "{} / HTTP/1.0\r\nDate: {date}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            self.config.method,
            body.len(),
        );

        stream
            .write_all(head.as_bytes())
            .await
            .map_err(|e| HttpClientError::Transport(e.into()))?;
        stream
            .write_all(&body)
            .await
            .map_err(|e| HttpClientError::Transport(e.into()))?;

        let headers = timeout(
            self.config.header_timeout,
            read_headers(&mut stream, self.config.header_max_bytes),
        )
        .await
        .map_err(|_| HttpClientError::HeaderTimeout)??;

        let content_length = parse_and_validate_headers(&headers)?;

        let body = timeout(
            self.config.body_timeout,
            read_body(&mut stream, content_length, self.config.body_chunk_bytes),
        )
        .await
        .map_err(|_| HttpClientError::BodyTimeout)??;

        let response: Response = serde_json::from_slice(&body)
            .map_err(|e| HttpClientError::MalformedResponse(e.to_string()))?;
        Ok(response)
    }
}

/// Read until `\r\n\r\n`, bounded by `max_bytes` total.
async fn read_headers(stream: &mut TcpStream, max_bytes: usize) -> Result<Vec<u8>, HttpClientError> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream
            .read(&mut byte)
            .await
            .map_err(|e| HttpClientError::Transport(e.into()))?;
        if n == 0 {
            return Err(HttpClientError::MalformedResponse(
                "connection closed before headers completed".to_string(),
            ));
        }
        buf.push(byte[0]);
        if buf.len() > max_bytes {
            return Err(HttpClientError::HeaderTooLarge { limit: max_bytes });
        }
        if buf.ends_with(b"\r\n\r\n") {
            return Ok(buf);
        }
    }
}

/// Validate status/`Content-Type` and extract `Content-Length`
/// (§4.G "Receives a response").
fn parse_and_validate_headers(raw: &[u8]) -> Result<usize, HttpClientError> {
    let text = String::from_utf8_lossy(raw);
    let mut lines = text.split("\r\n");

    let status_line = lines
        .next()
        .ok_or_else(|| HttpClientError::MalformedResponse("empty response".to_string()))?;
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| HttpClientError::MalformedResponse(format!("bad status line: {status_line}")))?;
    if status != 200 {
        return Err(HttpClientError::UnexpectedStatus(status));
    }

    let mut content_type_ok = false;
    let mut content_length: Option<usize> = None;

    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        match name.as_str() {
            "content-type" => {
                let main_type = value.split(';').next().unwrap_or("").trim();
                content_type_ok = main_type.eq_ignore_ascii_case("application/json");
            }
            "content-length" => {
                content_length = value.parse().ok();
            }
            _ => {}
        }
    }

    if !content_type_ok {
        return Err(HttpClientError::UnexpectedContentType);
    }

    content_length
        .ok_or_else(|| HttpClientError::MalformedResponse("missing Content-Length".to_string()))
}

async fn read_body(
    stream: &mut TcpStream,
    content_length: usize,
    chunk_bytes: usize,
) -> Result<Vec<u8>, HttpClientError> {
    let mut body = Vec::with_capacity(content_length);
    let mut chunk = vec![0u8; chunk_bytes];

    while body.len() < content_length {
        let remaining = content_length - body.len();
        let to_read = remaining.min(chunk.len());
        let n = stream
            .read(&mut chunk[..to_read])
            .await
            .map_err(|e| HttpClientError::Transport(e.into()))?;
        if n == 0 {
            return Err(HttpClientError::MalformedResponse(
                "connection closed before body completed".to_string(),
            ));
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_headers() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Type: application/json\r\nContent-Length: 42\r\n\r\n";
        let len = parse_and_validate_headers(raw).unwrap();
        assert_eq!(len, 42);
    }

    #[test]
    fn rejects_non_200_status() {
        let raw = b"HTTP/1.0 404 Not Found\r\nContent-Type: application/json\r\nContent-Length: 0\r\n\r\n";
        let err = parse_and_validate_headers(raw).unwrap_err();
        assert!(matches!(err, HttpClientError::UnexpectedStatus(404)));
    }

    #[test]
    fn rejects_non_json_content_type() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 0\r\n\r\n";
        let err = parse_and_validate_headers(raw).unwrap_err();
        assert!(matches!(err, HttpClientError::UnexpectedContentType));
    }

    #[test]
    fn content_type_match_is_case_insensitive_and_ignores_parameters() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Type: Application/JSON; charset=utf-8\r\nContent-Length: 3\r\n\r\n";
        assert_eq!(parse_and_validate_headers(raw).unwrap(), 3);
    }

    #[tokio::test]
    async fn call_round_trips_through_a_hand_rolled_http_server() {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                stream.read_exact(&mut byte).await.unwrap();
                raw.push(byte[0]);
                if raw.ends_with(b"\r\n\r\n") {
                    break;
                }
            }
            let header_text = String::from_utf8_lossy(&raw);
            let content_length: usize = header_text
                .lines()
                .find_map(|l| l.strip_prefix("Content-Length: "))
                .and_then(|v| v.trim().parse().ok())
                .unwrap();
            let mut body = vec![0u8; content_length];
            stream.read_exact(&mut body).await.unwrap();
            let request: Value = serde_json::from_slice(&body).unwrap();

            let response = serde_json::json!({
                "jsonrpc": "2.0",
                "result": format!("echo:{}", request["method"]),
                "error": null,
                "id": request["id"],
            });
            let response_body = serde_json::to_vec(&response).unwrap();
            let head = format!(
                "HTTP/1.0 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                response_body.len()
            );
            stream.write_all(head.as_bytes()).await.unwrap();
            stream.write_all(&response_body).await.unwrap();
        });

        let client = HttpClient::new(HttpClientConfig::default());
        let response = client
            .call(addr, "ping", serde_json::json!([]))
            .await
            .unwrap();
        assert_eq!(response.result, serde_json::json!("echo:ping"));

        server.await.unwrap();
    }
}
