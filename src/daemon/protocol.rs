//! IPC protocol types and framing for daemon communication.
//!
//! Messages are framed as 4 bytes of big-endian length followed by a JSON
//! body. The original pipe daemon read socket payloads until peer EOF with
//! no framing at all; length-prefixed frames replace that so a truncated
//! write is detected instead of silently accepted, and a connection can
//! carry more than one request.

use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum message size (16 MB) to prevent memory exhaustion.
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Request envelope sent from CLI to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request identifier for correlating responses.
    pub id: u64,
    /// The operation to perform.
    pub op: Operation,
}

impl Request {
    pub fn new(id: u64, op: Operation) -> Self {
        Self { id, op }
    }
}

/// Response envelope sent from daemon to CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Request ID this response corresponds to.
    pub id: u64,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Response body (operation-specific data).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Error message if ok is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Create a successful response with a body.
    pub fn ok(id: u64, body: impl Serialize) -> Self {
        Self {
            id,
            ok: true,
            body: Some(serde_json::to_value(body).unwrap_or(serde_json::Value::Null)),
            error: None,
        }
    }

    /// Create a successful response with no body.
    pub fn ok_empty(id: u64) -> Self {
        Self {
            id,
            ok: true,
            body: None,
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            body: None,
            error: Some(error.into()),
        }
    }
}

/// Operations supported by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Operation {
    /// Check if the daemon is alive.
    Ping,
    /// Report runtime info (pid, endpoint paths, provider).
    Status,
    /// Run a prompt through the completion client.
    Complete(CompleteRequest),
    /// Request daemon shutdown.
    Shutdown,
}

/// Payload for the `Complete` operation.
///
/// Unset fields fall back to the daemon's configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteRequest {
    /// The prompt text.
    pub prompt: String,
    /// Retry budget override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tries: Option<u32>,
    /// Token limit override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Body of a successful `Status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBody {
    pub pid: u32,
    pub version: String,
    pub pipe_path: String,
    pub socket_path: String,
    pub provider: String,
}

/// Write a length-delimited frame to an async writer.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    if data.len() > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "message too large: {} bytes (max {})",
                data.len(),
                MAX_MESSAGE_SIZE
            ),
        ));
    }

    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-delimited frame from an async reader.
///
/// Fails with EOF if the peer closed mid-frame, `InvalidData` if the header
/// claims a message larger than [`MAX_MESSAGE_SIZE`].
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf);

    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {} bytes (max {})", len, MAX_MESSAGE_SIZE),
        ));
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Serialize and write a request to an async writer.
pub async fn write_request<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    request: &Request,
) -> io::Result<()> {
    let json =
        serde_json::to_vec(request).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_frame(writer, &json).await
}

/// Read and deserialize a request from an async reader.
pub async fn read_request<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<Request> {
    let data = read_frame(reader).await?;
    serde_json::from_slice(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Serialize and write a response to an async writer.
pub async fn write_response<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &Response,
) -> io::Result<()> {
    let json =
        serde_json::to_vec(response).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_frame(writer, &json).await
}

/// Read and deserialize a response from an async reader.
pub async fn read_response<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<Response> {
    let data = read_frame(reader).await?;
    serde_json::from_slice(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn request_serialization_roundtrip() {
        let request = Request::new(42, Operation::Ping);
        let json = serde_json::to_string(&request).unwrap();
        let deserialized: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.id, 42);
        assert!(matches!(deserialized.op, Operation::Ping));
    }

    #[test]
    fn operation_tagged_serialization() {
        let op = Operation::Complete(CompleteRequest {
            prompt: "hello".to_string(),
            tries: Some(5),
            ..Default::default()
        });
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains(r#""type":"Complete""#));
        assert!(json.contains(r#""data""#));

        let deserialized: Operation = serde_json::from_str(&json).unwrap();
        if let Operation::Complete(req) = deserialized {
            assert_eq!(req.prompt, "hello");
            assert_eq!(req.tries, Some(5));
            assert_eq!(req.max_tokens, None);
        } else {
            panic!("Expected Complete operation");
        }
    }

    #[test]
    fn unit_variant_serialization() {
        let json = serde_json::to_string(&Operation::Shutdown).unwrap();
        assert!(json.contains(r#""type":"Shutdown""#));
        assert!(!json.contains(r#""data""#));
    }

    #[test]
    fn response_err_serialization() {
        let response = Response::err(2, "something went wrong");
        let json = serde_json::to_string(&response).unwrap();
        let deserialized: Response = serde_json::from_str(&json).unwrap();
        assert!(!deserialized.ok);
        assert!(deserialized.body.is_none());
        assert_eq!(deserialized.error.unwrap(), "something went wrong");
    }

    #[test]
    fn response_ok_empty_skips_none_fields() {
        let json = serde_json::to_string(&Response::ok_empty(3)).unwrap();
        assert!(!json.contains("body"));
        assert!(!json.contains("error"));
    }

    #[tokio::test]
    async fn frame_roundtrip() {
        let data = b"hello, world!";

        let mut buf = Vec::new();
        write_frame(&mut buf, data).await.unwrap();

        assert_eq!(buf.len(), 4 + data.len());
        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        assert_eq!(len as usize, data.len());

        let mut reader = Cursor::new(buf);
        let read_data = read_frame(&mut reader).await.unwrap();
        assert_eq!(read_data, data);
    }

    #[tokio::test]
    async fn request_response_roundtrip() {
        let request = Request::new(
            123,
            Operation::Complete(CompleteRequest {
                prompt: "summarize this".to_string(),
                tries: None,
                max_tokens: Some(64),
                temperature: Some(0.1),
            }),
        );

        let mut buf = Vec::new();
        write_request(&mut buf, &request).await.unwrap();

        let mut reader = Cursor::new(buf);
        let read_back = read_request(&mut reader).await.unwrap();

        assert_eq!(read_back.id, 123);
        if let Operation::Complete(req) = read_back.op {
            assert_eq!(req.prompt, "summarize this");
            assert_eq!(req.max_tokens, Some(64));
        } else {
            panic!("Expected Complete");
        }
    }

    #[tokio::test]
    async fn read_frame_size_limit() {
        let mut buf = Vec::new();
        let oversized_len = MAX_MESSAGE_SIZE + 1;
        buf.extend_from_slice(&oversized_len.to_be_bytes());
        buf.extend_from_slice(b"some data");

        let mut reader = Cursor::new(buf);
        let result = read_frame(&mut reader).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("message too large"));
    }

    #[tokio::test]
    async fn write_frame_size_limit() {
        let oversized = vec![0u8; (MAX_MESSAGE_SIZE + 1) as usize];
        let mut buf = Vec::new();
        assert!(write_frame(&mut buf, &oversized).await.is_err());
    }

    #[tokio::test]
    async fn multiple_frames_on_one_stream() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"first").await.unwrap();
        write_frame(&mut buf, b"second").await.unwrap();

        let mut reader = Cursor::new(buf);
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"first");
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"complete payload").await.unwrap();
        buf.truncate(buf.len() - 4); // peer died mid-write

        let mut reader = Cursor::new(buf);
        assert!(read_frame(&mut reader).await.is_err());
    }
}
