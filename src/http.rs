//! Minimal HTTP/1.1 framing over any tokio byte stream.
//!
//! Reads a request line, headers and a `Content-Length` or chunked body into
//! an [`ApiRequest`]; writes an [`ApiResponse`] back with an explicit length.

use crate::protocol::headers;
use crate::request::{ApiRequest, ApiResponse};
use bytes::{BufMut, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest request line or header line accepted.
const MAX_LINE: usize = 16 * 1024;
const MAX_HEADERS: usize = 100;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
}

/// A framed request plus whether the connection stays open afterwards.
#[derive(Debug)]
pub struct Incoming {
    pub request: ApiRequest,
    pub keep_alive: bool,
}

/// Read one request; `Ok(None)` when the peer closed before sending one.
pub async fn read_request<R>(
    reader: &mut R,
    max_body: usize,
) -> Result<Option<Incoming>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let Some(line) = read_line(reader).await? else {
        return Ok(None);
    };
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(HttpError::Malformed(format!("bad request line `{}`", line)));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed(format!("unsupported version {}", version)));
    }
    let mut request = ApiRequest::new(method, target);

    for _ in 0..=MAX_HEADERS {
        let line = read_line(reader)
            .await?
            .ok_or_else(|| HttpError::Malformed("connection closed in headers".into()))?;
        if line.is_empty() {
            let keep_alive = keep_alive(version, request.header("connection"));
            request.body = read_body(reader, &request, max_body).await?;
            return Ok(Some(Incoming {
                request,
                keep_alive,
            }));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::Malformed(format!("bad header `{}`", line)))?;
        request = request.with_header(name.trim(), value.trim());
    }
    Err(HttpError::Malformed("too many headers".into()))
}

fn keep_alive(version: &str, connection: Option<&str>) -> bool {
    match connection.map(|c| c.to_ascii_lowercase()) {
        Some(c) if c.contains("close") => false,
        Some(c) if c.contains("keep-alive") => true,
        _ => version == "HTTP/1.1",
    }
}

/// One CRLF-terminated line without the terminator.
async fn read_line<R>(reader: &mut R) -> Result<Option<String>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(MAX_LINE as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if !buf.ends_with(b"\n") {
        return Err(HttpError::Malformed("line too long or truncated".into()));
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| HttpError::Malformed("header is not UTF-8".into()))
}

async fn read_body<R>(
    reader: &mut R,
    request: &ApiRequest,
    max_body: usize,
) -> Result<Vec<u8>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let chunked = request
        .header("transfer-encoding")
        .map(|te| te.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);
    if chunked {
        return read_chunked(reader, max_body).await;
    }

    let length = match request.header(headers::CONTENT_LENGTH) {
        None => return Ok(Vec::new()),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| HttpError::Malformed(format!("bad content-length `{}`", raw)))?,
    };
    if length > max_body {
        return Err(HttpError::PayloadTooLarge(max_body));
    }
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

async fn read_chunked<R>(reader: &mut R, max_body: usize) -> Result<Vec<u8>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = BytesMut::new();
    loop {
        let line = read_line(reader)
            .await?
            .ok_or_else(|| HttpError::Malformed("connection closed in chunk".into()))?;
        let size_field = line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_field, 16)
            .map_err(|_| HttpError::Malformed(format!("bad chunk size `{}`", line)))?;
        if size == 0 {
            // Trailer section ends with an empty line.
            while let Some(trailer) = read_line(reader).await? {
                if trailer.is_empty() {
                    break;
                }
            }
            return Ok(body.to_vec());
        }
        if body.len() + size > max_body {
            return Err(HttpError::PayloadTooLarge(max_body));
        }
        let mut chunk = vec![0u8; size];
        reader.read_exact(&mut chunk).await?;
        body.put_slice(&chunk);
        read_line(reader).await?;
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

pub async fn write_response<W>(
    writer: &mut W,
    response: &ApiResponse,
    keep_alive: bool,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = BytesMut::with_capacity(256);
    let status = response.status;
    head.put_slice(format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status)).as_bytes());
    for (name, value) in &response.headers {
        head.put_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    head.put_slice(format!("content-length: {}\r\n", response.body.len()).as_bytes());
    let connection = if keep_alive { "keep-alive" } else { "close" };
    head.put_slice(format!("connection: {}\r\n\r\n", connection).as_bytes());

    writer.write_all(&head).await?;
    writer.write_all(&response.body).await?;
    writer.flush().await
}
