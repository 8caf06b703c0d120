//! HTTP/1.1 client for the upstream content store.
//!
//! # Responsibilities
//! - Open one fresh TCP connection per fetch attempt (no pooling, no keep-alive)
//! - Send a literal `GET` for the candidate under the store's namespace prefix
//! - Frame and validate the response head
//! - Stream exactly `Content-Length` body bytes into a caller-provided sink
//!
//! # Design Decisions
//! - Every connect/read/write carries its own deadline
//! - The connection is owned by [`UpstreamResponse`]; dropping it closes
//!   the socket on every exit path
//! - Peak memory is one chunk per in-flight body regardless of image size

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::config::{LimitsConfig, RelayConfig, UpstreamConfig};
use crate::http::head::{read_head, HeadError};
use crate::relay::resolver::CandidatePath;
use crate::resilience::timeouts::{timed_out_io, within, write_within, Deadlines, TimedOut};
use crate::upstream::error::{BodyError, FetchError};
use crate::upstream::response::ResponseHead;

/// Connects to the content store and fetches candidate paths.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    upstream: Arc<UpstreamConfig>,
    deadlines: Deadlines,
    max_head_bytes: usize,
    max_image_bytes: u64,
    chunk_size: usize,
}

impl UpstreamClient {
    pub fn new(upstream: UpstreamConfig, deadlines: Deadlines, limits: &LimitsConfig) -> Self {
        Self {
            upstream: Arc::new(upstream),
            deadlines,
            max_head_bytes: limits.max_response_head_bytes,
            max_image_bytes: limits.max_image_bytes,
            chunk_size: limits.chunk_size.max(1),
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.upstream.clone(),
            Deadlines::from(&config.timeouts),
            &config.limits,
        )
    }

    /// Request target sent upstream for `path`.
    pub fn request_target(&self, path: &CandidatePath) -> String {
        format!("{}{}", self.upstream.path_prefix, path)
    }

    fn request_bytes(&self, path: &CandidatePath) -> Vec<u8> {
        format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.request_target(path),
            self.upstream.authority(),
        )
        .into_bytes()
    }

    /// Fetch `path` up to the end of the response head.
    ///
    /// On success the returned response holds the live connection, positioned
    /// at the first body byte.
    pub async fn fetch(&self, path: &CandidatePath) -> Result<UpstreamResponse, FetchError> {
        let stream = self.connect().await?;
        let mut stream = BufReader::new(stream);

        let request = self.request_bytes(path);
        match within(self.deadlines.io, stream.get_mut().write_all(&request)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(FetchError::WriteFailed(e)),
            Err(TimedOut(_)) => return Err(FetchError::WriteTimeout),
        }

        let framed = within(self.deadlines.io, read_head(&mut stream, self.max_head_bytes)).await;
        let raw_head = match framed {
            Ok(Ok(raw)) => raw,
            Ok(Err(HeadError::TooLarge { limit })) => {
                return Err(FetchError::HeaderTooLarge { limit })
            }
            Ok(Err(HeadError::Incomplete { received })) => {
                return Err(FetchError::HeaderIncomplete { received })
            }
            Ok(Err(HeadError::Io(e))) => return Err(FetchError::HeaderReadFailed(e)),
            Err(TimedOut(_)) => return Err(FetchError::HeaderTimeout),
        };

        let head = ResponseHead::parse(&raw_head)?;
        let (content_type, content_length) = head.accept_image(self.max_image_bytes)?;

        tracing::trace!(
            target_path = %self.request_target(path),
            status = head.status,
            content_type = %content_type,
            content_length,
            "Upstream head accepted"
        );

        Ok(UpstreamResponse {
            content_type,
            content_length,
            connection: stream,
            io_timeout: self.deadlines.io,
            chunk_size: self.chunk_size,
        })
    }

    /// Fetch `path` and stream its body straight into `sink`.
    ///
    /// Returns the accepted content type and the number of bytes written.
    pub async fn fetch_streaming<W>(
        &self,
        path: &CandidatePath,
        sink: &mut W,
    ) -> Result<(String, u64), BodyError>
    where
        W: AsyncWrite + Unpin,
    {
        let response = self.fetch(path).await?;
        let content_type = response.content_type().to_string();
        let written = response.stream_body(sink).await?;
        Ok((content_type, written))
    }

    /// Fetch `path` into memory. Thin adapter over the streaming primitive.
    pub async fn fetch_bytes(&self, path: &CandidatePath) -> Result<FetchedImage, FetchError> {
        let response = self.fetch(path).await?;
        let content_type = response.content_type().to_string();
        let mut body = Vec::with_capacity(response.content_length() as usize);
        match response.stream_body(&mut body).await {
            Ok(_) => Ok(FetchedImage { content_type, body }),
            Err(BodyError::Upstream(e)) => Err(e),
            Err(BodyError::Sink { written, source }) => Err(FetchError::BodyReadFailed {
                received: written,
                source,
            }),
        }
    }

    async fn connect(&self) -> Result<TcpStream, FetchError> {
        let addr = (self.upstream.host.as_str(), self.upstream.port);
        match within(self.deadlines.connect, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(FetchError::ConnectFailed(e)),
            Err(TimedOut(_)) => Err(FetchError::ConnectTimeout),
        }
    }
}

/// An accepted upstream response whose body has not been read yet.
#[derive(Debug)]
pub struct UpstreamResponse {
    content_type: String,
    content_length: u64,
    connection: BufReader<TcpStream>,
    io_timeout: std::time::Duration,
    chunk_size: usize,
}

impl UpstreamResponse {
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Copy exactly `content_length` bytes into `sink`, one chunk at a time.
    ///
    /// Consumes the response; the upstream connection is closed when this
    /// returns, whatever the outcome.
    pub async fn stream_body<W>(mut self, sink: &mut W) -> Result<u64, BodyError>
    where
        W: AsyncWrite + Unpin,
    {
        let expected = self.content_length;
        let chunk_len = usize::try_from(expected)
            .map_or(self.chunk_size, |len| len.min(self.chunk_size));
        let mut chunk = vec![0u8; chunk_len];
        let mut received: u64 = 0;

        while received < expected {
            let want = usize::try_from(expected - received)
                .map_or(chunk.len(), |left| left.min(chunk.len()));

            let n = match within(self.io_timeout, self.connection.read(&mut chunk[..want])).await {
                Ok(Ok(0)) => return Err(FetchError::ShortBody { expected, received }.into()),
                Ok(Ok(n)) => n,
                Ok(Err(source)) => {
                    return Err(FetchError::BodyReadFailed { received, source }.into())
                }
                Err(TimedOut(_)) => return Err(FetchError::BodyTimeout { received }.into()),
            };

            write_within(self.io_timeout, sink, &chunk[..n])
                .await
                .map_err(|source| BodyError::Sink {
                    written: received,
                    source,
                })?;
            received += n as u64;
        }

        within(self.io_timeout, sink.flush())
            .await
            .map_err(timed_out_io)
            .and_then(|r| r)
            .map_err(|source| BodyError::Sink {
                written: received,
                source,
            })?;

        Ok(received)
    }
}

/// A fully buffered image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub content_type: String,
    pub body: Vec<u8>,
}
