//! Relay orchestration for one downstream request.
//!
//! # Responsibilities
//! - Frame the downstream request head and extract the identifier
//! - Gate on identifier validation before any upstream I/O
//! - Try candidates strictly in resolver order, first success wins
//! - Write the image response, or the single 404 for every failure
//!
//! # Design Decisions
//! - Candidate attempts are sequential; nothing is fanned out
//! - Once the 200 head is written there is no way back: an upstream or
//!   client failure mid-body leaves a truncated response and ends the task
//! - Downstream write errors are reported as outcomes, never as panics

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::RelayConfig;
use crate::http::head::read_head;
use crate::http::request::{RequestError, RequestLine};
use crate::http::response::{image_head, DownstreamStatus, NOT_FOUND};
use crate::observability::metrics;
use crate::relay::identifier::{validate, IdentifierError};
use crate::relay::resolver::{CandidatePath, ExtensionResolver};
use crate::resilience::timeouts::{within, write_within, Deadlines};
use crate::upstream::{BodyError, FetchError, UpstreamClient};

/// Why a request ended in a 404.
#[derive(Debug)]
pub enum NotFoundReason {
    /// The request head could not be read in full.
    UnreadableHead(String),
    /// The request line was not `GET /<id> HTTP/1.x`.
    BadRequest(RequestError),
    /// The identifier failed validation; upstream was never contacted.
    InvalidIdentifier(IdentifierError),
    /// Every candidate failed.
    Exhausted { attempts: usize },
}

/// Final result of handling one downstream connection.
#[derive(Debug)]
pub enum RelayOutcome {
    /// The full body was delivered.
    Relayed {
        candidate: CandidatePath,
        content_type: String,
        bytes: u64,
    },
    /// A 200 head went out but the body was cut short.
    Truncated {
        candidate: CandidatePath,
        expected: u64,
        error: BodyError,
    },
    /// The client went away before the 200 head could be written.
    ClientGone {
        candidate: CandidatePath,
        error: std::io::Error,
    },
    NotFound(NotFoundReason),
}

impl RelayOutcome {
    /// Status line the client was sent; `None` when it left before any.
    pub fn status(&self) -> Option<DownstreamStatus> {
        match self {
            Self::NotFound(_) => Some(DownstreamStatus::NotFound),
            Self::ClientGone { .. } => None,
            Self::Relayed { .. } | Self::Truncated { .. } => Some(DownstreamStatus::Ok),
        }
    }

    /// `status` label for the request counter.
    pub fn metric_label(&self) -> &'static str {
        self.status().map_or("client_gone", DownstreamStatus::label)
    }

    pub fn is_relayed(&self) -> bool {
        matches!(self, Self::Relayed { .. })
    }
}

/// Orchestrates validation, resolution and upstream fetching.
#[derive(Debug, Clone)]
pub struct RelayHandler {
    client: UpstreamClient,
    resolver: ExtensionResolver,
    max_id_length: usize,
    max_request_head_bytes: usize,
    io_timeout: Duration,
    cache_max_age_secs: u64,
}

impl RelayHandler {
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_deadlines(config, Deadlines::from(&config.timeouts))
    }

    /// Build with explicit deadlines instead of the whole-second config values.
    pub fn with_deadlines(config: &RelayConfig, deadlines: Deadlines) -> Self {
        Self {
            client: UpstreamClient::new(config.upstream.clone(), deadlines, &config.limits),
            resolver: ExtensionResolver::new(&config.resolver),
            max_id_length: config.limits.max_id_length,
            max_request_head_bytes: config.limits.max_request_head_bytes,
            io_timeout: deadlines.io,
            cache_max_age_secs: config.response.cache_max_age_secs,
        }
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    pub fn resolver(&self) -> &ExtensionResolver {
        &self.resolver
    }

    /// Serve one downstream connection: read its request, answer it.
    pub async fn handle<S>(&self, stream: S) -> RelayOutcome
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = BufReader::new(stream);

        let head = match within(
            self.io_timeout,
            read_head(&mut stream, self.max_request_head_bytes),
        )
        .await
        {
            Ok(Ok(head)) => head,
            Ok(Err(e)) => {
                return self
                    .not_found(stream.get_mut(), NotFoundReason::UnreadableHead(e.to_string()))
                    .await
            }
            Err(e) => {
                return self
                    .not_found(stream.get_mut(), NotFoundReason::UnreadableHead(e.to_string()))
                    .await
            }
        };

        let outcome = match RequestLine::parse(&head) {
            Ok(line) => self.relay(line.raw_id(), stream.get_mut()).await,
            Err(e) => {
                self.not_found(stream.get_mut(), NotFoundReason::BadRequest(e))
                    .await
            }
        };

        // Best effort: the response is complete or abandoned either way.
        let _ = within(self.io_timeout, stream.get_mut().shutdown()).await;
        outcome
    }

    /// Relay the asset named by `raw_id` into `sink`.
    pub async fn relay<W>(&self, raw_id: &str, sink: &mut W) -> RelayOutcome
    where
        W: AsyncWrite + Unpin,
    {
        let id = match validate(raw_id, self.max_id_length) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(raw_id = %raw_id.escape_debug(), error = %e, "Rejected identifier");
                return self.not_found(sink, NotFoundReason::InvalidIdentifier(e)).await;
            }
        };

        let mut attempts = 0;
        for candidate in self.resolver.resolve(&id) {
            attempts += 1;
            tracing::debug!(
                candidate = %candidate,
                attempt = attempts,
                "Trying upstream candidate"
            );

            let response = match self.client.fetch(&candidate).await {
                Ok(response) => response,
                Err(e) => {
                    log_fetch_failure(&candidate, &e);
                    metrics::record_fetch(e.label());
                    continue;
                }
            };
            metrics::record_fetch("ok");

            let content_type = response.content_type().to_string();
            let expected = response.content_length();
            let head = image_head(&content_type, expected, self.cache_max_age_secs);
            if let Err(error) = write_within(self.io_timeout, sink, &head).await {
                tracing::debug!(
                    candidate = %candidate,
                    error = %error,
                    "Client gone before response head"
                );
                return RelayOutcome::ClientGone { candidate, error };
            }

            return match response.stream_body(sink).await {
                Ok(bytes) => {
                    metrics::record_bytes(bytes);
                    RelayOutcome::Relayed {
                        candidate,
                        content_type,
                        bytes,
                    }
                }
                Err(error) => {
                    metrics::record_bytes(error.delivered());
                    tracing::warn!(
                        candidate = %candidate,
                        expected,
                        delivered = error.delivered(),
                        error = %error,
                        "Response body truncated"
                    );
                    RelayOutcome::Truncated {
                        candidate,
                        expected,
                        error,
                    }
                }
            };
        }

        tracing::debug!(id = %id, attempts, "No candidate succeeded");
        self.not_found(sink, NotFoundReason::Exhausted { attempts })
            .await
    }

    async fn not_found<W>(&self, sink: &mut W, reason: NotFoundReason) -> RelayOutcome
    where
        W: AsyncWrite + Unpin,
    {
        if let Err(e) = write_within(self.io_timeout, sink, NOT_FOUND).await {
            tracing::debug!(error = %e, "Failed to send 404");
        }
        RelayOutcome::NotFound(reason)
    }
}

fn log_fetch_failure(candidate: &CandidatePath, error: &FetchError) {
    if error.is_content_rejection() {
        tracing::debug!(
            candidate = %candidate,
            reason = error.label(),
            error = %error,
            "Candidate rejected"
        );
    } else {
        tracing::warn!(
            candidate = %candidate,
            reason = error.label(),
            error = %error,
            "Upstream fetch failed"
        );
    }
}
