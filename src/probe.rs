//! One-shot upstream probe used by the `probe` command.
//!
//! Runs the same validate → resolve → fetch sequence as the relay, but
//! reports every attempt instead of answering a client.

use std::path::Path;

use thiserror::Error;

use crate::config::RelayConfig;
use crate::relay::{validate, CandidatePath, ExtensionResolver, IdentifierError};
use crate::upstream::{BodyError, FetchError, UpstreamClient};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One candidate attempt.
#[derive(Debug)]
pub struct ProbeAttempt {
    pub candidate: CandidatePath,
    pub target: String,
    pub result: Result<(String, u64), FetchError>,
}

/// Every attempt made, in order. The last one is the success, if any.
#[derive(Debug, Default)]
pub struct ProbeReport {
    pub attempts: Vec<ProbeAttempt>,
}

impl ProbeReport {
    pub fn success(&self) -> Option<&ProbeAttempt> {
        self.attempts.iter().find(|a| a.result.is_ok())
    }
}

/// Probe `raw_id` against the configured upstream.
///
/// With `output`, the winning body is buffered and written to that file;
/// otherwise it is streamed and discarded.
pub async fn probe(
    config: &RelayConfig,
    raw_id: &str,
    output: Option<&Path>,
) -> Result<ProbeReport, ProbeError> {
    let id = validate(raw_id, config.limits.max_id_length)?;
    let resolver = ExtensionResolver::new(&config.resolver);
    let client = UpstreamClient::from_config(config);
    let mut report = ProbeReport::default();

    for candidate in resolver.resolve(&id) {
        let target = client.request_target(&candidate);
        let result = match output {
            Some(path) => match client.fetch_bytes(&candidate).await {
                Ok(image) => {
                    tokio::fs::write(path, &image.body)
                        .await
                        .map_err(|source| ProbeError::Output {
                            path: path.display().to_string(),
                            source,
                        })?;
                    Ok((image.content_type, image.body.len() as u64))
                }
                Err(e) => Err(e),
            },
            None => match client
                .fetch_streaming(&candidate, &mut tokio::io::sink())
                .await
            {
                Ok(found) => Ok(found),
                Err(BodyError::Upstream(e)) => Err(e),
                Err(BodyError::Sink { written, source }) => {
                    Err(FetchError::BodyReadFailed { received: written, source })
                }
            },
        };

        let done = result.is_ok();
        report.attempts.push(ProbeAttempt {
            candidate,
            target,
            result,
        });
        if done {
            break;
        }
    }

    Ok(report)
}
