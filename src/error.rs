//! Error types for the upstream completion call.

use std::time::Duration;
use thiserror::Error;

/// Why a completion call produced no usable reply.
///
/// The `Display` text is what callers see in the `error` field of a
/// degraded response.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("inference failed ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse inference response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("inference response contained no reply")]
    EmptyReply,

    #[error("inference timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Failure reported by a provider that does not speak HTTP, such as an
    /// in-process or test double provider.
    #[error("{0}")]
    Provider(String),
}
