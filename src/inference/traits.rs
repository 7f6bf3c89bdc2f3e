//! Completion provider trait, the seam between the relay and the upstream model.

use crate::error::InferenceError;
use crate::types::{Completion, CompletionRequest};
use async_trait::async_trait;

/// A hosted text-completion service.
///
/// Implementations must tolerate concurrent calls from many in-flight requests.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Generate a reply for the given ordered turns.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, InferenceError>;
}
