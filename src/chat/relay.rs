//! One visitor turn: gate → bound → assemble → complete → map.
//!
//! 1. Reject empty messages
//! 2. Screen the message for injection attempts
//! 3. Truncate the page content
//! 4. Assemble system + history + message
//! 5. Call the completion provider under a timeout
//! 6. Map success or failure to a reply

use crate::chat::{context, injection_defense, system_prompt};
use crate::chat::injection_defense::{FlagReason, Verdict};
use crate::config::RelayConfig;
use crate::error::InferenceError;
use crate::inference::CompletionProvider;
use crate::types::*;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reply to a message the sanitizer flagged.
pub const REDIRECT_REPLY: &str = "Je suis là pour répondre à vos questions sur le contenu de cette page. \
Pourriez-vous reformuler votre question ?";

/// Reply when the upstream call fails.
pub const APOLOGY_REPLY: &str = "Désolé, une erreur est survenue lors du traitement de votre demande. \
Merci de réessayer.";

/// Reply to an empty message.
pub const EMPTY_MESSAGE_REPLY: &str = "Veuillez saisir une question.";

pub const EMPTY_MESSAGE_ERROR: &str = "Message cannot be empty";

/// How a visitor turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Empty or whitespace-only message. The only client error.
    Rejected,
    /// Flagged by the sanitizer; the provider was not called.
    Redirected(FlagReason),
    /// The model replied.
    Answered(String),
    /// The call failed; carries the failure description.
    Degraded(String),
}

impl Outcome {
    /// Short label, exposed to clients in the `x-chat-outcome` header.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Rejected => OutcomeKind::Rejected,
            Self::Redirected(_) => OutcomeKind::Redirected,
            Self::Answered(_) => OutcomeKind::Answered,
            Self::Degraded(_) => OutcomeKind::Degraded,
        }
    }

    /// Wire body for this outcome.
    pub fn into_chat_response(self) -> ChatResponse {
        match self {
            Self::Rejected => ChatResponse::degraded(EMPTY_MESSAGE_REPLY, EMPTY_MESSAGE_ERROR),
            Self::Redirected(_) => ChatResponse::reply(REDIRECT_REPLY),
            Self::Answered(text) => ChatResponse::reply(text),
            Self::Degraded(err) => ChatResponse::degraded(APOLOGY_REPLY, err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Rejected,
    Redirected,
    Answered,
    Degraded,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Redirected => "redirected",
            Self::Answered => "answered",
            Self::Degraded => "degraded",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relays visitor turns to the completion provider. Stateless across calls.
#[derive(Clone)]
pub struct ChatRelay {
    config: Arc<RelayConfig>,
    provider: Arc<dyn CompletionProvider>,
}

impl ChatRelay {
    pub fn new(config: Arc<RelayConfig>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Handle one visitor turn. Never fails: every path ends in an [`Outcome`].
    pub async fn respond(&self, request: &ChatRequest) -> Outcome {
        if request.message.trim().is_empty() {
            debug!("Rejecting empty message");
            return Outcome::Rejected;
        }

        if let Verdict::Flagged(reason) =
            injection_defense::inspect(&request.message, self.config.max_message_length)
        {
            warn!(
                "Flagged message redirected ({}), page: {}",
                reason, request.page_url
            );
            return Outcome::Redirected(reason);
        }

        match self.complete(request).await {
            Ok(text) => Outcome::Answered(text),
            Err(e) => {
                error!("Error processing chat request: {}", e);
                Outcome::Degraded(e.to_string())
            }
        }
    }

    /// Assemble the turns and call the provider once, bounded by the configured timeout.
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        let page_content =
            context::truncate_page_content(&request.page_content, self.config.max_content_length);
        let system_prompt = system_prompt::build_system_prompt(&request.page_url, &page_content);
        let messages = context::build_messages(
            &system_prompt,
            &request.conversation_history,
            &request.message,
        );

        let completion_request = CompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let timeout = self.config.upstream_timeout();
        let completion = tokio::time::timeout(timeout, self.provider.complete(completion_request))
            .await
            .map_err(|_| InferenceError::Timeout(timeout))??;

        info!(
            "Reply from {} ({} tokens)",
            self.provider.name(),
            completion.usage.total_tokens
        );
        Ok(completion.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::injection_defense::InjectionCategory;

    #[test]
    fn outcomes_map_to_wire_bodies() {
        assert_eq!(
            Outcome::Answered("Bonjour".into()).into_chat_response(),
            ChatResponse::reply("Bonjour")
        );
        assert_eq!(
            Outcome::Redirected(FlagReason::Pattern(InjectionCategory::Jailbreak))
                .into_chat_response(),
            ChatResponse::reply(REDIRECT_REPLY)
        );
        assert_eq!(
            Outcome::Degraded("boom".into()).into_chat_response(),
            ChatResponse::degraded(APOLOGY_REPLY, "boom")
        );
        assert_eq!(
            Outcome::Rejected.into_chat_response().error.as_deref(),
            Some(EMPTY_MESSAGE_ERROR)
        );
    }

    #[test]
    fn kinds_render_as_header_values() {
        assert_eq!(Outcome::Rejected.kind().as_str(), "rejected");
        assert_eq!(Outcome::Answered(String::new()).kind().to_string(), "answered");
    }
}
