// Test doubles shared by the integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use avisia_chat::chat::ChatRelay;
use avisia_chat::config::RelayConfig;
use avisia_chat::error::InferenceError;
use avisia_chat::inference::CompletionProvider;
use avisia_chat::server::create_router;
use avisia_chat::types::{Completion, CompletionRequest, TokenUsage};
use axum::Router;

/// What the mock provider does when called.
#[derive(Clone, Debug)]
pub enum MockBehavior {
    Reply(String),
    Fail(String),
    Hang(Duration),
    Panic,
}

/// Completion provider that records every request it receives.
pub struct MockProvider {
    behavior: MockBehavior,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(MockBehavior::Reply(text.to_string()))
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Self::new(MockBehavior::Fail(reason.to_string()))
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, InferenceError> {
        self.calls.lock().unwrap().push(request);

        match &self.behavior {
            MockBehavior::Reply(text) => Ok(Completion {
                content: text.clone(),
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                },
            }),
            MockBehavior::Fail(reason) => Err(InferenceError::Provider(reason.clone())),
            MockBehavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Err(InferenceError::Provider("mock woke up".into()))
            }
            MockBehavior::Panic => panic!("mock provider exploded"),
        }
    }
}

/// Config with a key set and everything else at defaults.
pub fn test_config() -> RelayConfig {
    RelayConfig {
        api_key: "test-key".into(),
        ..RelayConfig::default()
    }
}

/// Router wired to the given provider.
pub fn test_app(config: RelayConfig, provider: Arc<MockProvider>) -> Router {
    create_router(ChatRelay::new(Arc::new(config), provider))
}
