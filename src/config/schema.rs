//! Configuration schema for the relay (TOML file, overridable from the environment).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worst-case JSON bytes per page character (`\uXXXX` escapes).
const JSON_BYTES_PER_CHAR: usize = 6;

/// Room for the message, URL and history on top of the page content.
const BODY_HEADROOM_BYTES: usize = 1024 * 1024;

/// Root configuration structure. Built once at startup and never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Service name reported by `GET /`.
    pub service_name: String,

    /// Mistral API key. Required to serve.
    pub api_key: String,

    /// Mistral API base URL.
    pub api_url: String,

    /// Model identifier sent with every completion.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Maximum tokens the model may generate per reply.
    pub max_tokens: u32,

    /// Upper bound on a single upstream call, in seconds.
    pub upstream_timeout_secs: u64,

    /// Page content beyond this many characters is truncated.
    pub max_content_length: usize,

    /// Messages longer than this many characters are flagged.
    pub max_message_length: usize,

    /// Floor for the accepted `/api/chat` body size, in bytes.
    pub max_body_bytes: usize,

    /// Origins allowed to call the API. `*` allows any.
    pub allowed_origins: Vec<String>,

    /// Interface to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            service_name: "Avisia Chatbot API - Mistral Edition".into(),
            api_key: String::new(),
            api_url: "https://api.mistral.ai".into(),
            model: "mistral-small-latest".into(),
            temperature: 0.7,
            max_tokens: 1000,
            upstream_timeout_secs: 30,
            max_content_length: 50_000,
            max_message_length: 2_000,
            max_body_bytes: 16 * 1024 * 1024,
            allowed_origins: vec!["*".into()],
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl RelayConfig {
    /// Timeout applied around each upstream call.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Largest `/api/chat` body accepted. Oversized pages must still reach
    /// truncation, so this never drops below what `max_content_length` needs.
    pub fn body_limit(&self) -> usize {
        let page_bytes = self
            .max_content_length
            .saturating_mul(JSON_BYTES_PER_CHAR)
            .saturating_add(BODY_HEADROOM_BYTES);
        self.max_body_bytes.max(page_bytes)
    }

    /// Whether cross-origin calls are accepted from any host.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
