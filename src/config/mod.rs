pub mod schema;

pub use schema::RelayConfig;

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::str::FromStr;

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<RelayConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read relay config file")?;
        let config: RelayConfig =
            toml::from_str(&contents).context("Failed to parse relay config (TOML)")?;
        Ok(config)
    } else {
        Ok(RelayConfig::default())
    }
}

/// Resolve the full startup configuration: defaults, then the optional TOML
/// file (`~` expanded), then process environment overrides.
pub fn resolve(path: Option<&str>) -> Result<RelayConfig> {
    let mut config = match path {
        Some(p) => {
            let expanded = shellexpand::tilde(p).into_owned();
            load_config(Path::new(&expanded))
                .with_context(|| format!("Failed to load config from {}", expanded))?
        }
        None => RelayConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Override fields from environment variables, looked up through `lookup`.
pub fn apply_env<F>(config: &mut RelayConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("MISTRAL_API_KEY") {
        config.api_key = v.trim().to_string();
    }
    if let Some(v) = get("MISTRAL_MODEL") {
        config.model = v.trim().to_string();
    }
    if let Some(v) = get("MISTRAL_API_URL") {
        config.api_url = v.trim().to_string();
    }
    if let Some(v) = get("ALLOWED_ORIGINS") {
        config.allowed_origins = parse_origins(&v);
    }
    if let Some(v) = get("MAX_CONTENT_LENGTH") {
        config.max_content_length = parse_number("MAX_CONTENT_LENGTH", &v)?;
    }
    if let Some(v) = get("MAX_MESSAGE_LENGTH") {
        config.max_message_length = parse_number("MAX_MESSAGE_LENGTH", &v)?;
    }
    if let Some(v) = get("PORT") {
        config.port = parse_number("PORT", &v)?;
    }
    if let Some(v) = get("UPSTREAM_TIMEOUT_SECS") {
        config.upstream_timeout_secs = parse_number("UPSTREAM_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = get("MAX_BODY_BYTES") {
        config.max_body_bytes = parse_number("MAX_BODY_BYTES", &v)?;
    }

    // A zero timeout would fail every upstream call.
    if config.upstream_timeout_secs == 0 {
        bail!("UPSTREAM_TIMEOUT_SECS must be at least 1");
    }

    Ok(())
}

/// Refuse to serve without credentials for the completion service.
pub fn require_api_key(config: &RelayConfig) -> Result<()> {
    if config.api_key.is_empty() {
        bail!("MISTRAL_API_KEY environment variable is required");
    }
    Ok(())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_deployment() {
        let config = RelayConfig::default();
        assert_eq!(config.model, "mistral-small-latest");
        assert_eq!(config.max_content_length, 50_000);
        assert_eq!(config.max_message_length, 2_000);
        assert_eq!(config.port, 8080);
        assert!(config.allows_any_origin());
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn env_overrides_fields() {
        let vars = env(&[
            ("MISTRAL_API_KEY", "secret"),
            ("MISTRAL_MODEL", "mistral-large-latest"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("MAX_CONTENT_LENGTH", "1000"),
            ("MAX_MESSAGE_LENGTH", "500"),
            ("PORT", "9000"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
        ]);
        let mut config = RelayConfig::default();
        apply_env(&mut config, |k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.api_key, "secret");
        assert_eq!(config.model, "mistral-large-latest");
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(!config.allows_any_origin());
        assert_eq!(config.max_content_length, 1000);
        assert_eq!(config.max_message_length, 500);
        assert_eq!(config.port, 9000);
        assert_eq!(config.upstream_timeout().as_secs(), 5);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let vars = env(&[("MISTRAL_MODEL", "  "), ("PORT", "")]);
        let mut config = RelayConfig::default();
        apply_env(&mut config, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.model, "mistral-small-latest");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn invalid_number_is_an_error() {
        let vars = env(&[("MAX_MESSAGE_LENGTH", "lots")]);
        let mut config = RelayConfig::default();
        let err = apply_env(&mut config, |k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("MAX_MESSAGE_LENGTH"));
    }

    #[test]
    fn zero_timeout_is_an_error() {
        let vars = env(&[("UPSTREAM_TIMEOUT_SECS", "0")]);
        let mut config = RelayConfig::default();
        let err = apply_env(&mut config, |k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("UPSTREAM_TIMEOUT_SECS"));
    }

    #[test]
    fn zero_timeout_from_file_is_an_error() {
        let mut config = RelayConfig {
            upstream_timeout_secs: 0,
            ..RelayConfig::default()
        };
        assert!(apply_env(&mut config, |_| None).is_err());
    }

    #[test]
    fn body_limit_covers_configured_page_size() {
        let config = RelayConfig::default();
        assert_eq!(config.body_limit(), 16 * 1024 * 1024);

        let config = RelayConfig {
            max_content_length: 5_000_000,
            ..RelayConfig::default()
        };
        assert!(config.body_limit() >= 5_000_000 * 6);
    }

    #[test]
    fn missing_api_key_refuses_to_serve() {
        let config = RelayConfig::default();
        assert!(require_api_key(&config).is_err());

        let config = RelayConfig {
            api_key: "k".into(),
            ..RelayConfig::default()
        };
        assert!(require_api_key(&config).is_ok());
    }

    #[test]
    fn toml_file_fills_missing_fields_with_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            model = "open-mistral-nemo"
            temperature = 0.2
            allowed_origins = ["https://www.avisia.fr"]
            "#,
        )
        .unwrap();
        assert_eq!(config.model, "open-mistral-nemo");
        assert!((config.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.max_tokens, 1000);
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/avisia-chat.toml")).unwrap();
        assert_eq!(config.port, 8080);
    }
}
