//! Chat-completions backends for flightdeck.
//!
//! All backends implement `flightdeck_core::ChatModel`.

pub mod openai_compat;

use std::sync::Arc;

use flightdeck_config::AppConfig;
use flightdeck_core::error::ProviderError;
use flightdeck_core::provider::ChatModel;

pub use openai_compat::OpenAiCompatProvider;

/// Build the configured chat model.
///
/// Local endpoints (Ollama) don't need a key; everything else does.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn ChatModel>, ProviderError> {
    let provider = &config.provider;

    let api_key = match (&provider.api_key, provider.name.as_str()) {
        (Some(key), _) => key.clone(),
        (None, "ollama") => "ollama".to_string(),
        (None, _) => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{}' (set FLIGHTDECK_API_KEY or OPENAI_API_KEY)",
                provider.name
            )));
        }
    };

    Ok(Arc::new(OpenAiCompatProvider::new(
        provider.name.clone(),
        provider.base_url.clone(),
        api_key,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_not_configured() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut config = AppConfig::default();
        config.provider.name = "ollama".into();
        config.provider.base_url = "http://localhost:11434/v1".into();
        let model = build_from_config(&config).unwrap();
        assert_eq!(model.name(), "ollama");
    }

    #[test]
    fn keyed_provider_builds() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-test".into());
        let model = build_from_config(&config).unwrap();
        assert_eq!(model.name(), "openai");
    }
}
