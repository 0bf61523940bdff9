use super::adapter::{SchedulingOracle, SYSTEM_PREAMBLE};
use crate::error::{oracle_error, AppResult};
use async_trait::async_trait;
use rig::completion::{Chat, Message};
use rig::providers::gemini::Client as GeminiClient;
use tracing::info;

/// Google Gemini through Rig
pub struct GeminiOracle {
    client: GeminiClient,
    model: String,
    temperature: f64,
}

impl GeminiOracle {
    pub fn new(api_key: &str, model: &str, temperature: f64) -> Self {
        info!("Using Gemini model: {}", model);
        Self {
            client: GeminiClient::new(api_key),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl SchedulingOracle for GeminiOracle {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(SYSTEM_PREAMBLE)
            .temperature(self.temperature)
            .build();

        let response = agent
            .chat(prompt.to_string(), Vec::<Message>::new())
            .await
            .map_err(|e| oracle_error(&format!("Gemini request failed: {}", e)))?;

        info!("Received response from Gemini");
        Ok(response)
    }
}

/// Stand-in used when no API key is configured; every call fails
#[derive(Debug, Default)]
pub struct DisabledOracle;

#[async_trait]
impl SchedulingOracle for DisabledOracle {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn complete(&self, _prompt: &str) -> AppResult<String> {
        Err(oracle_error("No oracle configured, set GEMINI_API_KEY"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_oracle_always_fails() {
        let oracle = DisabledOracle;
        assert_eq!(oracle.name(), "disabled");
        assert!(oracle.complete("anything").await.is_err());
    }
}
