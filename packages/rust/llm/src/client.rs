//! Retrying generation client.

use std::time::Duration;

use async_trait::async_trait;
use reportgen_shared::{BackendConfig, GenerationConfig, Result};
use tracing::{debug, instrument, warn};

use crate::backend::{ChatBackend, CompletionRequest, OpenAiBackend};
use crate::demo::DemoBackend;
use crate::{Generation, GenerationService};

/// Request tuning shared by every call.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub system_prompt: String,
    pub temperature: f32,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl From<&GenerationConfig> for ClientSettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

/// Production [`GenerationService`]: a backend plus retry and placeholder
/// handling.
pub struct LlmClient {
    backend: Box<dyn ChatBackend>,
    settings: ClientSettings,
}

impl LlmClient {
    pub fn new(backend: Box<dyn ChatBackend>, settings: ClientSettings) -> Self {
        Self { backend, settings }
    }

    /// Build the client described by the `[backend]` and `[generation]`
    /// config sections.
    ///
    /// A missing OpenAI key is not an error here; calls will be refused by the
    /// service and surface as placeholders.
    pub fn from_config(backend: &BackendConfig, generation: &GenerationConfig) -> Result<Self> {
        let timeout = Duration::from_secs(generation.timeout_secs);
        let chat: Box<dyn ChatBackend> = match backend {
            BackendConfig::OpenAi {
                model,
                base_url,
                api_key_env,
            } => {
                let key = std::env::var(api_key_env).ok();
                Box::new(OpenAiBackend::new(
                    "openai",
                    model,
                    base_url,
                    key.as_deref(),
                    timeout,
                )?)
            }
            BackendConfig::Vllm { model, base_url } => {
                Box::new(OpenAiBackend::new("vllm", model, base_url, None, timeout)?)
            }
            BackendConfig::Demo => Box::new(DemoBackend::new()),
        };

        Ok(Self::new(chat, ClientSettings::from(generation)))
    }

    /// Offline client backed by [`DemoBackend`].
    pub fn demo() -> Self {
        Self::new(Box::new(DemoBackend::new()), ClientSettings::default())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.settings.retry_base_delay * 2u32.saturating_pow(attempt)
    }
}

#[async_trait]
impl GenerationService for LlmClient {
    #[instrument(skip_all, fields(backend = %self.backend.name(), max_output))]
    async fn generate(&self, prompt: &str, max_output: u32) -> Generation {
        let request = CompletionRequest {
            system: &self.settings.system_prompt,
            prompt,
            max_tokens: max_output,
            temperature: self.settings.temperature,
        };

        let mut attempt = 0;
        loop {
            match self.backend.complete(&request).await {
                Ok(text) => {
                    debug!(attempt, chars = text.chars().count(), "generation succeeded");
                    return Generation::model(text);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        code = e.code(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(attempt, code = e.code(), error = %e, "generation failed");
                    return Generation::placeholder(e.kind(), &e.to_string());
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.backend.name(), self.backend.model())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Origin;
    use reportgen_shared::ErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_settings() -> ClientSettings {
        ClientSettings {
            retry_base_delay: Duration::from_millis(1),
            ..ClientSettings::default()
        }
    }

    fn client_for(server: &MockServer) -> LlmClient {
        let backend = OpenAiBackend::new(
            "vllm",
            "test-model",
            format!("{}/v1", server.uri()),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        LlmClient::new(Box::new(backend), fast_settings())
    }

    fn ok_body(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": content}}]
        }))
    }

    #[tokio::test]
    async fn success_yields_model_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ok_body("Section text."))
            .expect(1)
            .mount(&server)
            .await;

        let generation = client_for(&server).generate("write", 200).await;
        assert_eq!(generation, Generation::model("Section text."));
    }

    #[tokio::test]
    async fn server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ok_body("Recovered."))
            .expect(1)
            .mount(&server)
            .await;

        let generation = client_for(&server).generate("write", 200).await;
        assert_eq!(generation.origin, Origin::Model);
        assert_eq!(generation.text, "Recovered.");
    }

    #[tokio::test]
    async fn auth_failure_becomes_placeholder_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "invalid key"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let generation = client_for(&server).generate("write", 200).await;
        assert_eq!(
            generation.origin,
            Origin::Placeholder(ErrorKind::ServiceUnreachable)
        );
        assert!(generation.text.contains("invalid key"));
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let generation = client_for(&server).generate("write", 200).await;
        assert!(generation.is_placeholder());
    }

    #[tokio::test]
    async fn unreachable_host_becomes_placeholder() {
        let backend = OpenAiBackend::new(
            "vllm",
            "m",
            "http://127.0.0.1:9/v1",
            None,
            Duration::from_millis(500),
        )
        .unwrap();
        let client = LlmClient::new(
            Box::new(backend),
            ClientSettings {
                max_retries: 0,
                ..fast_settings()
            },
        );

        let generation = client.generate("write", 10).await;
        assert_eq!(
            generation.origin,
            Origin::Placeholder(ErrorKind::ServiceUnreachable)
        );
    }

    #[test]
    fn backoff_doubles() {
        let client = LlmClient::new(
            Box::new(DemoBackend::new()),
            ClientSettings {
                retry_base_delay: Duration::from_millis(100),
                ..ClientSettings::default()
            },
        );
        assert_eq!(client.backoff(0), Duration::from_millis(100));
        assert_eq!(client.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn from_config_describes_backend() {
        let client =
            LlmClient::from_config(&BackendConfig::Demo, &GenerationConfig::default()).unwrap();
        assert_eq!(client.describe(), "demo/demo");

        let vllm = BackendConfig::Vllm {
            model: "qwen".into(),
            base_url: "http://localhost:8000/v1".into(),
        };
        let client = LlmClient::from_config(&vllm, &GenerationConfig::default()).unwrap();
        assert_eq!(client.describe(), "vllm/qwen");
    }
}
