//! GeminiBrain implementation using the generateContent API.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use brain_core::{async_trait, Brain, BrainError, ChatTurn, GenerationRequest, TurnRole};
use reqwest::Client;
use tracing::{debug, info};

use crate::api_types::{
    ApiError, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};
use crate::config::GeminiBrainConfig;

/// A [`Brain`] backed by the Gemini generateContent endpoint.
///
/// The brain is stateless: conversation history arrives with every request
/// from the transcript store.
pub struct GeminiBrain {
    client: Client,
    config: GeminiBrainConfig,
}

impl GeminiBrain {
    /// Create a new GeminiBrain with the given configuration.
    pub fn new(config: GeminiBrainConfig) -> Result<Self, BrainError> {
        if config.api_key.is_empty() {
            return Err(BrainError::Configuration("API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrainError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "GeminiBrain initialized with model: {}, timeout: {:?}",
            config.model, config.timeout
        );

        Ok(Self { client, config })
    }

    /// Create a GeminiBrain from environment variables.
    ///
    /// See [`GeminiBrainConfig::from_env`] for required environment variables.
    pub fn from_env() -> Result<Self, BrainError> {
        Self::new(GeminiBrainConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &GeminiBrainConfig {
        &self.config
    }

    /// Build the request body for a generation request.
    fn build_body(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let system_instruction = if request.system_instruction.trim().is_empty() {
            None
        } else {
            Some(Content::system(request.system_instruction.clone()))
        };

        let contents = request.turns.iter().map(turn_to_content).collect();

        GenerateContentRequest {
            system_instruction,
            contents,
            generation_config: Some(GenerationConfig {
                temperature: request.temperature.or(self.config.temperature),
                max_output_tokens: request.max_tokens.or(self.config.max_tokens),
            }),
        }
    }
}

/// Map one turn to the API's content block.
fn turn_to_content(turn: &ChatTurn) -> Content {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Assistant => "model",
    };

    let mut parts = Vec::with_capacity(2);
    if !turn.text.is_empty() {
        parts.push(Part::text(turn.text.clone()));
    }
    if let Some(ref image) = turn.image {
        parts.push(Part::inline(image.mime_type.clone(), BASE64.encode(&image.data)));
    }
    if parts.is_empty() {
        // The API rejects empty parts arrays.
        parts.push(Part::text(" "));
    }

    Content {
        role: Some(role.to_string()),
        parts,
    }
}

/// Extract the best error message from a failed response body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => api_error.error.message,
        Err(_) => body.chars().take(500).collect(),
    }
}

#[async_trait]
impl Brain for GeminiBrain {
    async fn generate(&self, request: GenerationRequest) -> Result<String, BrainError> {
        let url = self.config.generate_url();
        let body = self.build_body(&request);

        debug!(
            "Sending generateContent request: model={}, turns={}",
            self.config.model,
            body.contents.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrainError::Timeout
                } else {
                    BrainError::Network(format!("Failed to send request: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BrainError::from_status(status.as_u16(), error_message(&error_text)));
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| BrainError::Network(format!("Failed to parse response: {}", e)))?;

        if let Some(ref usage) = completion.usage_metadata {
            debug!(
                "Token usage - prompt: {}, completion: {}, total: {}",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        completion.text().ok_or(BrainError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "GeminiBrain"
    }
}
