pub mod mock;
pub mod openai;

use crate::config::Config;

pub use mock::MockProvider;
pub use openai::OpenAiClient;

#[derive(Debug, thiserror::Error)]
#[error("AI provider request failed: {0}")]
pub struct UpstreamError(pub String);

/// The generation capability handed to the conversation handlers. A closed
/// set of backends so tests can substitute the deterministic one without
/// touching the environment at call sites.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(OpenAiClient),
    Mock(MockProvider),
}

impl Provider {
    pub fn from_config(config: &Config) -> Self {
        if config.mock_mode {
            Provider::Mock(MockProvider)
        } else {
            Provider::OpenAi(OpenAiClient::new(config))
        }
    }

    /// Turns the raw user text into a refined image-generation prompt.
    pub async fn build_prompt(&self, user_text: &str) -> Result<String, UpstreamError> {
        match self {
            Provider::OpenAi(client) => client.build_prompt(user_text).await,
            Provider::Mock(mock) => mock.build_prompt(user_text),
        }
    }

    /// Renders the refined prompt into opaque PNG bytes.
    pub async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, UpstreamError> {
        match self {
            Provider::OpenAi(client) => client.generate_image(prompt).await,
            Provider::Mock(mock) => mock.generate_image(prompt),
        }
    }
}
