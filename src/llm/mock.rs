use crate::llm::UpstreamError;

pub const MOCK_PROMPT: &str = "test value";

/// Fixture returned instead of calling the image provider.
pub const MOCK_IMAGE: &[u8] = include_bytes!("../../assets/mock_image.png");

/// Deterministic offline backend. Both operations are infallible but keep the
/// provider signatures so the conversation handlers stay identical in tests.
#[derive(Debug, Clone, Copy)]
pub struct MockProvider;

impl MockProvider {
    pub fn build_prompt(&self, _user_text: &str) -> Result<String, UpstreamError> {
        Ok(MOCK_PROMPT.to_string())
    }

    pub fn generate_image(&self, _prompt: &str) -> Result<Vec<u8>, UpstreamError> {
        Ok(MOCK_IMAGE.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;

    #[tokio::test]
    async fn mock_prompt_is_deterministic() {
        let provider = Provider::Mock(MockProvider);
        let first = provider.build_prompt("funky").await.unwrap();
        let second = provider.build_prompt("elegant").await.unwrap();
        assert_eq!(first, MOCK_PROMPT);
        assert_eq!(second, MOCK_PROMPT);
    }

    #[tokio::test]
    async fn mock_image_matches_fixture_bytes() {
        let provider = Provider::Mock(MockProvider);
        let bytes = provider.generate_image(MOCK_PROMPT).await.unwrap();
        assert_eq!(bytes, MOCK_IMAGE);
        // The fixture is a real PNG so Telegram accepts it during manual runs.
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
