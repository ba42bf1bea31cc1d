use std::env;

use anyhow::{anyhow, Result};
use teloxide::types::ChatId;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_bot_token: String,
    pub completion_api_key: String,
    pub image_api_key: String,
    pub admin_chat_ids: Vec<ChatId>,
    pub mock_mode: bool,
    pub log_level: String,
    pub completion_model: String,
    pub completion_max_tokens: u32,
    pub completion_temperature: f32,
    pub image_model: String,
    pub image_size: String,
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

/// Parses a comma-separated list of Telegram chat ids, skipping entries that
/// do not parse as integers.
pub fn parse_chat_id_list(value: &str) -> Vec<ChatId> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| entry.parse::<i64>().ok())
        .map(ChatId)
        .collect()
}

impl Config {
    pub fn load() -> Result<Self> {
        let bot_token = env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN is required"));
        }

        let mock_mode = env_bool("MOCK_MODE", false);

        let completion_api_key = env_string("OPENAI_API_TOKEN", "");
        if completion_api_key.trim().is_empty() && !mock_mode {
            return Err(anyhow!(
                "OPENAI_API_TOKEN is required unless MOCK_MODE is enabled"
            ));
        }

        let image_api_key = {
            let value = env_string("IMAGE_API_TOKEN", "");
            if value.trim().is_empty() {
                completion_api_key.clone()
            } else {
                value
            }
        };

        let admin_bot_token = {
            let value = env_string("ADMIN_BOT_TOKEN", "");
            if value.trim().is_empty() {
                bot_token.clone()
            } else {
                value
            }
        };

        Ok(Config {
            bot_token,
            admin_bot_token,
            completion_api_key,
            image_api_key,
            admin_chat_ids: parse_chat_id_list(&env_string("ADMIN_CHAT_IDS", "")),
            mock_mode,
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            completion_model: env_string("COMPLETION_MODEL", "gpt-3.5-turbo"),
            completion_max_tokens: env_u32("COMPLETION_MAX_TOKENS", 500),
            completion_temperature: env_f32("COMPLETION_TEMPERATURE", 0.7),
            image_model: env_string("IMAGE_MODEL", "dall-e-3"),
            image_size: env_string("IMAGE_SIZE", "1024x1024"),
        })
    }
}

pub const COMPLETION_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

pub const PROMPT_TEMPLATE: &str = r#"User says: {user_message}

Please respond with a description of an image based on the description that the user provided. The image should be of a font grid, which will be used for image generation. Your goal is to generate good-looking concepts for font styles. For instance, if the user says "funky", you should respond with "font grid with a funky aesthetic, thick lines, 1980s style, empathizing the curves of the letters"
"#;

pub const WELCOME_CAPTION: &str = "Hi! Describe the style of font you would like - a single word like \"funky\" works - and I will draw a type specimen concept for you.";

pub const PROCESSING_MESSAGE: &str = "Give me a moment while I sketch your font concept...";

pub const GENERIC_FAILURE_MESSAGE: &str =
    "Sorry, I encountered an error while processing your message. Please try again.";
