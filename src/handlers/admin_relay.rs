use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile};
use tracing::{debug, warn};

use crate::config::Config;

/// One fire-and-forget report to the operator chats.
#[derive(Debug, Clone)]
pub struct AdminNotification {
    pub text: String,
    pub image: Option<Vec<u8>>,
    pub username: String,
}

impl AdminNotification {
    pub fn text(username: &str, text: impl Into<String>) -> Self {
        AdminNotification {
            text: text.into(),
            image: None,
            username: username.to_string(),
        }
    }

    pub fn image(username: &str, caption: impl Into<String>, bytes: Vec<u8>) -> Self {
        AdminNotification {
            text: caption.into(),
            image: Some(bytes),
            username: username.to_string(),
        }
    }
}

/// Where relay deliveries go. A closed set of backends, like `Provider`, so
/// tests can observe the notification sequence without a live bot.
enum RelaySink {
    Telegram(Bot),
    Disabled,
    #[cfg(test)]
    Recording(std::sync::Mutex<Vec<AdminNotification>>),
}

/// Mirrors user traffic and errors to a fixed list of operator chats.
/// Deliveries run sequentially; a failed recipient is logged and skipped so
/// the relay never raises to the conversation handlers.
pub struct AdminRelay {
    sink: RelaySink,
    recipients: Vec<ChatId>,
}

impl AdminRelay {
    pub fn from_config(config: &Config) -> Self {
        if config.admin_chat_ids.is_empty() {
            return AdminRelay::disabled();
        }
        AdminRelay {
            sink: RelaySink::Telegram(Bot::new(config.admin_bot_token.clone())),
            recipients: config.admin_chat_ids.clone(),
        }
    }

    pub fn disabled() -> Self {
        AdminRelay {
            sink: RelaySink::Disabled,
            recipients: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn recording() -> Self {
        AdminRelay {
            sink: RelaySink::Recording(std::sync::Mutex::new(Vec::new())),
            recipients: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn recorded(&self) -> Vec<AdminNotification> {
        match &self.sink {
            RelaySink::Recording(log) => log.lock().unwrap().clone(),
            _ => Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.sink, RelaySink::Disabled)
    }

    pub async fn notify(&self, notification: AdminNotification) {
        let bot = match &self.sink {
            RelaySink::Telegram(bot) => bot,
            RelaySink::Disabled => return,
            #[cfg(test)]
            RelaySink::Recording(log) => {
                log.lock().unwrap().push(notification);
                return;
            }
        };

        let report = format!("[{}] {}", notification.username, notification.text);
        for recipient in &self.recipients {
            let delivery = match &notification.image {
                Some(bytes) => bot
                    .send_photo(*recipient, InputFile::memory(bytes.clone()))
                    .caption(report.clone())
                    .await
                    .map(|_| ()),
                None => bot
                    .send_message(*recipient, report.clone())
                    .await
                    .map(|_| ()),
            };
            if let Err(err) = delivery {
                warn!("Admin relay delivery to {} failed: {err}", recipient.0);
            }
        }
        debug!(
            recipients = self.recipients.len(),
            "Relayed notification from {}", notification.username
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_admin_ids(ids: &str) -> Config {
        Config {
            bot_token: "123:abc".to_string(),
            admin_bot_token: "123:abc".to_string(),
            completion_api_key: String::new(),
            image_api_key: String::new(),
            admin_chat_ids: crate::config::parse_chat_id_list(ids),
            mock_mode: true,
            log_level: "info".to_string(),
            completion_model: "gpt-3.5-turbo".to_string(),
            completion_max_tokens: 500,
            completion_temperature: 0.7,
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
        }
    }

    #[test]
    fn relay_is_noop_without_recipients() {
        let relay = AdminRelay::from_config(&config_with_admin_ids(""));
        assert!(!relay.is_enabled());
    }

    #[test]
    fn relay_enables_with_recipients() {
        let relay = AdminRelay::from_config(&config_with_admin_ids("100,200"));
        assert!(relay.is_enabled());
        assert_eq!(relay.recipients, vec![ChatId(100), ChatId(200)]);
    }

    #[tokio::test]
    async fn disabled_relay_swallows_notifications() {
        let relay = AdminRelay::disabled();
        relay
            .notify(AdminNotification::text("@someone", "hello"))
            .await;
    }

    #[tokio::test]
    async fn recording_sink_captures_notifications_in_order() {
        let relay = AdminRelay::recording();
        relay
            .notify(AdminNotification::text("@u", "first"))
            .await;
        relay
            .notify(AdminNotification::image("@u", "second", vec![1, 2, 3]))
            .await;

        let recorded = relay.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].text, "first");
        assert_eq!(recorded[1].text, "second");
        assert_eq!(recorded[1].image.as_deref(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn notification_constructors_carry_payloads() {
        let text = AdminNotification::text("@u", "received");
        assert!(text.image.is_none());

        let image = AdminNotification::image("@u", "generated", vec![1, 2, 3]);
        assert_eq!(image.image.as_deref(), Some(&[1, 2, 3][..]));
        assert_eq!(image.username, "@u");
    }
}
