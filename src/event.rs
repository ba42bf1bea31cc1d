use teloxide::types::{CallbackQuery, ChatId, Message, User};

/// The two inbound event shapes the bot reacts to, with unified accessors so
/// the relay never probes platform types field by field.
pub enum ChatEvent<'a> {
    Text(&'a Message),
    Callback(&'a CallbackQuery),
}

impl ChatEvent<'_> {
    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            ChatEvent::Text(message) => Some(message.chat.id),
            ChatEvent::Callback(query) => {
                query.message.as_ref().map(|message| message.chat().id)
            }
        }
    }

    pub fn sender(&self) -> Option<&User> {
        match self {
            ChatEvent::Text(message) => message.from.as_ref(),
            ChatEvent::Callback(query) => Some(&query.from),
        }
    }

    /// Display name used in operator notifications.
    pub fn sender_name(&self) -> String {
        match self.sender() {
            Some(user) => user
                .username
                .as_ref()
                .map(|name| format!("@{name}"))
                .unwrap_or_else(|| user.full_name()),
            None => "unknown".to_string(),
        }
    }
}
