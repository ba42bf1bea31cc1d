use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, Message,
    MessageId, ReplyParameters,
};
use tracing::{error, info};

use crate::config::{GENERIC_FAILURE_MESSAGE, PROCESSING_MESSAGE, WELCOME_CAPTION};
use crate::event::ChatEvent;
use crate::handlers::admin_relay::{AdminNotification, AdminRelay};
use crate::llm::{Provider, UpstreamError};
use crate::state::AppState;

const WELCOME_IMAGE: &[u8] = include_bytes!("../../assets/welcome.png");

pub const HANDOFF_CALLBACK_PREFIX: &str = "handoff:";
const HANDOFF_REQUEST_CALLBACK: &str = "handoff:request";
const HANDOFF_CONFIRM_YES_CALLBACK: &str = "handoff:confirm:yes";
const HANDOFF_CONFIRM_NO_CALLBACK: &str = "handoff:confirm:no";

const OFFER_BUTTON_LABEL: &str = "Request manual conversion";
const CONFIRM_QUESTION: &str =
    "Should a human take over and convert this concept into a working font?";
const HANDOFF_ACCEPTED_MESSAGE: &str =
    "Got it! Our team will pick this up and get back to you with a converted font.";
const HANDOFF_DECLINED_MESSAGE: &str =
    "No problem. Send another description whenever you want a new concept.";

const IMAGE_CAPTION_LIMIT: usize = 1000;

/// Steps of the two-step handoff dialog, decoded from callback data. The
/// dialog state lives in which keyboard is attached where, so handling stays
/// stateless per event and distinct chats cannot interfere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffAction {
    Request,
    Confirm(bool),
}

pub fn parse_handoff_callback(data: &str) -> Option<HandoffAction> {
    match data {
        HANDOFF_REQUEST_CALLBACK => Some(HandoffAction::Request),
        HANDOFF_CONFIRM_YES_CALLBACK => Some(HandoffAction::Confirm(true)),
        HANDOFF_CONFIRM_NO_CALLBACK => Some(HandoffAction::Confirm(false)),
        _ => None,
    }
}

/// Only non-empty, non-command text reaches the providers.
pub fn is_processable_text(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && !trimmed.starts_with('/')
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut iter = text.chars();
    let truncated: String = iter.by_ref().take(max_chars).collect();
    if iter.next().is_some() {
        format!("{truncated}...")
    } else {
        truncated
    }
}

pub fn build_offer_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        OFFER_BUTTON_LABEL,
        HANDOFF_REQUEST_CALLBACK,
    )]])
}

pub fn build_confirmation_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("Yes", HANDOFF_CONFIRM_YES_CALLBACK),
        InlineKeyboardButton::callback("No", HANDOFF_CONFIRM_NO_CALLBACK),
    ]])
}

pub async fn start_handler(bot: Bot, message: Message) -> Result<()> {
    bot.send_photo(message.chat.id, InputFile::memory(WELCOME_IMAGE))
        .caption(WELCOME_CAPTION)
        .await?;
    Ok(())
}

/// Refines the user text and renders the image, mirroring each stage to the
/// operators: received text, refined prompt, generated image, in that order.
pub async fn run_generation(
    provider: &Provider,
    relay: &AdminRelay,
    text: &str,
    username: &str,
) -> Result<(String, Vec<u8>), UpstreamError> {
    relay
        .notify(AdminNotification::text(
            username,
            format!("Received: {text}"),
        ))
        .await;

    let prompt = provider.build_prompt(text).await?;
    relay
        .notify(AdminNotification::text(
            username,
            format!("Prompt: {prompt}"),
        ))
        .await;

    let image = provider.generate_image(&prompt).await?;
    relay
        .notify(AdminNotification::image(
            username,
            format!("Generated for: {}", truncate_chars(&prompt, 200)),
            image.clone(),
        ))
        .await;

    Ok((prompt, image))
}

async fn report_failure(relay: &AdminRelay, username: &str, err: &anyhow::Error) {
    relay
        .notify(AdminNotification::text(username, format!("Error: {err}")))
        .await;
}

pub async fn text_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(text) = message.text().map(|text| text.to_string()) else {
        return Ok(());
    };
    if !is_processable_text(&text) {
        return Ok(());
    }

    let event = ChatEvent::Text(&message);
    let chat_id = event.chat_id().unwrap_or(message.chat.id);
    let username = event.sender_name();
    info!("Processing description from {} in chat {}", username, chat_id.0);

    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
    let ack = bot
        .send_message(chat_id, PROCESSING_MESSAGE)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;

    let outcome = match run_generation(&state.provider, &state.relay, text.trim(), &username).await
    {
        Ok((prompt, image)) => deliver_image(&bot, &message, ack.id, &prompt, image).await,
        Err(err) => Err(anyhow::Error::from(err)),
    };

    if let Err(err) = outcome {
        error!("Generation pipeline failed for chat {}: {err}", chat_id.0);
        let _ = bot
            .edit_message_text(chat_id, ack.id, GENERIC_FAILURE_MESSAGE)
            .await;
        report_failure(&state.relay, &username, &err).await;
    }
    Ok(())
}

async fn deliver_image(
    bot: &Bot,
    message: &Message,
    ack_id: MessageId,
    prompt: &str,
    image: Vec<u8>,
) -> Result<()> {
    let chat_id = message.chat.id;
    let _ = bot.send_chat_action(chat_id, ChatAction::UploadPhoto).await;

    // Turn the placeholder into the refined prompt so the user sees what was
    // actually rendered, then deliver the image with the handoff affordance.
    let _ = bot
        .edit_message_text(chat_id, ack_id, prompt.to_string())
        .await;
    bot.send_photo(chat_id, InputFile::memory(image))
        .caption(truncate_chars(prompt, IMAGE_CAPTION_LIMIT))
        .reply_parameters(ReplyParameters::new(message.id))
        .reply_markup(build_offer_keyboard())
        .await?;

    Ok(())
}

pub async fn handoff_callback(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let _ = bot.answer_callback_query(query.id.clone()).await;
    let Some(action) = query
        .data
        .as_deref()
        .and_then(parse_handoff_callback)
    else {
        return Ok(());
    };
    let event = ChatEvent::Callback(&query);
    let Some(chat_id) = event.chat_id() else {
        return Ok(());
    };
    let username = event.sender_name();
    let Some(message) = &query.message else {
        return Ok(());
    };

    if let Err(err) =
        apply_handoff_action(&bot, &state, chat_id, message.id(), &username, action).await
    {
        error!("Handoff dialog failed for chat {}: {err}", chat_id.0);
        let _ = bot.send_message(chat_id, GENERIC_FAILURE_MESSAGE).await;
        report_failure(&state.relay, &username, &err).await;
    }
    Ok(())
}

async fn apply_handoff_action(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    message_id: MessageId,
    username: &str,
    action: HandoffAction,
) -> Result<()> {
    match action {
        HandoffAction::Request => {
            // Strip the affordance from the photo before asking to confirm.
            let _ = bot.edit_message_reply_markup(chat_id, message_id).await;
            bot.send_message(chat_id, CONFIRM_QUESTION)
                .reply_markup(build_confirmation_keyboard())
                .await?;
        }
        HandoffAction::Confirm(true) => {
            info!("Handoff requested by {} in chat {}", username, chat_id.0);
            bot.edit_message_text(chat_id, message_id, HANDOFF_ACCEPTED_MESSAGE)
                .await?;
            state
                .relay
                .notify(AdminNotification::text(
                    username,
                    "Requested manual font conversion",
                ))
                .await;
        }
        HandoffAction::Confirm(false) => {
            bot.edit_message_text(chat_id, message_id, HANDOFF_DECLINED_MESSAGE)
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    use crate::llm::mock::{MOCK_IMAGE, MOCK_PROMPT};
    use crate::llm::MockProvider;

    fn callback_data(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            other => panic!("unexpected button kind: {other:?}"),
        }
    }

    #[test]
    fn command_and_empty_text_is_not_processable() {
        assert!(!is_processable_text(""));
        assert!(!is_processable_text("   "));
        assert!(!is_processable_text("/start"));
        assert!(!is_processable_text("  /help extra"));
        assert!(is_processable_text("funky"));
    }

    #[test]
    fn offer_keyboard_has_single_affordance() {
        let keyboard = build_offer_keyboard();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0].len(), 1);
        let data = callback_data(&keyboard.inline_keyboard[0][0]);
        assert_eq!(parse_handoff_callback(data), Some(HandoffAction::Request));
    }

    #[test]
    fn confirmation_keyboard_offers_yes_and_no() {
        let keyboard = build_confirmation_keyboard();
        let row = &keyboard.inline_keyboard[0];
        assert_eq!(row.len(), 2);
        assert_eq!(
            parse_handoff_callback(callback_data(&row[0])),
            Some(HandoffAction::Confirm(true))
        );
        assert_eq!(
            parse_handoff_callback(callback_data(&row[1])),
            Some(HandoffAction::Confirm(false))
        );
    }

    #[test]
    fn foreign_callback_data_is_ignored() {
        assert_eq!(parse_handoff_callback("image_res:2K"), None);
        assert_eq!(parse_handoff_callback("handoff:"), None);
    }

    #[test]
    fn captions_are_truncated_to_telegram_limits() {
        let long = "x".repeat(IMAGE_CAPTION_LIMIT + 50);
        let caption = truncate_chars(&long, IMAGE_CAPTION_LIMIT);
        assert_eq!(caption.chars().count(), IMAGE_CAPTION_LIMIT + 3);
        assert!(caption.ends_with("..."));
        assert_eq!(truncate_chars("short", IMAGE_CAPTION_LIMIT), "short");
    }

    #[tokio::test]
    async fn mock_generation_relays_text_prompt_and_image_in_order() {
        let provider = Provider::Mock(MockProvider);
        let relay = AdminRelay::recording();

        let (prompt, image) = run_generation(&provider, &relay, "funky", "@tester")
            .await
            .unwrap();
        assert_eq!(prompt, MOCK_PROMPT);
        assert_eq!(image, MOCK_IMAGE);

        let notifications = relay.recorded();
        assert_eq!(notifications.len(), 3);
        assert_eq!(notifications[0].text, "Received: funky");
        assert!(notifications[0].image.is_none());
        assert_eq!(notifications[1].text, format!("Prompt: {MOCK_PROMPT}"));
        assert!(notifications[1].image.is_none());
        assert!(notifications[2].text.starts_with("Generated for:"));
        assert_eq!(notifications[2].image.as_deref(), Some(MOCK_IMAGE));
        assert!(notifications
            .iter()
            .all(|notification| notification.username == "@tester"));
    }

    #[tokio::test]
    async fn failures_are_reported_to_operators() {
        let relay = AdminRelay::recording();
        let err = anyhow::Error::from(UpstreamError("image response had no image data".into()));
        report_failure(&relay, "@tester", &err).await;

        let notifications = relay.recorded();
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].text,
            "Error: AI provider request failed: image response had no image data"
        );
    }
}
