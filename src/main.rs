use std::error::Error;

use dotenvy::dotenv;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

mod config;
mod event;
mod handlers;
mod llm;
mod state;
mod utils;

use config::Config;
use handlers::admin_relay::AdminRelay;
use handlers::conversation::{self, HANDOFF_CALLBACK_PREFIX};
use llm::Provider;
use state::AppState;
use utils::logging::init_logging;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    Start,
}

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();

    let config = Config::load()?;
    let _guards = init_logging(&config.log_level);

    let bot = Bot::new(config.bot_token.clone());
    let provider = Provider::from_config(&config);
    let relay = AdminRelay::from_config(&config);
    if config.mock_mode {
        info!("Mock mode enabled; no provider calls will be made");
    }
    if !relay.is_enabled() {
        info!("No admin chats configured; relay disabled");
    }
    let state = AppState::new(provider, relay);

    info!("Starting FontSpecimenBot");

    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text))
        .endpoint(ignore_message);

    let callback_state = state.clone();
    let callback_handler =
        Update::filter_callback_query().endpoint(move |bot: Bot, query: CallbackQuery| {
            let state = callback_state.clone();
            async move { handle_callback_query(bot, state, query).await }
        });

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(bot: Bot, message: Message, command: Command) -> HandlerResult {
    match command {
        Command::Start => conversation::start_handler(bot, message).await?,
    }
    Ok(())
}

async fn handle_text(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    tokio::spawn(async move {
        if let Err(err) = conversation::text_handler(bot, state, message).await {
            error!("text handler failed: {err}");
        }
    });
    Ok(())
}

async fn handle_callback_query(bot: Bot, state: AppState, query: CallbackQuery) -> HandlerResult {
    let Some(data) = query.data.clone() else {
        return Ok(());
    };
    if data.starts_with(HANDOFF_CALLBACK_PREFIX) {
        tokio::spawn(async move {
            if let Err(err) = conversation::handoff_callback(bot, state, query).await {
                error!("handoff callback failed: {err}");
            }
        });
    }
    Ok(())
}

async fn ignore_message(_message: Message) -> HandlerResult {
    Ok(())
}
