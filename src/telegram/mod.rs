use crate::delivery::DeliverySink;
use crate::error::Result;
use crate::models::{DeliveryTarget, DisplayUnit};
use crate::services::{ticker_for_command, AssetCommands, ReloadOutcome};
use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Url;
use std::sync::Arc;
use teloxide::dispatching::repls::CommandReplExt;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "Show current USDC stats")]
    Usdc,
    #[command(description = "Show current SPYx stats")]
    Spyx,
    #[command(description = "Show current JITOSOL stats")]
    Jitosol,
    #[command(description = "Show the last known state of every tracked asset")]
    Status,
    #[command(description = "Reload message templates (admin only)")]
    Reload,
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Start the bot")]
    Start,
}

impl Command {
    /// Ticker looked up by the per-asset commands.
    pub fn ticker(&self) -> Option<&'static str> {
        match self {
            Command::Usdc => ticker_for_command("usdc"),
            Command::Spyx => ticker_for_command("spyx"),
            Command::Jitosol => ticker_for_command("jitosol"),
            _ => None,
        }
    }
}

/// Sends a display unit as a photo with caption when it has a usable
/// thumbnail, as a plain message otherwise.
pub async fn send_unit(bot: &Bot, chat_id: ChatId, unit: &DisplayUnit) -> Result<()> {
    let text = unit.full_text();
    let photo = unit
        .thumbnail
        .as_deref()
        .filter(|_| unit.fits_caption())
        .and_then(|url| Url::parse(url).ok());

    match photo {
        Some(url) => {
            bot.send_photo(chat_id, InputFile::url(url)).caption(text).await?;
        }
        None => {
            bot.send_message(chat_id, text).await?;
        }
    }
    Ok(())
}

/// Delivers change notifications to one configured Telegram chat.
#[derive(Clone)]
pub struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramSink {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self { bot, chat_id: ChatId(chat_id) }
    }
}

#[async_trait]
impl DeliverySink for TelegramSink {
    async fn resolve_target(&self) -> Result<DeliveryTarget> {
        let chat = self.bot.get_chat(self.chat_id).await?;
        Ok(DeliveryTarget {
            chat_id: chat.id.0,
            title: chat.title().map(str::to_string),
        })
    }

    async fn deliver(&self, target: &DeliveryTarget, unit: &DisplayUnit) -> Result<()> {
        send_unit(&self.bot, ChatId(target.chat_id), unit).await
    }
}

pub struct TelegramBot {
    bot: Bot,
    commands: AssetCommands,
}

impl TelegramBot {
    pub fn new(bot: Bot, commands: AssetCommands) -> Self {
        Self { bot, commands }
    }

    pub async fn start(self: Arc<Self>) -> Result<()> {
        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register bot commands: {}", e);
        }

        let bot = self.bot.clone();
        let handler_instance = self.clone();
        info!("Listening for chat commands");
        Command::repl(bot, move |_bot: Bot, msg: Message, cmd: Command| {
            let handler_instance = handler_instance.clone();
            async move {
                if let Err(e) = handler_instance.handle_command(msg, cmd).await {
                    error!("Error handling command: {}", e);
                }
                respond(())
            }
        })
        .await;
        Ok(())
    }

    pub async fn handle_command(&self, msg: Message, command: Command) -> Result<()> {
        let chat_id = msg.chat.id;
        match command {
            Command::Usdc | Command::Spyx | Command::Jitosol => {
                let ticker = match command.ticker() {
                    Some(ticker) => ticker,
                    None => return Ok(()),
                };
                match self.commands.stats(ticker).await {
                    Ok(Some(unit)) => send_unit(&self.bot, chat_id, &unit).await?,
                    Ok(None) => {
                        self.bot.send_message(chat_id, format!("❓ No asset found for {}.", ticker)).await?;
                    }
                    Err(e) => {
                        error!("Stats lookup for {} failed: {}", ticker, e);
                        self.bot.send_message(chat_id, "⚠️ Asset data is unavailable right now.").await?;
                    }
                }
            }
            Command::Status => {
                let units = self.commands.status().await?;
                if units.is_empty() {
                    self.bot.send_message(chat_id, "ℹ️ No state available yet.").await?;
                }
                for unit in &units {
                    send_unit(&self.bot, chat_id, unit).await?;
                }
            }
            Command::Reload => {
                let user_id = msg.from().map(|user| user.id.0).unwrap_or_default();
                match self.commands.reload_templates(user_id).await {
                    Ok(ReloadOutcome::Reloaded(_)) => {
                        self.bot.send_message(chat_id, "✅ Templates reloaded.").await?;
                    }
                    Ok(ReloadOutcome::Denied) => {}
                    Err(e) => {
                        error!("Template reload failed: {}", e);
                        self.bot.send_message(chat_id, format!("⚠️ Template reload failed: {}", e)).await?;
                    }
                }
            }
            Command::Help => {
                self.bot.send_message(chat_id, Command::descriptions().to_string()).await?;
            }
            Command::Start => {
                self.bot
                    .send_message(
                        chat_id,
                        "Watching USDC, SPYx and JITOSOL for epoch, capacity and TVL changes. Use /help to see available commands.",
                    )
                    .await?;
            }
        }
        Ok(())
    }
}
