//! Slash commands: `/help`, `/getinfo`, `/gpt`.

use super::Gateway;
use buddy_core::{
    completion::{ChatMessage, ChatOptions, ChatRequest, ReasoningEffort, Verbosity},
    error::BuddyError,
    message::{IncomingMessage, OutgoingMessage, User},
};
use tracing::{info, warn};

const UNKNOWN_COMMAND: &str =
    "Sorry, I don't recognize that command. Type /help to see available commands.";

/// Usage text listing the commands and how to address the bot.
pub(super) fn help_text(handle: &str) -> String {
    format!(
        "Available commands:\n\
         /help - List available commands\n\
         /getinfo - Get your account information\n\
         /gpt - Forward message to gpt\n\
         Tag me {handle} if you want to chat with me\n\
         Если использовать \"загугли\", \"поищи\" или ссылку в сообщении, \
         то будет веб поиск(очень долго думает секунд 30-60)"
    )
}

/// The sender's profile as shown by `/getinfo`.
pub(super) fn account_info(user: &User) -> String {
    let mut info = format!(
        "Your Account Information:\nFirst Name: {}\n",
        user.first_name
    );
    if let Some(last) = user.last_name.as_deref().filter(|s| !s.is_empty()) {
        info.push_str(&format!("Last Name: {last}\n"));
    }
    if let Some(un) = user.username.as_deref().filter(|s| !s.is_empty()) {
        info.push_str(&format!("Username: @{un}\n"));
    }
    info.push_str(&format!("User ID: {}", user.id));
    info
}

impl Gateway {
    /// Dispatch a command. Only `/gpt` replies are stored.
    pub(super) async fn handle_command(&self, msg: &IncomingMessage, command: &str, args: &str) {
        info!("command /{command} in chat {}", msg.chat.id);
        let chat_id = msg.chat.id;
        match command {
            "help" => {
                self.send_notice(chat_id, None, help_text(&self.bot.handle()))
                    .await
            }
            "getinfo" => match msg.from.as_ref() {
                Some(user) => self.send_notice(chat_id, None, account_info(user)).await,
                None => warn!("/getinfo without a sender in chat {chat_id}"),
            },
            "gpt" => self.handle_gpt_command(msg, args).await,
            _ => {
                self.send_notice(chat_id, None, UNKNOWN_COMMAND.to_string())
                    .await
            }
        }
    }

    /// One-shot completion outside the conversation context.
    async fn handle_gpt_command(&self, msg: &IncomingMessage, args: &str) {
        let chat_id = msg.chat.id;
        if args.is_empty() {
            self.send_notice(chat_id, None, "Please provide a message for GPT.".into())
                .await;
            return;
        }
        self.save_incoming(msg, args).await;

        let request = ChatRequest::new(
            self.openai.gpt_command_model(),
            vec![
                ChatMessage::system("You are a helpful assistant."),
                ChatMessage::user(args),
            ],
        )
        .with_options(ChatOptions::with_effort(
            ReasoningEffort::High,
            Verbosity::Medium,
        ));

        match self.complete_text(&request).await {
            Ok(answer) => {
                self.send_reply(
                    OutgoingMessage::rich_reply(chat_id, answer, msg.message_id),
                    true,
                )
                .await;
            }
            Err(e) => {
                warn!("/gpt completion failed: {e}");
                self.send_notice(
                    chat_id,
                    Some(msg.message_id),
                    format!("Error getting chat completion: {e}"),
                )
                .await;
            }
        }
    }

    /// Text of the first choice; an empty choice list is an error.
    pub(super) async fn complete_text(&self, request: &ChatRequest) -> Result<String, BuddyError> {
        let response = self.provider.complete(request).await?;
        info!(
            "completion via {} | model: {} | tokens: {}",
            self.provider.name(),
            response.model.as_deref().unwrap_or(&request.model),
            response.usage.total_tokens
        );
        response
            .first_text()
            .ok_or_else(|| BuddyError::Provider("no choices in response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_mentions_handle() {
        let text = help_text("@buddy_bot");
        assert!(text.starts_with("Available commands:\n/help"));
        assert!(text.contains("Tag me @buddy_bot if you want to chat with me"));
    }

    #[test]
    fn test_account_info_full() {
        let user = User {
            id: 42,
            first_name: "Thomas".into(),
            last_name: Some("Anderson".into()),
            username: Some("neo".into()),
            is_bot: false,
        };
        assert_eq!(
            account_info(&user),
            "Your Account Information:\nFirst Name: Thomas\nLast Name: Anderson\nUsername: @neo\nUser ID: 42"
        );
    }

    #[test]
    fn test_account_info_minimal() {
        let user = User {
            id: 7,
            first_name: "Ann".into(),
            last_name: None,
            username: Some(String::new()),
            is_bot: false,
        };
        assert_eq!(
            account_info(&user),
            "Your Account Information:\nFirst Name: Ann\nUser ID: 7"
        );
    }
}
