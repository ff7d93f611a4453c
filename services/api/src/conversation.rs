//! Conversation orchestrator
//!
//! Handles every chat-scoped operation for an authenticated user. Ownership is
//! always checked through the store's owner filter, so chats of other users
//! are reported exactly like chats that do not exist.
//!
//! Sending a message is a best-effort sequence, not a transaction: the user
//! turn is stored before the provider is called and stays stored if the call
//! fails. Such a trailing user turn without a reply is a valid transcript.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    assistant::{AssistantError, AssistantModel, HistoryTurn},
    error::{ApiError, ApiResult},
    models::{
        Chat, ChatTranscript, CurrentUser, Exchange, Message, NewMessage, UsageStats,
        chat::{DEFAULT_CHAT_TITLE, auto_title},
    },
    repositories::ChatStore,
    validation::{optional_text, required_text},
};

/// Prior messages replayed to the provider on each turn
pub const HISTORY_WINDOW: i64 = 10;

#[derive(Clone)]
pub struct ConversationService {
    store: Arc<dyn ChatStore>,
    assistant: Arc<dyn AssistantModel>,
    reply_timeout: Duration,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn ChatStore>,
        assistant: Arc<dyn AssistantModel>,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            store,
            assistant,
            reply_timeout,
        }
    }

    async fn owned_chat(&self, user: &CurrentUser, chat_id: Uuid) -> ApiResult<Chat> {
        self.store
            .find_chat(chat_id, user.id)
            .await?
            .ok_or_else(ApiError::chat_not_found)
    }

    /// All chats of the caller, most recently updated first
    pub async fn list_chats(&self, user: &CurrentUser) -> ApiResult<Vec<Chat>> {
        Ok(self.store.list_chats(user.id).await?)
    }

    /// Create a chat; a missing or blank title falls back to the default
    pub async fn create_chat(&self, user: &CurrentUser, title: Option<&str>) -> ApiResult<Chat> {
        let title = optional_text(title).unwrap_or(DEFAULT_CHAT_TITLE);
        let chat = self.store.create_chat(user.id, title).await?;

        info!("Created chat {} for user {}", chat.id, user.id);
        Ok(chat)
    }

    pub async fn rename_chat(
        &self,
        user: &CurrentUser,
        chat_id: Uuid,
        title: Option<&str>,
    ) -> ApiResult<Chat> {
        let title = required_text(title, "Title").map_err(ApiError::Validation)?;

        let chat = self
            .store
            .rename_chat(chat_id, user.id, title)
            .await?
            .ok_or_else(ApiError::chat_not_found)?;

        info!("Renamed chat {}", chat.id);
        Ok(chat)
    }

    /// Delete a chat together with its whole transcript
    pub async fn delete_chat(&self, user: &CurrentUser, chat_id: Uuid) -> ApiResult<()> {
        if !self.store.delete_chat(chat_id, user.id).await? {
            return Err(ApiError::chat_not_found());
        }

        info!("Deleted chat {} for user {}", chat_id, user.id);
        Ok(())
    }

    /// Transcript of a chat, oldest first
    pub async fn list_messages(&self, user: &CurrentUser, chat_id: Uuid) -> ApiResult<Vec<Message>> {
        let chat = self.owned_chat(user, chat_id).await?;
        Ok(self.store.list_messages(chat.id).await?)
    }

    /// Store a user turn, ask the assistant, store its reply
    #[instrument(skip(self, user, content), fields(user_id = %user.id))]
    pub async fn send_message(
        &self,
        user: &CurrentUser,
        chat_id: Uuid,
        content: Option<&str>,
    ) -> ApiResult<Exchange> {
        let content = required_text(content, "Content").map_err(ApiError::Validation)?;
        let chat = self.owned_chat(user, chat_id).await?;

        // Title is only written back when this turn auto-titles the chat
        let first_turn =
            chat.has_default_title() && self.store.count_messages(chat.id).await? == 0;
        let new_title = first_turn.then(|| auto_title(content));

        let user_message = self
            .store
            .insert_message(&NewMessage::from_user(chat.id, user.id, content))
            .await?;

        let window = self
            .store
            .recent_messages(chat.id, user_message.id, HISTORY_WINDOW)
            .await?;
        let history: Vec<HistoryTurn> = window.iter().map(HistoryTurn::from).collect();

        let reply = match tokio::time::timeout(
            self.reply_timeout,
            self.assistant.reply(&history, content),
        )
        .await
        {
            Ok(Ok(reply)) if !reply.trim().is_empty() => reply,
            Ok(Ok(_)) => return Err(self.upstream_failure(chat.id, AssistantError::Empty)),
            Ok(Err(e)) => return Err(self.upstream_failure(chat.id, e)),
            Err(_) => {
                return Err(
                    self.upstream_failure(chat.id, AssistantError::Timeout(self.reply_timeout))
                );
            }
        };

        let assistant_message = self
            .store
            .insert_message(&NewMessage::from_assistant(chat.id, reply))
            .await?;

        let chat = self
            .store
            .record_activity(chat.id, user.id, new_title.as_deref())
            .await?
            .ok_or_else(ApiError::chat_not_found)?;

        info!(
            "Completed exchange in chat {} with {} turns of history",
            chat.id,
            history.len()
        );

        Ok(Exchange {
            user_message,
            assistant_message,
            chat,
        })
    }

    fn upstream_failure(&self, chat_id: Uuid, error: AssistantError) -> ApiError {
        warn!(
            "Assistant failed for chat {}; user turn kept without reply: {}",
            chat_id, error
        );
        ApiError::Upstream(error)
    }

    /// Chat and message totals for the caller
    pub async fn stats(&self, user: &CurrentUser) -> ApiResult<UsageStats> {
        let total_chats = self.store.count_chats(user.id).await?;
        let total_messages = self.store.count_owner_messages(user.id).await?;

        Ok(UsageStats {
            total_chats,
            total_messages,
        })
    }

    /// Every chat of the caller with its full transcript
    pub async fn export(&self, user: &CurrentUser) -> ApiResult<Vec<ChatTranscript>> {
        let chats = self.store.list_chats(user.id).await?;
        let mut transcripts = Vec::with_capacity(chats.len());

        for chat in chats {
            let messages = self.store.list_messages(chat.id).await?;
            transcripts.push(ChatTranscript { chat, messages });
        }

        Ok(transcripts)
    }
}
