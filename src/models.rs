//! Conversation transcript types shared by the client, server, and viewers.
//!
//! A [`Conversation`] is an ordered, append-only list of [`Message`]s. The
//! only invariant is insertion order; illustrations attach to the trailing
//! assistant message after its text has landed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Base64-encoded PNG illustration; `None` when generation was skipped
    /// or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            image: None,
        }
    }
}

/// An ordered, append-only transcript of user/assistant turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            started_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Append a user turn and return its id.
    pub fn push_user(&mut self, content: impl Into<String>) -> String {
        let msg = Message::new(Role::User, content);
        let id = msg.id.clone();
        self.messages.push(msg);
        id
    }

    /// Append an assistant turn (text only) and return its id.
    pub fn push_assistant(&mut self, content: impl Into<String>) -> String {
        let msg = Message::new(Role::Assistant, content);
        let id = msg.id.clone();
        self.messages.push(msg);
        id
    }

    /// Attach an illustration to the trailing assistant message.
    ///
    /// No-op when the transcript is empty or ends with a user turn, so a
    /// late-arriving image can never land on the wrong message.
    pub fn attach_image(&mut self, image_base64: impl Into<String>) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant => {
                last.image = Some(image_base64.into());
                true
            }
            _ => false,
        }
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// One dated page of the static history viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub conversations: Vec<LoggedConversation>,
}

/// A timed conversation inside a [`HistoryDay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedConversation {
    /// Display time, e.g. `"10:30 AM"`.
    pub time: String,
    pub messages: Vec<LoggedMessage>,
}

/// A bare role/content pair as stored in the history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedMessage {
    pub role: Role,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_keep_insertion_order() {
        let mut conv = Conversation::new("test");
        conv.push_user("one");
        conv.push_assistant("two");
        conv.push_user("three");
        let contents: Vec<&str> = conv.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn attach_image_targets_trailing_assistant() {
        let mut conv = Conversation::new("test");
        conv.push_user("question");
        conv.push_assistant("answer");
        assert!(conv.attach_image("abc123"));
        assert_eq!(conv.last().unwrap().image.as_deref(), Some("abc123"));
        // The user message stays untouched
        assert!(conv.messages[0].image.is_none());
    }

    #[test]
    fn attach_image_noop_on_user_tail() {
        let mut conv = Conversation::new("test");
        conv.push_assistant("answer");
        conv.push_user("question");
        assert!(!conv.attach_image("abc123"));
        assert!(conv.messages.iter().all(|m| m.image.is_none()));
    }

    #[test]
    fn attach_image_noop_on_empty() {
        let mut conv = Conversation::new("test");
        assert!(!conv.attach_image("abc123"));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
