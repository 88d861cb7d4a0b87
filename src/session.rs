//! Chat transcript assembly over the backend client.
//!
//! [`ChatSession::send`] implements the send-message flow: append the user
//! turn, get the answer (hard failure), append the assistant turn, then try
//! for an illustration (soft failure). Also carries the follow-up prompt
//! suggestions shown after each exchange.

use anyhow::Result;

use crate::backend::BackendClient;
use crate::models::Conversation;

/// Coarse language bucket for follow-up prompt selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    NonEnglish,
}

/// Any non-ASCII character flips the bucket. Crude, but it only picks
/// which canned prompt pool to draw from.
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(|c| !c.is_ascii()) {
        Language::NonEnglish
    } else {
        Language::English
    }
}

const FOLLOW_UPS_ENGLISH: &[&str] = &[
    "Can you tell me more?",
    "What happens next?",
    "Why is that important?",
    "How does that work?",
    "Can you give an example?",
];

const FOLLOW_UPS_NON_ENGLISH: &[&str] = &[
    "¿Puedes contarme más?",
    "¿Qué pasa después?",
    "¿Por qué es importante eso?",
    "¿Cómo funciona eso?",
    "¿Puedes darme un ejemplo?",
];

/// Pick a canned follow-up prompt for the language of `user_text`.
///
/// Selection hashes the message text, so the same message always suggests
/// the same follow-up.
pub fn follow_up_suggestion(user_text: &str) -> &'static str {
    let pool = match detect_language(user_text) {
        Language::English => FOLLOW_UPS_ENGLISH,
        Language::NonEnglish => FOLLOW_UPS_NON_ENGLISH,
    };
    pool[fnv1a(user_text.as_bytes()) as usize % pool.len()]
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Outcome of one exchange: the answer text and whether an illustration
/// was attached.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub answer: String,
    pub illustrated: bool,
}

/// A live conversation bound to a backend.
pub struct ChatSession {
    backend: BackendClient,
    pub conversation: Conversation,
}

impl ChatSession {
    pub fn new(backend: BackendClient, title: impl Into<String>) -> Self {
        Self {
            backend,
            conversation: Conversation::new(title),
        }
    }

    /// Send one user message and assemble the resulting turns.
    ///
    /// 1. Append the user message (it stays even if the backend fails).
    /// 2. `POST /chat` — failure propagates to the caller.
    /// 3. Append the assistant answer, text only.
    /// 4. `POST /generate-image` with the answer as the prompt — a `None`
    ///    just leaves the answer without an illustration.
    pub async fn send(&mut self, question: &str) -> Result<Exchange> {
        self.conversation.push_user(question);

        let answer = self.backend.ask(question).await?;
        self.conversation.push_assistant(&answer);

        let illustrated = match self.backend.illustrate(&answer).await {
            Some(image) => self.conversation.attach_image(image),
            None => false,
        };

        Ok(Exchange {
            answer,
            illustrated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_english() {
        assert_eq!(detect_language("Tell me a story!"), Language::English);
    }

    #[test]
    fn non_ascii_is_non_english() {
        assert_eq!(detect_language("¿Qué pasa?"), Language::NonEnglish);
        assert_eq!(detect_language("昔々あるところに"), Language::NonEnglish);
    }

    #[test]
    fn empty_text_defaults_to_english() {
        assert_eq!(detect_language(""), Language::English);
    }

    #[test]
    fn suggestion_matches_language_pool() {
        let english = follow_up_suggestion("tell me about dragons");
        assert!(FOLLOW_UPS_ENGLISH.contains(&english));

        let spanish = follow_up_suggestion("cuéntame sobre dragones");
        assert!(FOLLOW_UPS_NON_ENGLISH.contains(&spanish));
    }

    #[test]
    fn suggestion_is_deterministic() {
        let a = follow_up_suggestion("the same message");
        let b = follow_up_suggestion("the same message");
        assert_eq!(a, b);
    }
}
