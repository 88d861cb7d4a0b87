//! Scripted demo conversation playback.
//!
//! The landing page's "see it in action" chat is a hard-coded conversation
//! played back one step at a time: an opening assistant line, then a user
//! turn followed (after a typing pause) by the next assistant reply.
//! Stepping past the end of the script does nothing.

use std::time::Duration;

use crate::models::Conversation;

/// One scripted exchange.
#[derive(Debug, Clone)]
pub struct DemoTurn {
    pub user: &'static str,
    pub assistant: &'static str,
}

/// A scripted conversation: an opening line plus ordered turns.
#[derive(Debug, Clone)]
pub struct DemoScript {
    pub opening: &'static str,
    pub turns: &'static [DemoTurn],
}

/// The built-in demo script.
pub fn default_script() -> DemoScript {
    DemoScript {
        opening: "Hello! I'm your story friend. What should tonight's story be about?",
        turns: &[
            DemoTurn {
                user: "Can we have a story about a lighthouse?",
                assistant: "A lighthouse it is! On a foggy little island stood Old Glimmer, \
                            a lighthouse whose lamp had started to flicker...",
            },
            DemoTurn {
                user: "Why was the lamp flickering?",
                assistant: "Inside the lamp lived a firefly named Pip, and Pip had the \
                            hiccups! Every hiccup made the whole island blink.",
            },
            DemoTurn {
                user: "How did Pip get rid of the hiccups?",
                assistant: "The seagulls tried everything: a surprise squawk, a sip of dew, \
                            even standing on one leg. Want to hear what finally worked?",
            },
        ],
    }
}

/// Tracks playback position within a [`DemoScript`].
pub struct DemoPlayer {
    script: DemoScript,
    step: usize,
    pub conversation: Conversation,
}

impl DemoPlayer {
    /// Start playback; the opening assistant line is appended immediately.
    pub fn new(script: DemoScript) -> Self {
        let mut conversation = Conversation::new("Demo");
        conversation.push_assistant(script.opening);
        Self {
            script,
            step: 0,
            conversation,
        }
    }

    /// Play the next scripted exchange, if any.
    ///
    /// Returns the turn that was appended, or `None` once the script is
    /// exhausted (repeat calls stay a no-op).
    pub fn step(&mut self) -> Option<&'static DemoTurn> {
        let turn = self.script.turns.get(self.step)?;
        self.conversation.push_user(turn.user);
        self.conversation.push_assistant(turn.assistant);
        self.step += 1;
        Some(turn)
    }

    pub fn finished(&self) -> bool {
        self.step >= self.script.turns.len()
    }
}

/// Play the whole script to stdout with typing pauses.
///
/// `fast` drops the pauses (used by tests and the impatient).
pub async fn run_demo(fast: bool) {
    let pause = if fast {
        Duration::ZERO
    } else {
        Duration::from_millis(1500)
    };

    let mut player = DemoPlayer::new(default_script());
    println!("  story friend: {}", player.conversation.last().map(|m| m.content.as_str()).unwrap_or(""));

    while let Some(turn) = player.step() {
        println!("           you: {}", turn.user);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        println!("  story friend: {}", turn.assistant);
        println!();
    }

    println!("(demo finished; try `storybot chat` for the real thing)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn opening_line_is_first_message() {
        let player = DemoPlayer::new(default_script());
        let first = &player.conversation.messages[0];
        assert_eq!(first.role, Role::Assistant);
        assert_eq!(first.content, default_script().opening);
    }

    #[test]
    fn each_step_appends_user_then_assistant() {
        let mut player = DemoPlayer::new(default_script());
        player.step().unwrap();
        let msgs = &player.conversation.messages;
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[1].role, Role::User);
        assert_eq!(msgs[2].role, Role::Assistant);
    }

    #[test]
    fn stepping_past_end_is_noop() {
        let mut player = DemoPlayer::new(default_script());
        while player.step().is_some() {}
        assert!(player.finished());
        let len_before = player.conversation.messages.len();
        assert!(player.step().is_none());
        assert_eq!(player.conversation.messages.len(), len_before);
    }

    #[test]
    fn full_playback_length() {
        let script = default_script();
        let mut player = DemoPlayer::new(script.clone());
        while player.step().is_some() {}
        // opening + 2 messages per turn
        assert_eq!(
            player.conversation.messages.len(),
            1 + 2 * script.turns.len()
        );
    }
}
