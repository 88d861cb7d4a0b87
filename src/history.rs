//! Static transcript viewer.
//!
//! Renders past conversations grouped by day, then by time within the day.
//! The log loads from `[history].path` when configured; otherwise a small
//! built-in sample is shown so the command works out of the box.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

use crate::models::{HistoryDay, LoggedConversation, LoggedMessage, Role};

/// Load a history log from a JSON file: an array of [`HistoryDay`]s.
pub fn load_history(path: &Path) -> Result<Vec<HistoryDay>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;
    let days: Vec<HistoryDay> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history file: {}", path.display()))?;
    Ok(days)
}

/// Built-in sample log used when no history file is configured.
pub fn sample_history() -> Vec<HistoryDay> {
    fn msg(role: Role, content: &str) -> LoggedMessage {
        LoggedMessage {
            role,
            content: content.to_string(),
        }
    }

    vec![
        HistoryDay {
            date: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
            conversations: vec![
                LoggedConversation {
                    time: "10:30 AM".to_string(),
                    messages: vec![
                        msg(Role::User, "Tell me a story about a runaway kite!"),
                        msg(
                            Role::Assistant,
                            "High above Maple Street, a red kite named Zip slipped its string and set off to see the clouds up close...",
                        ),
                    ],
                },
                LoggedConversation {
                    time: "2:45 PM".to_string(),
                    messages: vec![
                        msg(Role::User, "What do moles do all winter?"),
                        msg(
                            Role::Assistant,
                            "Down in the Tunnel Town beneath the frozen garden, Mayor Digby the mole was organizing the Great Underground Pancake Festival...",
                        ),
                    ],
                },
            ],
        },
        HistoryDay {
            date: NaiveDate::from_ymd_opt(2025, 6, 11).unwrap(),
            conversations: vec![LoggedConversation {
                time: "3:15 PM".to_string(),
                messages: vec![
                    msg(Role::User, "I want a story about a singing whale!"),
                    msg(
                        Role::Assistant,
                        "In the deep blue Humming Sea lived Barnaby, a whale whose songs were so catchy that even the jellyfish bobbed along...",
                    ),
                ],
            }],
        },
    ]
}

/// Print the history log grouped by date, then by time.
pub fn render_history(days: &[HistoryDay]) {
    for day in days {
        println!("{}", day.date.format("%A, %B %-d, %Y"));
        println!();

        for conv in &day.conversations {
            println!("  {}", conv.time);
            for message in &conv.messages {
                let who = match message.role {
                    Role::User => "you",
                    Role::Assistant => "story friend",
                };
                println!("    {:>12}: {}", who, message.content);
            }
            println!();
        }
    }
}
