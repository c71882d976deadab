// ABOUTME: Moderation command parsing and execution -- the `!command` control surface for moderators.
// ABOUTME: Executed commands feed the gamification sink and return an announcement for priority send.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use warden_core::traits::{GamificationSink, ModerationAction, ModerationEvent, NormalizedMessage};

use crate::metrics;

/// Default timeout length when a moderator gives none.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Moderation commands parsed from message bodies.
///
/// Commands must start with `!`. The command name is case-insensitive.
/// Missing required arguments produce `Unknown`.
#[derive(Debug, PartialEq)]
pub enum ModCommand {
    /// Time a user out, optionally for a specific number of seconds
    Timeout { target: String, duration_secs: u64 },
    /// Ban a user from the chat
    Ban { target: String },
    /// Lift a ban
    Unban { target: String },
    /// Set slow mode, in seconds (0 disables)
    Slowmode { seconds: u64 },
    /// Show this session's moderation tallies
    Stats,
    /// Show available commands
    Help,
    /// Unrecognized input (unknown `!` command or missing required args)
    Unknown(String),
}

impl ModCommand {
    /// Parse a raw message body into a ModCommand.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();

        // Split into at most 3 parts: command, first_arg, rest
        let parts: Vec<&str> = input.splitn(3, ' ').collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "!timeout" => match parts.get(1) {
                Some(target) if !target.is_empty() => {
                    let duration_secs = parts
                        .get(2)
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(DEFAULT_TIMEOUT_SECS);
                    Self::Timeout {
                        target: target.to_string(),
                        duration_secs,
                    }
                }
                _ => Self::Unknown(input.to_string()),
            },

            "!ban" => match parts.get(1) {
                Some(target) if !target.is_empty() => Self::Ban {
                    target: target.to_string(),
                },
                _ => Self::Unknown(input.to_string()),
            },

            "!unban" => match parts.get(1) {
                Some(target) if !target.is_empty() => Self::Unban {
                    target: target.to_string(),
                },
                _ => Self::Unknown(input.to_string()),
            },

            "!slowmode" => {
                let seconds = parts.get(1).and_then(|s| s.parse::<u64>().ok());
                match seconds {
                    Some(seconds) => Self::Slowmode { seconds },
                    None => Self::Unknown(input.to_string()),
                }
            }

            "!stats" => Self::Stats,

            "!help" => Self::Help,

            _ => Self::Unknown(input.to_string()),
        }
    }
}

/// Executes moderation commands from allowlisted moderators.
///
/// Keeps a per-session tally per moderator for `!stats`; durable scoring
/// lives behind the gamification sink.
pub struct CommandHandler {
    sink: Arc<dyn GamificationSink>,
    moderators: HashSet<String>,
    tally: HashMap<String, u32>,
}

impl CommandHandler {
    pub fn new(sink: Arc<dyn GamificationSink>, moderators: HashSet<String>) -> Self {
        Self {
            sink,
            moderators,
            tally: HashMap::new(),
        }
    }

    /// Handle a command-class message. Returns the announcement text to send,
    /// or None when the sender is not a moderator.
    pub async fn handle(&mut self, msg: &NormalizedMessage) -> Option<String> {
        if !self.moderators.contains(&msg.author_id) {
            tracing::debug!(author = %msg.author_name, "Ignoring command from non-moderator");
            return None;
        }

        let cmd = ModCommand::parse(&msg.text);
        tracing::info!(moderator = %msg.author_name, command = ?cmd, "Moderation command");

        let announcement = match cmd {
            ModCommand::Timeout {
                target,
                duration_secs,
            } => {
                self.record(msg, ModerationAction::Timeout, &target, Some(duration_secs))
                    .await;
                format!("{} has been timed out for {}s.", target, duration_secs)
            }
            ModCommand::Ban { target } => {
                self.record(msg, ModerationAction::Ban, &target, None).await;
                format!("{} has been banned.", target)
            }
            ModCommand::Unban { target } => {
                self.record(msg, ModerationAction::Unban, &target, None).await;
                format!("{} has been unbanned.", target)
            }
            ModCommand::Slowmode { seconds } => {
                self.record(msg, ModerationAction::Slowmode, &seconds.to_string(), None)
                    .await;
                if seconds == 0 {
                    "Slow mode disabled.".to_string()
                } else {
                    format!("Slow mode set to {}s.", seconds)
                }
            }
            ModCommand::Stats => self.stats_text(),
            ModCommand::Help => self.help_text(),
            ModCommand::Unknown(text) => {
                format!(
                    "Unknown command: \"{}\". Type !help for a list of available commands.",
                    text
                )
            }
        };

        Some(announcement)
    }

    async fn record(
        &mut self,
        msg: &NormalizedMessage,
        action: ModerationAction,
        target: &str,
        duration_secs: Option<u64>,
    ) {
        *self.tally.entry(msg.author_name.clone()).or_insert(0) += 1;
        metrics::record_moderation_command();
        self.sink
            .record_moderation_event(ModerationEvent {
                action,
                moderator: msg.author_name.clone(),
                target: target.to_string(),
                duration_secs,
            })
            .await;
    }

    fn stats_text(&self) -> String {
        if self.tally.is_empty() {
            return "No moderation actions this session.".to_string();
        }
        let mut entries: Vec<(&String, &u32)> = self.tally.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let lines: Vec<String> = entries
            .iter()
            .map(|(name, count)| format!("{}: {}", name, count))
            .collect();
        format!("Moderation actions this session: {}", lines.join(", "))
    }

    /// Build the help text listing all moderation commands.
    fn help_text(&self) -> String {
        "Moderation commands:\n\
         \n\
         !timeout <user> [seconds]  — Time a user out (default 300s)\n\
         !ban <user>                — Ban a user\n\
         !unban <user>              — Lift a ban\n\
         !slowmode <seconds>        — Set slow mode (0 disables)\n\
         !stats                     — Show this session's mod tallies\n\
         !help                      — Show this help"
            .to_string()
    }
}
