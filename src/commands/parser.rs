//! Parser for bot commands in chat messages.
//!
//! This module provides a pure parser that extracts structured commands from the
//! text of an incoming chat message.

use crate::types::BranchId;

use super::types::Command;

/// Parses a bot command from message text.
///
/// # Arguments
///
/// * `text` - The message text
/// * `bot_name` - The bot's username without the `@` prefix (e.g., `"notice_relay_bot"`)
///
/// # Parsing Rules
///
/// - The message must start with `/` (leading whitespace is ignored)
/// - Command names are case-insensitive
/// - In group chats commands may be addressed as `/cmd@bot_name`; the bot name is
///   matched case-insensitively and commands addressed to other bots are ignored
/// - Everything after the command word is the argument, with whitespace collapsed
/// - Returns `None` for text that is not a command for this bot
///
/// # Examples
///
/// ```
/// use notice_relay::commands::{parse_command, Command};
/// use notice_relay::types::BranchId;
///
/// assert_eq!(parse_command("/start", "relay_bot"), Some(Command::Start));
/// assert_eq!(
///     parse_command("/subscribe@Relay_Bot  CSE", "relay_bot"),
///     Some(Command::Subscribe(Some(BranchId::parse("CSE").unwrap())))
/// );
/// assert_eq!(parse_command("/start@other_bot", "relay_bot"), None);
/// assert_eq!(parse_command("hello", "relay_bot"), None);
/// ```
pub fn parse_command(text: &str, bot_name: &str) -> Option<Command> {
    let text = text.trim_start().strip_prefix('/')?;
    let (head, rest) = split_first_word(text);

    let name = match head.split_once('@') {
        Some((name, target)) => {
            if !target.eq_ignore_ascii_case(bot_name) {
                return None;
            }
            name
        }
        None => head,
    };
    if name.is_empty() {
        return None;
    }

    let argument = parse_argument(rest);
    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "subscribe" => Command::Subscribe(argument),
        "unsubscribe" | "stop" => Command::Unsubscribe(argument),
        "branches" => Command::Branches,
        "status" | "subscriptions" => Command::Status,
        _ => Command::Unknown(name.to_string()),
    };
    Some(command)
}

/// Parses the optional branch argument, collapsing internal whitespace.
fn parse_argument(text: &str) -> Option<BranchId> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    BranchId::parse(collapsed).ok()
}

/// Splits text at the first whitespace, returning (word, rest).
/// If no whitespace, returns (text, "").
fn split_first_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Default bot name used in tests.
    const BOT: &str = "notice_relay_bot";

    fn branch(name: &str) -> Option<BranchId> {
        Some(BranchId::parse(name).unwrap())
    }

    // ==================== Valid command parsing ====================

    #[test]
    fn simple_commands_parse() {
        assert_eq!(parse_command("/start", BOT), Some(Command::Start));
        assert_eq!(parse_command("/help", BOT), Some(Command::Help));
        assert_eq!(parse_command("/branches", BOT), Some(Command::Branches));
        assert_eq!(parse_command("/status", BOT), Some(Command::Status));
    }

    #[test]
    fn subscribe_takes_branch_argument() {
        assert_eq!(
            parse_command("/subscribe CSE", BOT),
            Some(Command::Subscribe(branch("CSE")))
        );
    }

    #[test]
    fn subscribe_without_branch_is_kept_for_usage_reply() {
        assert_eq!(
            parse_command("/subscribe   ", BOT),
            Some(Command::Subscribe(None))
        );
    }

    #[test]
    fn multi_word_branch_collapses_whitespace() {
        assert_eq!(
            parse_command("/subscribe  B.Tech \t CSE ", BOT),
            Some(Command::Subscribe(branch("B.Tech CSE")))
        );
    }

    #[test]
    fn unsubscribe_with_and_without_branch() {
        assert_eq!(
            parse_command("/unsubscribe", BOT),
            Some(Command::Unsubscribe(None))
        );
        assert_eq!(
            parse_command("/unsubscribe IT", BOT),
            Some(Command::Unsubscribe(branch("IT")))
        );
        assert_eq!(parse_command("/stop", BOT), Some(Command::Unsubscribe(None)));
    }

    #[test]
    fn command_name_is_case_insensitive() {
        assert_eq!(parse_command("/START", BOT), Some(Command::Start));
        assert_eq!(
            parse_command("/Subscribe ECE", BOT),
            Some(Command::Subscribe(branch("ECE")))
        );
    }

    // ==================== Addressing ====================

    #[test]
    fn addressed_to_this_bot_parses() {
        assert_eq!(
            parse_command("/start@Notice_Relay_Bot", BOT),
            Some(Command::Start)
        );
    }

    #[test]
    fn addressed_to_other_bot_is_ignored() {
        assert_eq!(parse_command("/start@some_other_bot", BOT), None);
    }

    // ==================== Non-commands ====================

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("please subscribe me", BOT), None);
        assert_eq!(parse_command("", BOT), None);
        assert_eq!(parse_command("/", BOT), None);
        assert_eq!(parse_command("/@notice_relay_bot", BOT), None);
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(
            parse_command("/frobnicate now", BOT),
            Some(Command::Unknown("frobnicate".into()))
        );
    }

    proptest! {
        #[test]
        fn never_panics(text in ".{0,64}") {
            let _ = parse_command(&text, BOT);
        }

        #[test]
        fn text_without_slash_is_never_a_command(text in "[^/ \t\n][^\n]{0,40}") {
            prop_assert_eq!(parse_command(&text, BOT), None);
        }
    }
}
