//! Telegram bot command parsing and reply texts.

/// A command sent to the bot in a private chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Status,
    Link(String),
    Unlink,
    Notifications(bool),
    Unknown(String),
}

/// Parse the text of an incoming message.
///
/// Returns `None` for plain text that is not a command. Handles the
/// `/command@BotName` form used in group chats.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let name = head.split('@').next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();

    let command = match (name.as_str(), arg) {
        ("start", _) => BotCommand::Start,
        ("help", _) => BotCommand::Help,
        ("status", _) => BotCommand::Status,
        ("link", Some(code)) => BotCommand::Link(code.to_ascii_uppercase()),
        ("link", None) => BotCommand::Unknown("link".to_string()),
        ("unlink", _) => BotCommand::Unlink,
        ("notifications", Some(flag)) => match flag.to_ascii_lowercase().as_str() {
            "on" => BotCommand::Notifications(true),
            "off" => BotCommand::Notifications(false),
            _ => BotCommand::Unknown(name),
        },
        _ => BotCommand::Unknown(name),
    };
    Some(command)
}

pub const HELP_TEXT: &str = "<b>Available commands</b>\n\
/start - Welcome message\n\
/help - Show this help\n\
/status - Show your linked business and subscription\n\
/link CODE - Link this chat to your business\n\
/unlink - Stop receiving business notifications\n\
/notifications on|off - Toggle notifications";

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn welcome_text(first_name: Option<&str>) -> String {
    let name = escape_html(first_name.unwrap_or("there"));
    format!(
        "Hello {name}! This bot delivers notifications about your e-menu business.\n\n{HELP_TEXT}"
    )
}

/// Render a notification as `<b>subject</b>` followed by the body.
pub fn render_notification(subject: &str, body: &str) -> String {
    format!("<b>{}</b>\n{}", escape_html(subject), escape_html(body))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("hello"), None);
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_command("/start"), Some(BotCommand::Start));
        assert_eq!(parse_command(" /HELP "), Some(BotCommand::Help));
        assert_eq!(parse_command("/status@emenu_bot"), Some(BotCommand::Status));
        assert_eq!(parse_command("/unlink"), Some(BotCommand::Unlink));
    }

    #[test]
    fn link_requires_code() {
        assert_eq!(
            parse_command("/link ab12cd34"),
            Some(BotCommand::Link("AB12CD34".to_string()))
        );
        assert_eq!(
            parse_command("/link"),
            Some(BotCommand::Unknown("link".to_string()))
        );
    }

    #[test]
    fn notifications_toggle() {
        assert_eq!(
            parse_command("/notifications off"),
            Some(BotCommand::Notifications(false))
        );
        assert_matches!(
            parse_command("/notifications maybe"),
            Some(BotCommand::Unknown(name)) if name == "notifications"
        );
        assert_matches!(parse_command("/frobnicate"), Some(BotCommand::Unknown(_)));
    }

    #[test]
    fn escapes_html() {
        assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
        assert_eq!(
            render_notification("Renewed", "a < b"),
            "<b>Renewed</b>\na &lt; b"
        );
    }

    #[test]
    fn welcome_uses_name() {
        assert!(welcome_text(Some("Dara")).starts_with("Hello Dara!"));
        assert!(welcome_text(None).starts_with("Hello there!"));
    }
}
