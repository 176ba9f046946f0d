//! Text the terminal surface renders, kept apart from the I/O loop so it can be tested.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use crate::chat::{Message, Sender};
use crate::connection::{BrowserProfile, ConnectionState};

pub const SEND_FIRST_MESSAGE_HINT: &str = "Send your first message!";
pub const CONNECT_TO_CHAT_HINT: &str = "Connect wallet to chat";
pub const INPUT_HINT: &str = "Type a message...";
pub const ADDRESS_COPIED: &str = "Address copied to clipboard!";

/// `0x1234...abcd` form of an address. Short inputs are returned unchanged.
pub fn truncate_address(address: &str) -> String {
    let chars = address.chars().collect::<Vec<_>>();
    if chars.len() <= 10 {
        return address.to_string();
    }

    let head = chars[..6].iter().collect::<String>();
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{head}...{tail}")
}

pub fn connect_button_label(state: &ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "Connect Wallet",
        ConnectionState::Connecting => "Connecting...",
        ConnectionState::Error(_) => "Retry Connection",
        ConnectionState::Connected { .. } => "Disconnect Wallet",
    }
}

/// Banner lines for a failed connection, with the browser-specific hint when one applies.
pub fn error_banner(state: &ConnectionState, browser: BrowserProfile) -> Vec<String> {
    let ConnectionState::Error(failure) = state else {
        return Vec::new();
    };

    let mut lines = vec![format!("⚠️ {}", failure.user_message())];
    if let Some(hint) = browser.error_hint() {
        lines.push(hint.to_string());
    }
    lines
}

pub fn empty_transcript_hint(connected: bool) -> &'static str {
    if connected {
        SEND_FIRST_MESSAGE_HINT
    } else {
        CONNECT_TO_CHAT_HINT
    }
}

pub fn send_label(busy: bool) -> &'static str {
    if busy { "..." } else { "Send" }
}

pub fn message_line(message: &Message) -> String {
    match message.sender {
        Sender::User => format!("{:>6} │ {}", "you", message.text),
        Sender::Assistant => format!("{:>6} │ {}", "ai", message.text),
    }
}

/// OSC 52 sequence asking the terminal to place `text` on the system clipboard.
pub fn clipboard_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", BASE64_STANDARD.encode(text))
}
