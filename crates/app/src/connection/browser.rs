use std::sync::LazyLock;

use regex::Regex;

static EDGE_USER_AGENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Edg/\d+").expect("edge user-agent pattern")
});

pub const EDGE_PINNING_HINT: &str = "Edge Users: Ensure your wallet extension is pinned";

/// Browser engine the wallet extension runs in, as far as handshake quirks go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserProfile {
    /// Chromium Edge, whose extension handshake can land after the first connect resolves.
    Edge,
    #[default]
    Other,
}

impl BrowserProfile {
    pub fn from_user_agent(user_agent: &str) -> Self {
        if EDGE_USER_AGENT.is_match(user_agent) {
            Self::Edge
        } else {
            Self::Other
        }
    }

    pub fn has_delayed_handshake(self) -> bool {
        matches!(self, Self::Edge)
    }

    /// Extra guidance shown under a connection error.
    pub fn error_hint(self) -> Option<&'static str> {
        match self {
            Self::Edge => Some(EDGE_PINNING_HINT),
            Self::Other => None,
        }
    }
}
