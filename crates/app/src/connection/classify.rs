use crate::wallet::{USER_REJECTED_REQUEST_CODE, WalletError};

pub const USER_DECLINED_MESSAGE: &str = "You cancelled the connection";
pub const PROVIDER_UNAVAILABLE_MESSAGE: &str = "Please check your wallet extension";

/// Normalized reason a connection attempt did not produce a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectFailure {
    UserDeclined,
    /// Missing provider, transport trouble, or any provider error other than a decline.
    ProviderUnavailable,
}

impl ConnectFailure {
    pub fn classify(error: &WalletError) -> Self {
        if error.code() == Some(USER_REJECTED_REQUEST_CODE)
            || error.to_string().to_ascii_lowercase().contains("user rejected")
        {
            Self::UserDeclined
        } else {
            Self::ProviderUnavailable
        }
    }

    /// Fixed text shown to the user. Raw provider text never reaches the surface.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::UserDeclined => USER_DECLINED_MESSAGE,
            Self::ProviderUnavailable => PROVIDER_UNAVAILABLE_MESSAGE,
        }
    }
}
