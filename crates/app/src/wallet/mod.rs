//! Seam between the connection manager and whatever wallet the host injects.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use snafu::Snafu;

mod rpc;

pub use rpc::JsonRpcWallet;

/// EIP-1193 error code a provider returns when the user declines a request.
pub const USER_REJECTED_REQUEST_CODE: i64 = 4001;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type WalletResult<T> = Result<T, WalletError>;

/// Account address as reported by the wallet, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Returns `None` for blank input so an empty string never stands in for an account.
    pub fn parse(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum WalletError {
    #[snafu(display("wallet provider at {endpoint} is unreachable on `{stage}`: {source}"))]
    Unreachable {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("wallet provider rejected `{method}` with code {code}: {message}"))]
    Rejected {
        stage: &'static str,
        method: &'static str,
        code: i64,
        message: String,
    },
    #[snafu(display("wallet provider sent a malformed `{method}` response: {details}"))]
    MalformedResponse {
        stage: &'static str,
        method: &'static str,
        details: String,
    },
    #[snafu(display("wallet provider returned no accounts"))]
    NoAccounts { stage: &'static str },
    #[snafu(display("no wallet provider is listening at {endpoint}"))]
    ProviderMissing {
        stage: &'static str,
        endpoint: String,
    },
}

impl WalletError {
    /// EIP-1193 error code, when the provider supplied one.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            Self::Unreachable { .. }
            | Self::MalformedResponse { .. }
            | Self::NoAccounts { .. }
            | Self::ProviderMissing { .. } => None,
        }
    }
}

/// Capabilities of an injected wallet that the connection manager relies on.
pub trait WalletProvider: Send + Sync {
    /// Provider-agnostic connect; resolves to the account the session binds to.
    fn connect(&self) -> BoxFuture<'_, WalletResult<Address>>;

    /// Explicit account request (`eth_requestAccounts`), used by the compensating retry.
    fn request_accounts(&self) -> BoxFuture<'_, WalletResult<Vec<Address>>>;

    /// Account the provider currently exposes to this site, if it already authorized it.
    fn selected_address(&self) -> BoxFuture<'_, Option<Address>>;

    /// Local teardown hook. Providers without a revocation call keep the default.
    fn disconnect(&self) {}
}
