use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    Address, BoxFuture, MalformedResponseSnafu, NoAccountsSnafu, ProviderMissingSnafu, WalletError,
    WalletProvider, WalletResult,
};

const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
const ACCOUNTS: &str = "eth_accounts";
/// `eth_accounts` never prompts the user, so a slow answer means the provider is stuck.
const ACCOUNTS_TIMEOUT: Duration = Duration::from_secs(5);

/// EIP-1193 account methods spoken as JSON-RPC 2.0 over HTTP.
///
/// Fits wallets that expose their provider on a local endpoint (signer daemons,
/// dev nodes). Holds no keys; every decision stays with the wallet.
pub struct JsonRpcWallet {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: [Value; 0],
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl JsonRpcWallet {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim().to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn accounts(&self, method: &'static str) -> WalletResult<Vec<Address>> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params: [],
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if method == ACCOUNTS {
            builder = builder.timeout(ACCOUNTS_TIMEOUT);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| send_error(&self.endpoint, source))?;

        let body: RpcResponse = response.json().await.map_err(|source| {
            WalletError::MalformedResponse {
                stage: "decode-rpc-response",
                method,
                details: source.to_string(),
            }
        })?;

        parse_accounts(method, body)
    }
}

/// Nothing listening at the endpoint means no wallet is running there; anything else is
/// a transport problem with a wallet that does exist.
fn send_error(endpoint: &str, source: reqwest::Error) -> WalletError {
    if source.is_connect() {
        return ProviderMissingSnafu {
            stage: "connect-rpc-endpoint",
            endpoint,
        }
        .build();
    }

    WalletError::Unreachable {
        stage: "send-rpc-request",
        endpoint: endpoint.to_string(),
        source,
    }
}

fn parse_accounts(method: &'static str, body: RpcResponse) -> WalletResult<Vec<Address>> {
    if let Some(error) = body.error {
        return Err(WalletError::Rejected {
            stage: "rpc-error-response",
            method,
            code: error.code,
            message: error.message,
        });
    }

    let Some(Value::Array(entries)) = body.result else {
        return MalformedResponseSnafu {
            stage: "rpc-result-shape",
            method,
            details: "expected an array of account strings".to_string(),
        }
        .fail();
    };

    Ok(entries
        .iter()
        .filter_map(Value::as_str)
        .filter_map(Address::parse)
        .collect())
}

impl WalletProvider for JsonRpcWallet {
    fn connect(&self) -> BoxFuture<'_, WalletResult<Address>> {
        Box::pin(async move {
            let accounts = self.accounts(REQUEST_ACCOUNTS).await?;
            accounts.into_iter().next().ok_or_else(|| {
                NoAccountsSnafu {
                    stage: "connect-first-account",
                }
                .build()
            })
        })
    }

    fn request_accounts(&self) -> BoxFuture<'_, WalletResult<Vec<Address>>> {
        Box::pin(self.accounts(REQUEST_ACCOUNTS))
    }

    fn selected_address(&self) -> BoxFuture<'_, Option<Address>> {
        Box::pin(async move {
            match self.accounts(ACCOUNTS).await {
                Ok(accounts) => accounts.into_iter().next(),
                Err(error) => {
                    tracing::debug!(
                        endpoint = %self.endpoint,
                        error = %error,
                        "could not read selected address"
                    );
                    None
                }
            }
        })
    }
}
