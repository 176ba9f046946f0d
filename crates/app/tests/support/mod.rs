#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::pending;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use walletchat::connection::{ConnectionHandle, ConnectionState};
use walletchat::wallet::{Address, BoxFuture, WalletError, WalletProvider, WalletResult};
use walletchat_llm::{self as llm, CompletionProvider, CompletionRequest, ProviderResult};

pub const ALICE: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";
pub const BOB: &str = "0x2932b7A2355D6fecc4b5c0B6BD44cC31df247a2e";

pub fn address(raw: &str) -> Address {
    Address::parse(raw).expect("address")
}

pub fn declined() -> WalletError {
    WalletError::Rejected {
        stage: "test",
        method: "eth_requestAccounts",
        code: 4001,
        message: "User rejected the request.".to_string(),
    }
}

pub fn provider_missing() -> WalletError {
    WalletError::ProviderMissing {
        stage: "test",
        endpoint: "http://127.0.0.1:8545".to_string(),
    }
}

/// Scripted outcome of one `connect` call.
pub enum ConnectStep {
    Resolve(WalletResult<Address>),
    ResolveAfter(Duration, WalletResult<Address>),
    /// The handshake never lands.
    Hang,
}

#[derive(Default)]
pub struct FakeWallet {
    connect_script: Mutex<VecDeque<ConnectStep>>,
    selected: Mutex<Option<Address>>,
    selection_hangs: AtomicBool,
    granted: Mutex<Vec<Address>>,
    connect_calls: AtomicUsize,
    request_accounts_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl FakeWallet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, step: ConnectStep) {
        self.connect_script.lock().expect("script").push_back(step);
    }

    pub fn select(&self, address: Option<Address>) {
        *self.selected.lock().expect("selected") = address;
    }

    /// Makes every later `selected_address` read wait forever.
    pub fn hang_selection(&self) {
        self.selection_hangs.store(true, Ordering::SeqCst);
    }

    pub fn grant(&self, accounts: Vec<Address>) {
        *self.granted.lock().expect("granted") = accounts;
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn request_accounts_calls(&self) -> usize {
        self.request_accounts_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

impl WalletProvider for FakeWallet {
    fn connect(&self) -> BoxFuture<'_, WalletResult<Address>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .connect_script
            .lock()
            .expect("script")
            .pop_front()
            .unwrap_or_else(|| ConnectStep::Resolve(Ok(address(ALICE))));

        Box::pin(async move {
            match step {
                ConnectStep::Resolve(result) => result,
                ConnectStep::ResolveAfter(delay, result) => {
                    tokio::time::sleep(delay).await;
                    result
                }
                ConnectStep::Hang => pending().await,
            }
        })
    }

    fn request_accounts(&self) -> BoxFuture<'_, WalletResult<Vec<Address>>> {
        self.request_accounts_calls.fetch_add(1, Ordering::SeqCst);
        let granted = self.granted.lock().expect("granted").clone();
        Box::pin(async move { Ok(granted) })
    }

    fn selected_address(&self) -> BoxFuture<'_, Option<Address>> {
        let selected = self.selected.lock().expect("selected").clone();
        let hangs = self.selection_hangs.load(Ordering::SeqCst);
        Box::pin(async move {
            if hangs {
                pending::<()>().await;
            }
            selected
        })
    }

    fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Completion provider that answers from a script, optionally holding each reply until
/// released.
#[derive(Default)]
pub struct FakeCompletion {
    replies: Mutex<VecDeque<ProviderResult<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    gate: Option<Arc<Notify>>,
}

impl FakeCompletion {
    pub fn replying(replies: Vec<ProviderResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    pub fn gated(replies: Vec<ProviderResult<String>>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests").clone()
    }
}

impl CompletionProvider for FakeCompletion {
    fn id(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        llm::DEFAULT_MODEL
    }

    fn complete<'a>(&'a self, request: CompletionRequest) -> llm::BoxFuture<'a, ProviderResult<String>> {
        self.requests.lock().expect("requests").push(request);
        let reply = self
            .replies
            .lock()
            .expect("replies")
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()));
        let gate = self.gate.clone();

        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            reply
        })
    }
}

pub fn completion_failure() -> llm::ProviderError {
    llm::ProviderError::CompletionStatus {
        stage: "test",
        status: 502,
        body: "bad gateway".to_string(),
    }
}

/// Waits (in virtual time) until the published state satisfies `predicate`.
pub async fn wait_for_state(
    handle: &ConnectionHandle,
    predicate: impl FnMut(&ConnectionState) -> bool,
) -> ConnectionState {
    let mut states = handle.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(60), states.wait_for(predicate))
        .await
        .expect("state reached before timeout")
        .expect("manager running");
    state.clone()
}
