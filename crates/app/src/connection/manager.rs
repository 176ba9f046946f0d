use std::sync::Arc;
use std::time::Duration;

use snafu::Snafu;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::wallet::{Address, WalletProvider, WalletResult};

use super::browser::BrowserProfile;
use super::classify::ConnectFailure;
use super::state::{ConnectionState, ConnectionTransition, Session};

/// Delay before the compensating account request on browsers with a slow handshake.
pub const DEFAULT_COMPENSATION_DELAY: Duration = Duration::from_millis(1500);

/// Events pushed into the manager from the surface or the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCommand {
    Connect,
    Disconnect,
    /// Reconcile with the provider's selected address (mount, reload).
    Sync,
    /// Wallet-initiated account change, first entry is the active account.
    AccountsChanged(Vec<Address>),
}

/// Events the manager schedules for itself.
#[derive(Debug)]
enum InternalEvent {
    AttemptSettled {
        epoch: u64,
        result: WalletResult<Address>,
    },
    CompensationGranted {
        epoch: u64,
    },
    SelectionRead {
        address: Option<Address>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptOrigin {
    User,
    AutoSync,
    Compensation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub browser: BrowserProfile,
    /// `None` turns the compensating retry off entirely.
    pub compensation_delay: Option<Duration>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            browser: BrowserProfile::Other,
            compensation_delay: Some(DEFAULT_COMPENSATION_DELAY),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ConnectionError {
    #[snafu(display("connection manager has stopped; `{stage}` was not delivered"))]
    ManagerStopped { stage: &'static str },
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

struct ScheduledCompensation {
    epoch: u64,
    task: JoinHandle<()>,
}

/// Owns the wallet session. Runs as a single task; everything that can change the
/// session arrives as an event, and every resulting state is published on a watch
/// channel.
pub struct ConnectionManager {
    wallet: Arc<dyn WalletProvider>,
    options: ConnectionOptions,
    state: ConnectionState,
    /// Identifies the latest attempt chain. Settlements and timers from older chains are stale.
    epoch: u64,
    compensation: Option<ScheduledCompensation>,
    /// Set by an explicit disconnect so the reconcile pass does not undo the user's choice.
    auto_sync_suppressed: bool,
    state_tx: watch::Sender<ConnectionState>,
    internal_tx: mpsc::UnboundedSender<InternalEvent>,
}

/// Cloneable front door to a running [`ConnectionManager`].
#[derive(Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<ConnectionCommand>,
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionHandle {
    pub fn request_connection(&self) -> ConnectionResult<()> {
        self.send(ConnectionCommand::Connect, "request-connection")
    }

    pub fn disconnect(&self) -> ConnectionResult<()> {
        self.send(ConnectionCommand::Disconnect, "disconnect")
    }

    pub fn sync(&self) -> ConnectionResult<()> {
        self.send(ConnectionCommand::Sync, "sync")
    }

    pub fn accounts_changed(&self, accounts: Vec<Address>) -> ConnectionResult<()> {
        self.send(ConnectionCommand::AccountsChanged(accounts), "accounts-changed")
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Session {
        self.state.borrow().session()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    fn send(&self, command: ConnectionCommand, stage: &'static str) -> ConnectionResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ManagerStoppedSnafu { stage }.build())
    }
}

impl ConnectionManager {
    /// Starts the manager on the current tokio runtime. It reconciles with the
    /// provider once on start and stops when every handle is dropped.
    pub fn spawn(
        wallet: Arc<dyn WalletProvider>,
        options: ConnectionOptions,
    ) -> (ConnectionHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::default());

        let manager = Self {
            wallet,
            options,
            state: ConnectionState::default(),
            epoch: 0,
            compensation: None,
            auto_sync_suppressed: false,
            state_tx,
            internal_tx,
        };

        let task = tokio::spawn(manager.run(command_rx, internal_rx));
        let handle = ConnectionHandle {
            commands: command_tx,
            state: state_rx,
        };
        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ConnectionCommand>,
        mut internal: mpsc::UnboundedReceiver<InternalEvent>,
    ) {
        self.reconcile();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = internal.recv() => self.handle_internal(event),
            }
        }

        self.cancel_compensation();
        tracing::debug!("connection manager stopped");
    }

    fn handle_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect => {
                self.auto_sync_suppressed = false;
                self.request_connection(AttemptOrigin::User);
            }
            ConnectionCommand::Disconnect => self.disconnect(),
            ConnectionCommand::Sync => self.reconcile(),
            ConnectionCommand::AccountsChanged(accounts) => self.accounts_changed(accounts),
        }
    }

    fn handle_internal(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::AttemptSettled { epoch, result } => self.settle(epoch, result),
            InternalEvent::CompensationGranted { epoch } => {
                if self.compensation.as_ref().map(|scheduled| scheduled.epoch) == Some(epoch) {
                    self.compensation = None;
                }
                if epoch != self.epoch || self.state.is_connected() {
                    tracing::debug!(epoch, current_epoch = self.epoch, "ignoring stale compensating retry");
                    return;
                }
                tracing::info!(epoch, "wallet granted accounts after delayed handshake; retrying");
                self.request_connection(AttemptOrigin::Compensation);
            }
            InternalEvent::SelectionRead { address } => self.selection_read(address),
        }
    }

    fn request_connection(&mut self, origin: AttemptOrigin) {
        match (&self.state, origin) {
            (ConnectionState::Connected { .. }, _) => {
                tracing::debug!(?origin, "already connected; connect request is a no-op");
                return;
            }
            // A fresh account grant supersedes an attempt whose handshake never landed.
            (ConnectionState::Connecting, AttemptOrigin::User | AttemptOrigin::AutoSync) => {
                tracing::debug!(?origin, "connection attempt already in flight");
                return;
            }
            _ => {}
        }

        if origin != AttemptOrigin::Compensation {
            self.cancel_compensation();
        }
        self.epoch = self.epoch.wrapping_add(1);
        let epoch = self.epoch;
        self.transition(ConnectionTransition::Begin);

        let wallet = Arc::clone(&self.wallet);
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = wallet.connect().await;
            let _ = internal_tx.send(InternalEvent::AttemptSettled { epoch, result });
        });

        if origin != AttemptOrigin::Compensation {
            self.schedule_compensation(epoch);
        }
    }

    fn settle(&mut self, epoch: u64, result: WalletResult<Address>) {
        if epoch != self.epoch || !self.state.is_connecting() {
            tracing::debug!(epoch, current_epoch = self.epoch, "ignoring stale connection result");
            return;
        }

        match result {
            Ok(address) => {
                tracing::info!(%address, "wallet connected");
                self.cancel_compensation();
                self.transition(ConnectionTransition::Succeed(address));
            }
            Err(error) => {
                let failure = ConnectFailure::classify(&error);
                match failure {
                    ConnectFailure::UserDeclined => {
                        tracing::info!(error = %error, "user declined wallet connection")
                    }
                    ConnectFailure::ProviderUnavailable => {
                        tracing::warn!(error = %error, "wallet connection failed")
                    }
                }
                self.transition(ConnectionTransition::Fail(failure));
            }
        }
    }

    fn disconnect(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.cancel_compensation();
        self.auto_sync_suppressed = true;
        self.wallet.disconnect();
        self.transition(ConnectionTransition::Disconnect);
        tracing::info!("wallet disconnected");
    }

    fn accounts_changed(&mut self, accounts: Vec<Address>) {
        let first = accounts.into_iter().next();
        match (&self.state, first) {
            (ConnectionState::Connected { .. }, None) => {
                tracing::info!("wallet revoked every account");
                self.disconnect();
            }
            (ConnectionState::Connected { address }, Some(next)) if *address != next => {
                tracing::info!(from = %address, to = %next, "wallet switched account");
                self.publish(ConnectionState::Connected { address: next });
            }
            (ConnectionState::Disconnected | ConnectionState::Error(_), Some(_)) => {
                self.auto_sync_suppressed = false;
                self.request_connection(AttemptOrigin::AutoSync);
            }
            _ => {}
        }
    }

    /// Reads the provider's selected account off the actor task; the answer comes back
    /// as `SelectionRead`.
    fn reconcile(&mut self) {
        if !self.can_auto_sync() {
            return;
        }

        let wallet = Arc::clone(&self.wallet);
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let address = wallet.selected_address().await;
            let _ = internal_tx.send(InternalEvent::SelectionRead { address });
        });
    }

    /// Triggers one connect when the provider already exposes an account this site was
    /// authorized for and the session is still disconnected.
    fn selection_read(&mut self, address: Option<Address>) {
        let Some(address) = address else {
            return;
        };
        if !self.can_auto_sync() {
            tracing::debug!(%address, state = ?self.state, "selection read no longer applies");
            return;
        }

        tracing::info!(%address, "provider already exposes an account; syncing session");
        self.request_connection(AttemptOrigin::AutoSync);
    }

    fn can_auto_sync(&self) -> bool {
        !self.auto_sync_suppressed && matches!(self.state, ConnectionState::Disconnected)
    }

    fn schedule_compensation(&mut self, epoch: u64) {
        let Some(delay) = self.options.compensation_delay else {
            return;
        };
        if !self.options.browser.has_delayed_handshake() {
            return;
        }

        let wallet = Arc::clone(&self.wallet);
        let internal_tx = self.internal_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match wallet.request_accounts().await {
                Ok(accounts) if !accounts.is_empty() => {
                    let _ = internal_tx.send(InternalEvent::CompensationGranted { epoch });
                }
                Ok(_) => tracing::debug!(epoch, "compensating account request returned nothing"),
                Err(error) => {
                    tracing::warn!(epoch, error = %error, "compensating account request failed")
                }
            }
        });

        tracing::debug!(epoch, delay_ms = delay.as_millis() as u64, "scheduled compensating retry");
        self.compensation = Some(ScheduledCompensation { epoch, task });
    }

    fn cancel_compensation(&mut self) {
        if let Some(scheduled) = self.compensation.take() {
            scheduled.task.abort();
            tracing::debug!(epoch = scheduled.epoch, "cancelled compensating retry");
        }
    }

    fn transition(&mut self, transition: ConnectionTransition) {
        match self.state.apply(transition) {
            Ok(next) => self.publish(next),
            Err(rejection) => {
                tracing::debug!(state = ?self.state, ?rejection, "rejected connection transition")
            }
        }
    }

    fn publish(&mut self, next: ConnectionState) {
        if next == self.state {
            return;
        }
        self.state = next.clone();
        self.state_tx.send_replace(next);
    }
}
