use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::wallet::{Address, WalletProvider};

use super::manager::ConnectionHandle;

/// Turns changes in the provider's selected account into `AccountsChanged` events, for
/// wallets that cannot push them. The first observation is the baseline and is not reported.
pub fn spawn_account_watch(
    wallet: Arc<dyn WalletProvider>,
    connection: ConnectionHandle,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        ticker.tick().await;
        let mut last_seen = wallet.selected_address().await;

        loop {
            ticker.tick().await;
            let current = wallet.selected_address().await;
            if current == last_seen {
                continue;
            }

            tracing::debug!(from = ?last_seen, to = ?current, "provider account selection changed");
            let accounts = current.iter().cloned().collect::<Vec<Address>>();
            if connection.accounts_changed(accounts).is_err() {
                tracing::debug!("connection manager stopped; account watch exiting");
                break;
            }
            last_seen = current;
        }
    })
}
