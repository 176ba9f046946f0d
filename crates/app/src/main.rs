use std::sync::Arc;

use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use walletchat::AppError;
use walletchat::chat::ConversationView;
use walletchat::connection::{ConnectionManager, spawn_account_watch};
use walletchat::settings::SettingsStore;
use walletchat::shell::Shell;
use walletchat::wallet::{JsonRpcWallet, WalletProvider};

/// Entry point: logging to stderr, layered settings, the connection manager, then the
/// terminal shell on stdin/stdout until `/quit` or end of input.
#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "walletchat=info,walletchat_llm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let store = Arc::new(SettingsStore::load());
    let settings = store.settings();
    tracing::info!(
        config_path = ?store.config_path(),
        model = %settings.model,
        wallet = %settings.wallet_rpc_url,
        "starting wallet chat"
    );

    let wallet: Arc<dyn WalletProvider> = Arc::new(JsonRpcWallet::new(&settings.wallet_rpc_url));
    let options = settings.connection_options();
    let (connection, manager_task) = ConnectionManager::spawn(Arc::clone(&wallet), options);
    let account_watch = settings
        .account_poll_period()
        .map(|period| spawn_account_watch(Arc::clone(&wallet), connection.clone(), period));

    let view = ConversationView::new(settings.completion_provider(), settings.model.clone());
    let shell = Shell::new(
        connection,
        view,
        Arc::clone(&store),
        options.browser,
        tokio::io::stdout(),
    );
    let result = shell.run(BufReader::new(tokio::io::stdin())).await;

    if let Some(task) = account_watch {
        task.abort();
    }
    manager_task.abort();
    result.map(|_| ())
}
