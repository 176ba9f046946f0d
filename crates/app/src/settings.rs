use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use walletchat_llm::{
    CompletionProvider, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_REFERER, DEFAULT_TITLE,
    OPENROUTER_PROVIDER_ID, ProviderConfig, create_provider,
};

use crate::connection::{BrowserProfile, ConnectionOptions};

pub const SETTINGS_DIRECTORY_NAME: &str = "walletchat";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "WALLETCHAT_";
pub const DEFAULT_WALLET_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_EDGE_RETRY_DELAY_MS: u64 = 1500;
pub const DEFAULT_ACCOUNT_POLL_MS: u64 = 4000;

/// Credential baked in at build time; runtime configuration can still override it.
const BUILD_TIME_API_KEY: Option<&str> = option_env!("WALLETCHAT_API_KEY");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_referer")]
    pub referer: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_wallet_rpc_url")]
    pub wallet_rpc_url: String,
    /// User agent of the browser hosting the wallet extension, for quirk detection.
    #[serde(default)]
    pub user_agent: String,
    /// `0` disables the compensating retry.
    #[serde(default = "default_edge_retry_delay_ms")]
    pub edge_retry_delay_ms: u64,
    /// Period of the selected-account poll. `0` disables it.
    #[serde(default = "default_account_poll_ms")]
    pub account_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            api_key: default_api_key(),
            endpoint: default_endpoint(),
            model: default_model(),
            referer: default_referer(),
            title: default_title(),
            wallet_rpc_url: default_wallet_rpc_url(),
            user_agent: String::new(),
            edge_retry_delay_ms: default_edge_retry_delay_ms(),
            account_poll_ms: default_account_poll_ms(),
        }
    }
}

impl Settings {
    pub fn to_provider_config(&self) -> Option<ProviderConfig> {
        if self.api_key.trim().is_empty() {
            return None;
        }

        Some(
            ProviderConfig::new(&self.provider_id, &self.api_key, &self.endpoint, &self.model)
                .with_attribution(&self.referer, &self.title),
        )
    }

    /// Provider for the configured credential. Without one the app still runs and every
    /// send resolves to the failure reply.
    pub fn completion_provider(&self) -> Option<Arc<dyn CompletionProvider>> {
        let Some(config) = self.to_provider_config() else {
            tracing::warn!(provider_id = %self.provider_id, "no API key configured; chat replies will fail");
            return None;
        };

        match create_provider(config) {
            Ok(provider) => Some(provider),
            Err(error) => {
                tracing::warn!(error = %error, "failed to create completion provider");
                None
            }
        }
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            browser: BrowserProfile::from_user_agent(&self.user_agent),
            compensation_delay: (self.edge_retry_delay_ms > 0)
                .then(|| Duration::from_millis(self.edge_retry_delay_ms)),
        }
    }

    pub fn account_poll_period(&self) -> Option<Duration> {
        (self.account_poll_ms > 0).then(|| Duration::from_millis(self.account_poll_ms))
    }

    pub fn normalized(self) -> Self {
        Self {
            provider_id: or_default(self.provider_id, default_provider_id),
            api_key: self.api_key.trim().to_string(),
            endpoint: or_default(self.endpoint, default_endpoint),
            model: or_default(self.model, default_model),
            referer: or_default(self.referer, default_referer),
            title: or_default(self.title, default_title),
            wallet_rpc_url: or_default(self.wallet_rpc_url, default_wallet_rpc_url),
            user_agent: self.user_agent.trim().to_string(),
            edge_retry_delay_ms: self.edge_retry_delay_ms,
            account_poll_ms: self.account_poll_ms,
        }
    }
}

/// Layered settings: defaults, then the JSON file, then `WALLETCHAT_*` variables.
pub struct SettingsStore {
    settings: Arc<ArcSwap<Settings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".walletchat"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_layers(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    /// Re-reads every layer and swaps the snapshot in one step.
    pub fn reload(&self) -> Arc<Settings> {
        let settings = Arc::new(Self::load_layers(&self.config_path));
        self.settings.store(Arc::clone(&settings));
        tracing::info!("reloaded settings from {:?}", self.config_path);
        settings
    }

    fn load_layers(path: &Path) -> Settings {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if path.exists() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        match figment.extract::<Settings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                Settings::default()
            }
        }
    }
}

fn or_default(value: String, default: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_string()
    }
}

fn default_provider_id() -> String {
    OPENROUTER_PROVIDER_ID.to_string()
}

fn default_api_key() -> String {
    BUILD_TIME_API_KEY.unwrap_or_default().trim().to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_referer() -> String {
    DEFAULT_REFERER.to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_wallet_rpc_url() -> String {
    DEFAULT_WALLET_RPC_URL.to_string()
}

fn default_edge_retry_delay_ms() -> u64 {
    DEFAULT_EDGE_RETRY_DELAY_MS
}

fn default_account_poll_ms() -> u64 {
    DEFAULT_ACCOUNT_POLL_MS
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn file_then_environment_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                SETTINGS_FILE_NAME,
                r#"{
                    "model": "  mistralai/mistral-7b-instruct ",
                    "endpoint": "",
                    "user_agent": "Mozilla/5.0 Edg/120.0"
                }"#,
            )?;
            jail.set_env("WALLETCHAT_API_KEY", "sk-from-env");
            jail.set_env("WALLETCHAT_EDGE_RETRY_DELAY_MS", "0");

            let store = SettingsStore::new(PathBuf::from(SETTINGS_FILE_NAME));
            let settings = store.settings();

            assert_eq!(settings.model, "mistralai/mistral-7b-instruct");
            assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
            assert_eq!(settings.api_key, "sk-from-env");

            let options = settings.connection_options();
            assert_eq!(options.browser, BrowserProfile::Edge);
            assert_eq!(options.compensation_delay, None);
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults_and_reload_picks_up_changes() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let store = SettingsStore::new(PathBuf::from(SETTINGS_FILE_NAME));
            assert_eq!(store.settings().wallet_rpc_url, DEFAULT_WALLET_RPC_URL);
            assert_eq!(
                store.settings().connection_options().compensation_delay,
                Some(Duration::from_millis(DEFAULT_EDGE_RETRY_DELAY_MS))
            );

            jail.create_file(SETTINGS_FILE_NAME, r#"{ "wallet_rpc_url": "http://10.0.0.2:8545" }"#)?;
            let reloaded = store.reload();
            assert_eq!(reloaded.wallet_rpc_url, "http://10.0.0.2:8545");
            assert_eq!(store.settings().wallet_rpc_url, "http://10.0.0.2:8545");
            Ok(())
        });
    }

    #[test]
    fn blank_api_key_means_no_provider_config() {
        let settings = Settings {
            api_key: "  ".to_string(),
            ..Settings::default()
        }
        .normalized();
        assert!(settings.to_provider_config().is_none());

        let settings = Settings {
            api_key: "sk-test".to_string(),
            ..Settings::default()
        };
        let config = settings.to_provider_config().expect("config");
        assert_eq!(config.model_id, DEFAULT_MODEL);
        assert_eq!(config.title, DEFAULT_TITLE);

        let provider = settings.completion_provider().expect("provider");
        assert_eq!(provider.id(), OPENROUTER_PROVIDER_ID);
        assert_eq!(provider.model(), DEFAULT_MODEL);
    }

    #[test]
    fn zero_poll_period_disables_account_watch() {
        let settings = Settings {
            account_poll_ms: 0,
            ..Settings::default()
        };
        assert_eq!(settings.account_poll_period(), None);
        assert_eq!(
            Settings::default().account_poll_period(),
            Some(Duration::from_millis(DEFAULT_ACCOUNT_POLL_MS))
        );
    }
}
