use std::sync::Arc;

mod provider;
mod rig_adapter;
mod wire;

pub use provider::{
    BoxFuture, CompletionProvider, CompletionRequest, DEFAULT_ENDPOINT, DEFAULT_MODEL,
    DEFAULT_REFERER, DEFAULT_TITLE, OPENROUTER_PROVIDER_ID, ProviderConfig, ProviderError,
    ProviderResult,
};
pub use rig_adapter::RigProviderAdapter;

pub fn create_provider(mut config: ProviderConfig) -> ProviderResult<Arc<dyn CompletionProvider>> {
    if config.provider_id.trim().is_empty() {
        config.provider_id = OPENROUTER_PROVIDER_ID.to_string();
    }

    match config.provider_id.as_str() {
        // Both speak the same chat-completions wire format; only the endpoint differs.
        "openrouter" | "openai" => Ok(Arc::new(RigProviderAdapter::new(config)?)),
        _ => Err(ProviderError::UnsupportedProvider {
            stage: "create-provider",
            provider_id: config.provider_id,
        }),
    }
}
