use rig::http_client::{self, HttpClientExt};
use rig::providers::openai;
use snafu::{ResultExt, ensure};

use super::provider::{
    BoxFuture, CompletionProvider, CompletionRequest, CompletionStatusSnafu, EmptyPromptSnafu,
    EncodeRequestSnafu, HttpClientSnafu, MissingApiKeySnafu, ProviderConfig, ProviderError,
    ProviderResult,
};
use super::wire::{ChatCompletionBody, extract_reply};

/// Talks to any OpenAI-compatible `/chat/completions` endpoint through rig's HTTP client.
///
/// Rig's own completion models target the Responses API, which gateways such as
/// OpenRouter do not serve, so the request body is built here and only the transport
/// (base URL, bearer auth) comes from rig.
pub struct RigProviderAdapter {
    config: ProviderConfig,
}

impl RigProviderAdapter {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        ensure!(
            !config.api_key.is_empty(),
            MissingApiKeySnafu {
                stage: "rig-adapter-new",
                provider_id: config.provider_id.clone(),
            }
        );

        Ok(Self { config })
    }

    fn build_client(config: &ProviderConfig) -> ProviderResult<openai::Client> {
        let mut builder = openai::Client::builder().api_key(config.api_key.as_str());
        if !config.endpoint.is_empty() {
            builder = builder.base_url(config.endpoint.as_str());
        }
        builder.build().context(HttpClientSnafu {
            stage: "build-client",
        })
    }

    async fn send_completion(&self, request: CompletionRequest) -> ProviderResult<String> {
        ensure!(
            !request.prompt.trim().is_empty(),
            EmptyPromptSnafu {
                stage: "send-completion"
            }
        );

        let body = serde_json::to_vec(&ChatCompletionBody::single_user_turn(
            &request.model_id,
            &request.prompt,
        ))
        .context(EncodeRequestSnafu {
            stage: "encode-completion-body",
        })?;

        let client = Self::build_client(&self.config)?;
        let http_request = client
            .post("/chat/completions")
            .context(HttpClientSnafu {
                stage: "build-completion-request",
            })?
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", self.config.referer.as_str())
            .header("X-Title", self.config.title.as_str())
            .body(body)
            .map_err(|source| ProviderError::BuildHttpRequestBody {
                stage: "build-completion-request-body",
                message: source.to_string(),
            })?;

        let response = client.send(http_request).await.context(HttpClientSnafu {
            stage: "send-completion-request",
        })?;
        let status = response.status();
        let payload = http_client::text(response).await.context(HttpClientSnafu {
            stage: "read-completion-response",
        })?;

        if !status.is_success() {
            return CompletionStatusSnafu {
                stage: "completion-http-status",
                status: status.as_u16(),
                body: payload,
            }
            .fail();
        }

        let reply = extract_reply(&payload)?;
        tracing::debug!(
            provider_id = %self.config.provider_id,
            model_id = %request.model_id,
            reply_len = reply.len(),
            "completion received"
        );
        Ok(reply)
    }
}

impl CompletionProvider for RigProviderAdapter {
    fn id(&self) -> &str {
        &self.config.provider_id
    }

    fn model(&self) -> &str {
        &self.config.model_id
    }

    fn complete<'a>(&'a self, request: CompletionRequest) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(self.send_completion(request))
    }
}
