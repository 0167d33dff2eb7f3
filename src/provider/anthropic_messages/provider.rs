use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{DEFAULT_MAX_TOKENS, ProviderConfig};
use crate::error::NexusError;
use crate::http::{DynHttpTransport, post_json_with_headers, retry_after_from_headers};
use crate::provider::{CapabilityDescriptor, LlmService};
use crate::types::{GenerateRequest, GenerateResponse};

use super::error::parse_anthropic_error;
use super::request::build_anthropic_body;
use super::response::map_response;
use super::types::AnthropicMessageResponse;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_VERSION: &str = "2023-06-01";
pub(crate) const PROVIDER_NAME: &str = "anthropic_messages";

/// Anthropic Messages 适配器
pub struct AnthropicMessagesService {
    transport: DynHttpTransport,
    base_url: String,
    api_key: SecretString,
    version: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicMessagesService {
    /// 使用默认 base_url 与 anthropic-version 创建适配器
    pub fn new(transport: DynHttpTransport, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            version: DEFAULT_VERSION.to_string(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// 由配置构造
    pub fn from_config(transport: DynHttpTransport, config: &ProviderConfig) -> Self {
        let mut service = Self::new(transport, config.api_key.clone(), config.model.clone());
        service.max_tokens = config.max_tokens_or_default();
        if let Some(base_url) = &config.base_url {
            service.base_url = base_url.clone();
        }
        service
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 自定义 anthropic-version 头
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 设置响应 token 上限
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "x-api-key".to_string(),
            self.api_key.expose_secret().to_string(),
        );
        headers.insert("anthropic-version".to_string(), self.version.clone());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }
}

#[async_trait]
impl LlmService for AnthropicMessagesService {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, NexusError> {
        request.validate()?;

        info!(
            provider = PROVIDER_NAME,
            prompt_chars = request.prompt.chars().count(),
            files = request.files.len(),
            "generating response"
        );

        let body = build_anthropic_body(request, &self.model, self.max_tokens)?;
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            &body,
            cancel,
        )
        .await
        .inspect_err(|err| error!(provider = PROVIDER_NAME, error = %err, "request failed"))?;

        let status = response.status;
        let retry_after = retry_after_from_headers(&response.headers);
        let text = response.into_string()?;
        if !(200..300).contains(&status) {
            let err = parse_anthropic_error(status, &text, retry_after);
            error!(provider = PROVIDER_NAME, status, error = %err, "provider returned an error");
            return Err(err);
        }

        let parsed: AnthropicMessageResponse = serde_json::from_str(&text).map_err(|err| {
            NexusError::provider(PROVIDER_NAME, format!("failed to parse response: {err}"))
        })?;
        let mapped = map_response(parsed, PROVIDER_NAME)?;

        info!(
            provider = PROVIDER_NAME,
            total_tokens = mapped.usage.total_tokens,
            "response received"
        );
        Ok(mapped)
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_image_input: true,
            supports_document_input: true,
            supports_audio_input: false,
            supports_video_input: false,
            supports_url_attachments: false,
            inlines_remote_urls: false,
        }
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::{HttpRequest, HttpResponse, HttpTransport};

    struct PanicTransport;

    #[async_trait]
    impl HttpTransport for PanicTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, NexusError> {
            panic!("send should not be called");
        }
    }

    #[test]
    fn endpoint_handles_versioned_and_bare_base_urls() {
        let service = AnthropicMessagesService::new(
            Arc::new(PanicTransport),
            SecretString::from("test-key".to_string()),
            "claude-sonnet-4-5",
        );
        assert_eq!(service.endpoint(), "https://api.anthropic.com/v1/messages");

        let service = service.with_base_url("https://proxy.local/v1");
        assert_eq!(service.endpoint(), "https://proxy.local/v1/messages");
    }

    #[tokio::test]
    async fn pre_cancelled_token_aborts_before_the_network_call() {
        let service = AnthropicMessagesService::new(
            Arc::new(PanicTransport),
            SecretString::from("test-key".to_string()),
            "claude-sonnet-4-5",
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .generate(&GenerateRequest::from_prompt("hello"), &cancel)
            .await
            .expect_err("cancelled call should fail");
        assert!(matches!(err, NexusError::Cancelled { .. }));
    }
}
