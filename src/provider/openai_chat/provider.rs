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

use super::error::parse_openai_error;
use super::request::build_openai_body;
use super::response::map_response;
use super::types::OpenAiChatResponse;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub(crate) const PROVIDER_NAME: &str = "openai_chat";

/// OpenAI Chat Completions 适配器
pub struct OpenAiChatService {
    transport: DynHttpTransport,
    base_url: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
}

impl OpenAiChatService {
    /// 创建带默认 base_url 的适配器
    pub fn new(transport: DynHttpTransport, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// 由配置构造 工厂按 ProviderKind 分派到这里
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

    /// 设置响应 token 上限
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key.expose_secret()),
        );
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }
}

#[async_trait]
impl LlmService for OpenAiChatService {
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

        let body = build_openai_body(request, &self.model, self.max_tokens)?;
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
            let err = parse_openai_error(status, &text, retry_after);
            error!(provider = PROVIDER_NAME, status, error = %err, "provider returned an error");
            return Err(err);
        }

        let parsed: OpenAiChatResponse = serde_json::from_str(&text).map_err(|err| {
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
            supports_audio_input: true,
            supports_video_input: false,
            supports_url_attachments: true,
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

    fn service(transport: DynHttpTransport) -> OpenAiChatService {
        OpenAiChatService::new(transport, SecretString::from("test-key".to_string()), "gpt-4.1")
    }

    #[test]
    fn endpoint_handles_versioned_and_bare_base_urls() {
        let service = service(Arc::new(PanicTransport));
        assert_eq!(
            service.endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );

        let service = service.with_base_url("https://proxy.local/v1/");
        assert_eq!(service.endpoint(), "https://proxy.local/v1/chat/completions");
    }

    #[tokio::test]
    async fn invalid_requests_never_reach_the_transport() {
        let service = service(Arc::new(PanicTransport));
        let cancel = CancellationToken::new();

        let err = service
            .generate(&GenerateRequest::from_prompt("   "), &cancel)
            .await
            .expect_err("blank prompt should fail");
        assert!(matches!(err, NexusError::Validation { .. }));
    }

    #[tokio::test]
    async fn pre_cancelled_token_aborts_before_the_network_call() {
        let service = service(Arc::new(PanicTransport));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .generate(&GenerateRequest::from_prompt("hello"), &cancel)
            .await
            .expect_err("cancelled call should fail");
        assert!(matches!(err, NexusError::Cancelled { .. }));
    }
}
