use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ProviderConfig;
use crate::error::NexusError;
use crate::http::{
    DynHttpTransport, get_with_headers, post_json_with_headers, retry_after_from_headers,
};
use crate::provider::{CapabilityDescriptor, LlmService};
use crate::types::{FileContent, GenerateRequest, GenerateResponse};

use super::error::parse_gemini_error;
use super::request::build_gemini_body;
use super::response::map_response;
use super::types::GeminiGenerateContentResponse;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub(crate) const PROVIDER_NAME: &str = "google_gemini";

/// Google Gemini GenerateContent 适配器
pub struct GoogleGeminiService {
    transport: DynHttpTransport,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl GoogleGeminiService {
    /// 创建指向官方 Generative Language 服务的适配器
    pub fn new(transport: DynHttpTransport, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: model.into(),
        }
    }

    /// 由配置构造
    pub fn from_config(transport: DynHttpTransport, config: &ProviderConfig) -> Self {
        let mut service = Self::new(transport, config.api_key.clone(), config.model.clone());
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

    /// 模型名称通过路径携带 自动补全 `models/` 前缀
    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{base}/v1beta/{model_path}:generateContent")
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "x-goog-api-key".to_string(),
            self.api_key.expose_secret().to_string(),
        );
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    /// 远程附件先经同一 transport 下载再内联 Gemini 不接受 http(s) 引用
    async fn inline_remote_files(
        &self,
        files: &[FileContent],
        cancel: &CancellationToken,
    ) -> Result<Vec<FileContent>, NexusError> {
        let mut resolved = Vec::with_capacity(files.len());
        for file in files {
            if !file.is_remote() {
                resolved.push(file.clone());
                continue;
            }

            let url = file.url.as_deref().unwrap_or_default().to_string();
            info!(provider = PROVIDER_NAME, url, "downloading remote attachment");
            let response =
                get_with_headers(self.transport.as_ref(), url.clone(), HashMap::new(), cancel)
                    .await?;
            if !(200..300).contains(&response.status) {
                return Err(NexusError::transport(format!(
                    "failed to download {url}: status {}",
                    response.status
                )));
            }

            resolved.push(FileContent::from_bytes(
                &response.body,
                file.media_type,
                file.mime_type.clone(),
                file.filename.as_deref(),
            ));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl LlmService for GoogleGeminiService {
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

        let files = self.inline_remote_files(&request.files, cancel).await?;
        let body = build_gemini_body(request, &files)?;
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
            let err = parse_gemini_error(status, &text, retry_after);
            error!(provider = PROVIDER_NAME, status, error = %err, "provider returned an error");
            return Err(err);
        }

        let parsed: GeminiGenerateContentResponse = serde_json::from_str(&text).map_err(|err| {
            NexusError::provider(PROVIDER_NAME, format!("failed to parse response: {err}"))
        })?;
        let mapped = map_response(parsed, PROVIDER_NAME, &self.model)?;

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
            supports_video_input: true,
            supports_url_attachments: true,
            inlines_remote_urls: true,
        }
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;

    use super::*;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
    use crate::types::MediaType;

    struct PanicTransport;

    #[async_trait]
    impl HttpTransport for PanicTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, NexusError> {
            panic!("send should not be called");
        }
    }

    /// GET 返回固定字节 POST 返回最小合法响应
    struct InliningTransport {
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for InliningTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NexusError> {
            match request.method {
                HttpMethod::Get => {
                    self.downloads.fetch_add(1, Ordering::SeqCst);
                    Ok(HttpResponse {
                        status: 200,
                        headers: HashMap::new(),
                        body: b"remote-image-bytes".to_vec(),
                    })
                }
                HttpMethod::Post => {
                    let body = request.body.unwrap_or_default();
                    let payload: serde_json::Value =
                        serde_json::from_slice(&body).expect("request body should be json");
                    // 下载内容应已内联为 base64
                    let inline = payload["contents"][0]["parts"][0]["inline_data"]["data"]
                        .as_str()
                        .expect("inline data");
                    assert_eq!(
                        BASE64.decode(inline).expect("decode"),
                        b"remote-image-bytes"
                    );

                    Ok(HttpResponse {
                        status: 200,
                        headers: HashMap::new(),
                        body: br#"{
                            "candidates": [{"content": {"parts": [{"text": "a cat"}], "role": "model"}, "finishReason": "STOP"}],
                            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 2, "totalTokenCount": 7}
                        }"#
                        .to_vec(),
                    })
                }
            }
        }
    }

    fn service(transport: DynHttpTransport) -> GoogleGeminiService {
        GoogleGeminiService::new(
            transport,
            SecretString::from("test-key".to_string()),
            "gemini-2.0-flash",
        )
    }

    #[test]
    fn endpoint_prefixes_bare_model_names() {
        let service = service(Arc::new(PanicTransport));
        assert_eq!(
            service.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );

        let prefixed = GoogleGeminiService::new(
            Arc::new(PanicTransport),
            SecretString::from("test-key".to_string()),
            "models/gemini-2.0-flash",
        );
        assert_eq!(
            prefixed.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn remote_attachments_are_downloaded_and_inlined() {
        let transport = Arc::new(InliningTransport {
            downloads: AtomicUsize::new(0),
        });
        let service = service(transport.clone());
        let cancel = CancellationToken::new();

        let request = GenerateRequest::from_prompt("what is this").with_file(
            FileContent::from_url("https://example.com/cat.png", MediaType::Image, "image/png"),
        );

        let response = service
            .generate(&request, &cancel)
            .await
            .expect("generate should succeed");
        assert_eq!(response.content, "a cat");
        assert_eq!(transport.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pre_cancelled_token_aborts_before_any_network_call() {
        // 取消必须先于附件下载生效 因此用 PanicTransport 验证
        let service = service(Arc::new(PanicTransport));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = GenerateRequest::from_prompt("hello").with_file(FileContent::from_url(
            "https://example.com/cat.png",
            MediaType::Image,
            "image/png",
        ));

        let err = service
            .generate(&request, &cancel)
            .await
            .expect_err("cancelled call should fail");
        assert!(matches!(err, NexusError::Cancelled { .. }));
    }
}
