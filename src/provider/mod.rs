use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::NexusError;
use crate::types::{GenerateRequest, GenerateResponse};

pub mod anthropic_messages;
pub mod google_gemini;
pub mod openai_chat;

/// 统一的服务 Trait 所有供应商适配器实现该接口即可接入
#[async_trait]
pub trait LlmService: Send + Sync {
    /// 提交完整请求并等待规范化响应
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, NexusError>;

    /// 便捷入口 将纯文本提示包装为最小请求后转发
    async fn generate_text(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, NexusError> {
        let request = GenerateRequest::from_prompt(prompt);
        self.generate(&request, cancel).await
    }

    /// 描述附件相关的能力范围
    fn capabilities(&self) -> CapabilityDescriptor;

    /// 适配器名称 例如 `openai_chat`
    fn name(&self) -> &'static str;
}

/// 线程安全的适配器句柄
pub type DynLlmService = Arc<dyn LlmService>;

/// Capability descriptor used to decide how each adapter treats attachments.
///
/// The remote-url policy is deliberately per-provider: an adapter either
/// forwards urls natively (`supports_url_attachments` without
/// `inlines_remote_urls`), downloads and inlines them
/// (`inlines_remote_urls`), or rejects url-only attachments outright (both
/// flags false).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Whether image inputs are supported.
    pub supports_image_input: bool,
    /// Whether document inputs (PDF and friends) are supported.
    pub supports_document_input: bool,
    /// Whether audio inputs are supported.
    pub supports_audio_input: bool,
    /// Whether video inputs are supported.
    pub supports_video_input: bool,
    /// Whether remote-url attachments are accepted at all.
    pub supports_url_attachments: bool,
    /// Whether remote urls are fetched and inlined before dispatch.
    pub inlines_remote_urls: bool,
}
