use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::NexusError;
use crate::provider::{CapabilityDescriptor, DynLlmService, LlmService};
use crate::types::{GenerateRequest, GenerateResponse};

/// 统一调用入口 与适配器暴露完全相同的两个 generate 方法
///
/// 仅做转发 不追加任何策略 调用方依赖这一稳定接口即可
/// 在不同供应商之间无感切换
pub struct NexusClient {
    service: DynLlmService,
}

impl std::fmt::Debug for NexusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NexusClient")
            .field("service", &self.service.name())
            .finish()
    }
}

impl NexusClient {
    /// 包装一个已解析的适配器
    pub fn new(service: DynLlmService) -> Self {
        Self { service }
    }

    /// 提交完整请求
    pub async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, NexusError> {
        self.service.generate(request, cancel).await
    }

    /// 提交纯文本提示
    pub async fn generate_text(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, NexusError> {
        self.service.generate_text(prompt, cancel).await
    }

    /// 底层适配器名称
    pub fn provider_name(&self) -> &'static str {
        self.service.name()
    }

    /// 底层适配器能力
    pub fn capabilities(&self) -> CapabilityDescriptor {
        self.service.capabilities()
    }
}

#[async_trait]
impl LlmService for NexusClient {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, NexusError> {
        NexusClient::generate(self, request, cancel).await
    }

    async fn generate_text(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, NexusError> {
        NexusClient::generate_text(self, prompt, cancel).await
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        NexusClient::capabilities(self)
    }

    fn name(&self) -> &'static str {
        self.provider_name()
    }
}
