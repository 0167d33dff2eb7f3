use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::client::NexusClient;
use crate::config::{LlmSettings, ProviderKind};
use crate::error::NexusError;
use crate::http::DynHttpTransport;
use crate::provider::DynLlmService;
use crate::provider::anthropic_messages::AnthropicMessagesService;
use crate::provider::google_gemini::GoogleGeminiService;
use crate::provider::openai_chat::OpenAiChatService;

/// 多供应商服务工厂 负责按句柄解析与缓存适配器
///
/// 配置在构造时一次性校验 之后只读 适配器按句柄懒构造并缓存
/// 生命周期内同一句柄至多对应一个适配器实例
pub struct ServiceFactory {
    settings: LlmSettings,
    transport: DynHttpTransport,
    default_name: String,
    adapters: Mutex<HashMap<String, DynLlmService>>,
}

impl ServiceFactory {
    /// 校验配置并创建工厂 配置不合法时立即失败
    pub fn new(settings: LlmSettings, transport: DynHttpTransport) -> Result<Self, NexusError> {
        settings.validate()?;

        // 未显式指定默认供应商时取首个配置条目
        let default_name = settings
            .default_provider
            .clone()
            .unwrap_or_else(|| settings.providers[0].name.clone());

        info!(
            default = %default_name,
            providers = settings.providers.len(),
            "service factory initialized"
        );

        Ok(Self {
            settings,
            transport,
            default_name,
            adapters: Mutex::new(HashMap::new()),
        })
    }

    /// 解析默认句柄并创建统一入口
    pub fn create_service(&self) -> Result<NexusClient, NexusError> {
        self.create_service_named(&self.default_name)
    }

    /// 按句柄创建统一入口 未知句柄时错误中列出全部可用句柄
    pub fn create_service_named(&self, name: &str) -> Result<NexusClient, NexusError> {
        Ok(NexusClient::new(self.resolve_adapter(name)?))
    }

    /// 所有已配置的句柄 顺序不保证有意义
    pub fn configured_providers(&self) -> Vec<String> {
        self.settings.provider_names()
    }

    /// 已解析的默认句柄 不触发适配器构造
    pub fn default_provider_name(&self) -> &str {
        &self.default_name
    }

    pub(crate) fn resolve_adapter(&self, name: &str) -> Result<DynLlmService, NexusError> {
        if name.trim().is_empty() {
            return Err(NexusError::argument("provider name must not be blank"));
        }

        let config = self.settings.get(name).ok_or_else(|| {
            NexusError::argument(format!(
                "unknown provider `{name}` (configured: {})",
                self.configured_providers().join(", ")
            ))
        })?;

        // 单飞构造 check-then-create 全程持锁 构造是纯内存操作不做 IO
        let mut adapters = self.adapters.lock().expect("adapter cache lock poisoned");
        if let Some(adapter) = adapters.get(name) {
            debug!(name, "adapter cache hit");
            return Ok(adapter.clone());
        }

        let adapter: DynLlmService = match config.provider {
            ProviderKind::OpenAi => {
                Arc::new(OpenAiChatService::from_config(self.transport.clone(), config))
            }
            ProviderKind::Anthropic => Arc::new(AnthropicMessagesService::from_config(
                self.transport.clone(),
                config,
            )),
            ProviderKind::Google => {
                Arc::new(GoogleGeminiService::from_config(self.transport.clone(), config))
            }
        };

        info!(name, kind = config.provider.as_str(), "adapter constructed");
        adapters.insert(name.to_string(), adapter.clone());
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::http::reqwest::default_dyn_transport;

    fn factory_with(entries: &[(&str, ProviderKind)]) -> ServiceFactory {
        let settings = LlmSettings::new(
            entries
                .iter()
                .map(|(name, kind)| ProviderConfig::new(*name, *kind, "test-key", "test-model"))
                .collect(),
        );
        ServiceFactory::new(settings, default_dyn_transport().expect("transport"))
            .expect("factory")
    }

    #[test]
    fn empty_settings_fail_at_construction() {
        let result = ServiceFactory::new(
            LlmSettings::new(Vec::new()),
            default_dyn_transport().expect("transport"),
        );
        assert!(matches!(result, Err(NexusError::Config { .. })));
    }

    #[test]
    fn dangling_default_fails_at_construction() {
        let settings = LlmSettings::new(vec![ProviderConfig::new(
            "openai",
            ProviderKind::OpenAi,
            "test-key",
            "gpt-4.1",
        )])
        .with_default_provider("anthropic");

        let result = ServiceFactory::new(settings, default_dyn_transport().expect("transport"));
        assert!(matches!(result, Err(NexusError::Config { .. })));
    }

    #[test]
    fn explicit_default_wins_over_insertion_order() {
        let settings = LlmSettings::new(vec![
            ProviderConfig::new("openai", ProviderKind::OpenAi, "k1", "gpt-4.1"),
            ProviderConfig::new("anthropic", ProviderKind::Anthropic, "k2", "claude-sonnet-4-5"),
        ])
        .with_default_provider("anthropic");

        let factory = ServiceFactory::new(settings, default_dyn_transport().expect("transport"))
            .expect("factory");
        assert_eq!(factory.default_provider_name(), "anthropic");
    }

    #[test]
    fn implicit_default_is_the_first_inserted_provider() {
        let factory = factory_with(&[
            ("openai", ProviderKind::OpenAi),
            ("gemini", ProviderKind::Google),
        ]);
        assert_eq!(factory.default_provider_name(), "openai");

        let client = factory.create_service().expect("default service");
        assert_eq!(client.provider_name(), "openai_chat");
    }

    #[test]
    fn every_provider_kind_can_be_constructed() {
        let factory = factory_with(&[
            ("openai", ProviderKind::OpenAi),
            ("anthropic", ProviderKind::Anthropic),
            ("gemini", ProviderKind::Google),
        ]);

        let mut names = factory.configured_providers();
        names.sort();
        assert_eq!(names, vec!["anthropic", "gemini", "openai"]);

        for (name, adapter_name) in [
            ("openai", "openai_chat"),
            ("anthropic", "anthropic_messages"),
            ("gemini", "google_gemini"),
        ] {
            let client = factory.create_service_named(name).expect("service");
            assert_eq!(client.provider_name(), adapter_name);
        }
    }

    #[test]
    fn unknown_names_report_the_configured_alternatives() {
        let factory = factory_with(&[("openai", ProviderKind::OpenAi)]);

        let err = factory
            .create_service_named("missing")
            .expect_err("unknown name should fail");
        match err {
            NexusError::Argument { message } => {
                assert!(message.contains("missing"));
                assert!(message.contains("openai"));
            }
            other => panic!("unexpected error type: {other:?}"),
        }

        assert!(matches!(
            factory.create_service_named("  "),
            Err(NexusError::Argument { .. })
        ));
    }

    #[test]
    fn adapters_are_cached_per_name() {
        let factory = factory_with(&[("openai", ProviderKind::OpenAi)]);

        let first = factory.resolve_adapter("openai").expect("first");
        let second = factory.resolve_adapter("openai").expect("second");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_first_use_builds_at_most_one_adapter() {
        let factory = Arc::new(factory_with(&[("openai", ProviderKind::OpenAi)]));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let factory = factory.clone();
                tokio::spawn(async move { factory.resolve_adapter("openai").expect("adapter") })
            })
            .collect();

        let mut adapters = Vec::new();
        for task in tasks {
            adapters.push(task.await.expect("join"));
        }
        for adapter in &adapters[1..] {
            assert!(Arc::ptr_eq(&adapters[0], adapter));
        }
    }
}
