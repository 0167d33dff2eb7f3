use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::NexusError;

/// 未显式配置时的输出 token 上限
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// 供应商类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Google,
}

impl ProviderKind {
    /// 配置文件中使用的小写标识
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
        }
    }
}

/// 单个可调用后端的配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// 自定义句柄 例如 `default-openai`
    pub name: String,
    pub provider: ProviderKind,
    /// 鉴权密钥 序列化时不会泄露
    pub api_key: SecretString,
    pub model: String,
    /// 响应 token 上限 缺省按 [`DEFAULT_MAX_TOKENS`]
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// 为兼容原始配置保留 当前实现不做流式输出
    #[serde(default)]
    pub stream: Option<bool>,
    /// 覆盖默认服务地址 便于接入代理或兼容层
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// 构造最小配置
    pub fn new(
        name: impl Into<String>,
        provider: ProviderKind,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            api_key: SecretString::from(api_key.into()),
            model: model.into(),
            max_tokens: None,
            stream: None,
            base_url: None,
        }
    }

    /// 设置响应 token 上限
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// 配置生效的 token 上限
    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

/// 全量 LLM 配置 载入后只读
///
/// providers 使用有序列表 第一个条目即隐式默认供应商
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub default_provider: Option<String>,
}

impl LlmSettings {
    /// 由有序配置列表构造
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self {
            providers,
            default_provider: None,
        }
    }

    /// 显式指定默认供应商句柄
    pub fn with_default_provider(mut self, name: impl Into<String>) -> Self {
        self.default_provider = Some(name.into());
        self
    }

    /// 按句柄查找配置
    pub fn get(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|config| config.name == name)
    }

    /// 所有已配置的句柄
    pub fn provider_names(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|config| config.name.clone())
            .collect()
    }

    /// 构造期校验 失败即致命 不可重试
    pub fn validate(&self) -> Result<(), NexusError> {
        if self.providers.is_empty() {
            return Err(NexusError::config(
                "providers",
                "at least one provider must be configured",
            ));
        }

        let mut seen = Vec::with_capacity(self.providers.len());
        for config in &self.providers {
            if config.name.trim().is_empty() {
                return Err(NexusError::config(
                    "providers",
                    "provider name must not be blank",
                ));
            }
            if seen.contains(&config.name.as_str()) {
                return Err(NexusError::config(
                    "providers",
                    format!("duplicate provider name: {}", config.name),
                ));
            }
            seen.push(config.name.as_str());

            if config.api_key.expose_secret().is_empty() {
                return Err(NexusError::config(
                    format!("providers.{}.api_key", config.name),
                    "api key is required",
                ));
            }
            if config.model.trim().is_empty() {
                return Err(NexusError::config(
                    format!("providers.{}.model", config.name),
                    "model identifier is required",
                ));
            }
        }

        if let Some(default) = &self.default_provider {
            if self.get(default).is_none() {
                return Err(NexusError::config(
                    "default_provider",
                    format!(
                        "references unknown provider `{default}` (configured: {})",
                        seen.join(", ")
                    ),
                ));
            }
        }

        Ok(())
    }
}
