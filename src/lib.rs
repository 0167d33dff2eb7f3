//! 多供应商 LLM 统一调用库

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod http;
pub mod provider;
pub mod types;

pub use client::NexusClient;
pub use config::{LlmSettings, ProviderConfig, ProviderKind};
pub use error::NexusError;
pub use factory::ServiceFactory;
pub use provider::{CapabilityDescriptor, DynLlmService, LlmService};
pub use types::*;
