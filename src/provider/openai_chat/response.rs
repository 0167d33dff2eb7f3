use chrono::Utc;
use uuid::Uuid;

use crate::error::NexusError;
use crate::types::{GenerateResponse, UsageInfo};

use super::types::OpenAiChatResponse;

/// 将 Chat Completions 响应映射为统一的 GenerateResponse
pub(crate) fn map_response(
    resp: OpenAiChatResponse,
    provider: &'static str,
) -> Result<GenerateResponse, NexusError> {
    let choice = resp
        .choices
        .first()
        .ok_or_else(|| NexusError::provider(provider, "response contained no choices"))?;

    let message = choice.message.as_ref();
    let content = message
        .and_then(|message| message.content.clone())
        .or_else(|| message.and_then(|message| message.refusal.clone()))
        .unwrap_or_default();

    let usage = resp
        .usage
        .map(|usage| {
            UsageInfo::with_total(
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens,
            )
        })
        .unwrap_or_default();

    Ok(GenerateResponse {
        content,
        id: resp
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        model: resp.model,
        provider: provider.to_string(),
        usage,
        timestamp: Utc::now(),
        finish_reason: choice.finish_reason.clone().unwrap_or_default(),
        stop_sequence: None,
    })
}
