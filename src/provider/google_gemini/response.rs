use chrono::Utc;
use uuid::Uuid;

use crate::error::NexusError;
use crate::types::{GenerateResponse, UsageInfo};

use super::types::GeminiGenerateContentResponse;

/// 将 GenerateContent 响应映射为统一的 GenerateResponse
///
/// Gemini 不保证返回响应 ID 缺失时合成一个 UUID v4
pub(crate) fn map_response(
    resp: GeminiGenerateContentResponse,
    provider: &'static str,
    configured_model: &str,
) -> Result<GenerateResponse, NexusError> {
    let candidate = resp
        .candidates
        .first()
        .ok_or_else(|| NexusError::provider(provider, "response contained no candidates"))?;

    let content = candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let usage = resp
        .usage_metadata
        .map(|usage| {
            UsageInfo::with_total(
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
                usage.total_token_count,
            )
        })
        .unwrap_or_default();

    Ok(GenerateResponse {
        content,
        id: resp
            .response_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        model: resp
            .model_version
            .unwrap_or_else(|| configured_model.to_string()),
        provider: provider.to_string(),
        usage,
        timestamp: Utc::now(),
        finish_reason: candidate.finish_reason.clone().unwrap_or_default(),
        stop_sequence: None,
    })
}
