use chrono::Utc;
use uuid::Uuid;

use crate::error::NexusError;
use crate::types::{GenerateResponse, UsageInfo};

use super::types::AnthropicMessageResponse;

/// 将 Messages 响应映射为统一的 GenerateResponse
///
/// Messages API 不返回 total token 合计 这里按 input + output 计算
pub(crate) fn map_response(
    resp: AnthropicMessageResponse,
    provider: &'static str,
) -> Result<GenerateResponse, NexusError> {
    let content = resp
        .content
        .iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text.clone())
        .unwrap_or_default();

    let usage = resp
        .usage
        .map(|usage| {
            UsageInfo::with_total(
                usage.input_tokens.unwrap_or(0),
                usage.output_tokens.unwrap_or(0),
                None,
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
        finish_reason: resp.stop_reason.unwrap_or_default(),
        stop_sequence: resp.stop_sequence,
    })
}
