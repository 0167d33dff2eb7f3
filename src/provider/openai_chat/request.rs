use serde_json::{Map, Value, json};

use crate::error::NexusError;
use crate::types::{FileContent, GenerateRequest, MediaType};

use super::provider::PROVIDER_NAME;

/// 构建 Chat Completions 请求体
pub(crate) fn build_openai_body(
    request: &GenerateRequest,
    model: &str,
    default_max_tokens: u32,
) -> Result<Value, NexusError> {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));

    // 1. system 消息在前，随后是包含附件与提示词的 user 消息
    let mut messages = Vec::new();
    if let Some(system) = request
        .system_message
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(build_user_message(request)?);
    body.insert("messages".to_string(), Value::Array(messages));

    // 2. 采样与生成控制参数
    body.insert(
        "max_completion_tokens".to_string(),
        Value::from(request.max_tokens.unwrap_or(default_max_tokens)),
    );
    if let Some(temperature) = request.temperature {
        // Chat Completions 侧按单精度处理温度
        body.insert("temperature".to_string(), Value::from(temperature as f32));
    }

    // 3. 附加参数透传到顶层，例如 seed 或 service_tier
    for (key, value) in &request.additional_parameters {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

fn build_user_message(request: &GenerateRequest) -> Result<Value, NexusError> {
    if request.files.is_empty() {
        // 纯文本时直接使用字符串 content
        return Ok(json!({ "role": "user", "content": request.prompt }));
    }

    // 附件块在前 文本块收尾
    let mut parts = Vec::with_capacity(request.files.len() + 1);
    for file in &request.files {
        parts.push(convert_attachment(file)?);
    }
    parts.push(json!({ "type": "text", "text": request.prompt }));

    Ok(json!({ "role": "user", "content": parts }))
}

fn convert_attachment(file: &FileContent) -> Result<Value, NexusError> {
    match file.media_type {
        MediaType::Image => {
            // 远程图片直接透传 URL，内联数据走 data URL 通道
            let url = match remote_url(file) {
                Some(url) => url.to_string(),
                None => data_url(file),
            };
            Ok(json!({ "type": "image_url", "image_url": { "url": url } }))
        }
        MediaType::Document => {
            if remote_url(file).is_some() {
                return Err(NexusError::UnsupportedFeature {
                    provider: PROVIDER_NAME,
                    feature: "remote_document_attachment",
                });
            }
            Ok(json!({
                "type": "file",
                "file": {
                    "filename": file.filename.as_deref().unwrap_or("attachment"),
                    "file_data": data_url(file)
                }
            }))
        }
        MediaType::Audio => {
            if remote_url(file).is_some() {
                return Err(NexusError::UnsupportedFeature {
                    provider: PROVIDER_NAME,
                    feature: "remote_audio_attachment",
                });
            }
            Ok(json!({
                "type": "input_audio",
                "input_audio": { "data": file.data, "format": audio_format(&file.mime_type) }
            }))
        }
        MediaType::Video => Err(NexusError::UnsupportedFeature {
            provider: PROVIDER_NAME,
            feature: "video_input",
        }),
    }
}

fn remote_url(file: &FileContent) -> Option<&str> {
    if file.is_remote() { file.url.as_deref() } else { None }
}

fn data_url(file: &FileContent) -> String {
    format!("data:{};base64,{}", file.mime_type, file.data)
}

/// Chat Completions 的 input_audio.format 只接受短名
fn audio_format(mime_type: &str) -> &str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        other => other.strip_prefix("audio/").unwrap_or(other),
    }
}
