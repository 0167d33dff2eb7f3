use serde_json::{Map, Value, json};

use crate::error::NexusError;
use crate::types::{FileContent, GenerateRequest, MediaType};

use super::provider::PROVIDER_NAME;

/// 构建 Anthropic Messages 请求体
pub(crate) fn build_anthropic_body(
    request: &GenerateRequest,
    model: &str,
    default_max_tokens: u32,
) -> Result<Value, NexusError> {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));

    // 1. Messages API 强制要求 max_tokens
    body.insert(
        "max_tokens".to_string(),
        Value::from(request.max_tokens.unwrap_or(default_max_tokens)),
    );

    // 2. system 提示置于顶层 不进入 messages
    if let Some(system) = request
        .system_message
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    {
        body.insert("system".to_string(), Value::String(system.to_string()));
    }

    body.insert(
        "messages".to_string(),
        Value::Array(vec![build_user_message(request)?]),
    );

    if let Some(temperature) = request.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }

    // 3. 附加参数透传 例如 stop_sequences 或 top_k
    for (key, value) in &request.additional_parameters {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

fn build_user_message(request: &GenerateRequest) -> Result<Value, NexusError> {
    if request.files.is_empty() {
        return Ok(json!({ "role": "user", "content": request.prompt }));
    }

    // 附件块在前 文本块收尾
    let mut blocks = Vec::with_capacity(request.files.len() + 1);
    for file in &request.files {
        blocks.push(convert_attachment(file)?);
    }
    blocks.push(json!({ "type": "text", "text": request.prompt }));

    Ok(json!({ "role": "user", "content": blocks }))
}

fn convert_attachment(file: &FileContent) -> Result<Value, NexusError> {
    // Messages API 只接受内联 base64 附件 远程 URL 一律显式拒绝
    if file.is_remote() {
        return Err(NexusError::UnsupportedFeature {
            provider: PROVIDER_NAME,
            feature: "remote_url_attachment",
        });
    }

    let block_type = match file.media_type {
        MediaType::Image => "image",
        MediaType::Document => "document",
        MediaType::Audio => {
            return Err(NexusError::UnsupportedFeature {
                provider: PROVIDER_NAME,
                feature: "audio_input",
            });
        }
        MediaType::Video => {
            return Err(NexusError::UnsupportedFeature {
                provider: PROVIDER_NAME,
                feature: "video_input",
            });
        }
    };

    Ok(json!({
        "type": block_type,
        "source": {
            "type": "base64",
            "media_type": file.mime_type,
            "data": file.data
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 最简文本请求体
    #[test]
    fn text_only_request_uses_string_content() {
        let request = GenerateRequest::from_prompt("Hello, Claude").with_system_message("be kind");
        let body = build_anthropic_body(&request, "claude-sonnet-4-5", 2000).expect("build");

        assert_eq!(body["model"], json!("claude-sonnet-4-5"));
        assert_eq!(body["max_tokens"], json!(2000));
        assert_eq!(body["system"], json!("be kind"));

        let messages = body["messages"].as_array().expect("messages array");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], json!("user"));
        assert_eq!(messages[0]["content"], json!("Hello, Claude"));
    }

    #[test]
    fn request_max_tokens_wins_over_the_default() {
        let request = GenerateRequest::from_prompt("hi")
            .with_max_tokens(99)
            .with_temperature(1.0);
        let body = build_anthropic_body(&request, "claude-sonnet-4-5", 2000).expect("build");
        assert_eq!(body["max_tokens"], json!(99));
        assert_eq!(body["temperature"], json!(1.0));
    }

    /// 图像与文档附件转为 base64 source 块 文本块收尾
    #[test]
    fn inline_attachments_become_source_blocks_before_the_text() {
        let request = GenerateRequest::from_prompt("compare these")
            .with_file(FileContent::from_bytes(
                b"png-bytes",
                MediaType::Image,
                "image/png",
                None,
            ))
            .with_file(FileContent::from_bytes(
                b"%PDF-",
                MediaType::Document,
                "application/pdf",
                Some("r.pdf"),
            ));

        let body = build_anthropic_body(&request, "claude-sonnet-4-5", 2000).expect("build");
        let content = body["messages"][0]["content"]
            .as_array()
            .expect("content blocks");

        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["type"], json!("image"));
        assert_eq!(content[0]["source"]["type"], json!("base64"));
        assert_eq!(content[0]["source"]["media_type"], json!("image/png"));
        assert_eq!(content[1]["type"], json!("document"));
        assert_eq!(content[2], json!({"type": "text", "text": "compare these"}));
    }

    #[test]
    fn remote_url_attachments_are_rejected_explicitly() {
        let request = GenerateRequest::from_prompt("look").with_file(FileContent::from_url(
            "https://example.com/a.png",
            MediaType::Image,
            "image/png",
        ));

        let err =
            build_anthropic_body(&request, "claude-sonnet-4-5", 2000).expect_err("should fail");
        assert!(matches!(
            err,
            NexusError::UnsupportedFeature {
                provider: "anthropic_messages",
                feature: "remote_url_attachment"
            }
        ));
    }

    #[test]
    fn audio_and_video_attachments_are_rejected() {
        for (media_type, mime) in [(MediaType::Audio, "audio/wav"), (MediaType::Video, "video/mp4")]
        {
            let request = GenerateRequest::from_prompt("play")
                .with_file(FileContent::from_bytes(b"bits", media_type, mime, None));
            assert!(matches!(
                build_anthropic_body(&request, "claude-sonnet-4-5", 2000),
                Err(NexusError::UnsupportedFeature { .. })
            ));
        }
    }
}
