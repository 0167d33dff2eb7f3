use serde_json::{Map, Value, json};

use crate::error::NexusError;
use crate::types::{FileContent, GenerateRequest};

/// 构建 Gemini GenerateContent 请求体
///
/// 与 Chat Completions 不同 Gemini 使用路径参数携带模型名称
/// `POST /v1beta/models/{model}:generateContent` 因此 body 中不含 model。
/// `files` 是调用方已经内联完成的附件列表 远程 URL 在 provider 层先行下载。
pub(crate) fn build_gemini_body(
    request: &GenerateRequest,
    files: &[FileContent],
) -> Result<Value, NexusError> {
    let mut body = Map::new();

    // 1. 附件 inline_data 在前 文本 part 收尾
    let mut parts = Vec::with_capacity(files.len() + 1);
    for file in files {
        parts.push(json!({
            "inline_data": { "mime_type": file.mime_type, "data": file.data }
        }));
    }
    parts.push(json!({ "text": request.prompt }));

    body.insert(
        "contents".to_string(),
        Value::Array(vec![json!({ "role": "user", "parts": parts })]),
    );

    // 2. system 提示折叠为 system_instruction
    if let Some(system) = request
        .system_message
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    {
        body.insert(
            "system_instruction".to_string(),
            json!({ "role": "system", "parts": [ { "text": system } ] }),
        );
    }

    // 3. 采样配置 -> generationConfig 字段名为 camelCase
    if let Some(config) = build_generation_config(request) {
        body.insert("generationConfig".to_string(), config);
    }

    // 4. 额外配置透传到顶层 例如 safetySettings 或 cachedContent
    for (key, value) in &request.additional_parameters {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

fn build_generation_config(request: &GenerateRequest) -> Option<Value> {
    let mut config = Map::new();
    if let Some(temperature) = request.temperature {
        config.insert("temperature".to_string(), Value::from(temperature as f32));
    }
    // Gemini 仅在请求显式指定时设置 token 上限
    if let Some(max_tokens) = request.max_tokens {
        config.insert("maxOutputTokens".to_string(), Value::from(max_tokens));
    }

    if config.is_empty() {
        None
    } else {
        Some(Value::Object(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaType;

    #[test]
    fn text_only_request_builds_a_single_user_content() {
        let request = GenerateRequest::from_prompt("hello gemini").with_system_message("be brief");
        let body = build_gemini_body(&request, &request.files).expect("build");

        let contents = body["contents"].as_array().expect("contents array");
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], json!("user"));
        assert_eq!(contents[0]["parts"], json!([{ "text": "hello gemini" }]));
        assert_eq!(
            body["system_instruction"]["parts"],
            json!([{ "text": "be brief" }])
        );
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("model").is_none());
    }

    #[test]
    fn generation_config_uses_camel_case_and_request_values_only() {
        let request = GenerateRequest::from_prompt("hi")
            .with_temperature(0.25)
            .with_max_tokens(128);
        let body = build_gemini_body(&request, &request.files).expect("build");

        assert_eq!(body["generationConfig"]["temperature"], json!(0.25));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(128));

        // 未显式指定时不携带 maxOutputTokens
        let request = GenerateRequest::from_prompt("hi").with_temperature(0.25);
        let body = build_gemini_body(&request, &request.files).expect("build");
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn inline_attachments_become_inline_data_parts_before_the_text() {
        let request = GenerateRequest::from_prompt("what is this").with_file(
            FileContent::from_bytes(b"png-bytes", MediaType::Image, "image/png", None),
        );
        let body = build_gemini_body(&request, &request.files).expect("build");

        let parts = body["contents"][0]["parts"].as_array().expect("parts");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inline_data"]["mime_type"], json!("image/png"));
        assert!(parts[0]["inline_data"]["data"].is_string());
        assert_eq!(parts[1], json!({ "text": "what is this" }));
    }

    #[test]
    fn additional_parameters_pass_through_to_the_body_top_level() {
        let request = GenerateRequest::from_prompt("hi")
            .with_parameter("safetySettings", json!([{ "category": "HARM_CATEGORY_HATE_SPEECH" }]));
        let body = build_gemini_body(&request, &request.files).expect("build");
        assert!(body["safetySettings"].is_array());
    }
}
