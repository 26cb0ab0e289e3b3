//! VLM interaction: build the chat-completions request and send it once.
//!
//! The request has a single user turn: the profile's instruction text
//! followed by one `image_url` part per page. There is exactly one attempt
//! per run. A non-200 answer surfaces the response body verbatim in
//! [`DocExtractError::ApiError`].
//!
//! The credential goes into the `Authorization` header only. It is never
//! logged.

use crate::config::ExtractionConfig;
use crate::error::DocExtractError;
use crate::pipeline::encode::EncodedPayload;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ── Wire types ───────────────────────────────────────────────────────────

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Vec<ContentPart>,
}

/// One part of a multimodal message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Token accounting reported by the API, when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// The model's textual answer plus call metadata.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: Option<TokenUsage>,
    pub duration_ms: u64,
}

// ── Request construction ─────────────────────────────────────────────────

/// Assemble the request body: instruction first, then one image per page.
pub fn build_request(instruction: &str, payload: &EncodedPayload, config: &ExtractionConfig) -> ChatRequest {
    let mut content = Vec::with_capacity(payload.len() + 1);
    content.push(ContentPart::Text {
        text: instruction.to_string(),
    });
    content.extend(payload.data_urls().map(|url| ContentPart::ImageUrl {
        image_url: ImageUrl { url },
    }));

    ChatRequest {
        model: config.model.clone(),
        messages: vec![ChatMessage {
            role: "user",
            content,
        }],
        max_tokens: config.max_tokens,
    }
}

// ── Network call ─────────────────────────────────────────────────────────

/// Send the extraction request and return the completion text.
///
/// # Errors
/// * [`DocExtractError::MissingApiKey`] — no (or empty) credential in `config`
/// * [`DocExtractError::Transport`]     — no HTTP response at all
/// * [`DocExtractError::ApiError`]      — any status other than 200, body verbatim
/// * [`DocExtractError::MalformedResponse`] — 200 without `choices[0].message.content`
pub async fn request_extraction(
    instruction: &str,
    payload: &EncodedPayload,
    config: &ExtractionConfig,
) -> Result<Completion, DocExtractError> {
    let api_key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(DocExtractError::MissingApiKey)?;

    let body = build_request(instruction, payload, config);
    let transport = |detail: String| DocExtractError::Transport {
        endpoint: config.endpoint.clone(),
        detail,
    };

    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.api_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build().map_err(|e| transport(e.to_string()))?;

    info!(
        "Sending extraction request: model={}, {} image(s), {} base64 bytes",
        config.model,
        payload.len(),
        payload.total_bytes()
    );
    let start = Instant::now();

    let response = client
        .post(&config.endpoint)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                transport(format!("timed out: {e}"))
            } else {
                transport(e.to_string())
            }
        })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport(format!("failed to read response body: {e}")))?;
    let duration_ms = start.elapsed().as_millis() as u64;

    if status != StatusCode::OK {
        warn!("Extraction request failed: HTTP {} after {}ms", status, duration_ms);
        return Err(DocExtractError::ApiError {
            status: status.as_u16(),
            body: text,
        });
    }

    let parsed: ChatResponse = serde_json::from_str(&text)
        .map_err(|e| DocExtractError::MalformedResponse(format!("response is not JSON: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| {
            DocExtractError::MalformedResponse("missing choices[0].message.content".into())
        })?;

    debug!(
        "Completion received: {} chars, usage={:?}, {}ms",
        content.len(),
        parsed.usage,
        duration_ms
    );

    Ok(Completion {
        content,
        usage: parsed.usage,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_raster;

    #[test]
    fn request_body_shape() {
        let config = ExtractionConfig::default();
        let payload = EncodedPayload {
            mime_type: "image/jpeg".into(),
            images: vec!["AAA".into(), "BBB".into()],
        };
        let body = serde_json::to_value(build_request("extract please", &payload, &config)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 4096);
        let content = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "extract please");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,AAA");
        assert_eq!(content[2]["image_url"]["url"], "data:image/jpeg;base64,BBB");
    }

    #[test]
    fn request_uses_configured_model_and_ceiling() {
        let config = ExtractionConfig::builder()
            .model("gpt-4o-mini")
            .max_tokens(512)
            .build()
            .unwrap();
        let body = build_request("x", &encode_raster(b"x"), &config);
        assert_eq!(body.model, "gpt-4o-mini");
        assert_eq!(body.max_tokens, 512);
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let config = ExtractionConfig::builder()
            .endpoint("http://127.0.0.1:9/never")
            .api_key("   ")
            .build()
            .unwrap();
        let err = request_extraction("x", &encode_raster(b"x"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, DocExtractError::MissingApiKey));
    }

    #[test]
    fn response_without_choices_deserialises() {
        let r: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(r.choices.is_empty());
        assert!(r.usage.is_none());
    }
}
