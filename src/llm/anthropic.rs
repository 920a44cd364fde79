use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::error::{error_for_status, LlmError};
use super::provider::ChatModel;
use super::sse::{SseDecoder, SseFrame};
use super::types::ChatRequest;
use crate::core::config::settings::AnthropicSettings;

const PROVIDER: &str = "anthropic";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Client for the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicChatModel {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl AnthropicChatModel {
    pub fn new(settings: &AnthropicSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            client: Client::new(),
        }
    }

    fn build_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": DEFAULT_MAX_TOKENS,
            "messages": request.messages,
            "stream": stream,
        });

        if let (Some(obj), Some(t)) = (body.as_object_mut(), request.temperature) {
            obj.insert("temperature".to_string(), json!(t));
        }

        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let res = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::http(PROVIDER, e))?;
        error_for_status(PROVIDER, res).await
    }
}

#[derive(Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// What one decoded stream frame means for the caller.
#[derive(Debug, PartialEq)]
enum StreamStep {
    Text(String),
    Skip,
    Stop,
    Failed(String),
}

fn interpret_frame(frame: &SseFrame) -> StreamStep {
    let Ok(payload) = serde_json::from_str::<Value>(&frame.data) else {
        return StreamStep::Skip;
    };
    let kind = frame
        .event
        .as_deref()
        .or_else(|| payload["type"].as_str())
        .unwrap_or_default();

    match kind {
        "content_block_delta" => match payload["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => StreamStep::Text(text.to_string()),
            _ => StreamStep::Skip,
        },
        "message_stop" => StreamStep::Stop,
        "error" => StreamStep::Failed(
            payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string(),
        ),
        _ => StreamStep::Skip,
    }
}

#[async_trait]
impl ChatModel for AnthropicChatModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError> {
        let body = self.build_body(&request, false);
        let res = self.send(&body).await?;

        let payload: MessageResponse = res
            .json()
            .await
            .map_err(|e| LlmError::decode(PROVIDER, e.to_string()))?;

        Ok(payload
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect())
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
    ) -> Result<mpsc::Receiver<Result<String, LlmError>>, LlmError> {
        let body = self.build_body(&request, true);
        let res = self.send(&body).await?;

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            while let Some(item) = stream.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(LlmError::http(PROVIDER, e))).await;
                        return;
                    }
                };
                for frame in decoder.push(&bytes) {
                    match interpret_frame(&frame) {
                        StreamStep::Text(text) => {
                            if tx.send(Ok(text)).await.is_err() {
                                return;
                            }
                        }
                        StreamStep::Skip => {}
                        StreamStep::Stop => return,
                        StreamStep::Failed(message) => {
                            let _ = tx.send(Err(LlmError::stream(PROVIDER, message))).await;
                            return;
                        }
                    }
                }
            }

            match decoder.finish().map(|frame| interpret_frame(&frame)) {
                Some(StreamStep::Stop) => {}
                Some(StreamStep::Failed(message)) => {
                    let _ = tx.send(Err(LlmError::stream(PROVIDER, message))).await;
                }
                _ => {
                    let _ = tx
                        .send(Err(LlmError::stream(
                            PROVIDER,
                            "stream closed before message_stop",
                        )))
                        .await;
                }
            }
        });

        Ok(rx)
    }
}
