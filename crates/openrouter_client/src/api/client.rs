use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use summary_engine::MetricsRecord;

use crate::api::models::{
    ApiErrorBody, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};
use crate::client_trait::{SummaryClientTrait, SummaryOutcome};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::pricing::{
    cost_usd, estimate_tokens, normalize_model_id, pricing_for_model, supported_models,
    ModelPricing,
};

/// OpenRouter-backed summary client. One instance is shared by the whole
/// service; reqwest pools connections internally.
#[derive(Debug)]
pub struct OpenRouterClient {
    client: Client,
    config: ClientConfig,
}

impl OpenRouterClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn build_messages(text: &str, max_length: Option<u32>, language: &str) -> Vec<ChatMessage> {
        let mut instruction = format!(
            "Summarize the text provided by the user in the '{}' language. \
             The summary must be clear and concise.",
            language
        );
        if let Some(max_length) = max_length {
            instruction.push_str(&format!(
                " The summary must be at most {} characters long.",
                max_length
            ));
        }
        vec![ChatMessage::system(instruction), ChatMessage::user(text)]
    }

    async fn chat_completion(
        &self,
        model_id: &str,
        messages: Vec<ChatMessage>,
    ) -> ClientResult<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: model_id.to_string(),
            messages,
            max_tokens: None,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<ChatCompletionResponse>().await?)
    }
}

#[async_trait]
impl SummaryClientTrait for OpenRouterClient {
    async fn generate_summary(
        &self,
        model_id: &str,
        text: &str,
        max_length: Option<u32>,
        language: &str,
    ) -> ClientResult<SummaryOutcome> {
        if self.config.api_key.is_empty() {
            return Err(ClientError::Auth(
                "OPENROUTER_API_KEY is not configured".to_string(),
            ));
        }
        let pricing = pricing_for_model(model_id)
            .ok_or_else(|| ClientError::UnsupportedModel(model_id.to_string()))?;

        let messages = Self::build_messages(text, max_length, language);
        let started = Instant::now();
        let response = self.chat_completion(model_id, messages).await?;
        let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        let summary = response
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ClientError::EmptyCompletion(model_id.to_string()))?;

        let (input_tokens, output_tokens, total_tokens) = match response.usage {
            Some(usage) => {
                let total = if usage.total_tokens > 0 {
                    usage.total_tokens
                } else {
                    usage.prompt_tokens + usage.completion_tokens
                };
                (usage.prompt_tokens, usage.completion_tokens, total)
            }
            None => {
                // Some upstreams omit usage; fall back to a character-based
                // estimate so the cost is never silently zero.
                warn!("no usage block from model {}, estimating tokens", model_id);
                let input = estimate_tokens(text);
                let output = estimate_tokens(&summary);
                (input, output, input + output)
            }
        };

        let record = MetricsRecord {
            model_id: normalize_model_id(model_id).to_string(),
            provider: pricing.provider.to_string(),
            response_time_ms,
            tokens_used: total_tokens,
            cost_usd: cost_usd(pricing, input_tokens, output_tokens),
            timestamp: Utc::now(),
        };
        debug!(
            "summary from {}: {:.0}ms, {} tokens, ${:.6}",
            record.model_id, record.response_time_ms, record.tokens_used, record.cost_usd
        );

        Ok(SummaryOutcome { summary, record })
    }

    fn supported_models(&self) -> &'static [ModelPricing] {
        supported_models()
    }
}
