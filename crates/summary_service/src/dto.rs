//! Request/response models. Field names are part of the external API
//! contract and must not change without coordinating with UI consumers.

use chrono::{DateTime, Utc};
use openrouter_client::{ModelPricing, SummaryOutcome};
use serde::{Deserialize, Serialize};
use summary_engine::{ComparisonVerdict, Recommendation};

pub const MIN_TEXT_LENGTH: usize = 10;

fn default_language() -> String {
    "sl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    pub text: String,
    pub model: String,
    pub max_length: Option<u32>,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonRequest {
    pub text: String,
    pub models: Vec<String>,
    pub max_length: Option<u32>,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryMetricsDto {
    pub response_time_ms: f64,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponseDto {
    pub model: String,
    pub summary: String,
    pub metrics: SummaryMetricsDto,
}

impl From<&SummaryOutcome> for SummaryResponseDto {
    fn from(outcome: &SummaryOutcome) -> Self {
        Self {
            model: outcome.record.model_id.clone(),
            summary: outcome.summary.clone(),
            metrics: SummaryMetricsDto {
                response_time_ms: outcome.record.response_time_ms,
                tokens_used: outcome.record.tokens_used,
                cost_usd: outcome.record.cost_usd,
                timestamp: outcome.record.timestamp,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResultDto {
    pub fastest: String,
    pub cheapest: String,
    pub average_response_time: f64,
    pub total_cost: f64,
}

impl From<&ComparisonVerdict> for ComparisonResultDto {
    fn from(verdict: &ComparisonVerdict) -> Self {
        Self {
            fastest: verdict.fastest.model_id.clone(),
            cheapest: verdict.cheapest.model_id.clone(),
            average_response_time: verdict.average_response_time_ms,
            total_cost: verdict.total_cost_usd,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResponseDto {
    pub results: Vec<SummaryResponseDto>,
    pub comparison: ComparisonResultDto,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelCardDto {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub max_tokens: u32,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
    pub status: String,
}

impl From<&ModelPricing> for ModelCardDto {
    fn from(pricing: &ModelPricing) -> Self {
        Self {
            id: pricing.id.to_string(),
            name: pricing.name.to_string(),
            provider: pricing.provider.to_string(),
            max_tokens: pricing.max_tokens,
            input_cost_per_1k: pricing.input_cost_per_1k,
            output_cost_per_1k: pricing.output_cost_per_1k,
            status: "available".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponseDto {
    pub models: Vec<ModelCardDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendQuery {
    pub criteria: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationDto {
    pub recommended_model: String,
    pub provider: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl From<Recommendation> for RecommendationDto {
    fn from(recommendation: Recommendation) -> Self {
        Self {
            recommended_model: recommendation.model_name,
            provider: recommendation.provider,
            reason: recommendation.reason,
            score: recommendation.score,
        }
    }
}
