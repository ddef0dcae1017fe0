use serde::Serialize;

/// Static pricing and capability card for one supported model family.
#[derive(Debug, Clone, Serialize)]
pub struct ModelPricing {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
    pub max_tokens: u32,
}

const CATALOG: &[ModelPricing] = &[
    ModelPricing {
        id: "gemini-pro",
        name: "Gemini Pro",
        provider: "Google",
        input_cost_per_1k: 0.0005,
        output_cost_per_1k: 0.0015,
        max_tokens: 32_768,
    },
    ModelPricing {
        id: "gemini-1.5-pro",
        name: "Gemini 1.5 Pro",
        provider: "Google",
        input_cost_per_1k: 0.00125,
        output_cost_per_1k: 0.005,
        max_tokens: 32_768,
    },
    ModelPricing {
        id: "gpt-4",
        name: "GPT-4",
        provider: "OpenAI",
        input_cost_per_1k: 0.03,
        output_cost_per_1k: 0.06,
        max_tokens: 8_192,
    },
    ModelPricing {
        id: "gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
        provider: "OpenAI",
        input_cost_per_1k: 0.0015,
        output_cost_per_1k: 0.002,
        max_tokens: 4_096,
    },
    ModelPricing {
        id: "claude-3-opus",
        name: "Claude 3 Opus",
        provider: "Anthropic",
        input_cost_per_1k: 0.015,
        output_cost_per_1k: 0.075,
        max_tokens: 200_000,
    },
    ModelPricing {
        id: "claude-3-sonnet",
        name: "Claude 3 Sonnet",
        provider: "Anthropic",
        input_cost_per_1k: 0.003,
        output_cost_per_1k: 0.015,
        max_tokens: 200_000,
    },
    ModelPricing {
        id: "claude-3-haiku",
        name: "Claude 3 Haiku",
        provider: "Anthropic",
        input_cost_per_1k: 0.00025,
        output_cost_per_1k: 0.00125,
        max_tokens: 200_000,
    },
];

pub fn supported_models() -> &'static [ModelPricing] {
    CATALOG
}

/// Strip an OpenRouter-style "vendor/" prefix, e.g. "openai/gpt-4" -> "gpt-4".
pub fn normalize_model_id(model_id: &str) -> &str {
    model_id.rsplit('/').next().unwrap_or(model_id)
}

/// Resolve pricing for a model id, matching family prefixes so versioned ids
/// like "gpt-4-0613" or "claude-3-haiku-20240307" still price correctly.
pub fn pricing_for_model(model_id: &str) -> Option<&'static ModelPricing> {
    let normalized = normalize_model_id(model_id);
    // Longest family id first so "gemini-1.5-pro" is not shadowed by a
    // shorter prefix.
    CATALOG
        .iter()
        .filter(|entry| normalized == entry.id || normalized.starts_with(entry.id))
        .max_by_key(|entry| entry.id.len())
}

/// Rough fallback when the API returns no usage block: 1 token ~ 4 chars.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() / 4) as u64
}

pub fn cost_usd(pricing: &ModelPricing, input_tokens: u64, output_tokens: u64) -> f64 {
    (input_tokens as f64 / 1000.0) * pricing.input_cost_per_1k
        + (output_tokens as f64 / 1000.0) * pricing.output_cost_per_1k
}
