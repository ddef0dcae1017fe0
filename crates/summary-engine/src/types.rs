use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one model invocation target. Model ids are not globally
/// unique across providers, so the pair is the real aggregation key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    pub model_id: String,
    pub provider: String,
}

impl ModelKey {
    pub fn new(model_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            provider: provider.into(),
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model_id, self.provider)
    }
}

/// One model's measured result for one request. Created once by a provider
/// client when an invocation completes, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub model_id: String,
    pub provider: String,
    pub response_time_ms: f64,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub timestamp: DateTime<Utc>,
}

impl MetricsRecord {
    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.model_id.clone(), self.provider.clone())
    }

    /// Check the record invariants. A violating record fails the whole event
    /// rather than being dropped, since a dropped record would corrupt
    /// downstream averages.
    pub fn validate(&self) -> Result<(), String> {
        if self.model_id.is_empty() {
            return Err("model_id must not be empty".to_string());
        }
        if self.provider.is_empty() {
            return Err(format!("provider must not be empty for model '{}'", self.model_id));
        }
        if !self.response_time_ms.is_finite() || self.response_time_ms < 0.0 {
            return Err(format!(
                "response_time_ms must be finite and non-negative for {}: {}",
                self.key(),
                self.response_time_ms
            ));
        }
        if !self.cost_usd.is_finite() || self.cost_usd < 0.0 {
            return Err(format!(
                "cost_usd must be finite and non-negative for {}: {}",
                self.key(),
                self.cost_usd
            ));
        }
        Ok(())
    }
}

/// Derived result for one multi-model comparison event. Returned to the
/// caller and folded into the aggregate store; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonVerdict {
    pub fastest: ModelKey,
    pub cheapest: ModelKey,
    pub average_response_time_ms: f64,
    pub total_cost_usd: f64,
}

/// Running statistics for one (model_id, provider) key across every event
/// ever recorded. Averages are never stored; they are derived at read time
/// from the sums to avoid drift from repeated re-averaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub key: ModelKey,
    pub total_comparisons: u64,
    pub sum_response_time_ms: f64,
    pub sum_cost_usd: f64,
    pub sum_tokens_used: u64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub times_fastest: u64,
    pub times_cheapest: u64,
    pub updated_at: DateTime<Utc>,
}

impl AggregateRow {
    /// Fresh row for a key seen for the first time. Min/max are seeded from
    /// the first observation when the record is folded in.
    pub fn new(key: ModelKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            total_comparisons: 0,
            sum_response_time_ms: 0.0,
            sum_cost_usd: 0.0,
            sum_tokens_used: 0,
            min_response_time_ms: f64::INFINITY,
            max_response_time_ms: f64::NEG_INFINITY,
            times_fastest: 0,
            times_cheapest: 0,
            updated_at: now,
        }
    }

    /// Fold one record of one event into this row. Returns the updated row
    /// without mutating `self`, so a failed event leaves state untouched.
    pub fn folded(
        &self,
        record: &MetricsRecord,
        verdict: &ComparisonVerdict,
        now: DateTime<Utc>,
    ) -> Result<AggregateRow, String> {
        let mut next = self.clone();

        next.total_comparisons = self
            .total_comparisons
            .checked_add(1)
            .ok_or_else(|| format!("total_comparisons overflow for {}", self.key))?;
        next.sum_tokens_used = self
            .sum_tokens_used
            .checked_add(record.tokens_used)
            .ok_or_else(|| format!("sum_tokens_used overflow for {}", self.key))?;

        next.sum_response_time_ms = self.sum_response_time_ms + record.response_time_ms;
        next.sum_cost_usd = self.sum_cost_usd + record.cost_usd;
        if !next.sum_response_time_ms.is_finite() || !next.sum_cost_usd.is_finite() {
            return Err(format!("running sum overflow for {}", self.key));
        }

        next.min_response_time_ms = self.min_response_time_ms.min(record.response_time_ms);
        next.max_response_time_ms = self.max_response_time_ms.max(record.response_time_ms);

        let key = record.key();
        if key == verdict.fastest {
            next.times_fastest = self
                .times_fastest
                .checked_add(1)
                .ok_or_else(|| format!("times_fastest overflow for {}", self.key))?;
        }
        if key == verdict.cheapest {
            next.times_cheapest = self
                .times_cheapest
                .checked_add(1)
                .ok_or_else(|| format!("times_cheapest overflow for {}", self.key))?;
        }

        next.updated_at = now;
        Ok(next)
    }
}
