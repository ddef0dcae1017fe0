use serde::Serialize;

use crate::storage::{AggregateStorage, EngineResult};
use crate::types::AggregateRow;

/// One aggregate row with its derived averages, shaped for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelAnalysis {
    pub model_name: String,
    pub provider: String,
    pub total_comparisons: u64,
    pub avg_response_time_ms: f64,
    pub avg_cost_usd: f64,
    pub avg_tokens_used: f64,
    pub total_cost_usd: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub times_fastest: u64,
    pub times_cheapest: u64,
}

impl From<&AggregateRow> for ModelAnalysis {
    fn from(row: &AggregateRow) -> Self {
        let count = row.total_comparisons as f64;
        Self {
            model_name: row.key.model_id.clone(),
            provider: row.key.provider.clone(),
            total_comparisons: row.total_comparisons,
            avg_response_time_ms: row.sum_response_time_ms / count,
            avg_cost_usd: row.sum_cost_usd / count,
            avg_tokens_used: row.sum_tokens_used as f64 / count,
            total_cost_usd: row.sum_cost_usd,
            min_response_time_ms: row.min_response_time_ms,
            max_response_time_ms: row.max_response_time_ms,
            times_fastest: row.times_fastest,
            times_cheapest: row.times_cheapest,
        }
    }
}

/// Read-side projection of the aggregate store: every current row with its
/// averages computed from the stored sums, ordered by `total_comparisons`
/// descending with `(model_id, provider)` as the tie-break. Never mutates
/// the store; an empty store yields an empty list.
pub async fn list_analysis(storage: &dyn AggregateStorage) -> EngineResult<Vec<ModelAnalysis>> {
    let mut rows = storage.snapshot().await?;
    rows.sort_by(|a, b| {
        b.total_comparisons
            .cmp(&a.total_comparisons)
            .then_with(|| a.key.cmp(&b.key))
    });
    Ok(rows.iter().map(ModelAnalysis::from).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendCriteria {
    Balanced,
    Speed,
    Cost,
}

impl RecommendCriteria {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "balanced" => Some(Self::Balanced),
            "speed" => Some(Self::Speed),
            "cost" => Some(Self::Cost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub model_name: String,
    pub provider: String,
    pub reason: String,
    pub score: Option<f64>,
}

/// Recommend a model from historical rows. Returns `None` when no data has
/// been recorded yet; the caller decides how to surface that.
pub fn recommend(rows: &[ModelAnalysis], criteria: RecommendCriteria) -> Option<Recommendation> {
    if rows.is_empty() {
        return None;
    }

    match criteria {
        RecommendCriteria::Speed => {
            let fastest = min_by_metric(rows, |row| row.avg_response_time_ms)?;
            Some(Recommendation {
                model_name: fastest.model_name.clone(),
                provider: fastest.provider.clone(),
                reason: "lowest average response time".to_string(),
                score: None,
            })
        }
        RecommendCriteria::Cost => {
            let cheapest = min_by_metric(rows, |row| row.avg_cost_usd)?;
            Some(Recommendation {
                model_name: cheapest.model_name.clone(),
                provider: cheapest.provider.clone(),
                reason: "lowest average cost".to_string(),
                score: None,
            })
        }
        RecommendCriteria::Balanced => {
            let max_time = rows
                .iter()
                .map(|row| row.avg_response_time_ms)
                .fold(0.0_f64, f64::max);
            let max_cost = rows.iter().map(|row| row.avg_cost_usd).fold(0.0_f64, f64::max);

            // Normalized 0..1 scores, weighted 60% speed / 40% cost.
            let mut best: Option<(&ModelAnalysis, f64)> = None;
            for row in rows {
                let speed_score = if max_time > 0.0 {
                    1.0 - row.avg_response_time_ms / max_time
                } else {
                    0.0
                };
                let cost_score = if max_cost > 0.0 {
                    1.0 - row.avg_cost_usd / max_cost
                } else {
                    0.0
                };
                let total = speed_score * 0.6 + cost_score * 0.4;
                let better = match best {
                    Some((_, best_score)) => total > best_score,
                    None => true,
                };
                if better {
                    best = Some((row, total));
                }
            }

            best.map(|(row, score)| Recommendation {
                model_name: row.model_name.clone(),
                provider: row.provider.clone(),
                reason: "balanced speed and cost over recorded comparisons".to_string(),
                score: Some(score),
            })
        }
    }
}

fn min_by_metric<F>(rows: &[ModelAnalysis], metric: F) -> Option<&ModelAnalysis>
where
    F: Fn(&ModelAnalysis) -> f64,
{
    rows.iter().min_by(|a, b| {
        metric(a)
            .partial_cmp(&metric(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}
