use std::collections::HashSet;

use crate::storage::{EngineError, EngineResult};
use crate::types::{ComparisonVerdict, MetricsRecord, ModelKey};

/// Compute the comparison verdict for one multi-model event.
///
/// Pure and idempotent. Ties on time or cost are broken by lexicographic
/// `(model_id, provider)` order so the verdict is reproducible regardless of
/// record ordering. A single-record event is valid: that record is both
/// fastest and cheapest by definition.
pub fn compare(records: &[MetricsRecord]) -> EngineResult<ComparisonVerdict> {
    if records.is_empty() {
        return Err(EngineError::InvalidMetric(
            "comparison event must contain at least one record".to_string(),
        ));
    }

    let mut seen: HashSet<ModelKey> = HashSet::with_capacity(records.len());
    for record in records {
        record.validate().map_err(EngineError::InvalidMetric)?;
        if !seen.insert(record.key()) {
            return Err(EngineError::InvalidMetric(format!(
                "duplicate model key in event: {}",
                record.key()
            )));
        }
    }

    let fastest = select_min(records, |r| r.response_time_ms);
    let cheapest = select_min(records, |r| r.cost_usd);

    // Incremental mean keeps the intermediate value within the input range,
    // matching the long-run accumulation discipline of the aggregate store.
    let mut average_response_time_ms = 0.0;
    let mut total_cost_usd = 0.0;
    for (index, record) in records.iter().enumerate() {
        average_response_time_ms +=
            (record.response_time_ms - average_response_time_ms) / (index as f64 + 1.0);
        total_cost_usd += record.cost_usd;
    }

    Ok(ComparisonVerdict {
        fastest,
        cheapest,
        average_response_time_ms,
        total_cost_usd,
    })
}

fn select_min<F>(records: &[MetricsRecord], value: F) -> ModelKey
where
    F: Fn(&MetricsRecord) -> f64,
{
    let mut best = &records[0];
    for candidate in &records[1..] {
        let candidate_value = value(candidate);
        let best_value = value(best);
        if candidate_value < best_value
            || (candidate_value == best_value && candidate.key() < best.key())
        {
            best = candidate;
        }
    }
    best.key()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::compare;
    use crate::storage::EngineError;
    use crate::types::{MetricsRecord, ModelKey};

    fn record(model: &str, provider: &str, time_ms: f64, cost: f64) -> MetricsRecord {
        MetricsRecord {
            model_id: model.to_string(),
            provider: provider.to_string(),
            response_time_ms: time_ms,
            tokens_used: 50,
            cost_usd: cost,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn compare_picks_fastest_and_cheapest_with_aggregates() {
        let records = vec![
            record("m1", "pA", 100.0, 0.01),
            record("m2", "pB", 50.0, 0.02),
        ];

        let verdict = compare(&records).expect("verdict");
        assert_eq!(verdict.fastest, ModelKey::new("m2", "pB"));
        assert_eq!(verdict.cheapest, ModelKey::new("m1", "pA"));
        assert_eq!(verdict.average_response_time_ms, 75.0);
        assert!((verdict.total_cost_usd - 0.03).abs() < 1e-12);
    }

    #[test]
    fn compare_accepts_single_record_event() {
        let records = vec![record("m1", "pA", 200.0, 0.05)];

        let verdict = compare(&records).expect("verdict");
        assert_eq!(verdict.fastest, ModelKey::new("m1", "pA"));
        assert_eq!(verdict.cheapest, ModelKey::new("m1", "pA"));
        assert_eq!(verdict.average_response_time_ms, 200.0);
    }

    #[test]
    fn compare_rejects_empty_event() {
        assert!(matches!(
            compare(&[]),
            Err(EngineError::InvalidMetric(_))
        ));
    }

    #[test]
    fn compare_rejects_negative_cost_for_whole_event() {
        let records = vec![
            record("m1", "pA", 100.0, 0.01),
            record("m2", "pB", 50.0, -1.0),
        ];

        assert!(matches!(
            compare(&records),
            Err(EngineError::InvalidMetric(_))
        ));
    }

    #[test]
    fn compare_rejects_duplicate_keys() {
        let records = vec![
            record("m1", "pA", 100.0, 0.01),
            record("m1", "pA", 50.0, 0.02),
        ];

        assert!(matches!(
            compare(&records),
            Err(EngineError::InvalidMetric(_))
        ));
    }

    #[test]
    fn ties_resolve_lexicographically_regardless_of_ordering() {
        let forward = vec![
            record("alpha", "pA", 50.0, 0.02),
            record("beta", "pB", 50.0, 0.02),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let verdict_forward = compare(&forward).expect("verdict");
        let verdict_reversed = compare(&reversed).expect("verdict");

        assert_eq!(verdict_forward.fastest, ModelKey::new("alpha", "pA"));
        assert_eq!(verdict_forward, verdict_reversed);
    }

    #[test]
    fn tie_break_considers_provider_when_model_ids_match() {
        let records = vec![
            record("m1", "pB", 50.0, 0.02),
            record("m1", "pA", 50.0, 0.01),
        ];

        let verdict = compare(&records).expect("verdict");
        assert_eq!(verdict.cheapest, ModelKey::new("m1", "pA"));
        assert_eq!(verdict.fastest, ModelKey::new("m1", "pA"));
    }
}
