pub mod analysis;
pub mod comparator;
pub mod storage;
pub mod types;

pub use analysis::{list_analysis, recommend, ModelAnalysis, RecommendCriteria, Recommendation};
pub use comparator::compare;
pub use storage::{
    AggregateStorage, EngineError, EngineResult, MemoryAggregateStorage, SqliteAggregateStorage,
};
pub use types::{AggregateRow, ComparisonVerdict, MetricsRecord, ModelKey};
