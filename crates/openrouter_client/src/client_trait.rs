use async_trait::async_trait;
use summary_engine::MetricsRecord;

use crate::error::ClientResult;
use crate::pricing::ModelPricing;

/// One completed summary invocation: the generated text plus the immutable
/// measurement consumed by the comparison engine.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub summary: String,
    pub record: MetricsRecord,
}

/// Seam between the HTTP layer and the model backend, so controllers can be
/// tested against a scripted client.
#[async_trait]
pub trait SummaryClientTrait: Send + Sync {
    /// Generate a summary with one model and measure the invocation.
    async fn generate_summary(
        &self,
        model_id: &str,
        text: &str,
        max_length: Option<u32>,
        language: &str,
    ) -> ClientResult<SummaryOutcome>;

    /// Models this client can serve, with pricing and capability info.
    fn supported_models(&self) -> &'static [ModelPricing];
}
