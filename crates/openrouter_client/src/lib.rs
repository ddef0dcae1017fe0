pub mod api;
pub mod client_trait;
pub mod config;
pub mod error;
pub mod pricing;

pub use api::client::OpenRouterClient;
pub use client_trait::{SummaryClientTrait, SummaryOutcome};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use pricing::{estimate_tokens, pricing_for_model, supported_models, ModelPricing};
