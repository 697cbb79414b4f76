//! Model adapter: a single abstract `generate` call plus one
//! reqwest-streaming reference implementation. Deliberately not a
//! multi-provider wire-format library — a real deployment plugs in
//! additional `ModelAdapter` impls the same way `AnthropicAdapter` does.

mod anthropic;
mod error;
mod http;
mod sse;
mod types;

pub use anthropic::AnthropicAdapter;
pub use error::ModelError;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// `on_delta` is called synchronously for every `StreamEvent` as it arrives
/// (text, thinking, and completed tool-call deltas) so callers can forward
/// it to the session's observability hook without waiting for the step to
/// finish.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    async fn generate(
        &self,
        request: GenerateRequest,
        on_delta: Arc<dyn Fn(StreamEvent) + Send + Sync>,
        cancel: &CancellationToken,
    ) -> Result<StepResult, ModelError>;
}
