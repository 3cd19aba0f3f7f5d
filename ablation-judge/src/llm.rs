//! LM call shared by the prompt-driven judge and planner.

use ablation_core::brain::{CompletionRequest, LlmProvider};
use ablation_core::cache::CachedResponse;
use ablation_core::config::BenchConfig;
use ablation_core::prompt::PromptRenderer;
use ablation_core::providers::with_retry;
use ablation_core::types::SideAssignment;
use serde::Serialize;
use tracing::debug;

/// Render the prompt, call the model with retry, and price the response.
pub(crate) async fn complete<T: Serialize>(
    config: &BenchConfig,
    provider: &dyn LlmProvider,
    renderer: &PromptRenderer,
    vars: &T,
    sides: Option<SideAssignment>,
) -> ablation_core::Result<CachedResponse> {
    let request = CompletionRequest {
        messages: renderer.messages(vars)?,
        temperature: config.model.temperature,
        top_p: config.model.top_p,
        max_tokens: config.model.max_tokens,
        reasoning_effort: config.model.reasoning_effort,
        model: Some(config.model.name.clone()),
    };

    let response = with_retry(&config.retry, || provider.complete(request.clone())).await?;
    let cost = provider.cost_of(&response.usage);
    debug!(
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        cost,
        "LM call complete"
    );
    Ok(CachedResponse::new(response, cost, sides))
}
