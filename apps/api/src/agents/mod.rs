//! Reasoning Agents: four roles behind one call contract.
//!
//! Each role implements [`Agent`]: how to render its prompt, how to repair and
//! validate what the model returned, and what to return when the model fails.
//! [`invoke`] owns the shared path (audit log, fence stripping, parsing,
//! fallback) so no role can skip validation.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::prompts::estimate_tokens;
use crate::llm_client::{strip_json_fences, ChatModel, LlmError};

pub mod evaluator;
pub mod gatekeeper;
pub mod models;
pub mod prompts;
pub mod skeptic;
pub mod synthesizer;

pub use evaluator::{EvaluationInput, UnifiedEvaluation, UnifiedEvaluator};
pub use gatekeeper::{ReadinessGatekeeper, ReadinessInput, ReadinessReport};
pub use skeptic::{Skeptic, SkepticAnalysis, SkepticInput};
pub use synthesizer::{DecisionSynthesizer, FinalDecision, SynthesisInput};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model call failed: {0}")]
    Provider(#[from] LlmError),

    #[error("response did not match the schema: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Whether an agent's output came from the model or from its fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct AgentOutcome<T> {
    pub output: T,
    pub source: OutputSource,
}

pub trait Agent: Send + Sync {
    type Input: Sync;
    type Output: DeserializeOwned + Send;

    fn role(&self) -> &'static str;

    fn system_prompt(&self) -> &'static str;

    fn render_prompt(&self, input: &Self::Input) -> String;

    /// Enforces the role's post-conditions. Applied to model output and fallback alike.
    fn validate(&self, output: Self::Output, input: &Self::Input) -> Self::Output;

    /// Deterministic, clearly-labelled substitute used on provider or parse failure.
    fn fallback(&self, input: &Self::Input) -> Self::Output;
}

/// Runs one agent for one candidate. Never fails: errors select the fallback.
pub async fn invoke<A: Agent>(
    model: &dyn ChatModel,
    agent: &A,
    candidate_id: &str,
    input: &A::Input,
) -> AgentOutcome<A::Output> {
    let system = agent.system_prompt();
    let prompt = agent.render_prompt(input);
    let total_chars = system.chars().count() + prompt.chars().count();
    info!(
        candidate_id,
        role = agent.role(),
        total_chars,
        estimated_tokens = estimate_tokens(system) + estimate_tokens(&prompt),
        "LLM input audit"
    );

    match call::<A>(model, system, &prompt).await {
        Ok(output) => {
            info!("{} completed for {candidate_id}", agent.role());
            AgentOutcome {
                output: agent.validate(output, input),
                source: OutputSource::Model,
            }
        }
        Err(e) => {
            warn!("{} failed for {candidate_id}, using fallback: {e}", agent.role());
            AgentOutcome {
                output: agent.validate(agent.fallback(input), input),
                source: OutputSource::Fallback,
            }
        }
    }
}

async fn call<A: Agent>(model: &dyn ChatModel, system: &str, prompt: &str) -> Result<A::Output, AgentError> {
    let text = model.complete(system, prompt).await?;
    Ok(serde_json::from_str(strip_json_fences(&text))?)
}

/// Pretty JSON for embedding structured context in a prompt.
pub(crate) fn to_prompt_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
