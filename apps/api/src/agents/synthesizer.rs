use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agents::evaluator::UnifiedEvaluation;
use crate::agents::gatekeeper::ReadinessReport;
use crate::agents::models::{one_or_many, score, tidy, DecisionLabel, Level};
use crate::agents::prompts::{SYNTHESIZER_PROMPT_TEMPLATE, SYNTHESIZER_SYSTEM};
use crate::agents::skeptic::SkepticAnalysis;
use crate::agents::{to_prompt_json, Agent};

const MAX_REASONING: usize = 8;
/// Every synthesized decision waits for a human.
pub const HITL_PENDING: &str = "PENDING_HR_REVIEW";
pub const CONTRADICTION_NOTE: &str =
    "Downgraded from STRONG HIRE: HIGH readiness conflicts with HIGH skeptic risk";

#[derive(Debug, Clone)]
pub struct SynthesisInput {
    pub gatekeeper: ReadinessReport,
    pub skeptic: SkepticAnalysis,
    pub scores: UnifiedEvaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    pub final_decision: DecisionLabel,
    #[serde(default, deserialize_with = "one_or_many")]
    pub decision_reasoning: Vec<String>,
    #[serde(default)]
    pub risk_level: Level,
    #[serde(deserialize_with = "score")]
    pub confidence: u32,
    #[serde(default)]
    pub candidate_classification: String,
    #[serde(default)]
    pub hitl_status: String,
}

/// True when the two upstream agents flatly disagree.
pub fn is_contradiction(gatekeeper: &ReadinessReport, skeptic: &SkepticAnalysis) -> bool {
    gatekeeper.hire_readiness_level == Level::High && skeptic.risk_level == Level::High
}

/// Reconciles gatekeeper, skeptic and raw scores into one label.
pub struct DecisionSynthesizer;

impl Agent for DecisionSynthesizer {
    type Input = SynthesisInput;
    type Output = FinalDecision;

    fn role(&self) -> &'static str {
        "Decision Synthesizer"
    }

    fn system_prompt(&self) -> &'static str {
        SYNTHESIZER_SYSTEM
    }

    fn render_prompt(&self, input: &SynthesisInput) -> String {
        SYNTHESIZER_PROMPT_TEMPLATE
            .replace("{gatekeeper}", &to_prompt_json(&input.gatekeeper))
            .replace("{skeptic}", &to_prompt_json(&input.skeptic))
            .replace("{scores}", &to_prompt_json(&input.scores))
    }

    fn validate(&self, mut decision: FinalDecision, input: &SynthesisInput) -> FinalDecision {
        tidy(&mut decision.decision_reasoning, MAX_REASONING);

        if decision.final_decision == DecisionLabel::StrongHire && is_contradiction(&input.gatekeeper, &input.skeptic) {
            warn!("Synthesizer returned STRONG HIRE despite HIGH/HIGH disagreement, downgrading");
            decision.final_decision = DecisionLabel::HireWithCaution;
            decision.decision_reasoning.push(CONTRADICTION_NOTE.to_string());
        }

        if decision.candidate_classification.trim().is_empty() {
            decision.candidate_classification = decision.final_decision.as_str().to_string();
        }
        decision.hitl_status = HITL_PENDING.to_string();
        decision
    }

    fn fallback(&self, _input: &SynthesisInput) -> FinalDecision {
        FinalDecision {
            final_decision: DecisionLabel::Hold,
            decision_reasoning: vec!["Decision synthesis error - manual review required.".to_string()],
            risk_level: Level::Medium,
            confidence: 50,
            candidate_classification: "System Error".to_string(),
            hitl_status: HITL_PENDING.to_string(),
        }
    }
}
