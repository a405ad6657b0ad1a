use serde::{Deserialize, Serialize};

use crate::agents::evaluator::UnifiedEvaluation;
use crate::agents::gatekeeper::ReadinessReport;
use crate::agents::models::{one_or_many, pad_to, tidy, Level};
use crate::agents::prompts::{SKEPTIC_PROMPT_TEMPLATE, SKEPTIC_SYSTEM};
use crate::agents::{to_prompt_json, Agent};
use crate::llm_client::prompts::LIST_FIELDS_INSTRUCTION;

const MAX_BULLETS: usize = 8;
pub const MIN_CONCERNS: usize = 3;
pub const MIN_CRITICAL_GAPS: usize = 2;

const CONCERN_FILLERS: [&str; 3] = [
    "Real-world production experience is unverified",
    "Collaboration and teamwork evidence is missing",
    "Scalability of past work is unproven",
];
const CRITICAL_GAP_FILLERS: [&str; 2] = [
    "System design at production scale",
    "Operational ownership of deployed services",
];

#[derive(Debug, Clone, Serialize)]
pub struct SkepticInput {
    pub candidate_id: String,
    pub evaluation: UnifiedEvaluation,
    pub gatekeeper: ReadinessReport,
}

#[derive(Debug, Serialize)]
struct SkepticContext<'a> {
    candidate_id: &'a str,
    eval_summary: &'a UnifiedEvaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkepticAnalysis {
    #[serde(default)]
    pub risk_level: Level,
    #[serde(default, deserialize_with = "one_or_many")]
    pub major_concerns: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub hidden_risks: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub critical_skill_gaps: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub skeptic_recommendation: Vec<String>,
}

/// Adversarial audit of the gatekeeper's verdict.
pub struct Skeptic;

impl Agent for Skeptic {
    type Input = SkepticInput;
    type Output = SkepticAnalysis;

    fn role(&self) -> &'static str {
        "Adversarial Skeptic"
    }

    fn system_prompt(&self) -> &'static str {
        SKEPTIC_SYSTEM
    }

    fn render_prompt(&self, input: &SkepticInput) -> String {
        let context = SkepticContext {
            candidate_id: &input.candidate_id,
            eval_summary: &input.evaluation,
        };
        SKEPTIC_PROMPT_TEMPLATE
            .replace("{list_instruction}", LIST_FIELDS_INSTRUCTION)
            .replace("{context}", &to_prompt_json(&context))
            .replace("{gatekeeper}", &to_prompt_json(&input.gatekeeper))
    }

    fn validate(&self, mut analysis: SkepticAnalysis, _input: &SkepticInput) -> SkepticAnalysis {
        for list in [
            &mut analysis.major_concerns,
            &mut analysis.hidden_risks,
            &mut analysis.critical_skill_gaps,
            &mut analysis.skeptic_recommendation,
        ] {
            tidy(list, MAX_BULLETS);
        }
        pad_to(&mut analysis.major_concerns, MIN_CONCERNS, &CONCERN_FILLERS);
        pad_to(&mut analysis.critical_skill_gaps, MIN_CRITICAL_GAPS, &CRITICAL_GAP_FILLERS);
        analysis
    }

    fn fallback(&self, _input: &SkepticInput) -> SkepticAnalysis {
        SkepticAnalysis {
            risk_level: Level::Medium,
            major_concerns: vec!["Skeptic audit system error".to_string()],
            hidden_risks: vec!["Possible unvetted evaluation logic".to_string()],
            critical_skill_gaps: vec!["Safety audit missing".to_string()],
            skeptic_recommendation: vec![
                "Caution: manual safety audit required due to system failure.".to_string(),
            ],
        }
    }
}
