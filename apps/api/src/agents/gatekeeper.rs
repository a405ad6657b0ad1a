use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agents::evaluator::UnifiedEvaluation;
use crate::agents::models::{one_or_many, pad_to, score, tidy, Level};
use crate::agents::prompts::{GATEKEEPER_PROMPT_TEMPLATE, GATEKEEPER_SYSTEM};
use crate::agents::{to_prompt_json, Agent};
use crate::llm_client::prompts::LIST_FIELDS_INSTRUCTION;

const MAX_BULLETS: usize = 8;
pub const MIN_SKILL_GAPS: usize = 2;
pub const MIN_RISK_FACTORS: usize = 1;
/// Gap count at which HIGH readiness is no longer credible.
pub const GAP_DOWNGRADE_THRESHOLD: usize = 3;

const SKILL_GAP_FILLERS: [&str; 2] = [
    "Production deployment experience not evidenced",
    "System design depth not demonstrated",
];
const RISK_FACTOR_FILLERS: [&str; 1] = ["Insufficient verified evidence of independent delivery"];

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessInput {
    pub candidate_id: String,
    #[serde(flatten)]
    pub evaluation: UnifiedEvaluation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessReport {
    #[serde(default)]
    pub hire_readiness_level: Level,
    #[serde(deserialize_with = "score")]
    pub confidence_score: u32,
    #[serde(default, deserialize_with = "one_or_many")]
    pub risk_factors: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub skill_gaps: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub interview_focus_areas: Vec<String>,
    #[serde(default)]
    pub final_hiring_recommendation: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub executive_summary: Vec<String>,
}

/// Conservative hire-readiness classification with hard calibration rules.
pub struct ReadinessGatekeeper;

impl Agent for ReadinessGatekeeper {
    type Input = ReadinessInput;
    type Output = ReadinessReport;

    fn role(&self) -> &'static str {
        "Readiness Gatekeeper"
    }

    fn system_prompt(&self) -> &'static str {
        GATEKEEPER_SYSTEM
    }

    fn render_prompt(&self, input: &ReadinessInput) -> String {
        GATEKEEPER_PROMPT_TEMPLATE
            .replace("{list_instruction}", LIST_FIELDS_INSTRUCTION)
            .replace("{profile}", &to_prompt_json(input))
    }

    fn validate(&self, mut report: ReadinessReport, input: &ReadinessInput) -> ReadinessReport {
        for list in [
            &mut report.risk_factors,
            &mut report.skill_gaps,
            &mut report.interview_focus_areas,
            &mut report.executive_summary,
        ] {
            tidy(list, MAX_BULLETS);
        }
        pad_to(&mut report.skill_gaps, MIN_SKILL_GAPS, &SKILL_GAP_FILLERS);
        pad_to(&mut report.risk_factors, MIN_RISK_FACTORS, &RISK_FACTOR_FILLERS);

        let ceiling = input.evaluation.resume_score.min(input.evaluation.github_score);
        if report.confidence_score > ceiling {
            report.confidence_score = ceiling;
        }

        if report.skill_gaps.len() >= GAP_DOWNGRADE_THRESHOLD && report.hire_readiness_level == Level::High {
            warn!(
                "Downgrading readiness for {}: HIGH with {} skill gaps",
                input.candidate_id,
                report.skill_gaps.len()
            );
            report.hire_readiness_level = Level::Medium;
            report.final_hiring_recommendation = "Borderline".to_string();
        }

        if report.final_hiring_recommendation.trim().is_empty() {
            report.final_hiring_recommendation = "Borderline".to_string();
        }
        report
    }

    fn fallback(&self, _input: &ReadinessInput) -> ReadinessReport {
        ReadinessReport {
            hire_readiness_level: Level::Low,
            confidence_score: 30,
            risk_factors: vec!["Evaluation error - manual review required".to_string()],
            skill_gaps: vec![
                "Technical evaluation failure".to_string(),
                "Data inconsistency".to_string(),
            ],
            interview_focus_areas: vec![
                "Foundational system design".to_string(),
                "Core architecture".to_string(),
            ],
            final_hiring_recommendation: "Reject".to_string(),
            executive_summary: vec![
                "System failure during strict assessment. Rejection recommended until manual audit.".to_string(),
            ],
        }
    }
}
