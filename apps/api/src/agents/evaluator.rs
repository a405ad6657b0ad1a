use serde::{Deserialize, Serialize};

use crate::agents::models::{one_or_many, score, tidy, EvidenceCitation};
use crate::agents::prompts::{EVALUATOR_PROMPT_TEMPLATE, EVALUATOR_SYSTEM, NO_EVIDENCE};
use crate::agents::Agent;
use crate::evidence::models::EngineeredFeatures;
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::vector_store::evidence::EvidenceChunk;

pub const MAX_CITATIONS: usize = 5;
pub const SNIPPET_CHARS: usize = 300;
const MAX_JUSTIFICATION: usize = 6;
pub const HEURISTIC_JUSTIFICATION: &str =
    "Heuristic result based on combined similarity and repository signals.";

#[derive(Debug, Clone)]
pub struct EvaluationInput {
    pub jd_text: String,
    pub resume_summary: String,
    /// Weighted resume similarity from ranking, 0–100.
    pub resume_similarity: f64,
    pub features: EngineeredFeatures,
    pub evidence: Vec<EvidenceChunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedEvaluation {
    #[serde(deserialize_with = "score")]
    pub resume_score: u32,
    #[serde(deserialize_with = "score")]
    pub github_score: u32,
    #[serde(deserialize_with = "score")]
    pub overall_score: u32,
    #[serde(default, deserialize_with = "one_or_many")]
    pub justification: Vec<String>,
    #[serde(default)]
    pub ai_evidence: Vec<EvidenceCitation>,
}

/// Trims a chunk to the citation length, marking the cut.
pub fn trim_snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_CHARS {
        let head: String = text.chars().take(SNIPPET_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

pub fn citations(evidence: &[EvidenceChunk]) -> Vec<EvidenceCitation> {
    evidence
        .iter()
        .take(MAX_CITATIONS)
        .map(|chunk| EvidenceCitation {
            repo: chunk.repo_name.clone(),
            kind: chunk.kind.clone(),
            snippet: trim_snippet(&chunk.chunk_text),
        })
        .collect()
}

/// `0.5 × resume similarity + 0.3 × AI relevance + 0.2 × activity`, all on 0–100.
pub fn heuristic_overall(resume_similarity: f64, features: &EngineeredFeatures) -> f64 {
    0.5 * resume_similarity + 0.3 * features.ai_relevance_score as f64 + 0.2 * features.activity_score as f64
}

fn format_evidence(evidence: &[EvidenceChunk]) -> String {
    if evidence.is_empty() {
        return NO_EVIDENCE.to_string();
    }
    evidence
        .iter()
        .map(|e| format!("Repo: {} | Source: {}\nContent: {}", e.repo_name, e.kind, e.chunk_text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scores resume fit, repository strength, and overall fit in one call.
pub struct UnifiedEvaluator;

impl Agent for UnifiedEvaluator {
    type Input = EvaluationInput;
    type Output = UnifiedEvaluation;

    fn role(&self) -> &'static str {
        "Unified Evaluator"
    }

    fn system_prompt(&self) -> &'static str {
        EVALUATOR_SYSTEM
    }

    fn render_prompt(&self, input: &EvaluationInput) -> String {
        EVALUATOR_PROMPT_TEMPLATE
            .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
            .replace("{jd}", &input.jd_text)
            .replace("{resume}", &input.resume_summary)
            .replace("{activity}", &input.features.activity_score.to_string())
            .replace("{relevance}", &input.features.ai_relevance_score.to_string())
            .replace("{repos}", &input.features.repo_count.to_string())
            .replace("{evidence}", &format_evidence(&input.evidence))
    }

    fn validate(&self, mut output: UnifiedEvaluation, input: &EvaluationInput) -> UnifiedEvaluation {
        tidy(&mut output.justification, MAX_JUSTIFICATION);
        if output.justification.is_empty() {
            output.justification.push("No justification provided by the evaluator.".to_string());
        }
        output.ai_evidence = citations(&input.evidence);
        output
    }

    fn fallback(&self, input: &EvaluationInput) -> UnifiedEvaluation {
        let similarity = input.resume_similarity.clamp(0.0, 100.0);
        UnifiedEvaluation {
            resume_score: similarity as u32,
            github_score: input.features.ai_relevance_score,
            overall_score: heuristic_overall(similarity, &input.features).clamp(0.0, 100.0) as u32,
            justification: vec![HEURISTIC_JUSTIFICATION.to_string()],
            ai_evidence: Vec::new(),
        }
    }
}
