use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::{CandidateEvaluation, RankingEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HrDecision {
    Approved,
    Rejected,
    OnHold,
}

impl HrDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            HrDecision::Approved => "APPROVED",
            HrDecision::Rejected => "REJECTED",
            HrDecision::OnHold => "ON_HOLD",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "APPROVED" => Some(HrDecision::Approved),
            "REJECTED" => Some(HrDecision::Rejected),
            "ON_HOLD" => Some(HrDecision::OnHold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HrStatus {
    Pending,
    Completed,
}

/// One cached outcome per (candidate, job description).
///
/// Every ranked candidate gets a record; only top-N candidates carry an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub candidate_id: String,
    pub jd_hash: String,
    pub rank: usize,
    pub name: String,
    pub ranking_score: f64,
    pub repository_url: Option<String>,
    pub evaluation: Option<CandidateEvaluation>,
    pub hr_decision: Option<HrDecision>,
    pub hr_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScreeningResult {
    pub fn new(jd_hash: &str, rank: usize, entry: &RankingEntry, evaluation: Option<CandidateEvaluation>) -> Self {
        let now = Utc::now();
        Self {
            candidate_id: entry.candidate_id.clone(),
            jd_hash: jd_hash.to_string(),
            rank,
            name: entry.name.clone(),
            ranking_score: entry.score,
            repository_url: entry.repository_url.clone(),
            evaluation,
            hr_decision: None,
            hr_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Keeps the human review and original creation time of the record being replaced.
    pub fn carry_forward(&mut self, prior: &ScreeningResult) {
        if prior.hr_decision.is_some() {
            self.hr_decision = prior.hr_decision;
            self.hr_notes = prior.hr_notes.clone();
        }
        self.created_at = prior.created_at;
    }

    pub fn hr_status(&self) -> HrStatus {
        match self.hr_decision {
            Some(_) => HrStatus::Completed,
            None => HrStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub rank: usize,
    pub candidate_id: String,
    pub name: String,
    pub score: f64,
    pub repository_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEvaluation {
    #[serde(flatten)]
    pub evaluation: CandidateEvaluation,
    pub hr_status: HrStatus,
    pub hr_decision: Option<HrDecision>,
    pub hr_notes: Option<String>,
}

/// The shape returned to the UI for both live and cached runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningReport {
    pub jd_hash: String,
    pub ranking: Vec<RankedCandidate>,
    pub evaluations: BTreeMap<String, ReportEvaluation>,
    pub from_cache: bool,
}

impl ScreeningReport {
    pub fn empty(jd_hash: &str) -> Self {
        Self {
            jd_hash: jd_hash.to_string(),
            ranking: Vec::new(),
            evaluations: BTreeMap::new(),
            from_cache: false,
        }
    }

    pub fn from_results(jd_hash: &str, mut results: Vec<ScreeningResult>, from_cache: bool) -> Self {
        results.sort_by_key(|r| r.rank);

        let ranking = results
            .iter()
            .map(|r| RankedCandidate {
                rank: r.rank,
                candidate_id: r.candidate_id.clone(),
                name: r.name.clone(),
                score: r.ranking_score,
                repository_url: r.repository_url.clone(),
            })
            .collect();

        let evaluations = results
            .into_iter()
            .filter_map(|r| {
                let hr_status = r.hr_status();
                let evaluation = r.evaluation?;
                Some((
                    r.candidate_id,
                    ReportEvaluation {
                        evaluation,
                        hr_status,
                        hr_decision: r.hr_decision,
                        hr_notes: r.hr_notes,
                    },
                ))
            })
            .collect();

        Self {
            jd_hash: jd_hash.to_string(),
            ranking,
            evaluations,
            from_cache,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::make_result;
    use super::*;

    #[test]
    fn test_hr_decision_wire_names() {
        assert_eq!(serde_json::to_string(&HrDecision::OnHold).unwrap(), "\"ON_HOLD\"");
        assert_eq!(HrDecision::parse("APPROVED"), Some(HrDecision::Approved));
        assert_eq!(HrDecision::parse("approved"), None);
    }

    #[test]
    fn test_carry_forward_keeps_review() {
        let mut prior = make_result("C001", "h1", 1);
        prior.hr_decision = Some(HrDecision::Approved);
        prior.hr_notes = Some("strong portfolio".to_string());

        let mut fresh = make_result("C001", "h1", 2);
        fresh.carry_forward(&prior);

        assert_eq!(fresh.hr_decision, Some(HrDecision::Approved));
        assert_eq!(fresh.hr_notes.as_deref(), Some("strong portfolio"));
        assert_eq!(fresh.created_at, prior.created_at);
        assert_eq!(fresh.rank, 2);
    }

    #[test]
    fn test_carry_forward_without_review_is_noop_for_hr() {
        let prior = make_result("C001", "h1", 1);
        let mut fresh = make_result("C001", "h1", 1);
        fresh.carry_forward(&prior);
        assert_eq!(fresh.hr_status(), HrStatus::Pending);
    }

    #[test]
    fn test_report_sorted_by_rank_and_only_evaluated_in_map() {
        let results = vec![make_result("C002", "h1", 2), make_result("C001", "h1", 1)];
        let report = ScreeningReport::from_results("h1", results, true);

        let order: Vec<_> = report.ranking.iter().map(|r| r.candidate_id.as_str()).collect();
        assert_eq!(order, vec!["C001", "C002"]);
        assert!(report.evaluations.is_empty());
        assert!(report.from_cache);
    }
}
