use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::candidate::ResumeSection;
use crate::vector_store::similarity::cosine_similarity;

/// Per-section contribution to the job-fit score. Weights sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionWeights(pub [(ResumeSection, f64); 4]);

impl Default for SectionWeights {
    fn default() -> Self {
        Self([
            (ResumeSection::Skills, 0.4),
            (ResumeSection::Experience, 0.3),
            (ResumeSection::Projects, 0.2),
            (ResumeSection::Education, 0.1),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub candidate_id: String,
    pub name: String,
    /// 0–100.
    pub score: f64,
    pub repository_url: Option<String>,
}

/// `Σ cosine(jd, section) × weight × 100`. A missing section contributes nothing.
pub fn weighted_score(
    jd_vector: &[f32],
    sections: &HashMap<ResumeSection, Vec<f32>>,
    weights: &SectionWeights,
) -> f64 {
    weights
        .0
        .iter()
        .filter_map(|(section, weight)| {
            sections
                .get(section)
                .map(|vector| cosine_similarity(jd_vector, vector) * weight)
        })
        .sum::<f64>()
        * 100.0
}

/// Highest score first. Ties keep roster order.
pub fn sort_ranking(entries: &mut [RankingEntry]) {
    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit vector at angle whose cosine against `[1, 0]` is `cos`.
    fn at_cosine(cos: f32) -> Vec<f32> {
        vec![cos, (1.0 - cos * cos).sqrt()]
    }

    #[test]
    fn test_weighted_score_from_section_similarities() {
        let jd = vec![1.0, 0.0];
        let sections = HashMap::from([
            (ResumeSection::Skills, at_cosine(0.9)),
            (ResumeSection::Experience, at_cosine(0.8)),
            (ResumeSection::Projects, at_cosine(0.5)),
            (ResumeSection::Education, at_cosine(0.2)),
        ]);
        let score = weighted_score(&jd, &sections, &SectionWeights::default());
        // (0.9*0.4 + 0.8*0.3 + 0.5*0.2 + 0.2*0.1) * 100
        assert!((score - 72.0).abs() < 1e-4, "score was {score}");
    }

    #[test]
    fn test_missing_sections_contribute_zero() {
        let jd = vec![1.0, 0.0];
        let sections = HashMap::from([(ResumeSection::Skills, vec![2.0, 0.0])]);
        let score = weighted_score(&jd, &sections, &SectionWeights::default());
        assert!((score - 40.0).abs() < 1e-9);
        assert_eq!(weighted_score(&jd, &HashMap::new(), &SectionWeights::default()), 0.0);
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let make = |id: &str, score: f64| RankingEntry {
            candidate_id: id.to_string(),
            name: id.to_string(),
            score,
            repository_url: None,
        };
        let mut entries = vec![make("C1", 50.0), make("C2", 80.0), make("C3", 50.0), make("C4", 10.0)];
        sort_ranking(&mut entries);
        let ids: Vec<&str> = entries.iter().map(|e| e.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["C2", "C1", "C3", "C4"]);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let total: f64 = SectionWeights::default().0.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
