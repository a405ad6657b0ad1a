use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Code-host wire shapes
// ────────────────────────────────────────────────────────────────────────────

/// One entry of a user's repository listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoSummary {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// One entry of a repository's root contents listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoFile {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl RepoFile {
    pub fn is_file(&self) -> bool {
        self.entry_type == "file"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction layers
// ────────────────────────────────────────────────────────────────────────────

/// Layer 1: counts and names straight from the listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRepoStats {
    pub username: String,
    pub total_repos: usize,
    pub repo_names: Vec<String>,
    pub languages_used: Vec<String>,
    pub total_stars: u64,
    pub total_forks: u64,
    pub ai_relevant_repos: Vec<String>,
}

/// Layer 2: bounded scores derived from the raw stats. Both scores are in 0..=100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineeredFeatures {
    pub repo_count: usize,
    pub ai_project_count: usize,
    pub activity_score: u32,
    pub ai_relevance_score: u32,
    pub languages_match_count: usize,
}

/// Layer 3: text pulled from one AI-relevant repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoContent {
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub readme: String,
    pub code_snippets: Vec<String>,
}

/// Everything the extractor learned about one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvidence {
    pub raw: RawRepoStats,
    pub features: EngineeredFeatures,
    pub repos: Vec<RepoContent>,
}
