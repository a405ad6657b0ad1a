use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, info};

use crate::evidence::models::{CandidateEvidence, EngineeredFeatures, RawRepoStats, RepoContent, RepoSummary};
use crate::evidence::CodeHost;

/// Case-insensitive substrings that mark a repository as AI-relevant.
pub const AI_KEYWORDS: [&str; 13] = [
    "ai",
    "ml",
    "llm",
    "rag",
    "langchain",
    "langgraph",
    "tensorflow",
    "pytorch",
    "genai",
    "agent",
    "transformer",
    "neural",
    "deep",
];

/// Source and notebook files are read before anything else.
const PREFERRED_EXTENSIONS: [&str; 4] = [".py", ".js", ".ts", ".ipynb"];

pub const TOP_CONTENT_REPOS: usize = 3;
pub const README_CHAR_CAP: usize = 5000;
pub const SNIPPET_CHAR_CAP: usize = 2000;
pub const MAX_SNIPPETS: usize = 3;

fn truncate_chars(text: &str, cap: usize) -> String {
    text.chars().take(cap).collect()
}

pub fn is_ai_relevant(repo: &RepoSummary) -> bool {
    let name = repo.name.to_lowercase();
    let description = repo.description.as_deref().unwrap_or("").to_lowercase();
    AI_KEYWORDS
        .iter()
        .any(|k| name.contains(k) || description.contains(k))
}

pub fn raw_stats(username: &str, repos: &[RepoSummary]) -> RawRepoStats {
    let languages: BTreeSet<String> = repos.iter().filter_map(|r| r.language.clone()).collect();
    RawRepoStats {
        username: username.to_string(),
        total_repos: repos.len(),
        repo_names: repos.iter().map(|r| r.name.clone()).collect(),
        languages_used: languages.into_iter().collect(),
        total_stars: repos.iter().map(|r| r.stargazers_count).sum(),
        total_forks: repos.iter().map(|r| r.forks_count).sum(),
        ai_relevant_repos: repos
            .iter()
            .filter(|r| is_ai_relevant(r))
            .map(|r| r.name.clone())
            .collect(),
    }
}

/// Activity and AI-relevance scores, hard-clamped to 0..=100.
pub fn engineer_features(raw: &RawRepoStats) -> EngineeredFeatures {
    if raw.total_repos == 0 {
        return EngineeredFeatures::default();
    }
    let activity = (raw.total_repos as u64)
        .saturating_mul(10)
        .saturating_add(raw.total_stars.saturating_mul(2))
        .saturating_add(raw.total_forks.saturating_mul(5));
    let ai_count = raw.ai_relevant_repos.len();
    EngineeredFeatures {
        repo_count: raw.total_repos,
        ai_project_count: ai_count,
        activity_score: activity.min(100) as u32,
        ai_relevance_score: (ai_count as u64).saturating_mul(25).min(100) as u32,
        languages_match_count: raw.languages_used.len(),
    }
}

/// AI-relevant repositories by stars, descending. The sort is stable so ties keep listing order.
pub fn select_top_repos(repos: &[RepoSummary], limit: usize) -> Vec<&RepoSummary> {
    let mut relevant: Vec<&RepoSummary> = repos.iter().filter(|r| is_ai_relevant(r)).collect();
    relevant.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
    relevant.truncate(limit);
    relevant
}

pub struct EvidenceExtractor {
    host: Arc<dyn CodeHost>,
}

impl EvidenceExtractor {
    pub fn new(host: Arc<dyn CodeHost>) -> Self {
        Self { host }
    }

    /// Never fails: every network step degrades to empty data.
    pub async fn extract(&self, username: &str) -> CandidateEvidence {
        let repos = match self.host.list_repos(username).await {
            Ok(repos) => repos,
            Err(e) => {
                error!("Failed to fetch repos for {username}: {e}");
                Vec::new()
            }
        };

        let raw = raw_stats(username, &repos);
        let features = engineer_features(&raw);

        let mut contents = Vec::new();
        for repo in select_top_repos(&repos, TOP_CONTENT_REPOS) {
            info!("Extracting content for {username}/{}", repo.name);
            contents.push(RepoContent {
                name: repo.name.clone(),
                url: repo.html_url.clone(),
                description: repo.description.clone(),
                readme: self.fetch_readme(username, &repo.name).await,
                code_snippets: self.fetch_snippets(username, &repo.name).await,
            });
        }

        CandidateEvidence {
            raw,
            features,
            repos: contents,
        }
    }

    async fn fetch_readme(&self, username: &str, repo: &str) -> String {
        match self.host.readme(username, repo).await {
            Ok(text) => truncate_chars(&text, README_CHAR_CAP),
            Err(e) => {
                error!("Failed to fetch README for {repo}: {e}");
                String::new()
            }
        }
    }

    async fn fetch_snippets(&self, username: &str, repo: &str) -> Vec<String> {
        let listing = match self.host.list_files(username, repo).await {
            Ok(listing) => listing,
            Err(e) => {
                error!("Failed to list files for {repo}: {e}");
                return Vec::new();
            }
        };

        let (preferred, others): (Vec<_>, Vec<_>) = listing
            .into_iter()
            .filter(|f| f.is_file())
            .partition(|f| PREFERRED_EXTENSIONS.iter().any(|ext| f.name.ends_with(ext)));

        let mut snippets = Vec::new();
        for file in preferred.into_iter().chain(others).take(MAX_SNIPPETS) {
            let Some(url) = file.download_url else {
                continue;
            };
            match self.host.download(&url).await {
                Ok(Some(body)) => snippets.push(truncate_chars(&body, SNIPPET_CHAR_CAP)),
                Ok(None) => {}
                Err(e) => error!("Failed to fetch {} from {repo}: {e}", file.name),
            }
        }
        snippets
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::{HashMap, HashSet};

    use async_trait::async_trait;

    use crate::evidence::models::RepoFile;
    use crate::evidence::{CodeHost, CodeHostError};

    use super::*;

    /// In-memory code host keyed by username / repo / download URL.
    #[derive(Default)]
    pub struct FakeCodeHost {
        pub repos: HashMap<String, Vec<RepoSummary>>,
        pub readmes: HashMap<String, String>,
        pub files: HashMap<String, Vec<RepoFile>>,
        pub downloads: HashMap<String, String>,
        pub failing_repos: HashSet<String>,
        pub fail_listing: bool,
    }

    fn unavailable() -> CodeHostError {
        CodeHostError::Status {
            status: 503,
            url: "fake".to_string(),
        }
    }

    #[async_trait]
    impl CodeHost for FakeCodeHost {
        async fn list_repos(&self, username: &str) -> Result<Vec<RepoSummary>, CodeHostError> {
            if self.fail_listing {
                return Err(unavailable());
            }
            Ok(self.repos.get(username).cloned().unwrap_or_default())
        }

        async fn readme(&self, _username: &str, repo: &str) -> Result<String, CodeHostError> {
            if self.failing_repos.contains(repo) {
                return Err(unavailable());
            }
            Ok(self.readmes.get(repo).cloned().unwrap_or_default())
        }

        async fn list_files(&self, _username: &str, repo: &str) -> Result<Vec<RepoFile>, CodeHostError> {
            if self.failing_repos.contains(repo) {
                return Err(unavailable());
            }
            Ok(self.files.get(repo).cloned().unwrap_or_default())
        }

        async fn download(&self, url: &str) -> Result<Option<String>, CodeHostError> {
            Ok(self.downloads.get(url).cloned())
        }
    }

    pub fn make_repo(name: &str, description: &str, stars: u64) -> RepoSummary {
        RepoSummary {
            name: name.to_string(),
            description: Some(description.to_string()),
            language: Some("Python".to_string()),
            stargazers_count: stars,
            forks_count: 0,
            html_url: Some(format!("https://github.com/octo/{name}")),
        }
    }

    pub fn make_file(name: &str) -> RepoFile {
        RepoFile {
            name: name.to_string(),
            entry_type: "file".to_string(),
            download_url: Some(format!("https://raw.example/{name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::evidence::models::RepoFile;

    #[test]
    fn test_keyword_match_is_case_insensitive_substring() {
        assert!(is_ai_relevant(&make_repo("LangGraph-Demo", "", 0)));
        assert!(is_ai_relevant(&make_repo("notes", "Experiments with PyTorch", 0)));
        // "ai" matches inside ordinary words; the list is substring-based.
        assert!(is_ai_relevant(&make_repo("email-parser", "", 0)));
        assert!(!is_ai_relevant(&make_repo("dotfiles", "shell config", 0)));
    }

    #[test]
    fn test_features_are_clamped() {
        let repos: Vec<RepoSummary> = (0..20)
            .map(|i| RepoSummary {
                forks_count: 50,
                ..make_repo(&format!("llm-{i}"), "", 500)
            })
            .collect();
        let features = engineer_features(&raw_stats("octo", &repos));
        assert_eq!(features.activity_score, 100);
        assert_eq!(features.ai_relevance_score, 100);
        assert_eq!(features.ai_project_count, 20);
    }

    #[test]
    fn test_feature_formulas_below_clamp() {
        let repos = vec![make_repo("rag-bot", "", 3), make_repo("site", "blog", 1)];
        let features = engineer_features(&raw_stats("octo", &repos));
        // 10*2 + 2*4 + 5*0
        assert_eq!(features.activity_score, 28);
        assert_eq!(features.ai_relevance_score, 25);
        assert_eq!(features.languages_match_count, 1);
    }

    #[test]
    fn test_zero_repos_all_zero_features() {
        let features = engineer_features(&raw_stats("octo", &[]));
        assert_eq!(features, EngineeredFeatures::default());
    }

    #[test]
    fn test_top_repos_by_stars_ties_keep_order() {
        let repos = vec![
            make_repo("agent-a", "", 5),
            make_repo("agent-b", "", 9),
            make_repo("agent-c", "", 5),
            make_repo("agent-d", "", 1),
            make_repo("website", "static pages", 100),
        ];
        let top: Vec<&str> = select_top_repos(&repos, 3).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(top, vec!["agent-b", "agent-a", "agent-c"]);
    }

    #[tokio::test]
    async fn test_extract_caps_and_prefers_source_files() {
        let mut host = FakeCodeHost::default();
        host.repos.insert("octo".to_string(), vec![make_repo("rag-bot", "RAG", 2)]);
        host.readmes.insert("rag-bot".to_string(), "r".repeat(6000));
        host.files.insert(
            "rag-bot".to_string(),
            vec![
                make_file("LICENSE"),
                make_file("README.md"),
                RepoFile {
                    name: "src".to_string(),
                    entry_type: "dir".to_string(),
                    download_url: None,
                },
                make_file("main.py"),
                make_file("notebook.ipynb"),
            ],
        );
        for name in ["LICENSE", "README.md", "main.py", "notebook.ipynb"] {
            host.downloads
                .insert(format!("https://raw.example/{name}"), format!("{name}:{}", "x".repeat(3000)));
        }

        let evidence = EvidenceExtractor::new(Arc::new(host)).extract("octo").await;
        let repo = &evidence.repos[0];
        assert_eq!(repo.readme.chars().count(), README_CHAR_CAP);
        assert_eq!(repo.code_snippets.len(), 3);
        assert!(repo.code_snippets[0].starts_with("main.py:"));
        assert!(repo.code_snippets[1].starts_with("notebook.ipynb:"));
        assert!(repo.code_snippets[2].starts_with("LICENSE:"));
        assert!(repo.code_snippets.iter().all(|s| s.chars().count() == SNIPPET_CHAR_CAP));
    }

    #[tokio::test]
    async fn test_failing_repo_degrades_to_empty_content() {
        let mut host = FakeCodeHost::default();
        host.repos.insert(
            "octo".to_string(),
            vec![make_repo("broken-agent", "", 9), make_repo("ok-agent", "", 1)],
        );
        host.failing_repos.insert("broken-agent".to_string());
        host.readmes.insert("ok-agent".to_string(), "works".to_string());

        let evidence = EvidenceExtractor::new(Arc::new(host)).extract("octo").await;
        assert_eq!(evidence.repos.len(), 2);
        assert_eq!(evidence.repos[0].readme, "");
        assert!(evidence.repos[0].code_snippets.is_empty());
        assert_eq!(evidence.repos[1].readme, "works");
    }

    #[tokio::test]
    async fn test_listing_failure_is_empty_evidence() {
        let host = FakeCodeHost {
            fail_listing: true,
            ..Default::default()
        };
        let evidence = EvidenceExtractor::new(Arc::new(host)).extract("octo").await;
        assert_eq!(evidence.features, EngineeredFeatures::default());
        assert!(evidence.repos.is_empty());
        assert_eq!(evidence.raw.username, "octo");
    }
}
