use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The four free-text resume sections that are embedded and ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSection {
    Skills,
    Experience,
    Projects,
    Education,
}

impl ResumeSection {
    pub const ALL: [ResumeSection; 4] = [
        ResumeSection::Skills,
        ResumeSection::Experience,
        ResumeSection::Projects,
        ResumeSection::Education,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeSection::Skills => "skills",
            ResumeSection::Experience => "experience",
            ResumeSection::Projects => "projects",
            ResumeSection::Education => "education",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateLinks {
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: String,
    pub name: String,
    #[serde(default)]
    pub links: CandidateLinks,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub projects: String,
    #[serde(default)]
    pub education: String,
}

impl Candidate {
    pub fn section(&self, section: ResumeSection) -> &str {
        match section {
            ResumeSection::Skills => &self.skills,
            ResumeSection::Experience => &self.experience,
            ResumeSection::Projects => &self.projects,
            ResumeSection::Education => &self.education,
        }
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.links.github.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Code-host username parsed from the repository URL, if any.
    pub fn code_host_username(&self) -> Option<String> {
        self.repository_url().and_then(extract_github_username)
    }

    /// Short summary handed to the evaluator: all skills plus the first 500 chars of experience.
    pub fn resume_summary(&self) -> String {
        let experience: String = self.experience.chars().take(500).collect();
        format!("Skills: {} | Experience: {experience}...", self.skills)
    }
}

/// Parses `user` from `github.com/user`, `https://github.com/user/`, `github.com/user/repo`.
pub fn extract_github_username(url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"github\.com/([a-zA-Z0-9-]+)").expect("static regex"));
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Reads a JSON array of candidates.
pub fn load_roster(path: &std::path::Path) -> anyhow::Result<Vec<Candidate>> {
    use anyhow::Context;
    let bytes = std::fs::read(path).with_context(|| format!("reading roster {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing roster {}", path.display()))
}
