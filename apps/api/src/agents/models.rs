//! Shared output vocabulary for the reasoning agents.
//!
//! Model output is parsed leniently: levels and labels tolerate case and
//! phrasing drift, list fields accept a bare string, and scores accept floats.
//! Validation afterwards guarantees every value is inside its fixed set.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Three-step scale shared by readiness and risk assessments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    High,
    #[default]
    Medium,
    Low,
}

impl Level {
    /// Unknown text maps to `Medium`.
    pub fn parse_lenient(text: &str) -> Self {
        let upper = text.to_uppercase();
        if upper.contains("HIGH") {
            Level::High
        } else if upper.contains("LOW") {
            Level::Low
        } else {
            Level::Medium
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Level::parse_lenient(&text))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::High => "HIGH",
            Level::Medium => "MEDIUM",
            Level::Low => "LOW",
        };
        f.write_str(s)
    }
}

/// The synthesizer's fixed label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecisionLabel {
    #[serde(rename = "STRONG HIRE")]
    StrongHire,
    #[serde(rename = "HIRE WITH CAUTION")]
    HireWithCaution,
    #[serde(rename = "PROCEED TO INTERVIEW")]
    ProceedToInterview,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "REJECT")]
    Reject,
}

impl DecisionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionLabel::StrongHire => "STRONG HIRE",
            DecisionLabel::HireWithCaution => "HIRE WITH CAUTION",
            DecisionLabel::ProceedToInterview => "PROCEED TO INTERVIEW",
            DecisionLabel::Hold => "HOLD",
            DecisionLabel::Reject => "REJECT",
        }
    }

    /// Maps free text onto the label set. Anything unrecognisable is `Hold`.
    pub fn parse_lenient(text: &str) -> Self {
        let normalized = text.to_uppercase().replace(['_', '-'], " ");
        if normalized.contains("STRONG") {
            DecisionLabel::StrongHire
        } else if normalized.contains("CAUTION") {
            DecisionLabel::HireWithCaution
        } else if normalized.contains("INTERVIEW") {
            DecisionLabel::ProceedToInterview
        } else if normalized.contains("REJECT") {
            DecisionLabel::Reject
        } else if normalized.contains("HOLD") {
            DecisionLabel::Hold
        } else if normalized.contains("HIRE") {
            DecisionLabel::HireWithCaution
        } else {
            DecisionLabel::Hold
        }
    }
}

impl<'de> Deserialize<'de> for DecisionLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(DecisionLabel::parse_lenient(&text))
    }
}

impl fmt::Display for DecisionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieved chunk echoed back for UI transparency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCitation {
    pub repo: String,
    pub kind: String,
    pub snippet: String,
}

// ────────────────────────────────────────────────────────────────────────────
// serde helpers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
    Null(()),
}

/// List fields accept `"text"`, `["a", "b"]`, or `null`.
pub fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

/// Scores accept ints or floats and are clamped to 0..=100.
pub fn score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(clamp_score(value))
}

pub fn clamp_score(value: f64) -> u32 {
    if value.is_nan() {
        0
    } else {
        value.clamp(0.0, 100.0) as u32
    }
}

// ────────────────────────────────────────────────────────────────────────────
// List hygiene
// ────────────────────────────────────────────────────────────────────────────

/// Drops blank entries, trims the rest, and caps the list length.
pub fn tidy(list: &mut Vec<String>, cap: usize) {
    list.retain(|s| !s.trim().is_empty());
    for item in list.iter_mut() {
        *item = item.trim().to_string();
    }
    list.truncate(cap);
}

/// Appends fillers (skipping ones already present) until the list holds `min` entries.
pub fn pad_to(list: &mut Vec<String>, min: usize, fillers: &[&str]) {
    for filler in fillers {
        if list.len() >= min {
            return;
        }
        if !list.iter().any(|s| s == filler) {
            list.push(filler.to_string());
        }
    }
}
