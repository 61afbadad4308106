//! Declarative YAML feature files
//!
//! ```yaml
//! feature: Products API
//! tags: [api]
//! scenarios:
//!   - name: Retrieve product details
//!     tags: [smoke]
//!     steps:
//!       - Given Product API is available
//!       - When Request product details by stored product ID
//!       - Then API response status is 200
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// A feature file: a titled group of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSpec {
    #[serde(alias = "name")]
    pub feature: String,

    #[serde(default)]
    pub description: String,

    /// Tags inherited by every scenario in the feature
    #[serde(default)]
    pub tags: Vec<String>,

    pub scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyword {
    Given,
    When,
    Then,
    And,
    But,
    /// `*` bullet
    Star,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Given => "Given",
            Keyword::When => "When",
            Keyword::Then => "Then",
            Keyword::And => "And",
            Keyword::But => "But",
            Keyword::Star => "*",
        }
    }

    fn parse(word: &str) -> Option<Self> {
        match word {
            "Given" => Some(Keyword::Given),
            "When" => Some(Keyword::When),
            "Then" => Some(Keyword::Then),
            "And" => Some(Keyword::And),
            "But" => Some(Keyword::But),
            "*" => Some(Keyword::Star),
            _ => None,
        }
    }
}

/// One step line, written as `"<Keyword> <text>"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepSpec {
    pub keyword: Keyword,
    pub text: String,
}

impl StepSpec {
    pub fn parse(line: &str) -> E2eResult<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let keyword = Keyword::parse(word).ok_or_else(|| {
            E2eError::SpecParse(format!("Step must start with Given/When/Then/And/But: '{}'", line))
        })?;
        let text = rest.trim();
        if text.is_empty() {
            return Err(E2eError::SpecParse(format!("Step has no text: '{}'", line)));
        }
        Ok(Self {
            keyword,
            text: text.to_string(),
        })
    }
}

impl TryFrom<String> for StepSpec {
    type Error = E2eError;

    fn try_from(line: String) -> E2eResult<Self> {
        Self::parse(&line)
    }
}

impl From<StepSpec> for String {
    fn from(step: StepSpec) -> Self {
        step.to_string()
    }
}

impl fmt::Display for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword.as_str(), self.text)
    }
}

/// A scenario ready to run, with feature tags merged in
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioCase {
    pub feature: String,
    pub name: String,
    pub tags: Vec<String>,
    pub steps: Vec<StepSpec>,
}

impl ScenarioCase {
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = normalize_tag(tag);
        self.tags.iter().any(|t| normalize_tag(t) == tag)
    }
}

fn normalize_tag(tag: &str) -> &str {
    tag.trim().trim_start_matches('@')
}

impl FeatureSpec {
    /// Parse a feature from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let feature: Self = serde_yaml::from_str(yaml)?;
        if let Some(empty) = feature.scenarios.iter().find(|s| s.steps.is_empty()) {
            return Err(E2eError::SpecParse(format!(
                "Scenario '{}' has no steps",
                empty.name
            )));
        }
        Ok(feature)
    }

    /// Parse a feature from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load every feature file under a directory, in path order
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::SpecParse(format!(
                "Feature directory not found: {}",
                dir.display()
            )));
        }

        let mut features = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            features.push(Self::from_file(entry.path())?);
        }

        Ok(features)
    }

    /// Scenarios of this feature with the feature's tags merged in
    pub fn cases(&self) -> Vec<ScenarioCase> {
        self.scenarios
            .iter()
            .map(|scenario| {
                let mut tags = self.tags.clone();
                for tag in &scenario.tags {
                    if !tags.contains(tag) {
                        tags.push(tag.clone());
                    }
                }
                ScenarioCase {
                    feature: self.feature.clone(),
                    name: scenario.name.clone(),
                    tags,
                    steps: scenario.steps.clone(),
                }
            })
            .collect()
    }

    /// Every scenario of every feature
    pub fn all_cases(features: &[Self]) -> Vec<ScenarioCase> {
        features.iter().flat_map(Self::cases).collect()
    }

    /// Scenarios carrying `tag`, directly or through their feature
    pub fn filter_by_tag(features: &[Self], tag: &str) -> Vec<ScenarioCase> {
        Self::all_cases(features)
            .into_iter()
            .filter(|case| case.has_tag(tag))
            .collect()
    }
}
