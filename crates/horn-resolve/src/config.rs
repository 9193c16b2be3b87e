//! Knowledge-base configuration.
//!
//! Resolution planning is out of scope: the join order of a conjunction and
//! the rules applicable to a pattern are assumed given, and this module is
//! where they are given. The configuration is serde-loadable so a whole
//! knowledge base can live in one JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Page of a base-data traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub size: u64,
    #[serde(default)]
    pub offset: i64,
}

impl Pagination {
    pub const fn new(size: u64, offset: i64) -> Self {
        Self { size, offset }
    }

    /// Default page for a single pattern's base data.
    pub fn for_pattern() -> Self {
        Self::new(5, 0)
    }

    /// Default page for a rule body's own base data.
    pub fn for_rule_body() -> Self {
        Self::new(1, 0)
    }
}

/// One rule concluding a pattern: its "when" body is a conjunction of
/// patterns, resolved through a shared rule-body resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub when: Vec<i64>,
    #[serde(default = "Pagination::for_rule_body")]
    pub traversal: Pagination,
}

impl RuleConfig {
    pub fn new(when: Vec<i64>) -> Self {
        Self {
            when,
            traversal: Pagination::for_rule_body(),
        }
    }

    pub fn with_traversal(mut self, traversal: Pagination) -> Self {
        self.traversal = traversal;
        self
    }
}

/// Resolution configuration of a single pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub id: i64,
    #[serde(default = "Pagination::for_pattern")]
    pub traversal: Pagination,
    /// Rules capable of concluding this pattern.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    /// Follow-on resolution step: when set, this pattern first delegates to
    /// another pattern and only then draws base data and rules for the
    /// folded intermediate result.
    #[serde(default)]
    pub then: Option<i64>,
}

impl PatternConfig {
    pub fn base(id: i64) -> Self {
        Self {
            id,
            traversal: Pagination::for_pattern(),
            rules: Vec::new(),
            then: None,
        }
    }

    pub fn with_traversal(mut self, traversal: Pagination) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_rule(mut self, rule: RuleConfig) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_then(mut self, then: i64) -> Self {
        self.then = Some(then);
        self
    }
}

/// The whole knowledge base handed to a query execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,
}

impl KnowledgeBase {
    pub fn new(patterns: Vec<PatternConfig>) -> Self {
        Self { patterns }
    }

    /// The configuration for a pattern; unknown patterns resolve to the
    /// defaults (base data only, no rules).
    pub fn pattern(&self, id: i64) -> PatternConfig {
        self.patterns
            .iter()
            .find(|pattern| pattern.id == id)
            .cloned()
            .unwrap_or_else(|| PatternConfig::base(id))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read knowledge base {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid knowledge base {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
