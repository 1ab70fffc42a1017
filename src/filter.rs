//! Course-name filtering
//!
//! Courses returned by the listing endpoint pass through a list of rules before
//! they become crawl targets. A course is kept only if every rule agrees:
//! for each rule, "pattern found in name" must equal the rule's `include` flag.
//! Links discovered later on course pages are never filtered here; they only
//! go through the structural denylist in [`crate::parser`].

use crate::config::FilterEntry;
use crate::ConfigError;
use regex::Regex;

/// A compiled filter rule
#[derive(Debug, Clone)]
pub struct FilterRule {
    pattern: Regex,
    include: bool,
}

impl FilterRule {
    /// Compiles a rule; the pattern is a regular expression searched anywhere in the name
    pub fn new(pattern: &str, include: bool) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;
        Ok(Self { pattern, include })
    }

    /// True when this rule lets the name through
    pub fn accepts(&self, name: &str) -> bool {
        self.pattern.is_match(name) == self.include
    }
}

/// The full rule set applied to course names
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    rules: Vec<FilterRule>,
}

impl CourseFilter {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self { rules }
    }

    /// Builds the filter from configuration entries
    pub fn from_entries(entries: &[FilterEntry]) -> Result<Self, ConfigError> {
        let rules = entries
            .iter()
            .map(|entry| FilterRule::new(&entry.pattern, entry.include))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// AND over all rules; an empty rule set keeps everything
    pub fn keep(&self, name: &str) -> bool {
        self.rules.iter().all(|rule| rule.accepts(name))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
