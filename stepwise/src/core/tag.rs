//! Classification tags and the providers that supply them.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A `(name, type)` classification label, e.g. `("Login", "feature")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    /// The tag's value.
    pub name: String,
    /// The tag's category (`feature`, `capability`, `story`, ...).
    #[serde(rename = "type")]
    pub tag_type: String,
}

impl Tag {
    /// Creates a new tag.
    #[must_use]
    pub fn new(name: impl Into<String>, tag_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag_type: tag_type.into(),
        }
    }

    /// Parses `type:name`. A bare value is treated as a `tag` typed tag.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.split_once(':') {
            Some((tag_type, name)) => Self::new(name.trim(), tag_type.trim()),
            None => Self::new(value.trim(), "tag"),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag_type, self.name)
    }
}

/// Identifies a test to a tag provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestIdentity {
    /// The test method or scenario name.
    pub name: String,
    /// The suite or class the test belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    /// Source path of the test, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl TestIdentity {
    /// Creates an identity from a test name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the suite.
    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    /// Sets the source path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Supplies tags for a test. Called by the runner before `test_started`.
pub trait TagProvider: Send + Sync {
    /// Returns the tags for `identity`.
    fn tags_for(&self, identity: &TestIdentity) -> Vec<Tag>;
}

/// A provider backed by fixed per-test and per-suite tables.
#[derive(Debug, Clone, Default)]
pub struct StaticTagProvider {
    by_test: HashMap<String, Vec<Tag>>,
    by_suite: HashMap<String, Vec<Tag>>,
}

impl StaticTagProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag for a test name.
    #[must_use]
    pub fn with_test_tag(mut self, test: impl Into<String>, tag: Tag) -> Self {
        self.by_test.entry(test.into()).or_default().push(tag);
        self
    }

    /// Adds a tag applied to every test of a suite.
    #[must_use]
    pub fn with_suite_tag(mut self, suite: impl Into<String>, tag: Tag) -> Self {
        self.by_suite.entry(suite.into()).or_default().push(tag);
        self
    }
}

impl TagProvider for StaticTagProvider {
    fn tags_for(&self, identity: &TestIdentity) -> Vec<Tag> {
        let suite_tags = identity
            .suite
            .as_ref()
            .and_then(|suite| self.by_suite.get(suite))
            .into_iter()
            .flatten();
        let test_tags = self.by_test.get(&identity.name).into_iter().flatten();
        suite_tags.chain(test_tags).cloned().collect()
    }
}

/// Merges the tags of several providers, keeping first-seen order and
/// dropping duplicates.
pub fn collect_tags<'a, I>(providers: I, identity: &TestIdentity) -> Vec<Tag>
where
    I: IntoIterator<Item = &'a dyn TagProvider>,
{
    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for provider in providers {
        for tag in provider.tags_for(identity) {
            if seen.insert(tag.clone()) {
                tags.push(tag);
            }
        }
    }
    tags
}
