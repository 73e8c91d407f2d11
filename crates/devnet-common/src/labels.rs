//! Label selectors for container discovery.
//!
//! A selector is a set of exact-match `key=value` pairs, ANDed together. It is
//! sent to the engine as `label` filters and can also be checked locally
//! against the labels of a listed container.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DevnetError;

/// Label naming the owner of a service container.
pub const OWNER_LABEL: &str = "service.owner";

/// Label carrying the logical service name of a container.
pub const NAME_LABEL: &str = "service.container.name";

/// Owner stamped on every service container started by the test harness.
pub const DEFAULT_OWNER: &str = "co.elastic.observability";

/// An exact-match, ANDed label filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    pairs: Vec<(String, String)>,
}

impl LabelSelector {
    /// Create an empty selector, which matches every container.
    #[must_use]
    pub const fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Selector for a service container: `service.owner` and `service.container.name`.
    #[must_use]
    pub fn service(owner: &str, name: &str) -> Self {
        Self::new().with(OWNER_LABEL, owner).with(NAME_LABEL, name)
    }

    /// Add a `key=value` requirement.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// The required pairs, in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Whether the selector has no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Whether every pair is present with exactly the same value.
    #[must_use]
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.pairs
            .iter()
            .all(|(key, value)| labels.get(key).is_some_and(|v| v == value))
    }

    /// Engine filter arguments: `{"label": ["k=v", ...]}`.
    #[must_use]
    pub fn to_filters(&self) -> HashMap<String, Vec<String>> {
        let mut filters = HashMap::new();
        if !self.pairs.is_empty() {
            filters.insert(
                "label".to_string(),
                self.pairs.iter().map(|(k, v)| format!("{k}={v}")).collect(),
            );
        }
        filters
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for LabelSelector {
    type Err = DevnetError;

    /// Parse `k=v[,k=v...]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut selector = Self::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| DevnetError::Config {
                message: format!("Invalid label '{pair}': expected key=value"),
            })?;
            if key.is_empty() {
                return Err(DevnetError::Config {
                    message: format!("Invalid label '{pair}': empty key"),
                });
            }
            selector = selector.with(key, value);
        }
        Ok(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn service_selector_filters() {
        let selector = LabelSelector::service(DEFAULT_OWNER, "mysql");
        let filters = selector.to_filters();
        assert_eq!(
            filters.get("label"),
            Some(&vec![
                "service.owner=co.elastic.observability".to_string(),
                "service.container.name=mysql".to_string(),
            ])
        );
    }

    #[test]
    fn empty_selector_has_no_filters() {
        assert!(LabelSelector::new().to_filters().is_empty());
        assert!(LabelSelector::new().matches(&HashMap::new()));
    }

    #[test]
    fn matches_requires_every_pair() {
        let selector = LabelSelector::service(DEFAULT_OWNER, "mysql");
        assert!(selector.matches(&labels(&[
            (OWNER_LABEL, DEFAULT_OWNER),
            (NAME_LABEL, "mysql"),
            ("extra", "ignored"),
        ])));
        assert!(!selector.matches(&labels(&[(OWNER_LABEL, DEFAULT_OWNER), (NAME_LABEL, "kibana")])));
        assert!(!selector.matches(&labels(&[(OWNER_LABEL, "other"), (NAME_LABEL, "mysql")])));
        assert!(!selector.matches(&labels(&[(NAME_LABEL, "mysql")])));
    }

    #[test]
    fn parse_and_display() {
        let selector: LabelSelector = "service.owner=me, service.container.name=redis"
            .parse()
            .unwrap();
        assert_eq!(selector, LabelSelector::service("me", "redis"));
        assert_eq!(
            selector.to_string(),
            "service.owner=me,service.container.name=redis"
        );
    }

    #[test]
    fn parse_rejects_malformed_pairs() {
        assert!("novalue".parse::<LabelSelector>().is_err());
        assert!("=value".parse::<LabelSelector>().is_err());
    }

    proptest! {
        #[test]
        fn matches_only_exact_values(
            owner in "[a-z.]{1,12}",
            name in "[a-z]{1,8}",
            other in "[a-z]{1,8}",
        ) {
            let selector = LabelSelector::service(&owner, &name);
            let exact = labels(&[(OWNER_LABEL, owner.as_str()), (NAME_LABEL, name.as_str())]);
            prop_assert!(selector.matches(&exact));

            let renamed = labels(&[(OWNER_LABEL, owner.as_str()), (NAME_LABEL, other.as_str())]);
            prop_assert_eq!(selector.matches(&renamed), other == name);
        }
    }
}
