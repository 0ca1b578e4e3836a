//! Access policies and equality label selectors
//!
//! An `AccessPolicy` lists namespace selectors. A selector matches a namespace
//! when every one of its `matchLabels` pairs is present on the namespace; the
//! policy grants access when any selector matches.
//!
//! ```yaml
//! namespaceSelectors:
//!   - matchLabels:
//!       tenant: team-a
//!   - matchLabels:
//!       shared: "true"
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Maximum length of a label name or value
const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a label key prefix (DNS subdomain)
const MAX_PREFIX_LENGTH: usize = 253;

static LABEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("static regex is valid")
});

static DNS_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("static regex is valid")
});

/// Access control list attached to a referenced object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
    /// Selectors evaluated in order; any match grants access
    #[serde(default)]
    pub namespace_selectors: Vec<NamespaceSelector>,
}

impl AccessPolicy {
    /// Policy granting access to namespaces matching any of the given label sets
    pub fn from_selectors<I>(selectors: I) -> Self
    where
        I: IntoIterator<Item = BTreeMap<String, String>>,
    {
        Self {
            namespace_selectors: selectors
                .into_iter()
                .map(|match_labels| NamespaceSelector { match_labels })
                .collect(),
        }
    }

    /// Parse a policy from YAML
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Equality selector over namespace labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

impl NamespaceSelector {
    /// Build the validated matcher for this selector
    pub fn matcher(&self) -> Result<LabelMatcher, SelectorError> {
        LabelMatcher::from_match_labels(&self.match_labels)
    }
}

/// Malformed selector criteria
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("invalid label key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid label value '{value}' for key '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Validated set of `key == value` requirements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMatcher {
    requirements: Vec<(String, String)>,
}

impl LabelMatcher {
    /// Build a matcher, validating every key and value
    pub fn from_match_labels(
        match_labels: &BTreeMap<String, String>,
    ) -> Result<Self, SelectorError> {
        let mut requirements = Vec::with_capacity(match_labels.len());

        for (key, value) in match_labels {
            validate_key(key)?;
            validate_value(key, value)?;
            requirements.push((key.clone(), value.clone()));
        }

        Ok(Self { requirements })
    }

    /// An empty matcher selects everything
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Check whether every requirement holds on `labels`
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

fn validate_key(key: &str) -> Result<(), SelectorError> {
    let invalid = |reason: String| SelectorError::InvalidKey {
        key: key.to_string(),
        reason,
    };

    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty() {
                return Err(invalid("prefix part must be non-empty".to_string()));
            }
            if prefix.len() > MAX_PREFIX_LENGTH {
                return Err(invalid(format!(
                    "prefix part must be no more than {} characters",
                    MAX_PREFIX_LENGTH
                )));
            }
            if !DNS_SUBDOMAIN.is_match(prefix) {
                return Err(invalid(
                    "prefix part must be a lowercase DNS subdomain".to_string(),
                ));
            }
            name
        }
        None => key,
    };

    if name.is_empty() {
        return Err(invalid("name part must be non-empty".to_string()));
    }
    if name.len() > MAX_LABEL_LENGTH {
        return Err(invalid(format!(
            "name part must be no more than {} characters",
            MAX_LABEL_LENGTH
        )));
    }
    if !LABEL_NAME.is_match(name) {
        return Err(invalid(
            "name part must consist of alphanumeric characters, '-', '_' or '.', \
             and must start and end with an alphanumeric character"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<(), SelectorError> {
    if value.is_empty() {
        return Ok(());
    }

    let reason = if value.len() > MAX_LABEL_LENGTH {
        format!("must be no more than {} characters", MAX_LABEL_LENGTH)
    } else if !LABEL_NAME.is_match(value) {
        "must consist of alphanumeric characters, '-', '_' or '.', \
         and must start and end with an alphanumeric character"
            .to_string()
    } else {
        return Ok(());
    };

    Err(SelectorError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    })
}
