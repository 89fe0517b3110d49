//! Sidecar core types: annotation sets, target selectors, and the error taxonomy
//! shared by the annotate engine and the CLI.

#![forbid(unsafe_code)]

pub mod keys;

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Fatal error kinds of an annotate run. None of them is recoverable per document:
/// the first error aborts the whole stream.
#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    /// Unreadable source, or a non-2xx HTTP response.
    #[error("input: {0}")]
    Input(String),
    /// A document could not be framed or parsed at the type-descriptor level.
    #[error("decode{}: {message}", at(.doc))]
    Decode { doc: Option<usize>, message: String },
    /// Invalid selector combination.
    #[error("configuration: {0}")]
    Configuration(String),
    /// The insertion path is not addressable, or the patch was rejected.
    #[error("patch{}: {message}", at(.doc))]
    Patch { doc: Option<usize>, message: String },
    /// Re-encoding a patched document failed. Internal defect, not user error.
    #[error("encode{}: {message}", at(.doc))]
    Encode { doc: Option<usize>, message: String },
}

fn at(doc: &Option<usize>) -> String {
    match doc {
        Some(n) => format!(" (document {})", n),
        None => String::new(),
    }
}

impl AnnotateError {
    pub fn input(msg: impl Into<String>) -> Self { Self::Input(msg.into()) }
    pub fn decode(msg: impl Into<String>) -> Self { Self::Decode { doc: None, message: msg.into() } }
    pub fn patch(msg: impl Into<String>) -> Self { Self::Patch { doc: None, message: msg.into() } }
    pub fn encode(msg: impl Into<String>) -> Self { Self::Encode { doc: None, message: msg.into() } }

    /// Attach the 1-based document ordinal, unless one is already recorded.
    pub fn at_document(self, n: usize) -> Self {
        match self {
            Self::Decode { doc: None, message } => Self::Decode { doc: Some(n), message },
            Self::Patch { doc: None, message } => Self::Patch { doc: Some(n), message },
            Self::Encode { doc: None, message } => Self::Encode { doc: Some(n), message },
            other => other,
        }
    }

    /// Short stable label, used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Decode { .. } => "decode",
            Self::Configuration(_) => "configuration",
            Self::Patch { .. } => "patch",
            Self::Encode { .. } => "encode",
        }
    }
}

pub type Result<T, E = AnnotateError> = std::result::Result<T, E>;

/// Ordered annotation key/value pairs. Values are always strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSet(SmallVec<[(String, String); 16]>);

impl AnnotationSet {
    pub fn new() -> Self { Self::default() }

    /// A set holding only `enabled: "true"`.
    pub fn enabled() -> Self {
        let mut set = Self::new();
        set.insert(keys::ENABLED, "true");
        set
    }

    /// Insert or overwrite `key`. An overwritten key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Insert the `Display` rendering of `value` when present; `None` inserts nothing.
    pub fn insert_opt<T: fmt::Display>(&mut self, key: &str, value: Option<T>) {
        if let Some(v) = value {
            self.insert(key, v.to_string());
        }
    }

    /// Force `enabled: "true"` to the front of the set.
    pub fn ensure_enabled(mut self) -> Self {
        self.0.retain(|(k, _)| k != keys::ENABLED);
        self.0.insert(0, (keys::ENABLED.to_string(), "true".to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool { self.get(key).is_some() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Which single resource of a run receives the annotation set.
///
/// An empty or absent `resource` means "the first eligible candidate".
/// A namespace is only meaningful together with a resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelector {
    pub resource: Option<String>,
    pub namespace: Option<String>,
}

impl TargetSelector {
    pub fn any() -> Self { Self::default() }

    pub fn named(resource: impl Into<String>) -> Self {
        Self { resource: Some(resource.into()), namespace: None }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref().filter(|s| !s.is_empty())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace().is_some() && self.resource().is_none() {
            return Err(AnnotateError::Configuration(
                "a target namespace requires a target resource name".into(),
            ));
        }
        Ok(())
    }
}

/// Identity of a workload resource found in a manifest stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceRef {
    pub const DEFAULT_NAMESPACE: &'static str = "default";

    /// Namespace with the cluster default applied.
    pub fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().filter(|s| !s.is_empty()).unwrap_or(Self::DEFAULT_NAMESPACE)
    }

    /// `{namespace}-{kind}-{name}`, kind lower-cased.
    pub fn default_app_id(&self) -> String {
        format!("{}-{}-{}", self.namespace_or_default(), self.kind.to_ascii_lowercase(), self.name)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace_or_default(), self.name)
    }
}

pub mod prelude {
    pub use super::{AnnotateError, AnnotationSet, ResourceRef, Result, TargetSelector};
    pub use super::keys;
}
