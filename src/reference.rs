//! Mapping from request path and query to an upstream artifact reference

use std::fmt;

/// Archive suffixes the gateway answers for
pub const ARCHIVE_SUFFIXES: [&str; 2] = [".tgz", ".tar.gz"];

pub const DEFAULT_TAG: &str = "latest";

/// How the artifact version is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(String),
    Digest(String),
}

impl Selector {
    /// `sha` wins whenever it is non-empty; otherwise `tag`, falling back to
    /// `latest`. Values are not validated here.
    pub fn from_params(tag: Option<&str>, sha: Option<&str>) -> Self {
        match (tag.filter(|t| !t.is_empty()), sha.filter(|s| !s.is_empty())) {
            (_, Some(sha)) => Selector::Digest(sha.to_string()),
            (Some(tag), None) => Selector::Tag(tag.to_string()),
            (None, None) => Selector::Tag(DEFAULT_TAG.to_string()),
        }
    }

    /// Reads the first `tag` and `sha` values from a raw query string.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut tag = None;
        let mut sha = None;

        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "tag" if tag.is_none() => tag = Some(value.into_owned()),
                "sha" if sha.is_none() => sha = Some(value.into_owned()),
                _ => {}
            }
        }

        Self::from_params(tag.as_deref(), sha.as_deref())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Tag(tag) => write!(f, ":{}", tag),
            Selector::Digest(sha) => write!(f, "@sha:{}", sha),
        }
    }
}

/// Returns the path without its archive suffix, or `None` if the path does
/// not name an archive. Only the matched suffix is removed.
pub fn strip_archive_suffix(path: &str) -> Option<&str> {
    ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| path.strip_suffix(suffix))
}

/// Fully-qualified reference: `{upstream}{path}:{tag}` or
/// `{upstream}{path}@sha:{digest}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    pub upstream: String,
    pub path: String,
    pub selector: Selector,
}

impl ArtifactReference {
    pub fn new(upstream: &str, path: &str, selector: Selector) -> Self {
        Self {
            upstream: upstream.to_string(),
            path: path.to_string(),
            selector,
        }
    }

    /// Builds the reference for a request, or `None` if the path does not
    /// percent-decode to UTF-8 or carries no recognised archive suffix.
    pub fn from_request(upstream: &str, path: &str, query: Option<&str>) -> Option<Self> {
        let decoded = urlencoding::decode(path).ok()?;
        let stripped = strip_archive_suffix(&decoded)?;
        Some(Self::new(upstream, stripped, Selector::from_query(query)))
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.upstream, self.path, self.selector)
    }
}
