//! Extension fallback resolution.
//!
//! # Responsibilities
//! - Decide which upstream paths to try for an identifier, in order
//! - Keep the site's extension-priority policy in one place
//!
//! # Design Decisions
//! - Qualified identifiers (nested path or known image suffix) map to
//!   exactly one candidate: themselves
//! - Bare identifiers get one candidate per configured extension
//! - Candidates are produced lazily; callers stop at the first success

use std::fmt;

use crate::config::ResolverConfig;
use crate::relay::identifier::Identifier;

/// One upstream path hypothesis derived from an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidatePath(String);

impl CandidatePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CandidatePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encodes the extension-priority policy.
#[derive(Debug, Clone)]
pub struct ExtensionResolver {
    extensions: Vec<String>,
    recognized_suffixes: Vec<String>,
}

impl ExtensionResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            recognized_suffixes: config.recognized_suffixes.clone(),
        }
    }

    /// Whether `id` is used as-is instead of being extended.
    pub fn is_qualified(&self, id: &Identifier) -> bool {
        id.has_separator()
            || self
                .recognized_suffixes
                .iter()
                .any(|suffix| id.as_str().ends_with(suffix.as_str()))
    }

    /// Ordered candidate paths for `id`.
    ///
    /// The returned iterator is cheap to recreate; call `resolve` again to
    /// restart from the highest-priority candidate.
    pub fn resolve<'a>(&'a self, id: &'a Identifier) -> Candidates<'a> {
        let mode = if self.is_qualified(id) {
            Mode::Exact { done: false }
        } else {
            Mode::Extended {
                extensions: self.extensions.iter(),
            }
        };
        Candidates { id, mode }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for ExtensionResolver {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

/// Lazy, finite sequence of candidate paths.
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    id: &'a Identifier,
    mode: Mode<'a>,
}

#[derive(Debug, Clone)]
enum Mode<'a> {
    Exact { done: bool },
    Extended { extensions: std::slice::Iter<'a, String> },
}

impl Iterator for Candidates<'_> {
    type Item = CandidatePath;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.mode {
            Mode::Exact { done } => {
                if *done {
                    return None;
                }
                *done = true;
                Some(CandidatePath(self.id.as_str().to_string()))
            }
            Mode::Extended { extensions } => extensions
                .next()
                .map(|ext| CandidatePath(format!("{}{}", self.id, ext))),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match &self.mode {
            Mode::Exact { done } => usize::from(!*done),
            Mode::Extended { extensions } => extensions.len(),
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Candidates<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(resolver: &ExtensionResolver, raw: &str) -> Vec<String> {
        let id = Identifier::parse(raw).unwrap();
        resolver.resolve(&id).map(|c| c.to_string()).collect()
    }

    #[test]
    fn bare_id_gets_every_extension_in_order() {
        let resolver = ExtensionResolver::default();
        assert_eq!(
            paths(&resolver, "cat"),
            vec!["cat.webp", "cat.png", "cat.jpg"]
        );
    }

    #[test]
    fn recognized_suffix_is_used_as_is() {
        let resolver = ExtensionResolver::default();
        for raw in ["cat.webp", "cat.png", "cat.jpg", "cat.jpeg"] {
            assert_eq!(paths(&resolver, raw), vec![raw]);
        }
    }

    #[test]
    fn nested_path_is_used_as_is() {
        let resolver = ExtensionResolver::default();
        assert_eq!(paths(&resolver, "albums/cat"), vec!["albums/cat"]);
    }

    #[test]
    fn suffix_match_is_case_sensitive() {
        let resolver = ExtensionResolver::default();
        assert_eq!(
            paths(&resolver, "cat.PNG"),
            vec!["cat.PNG.webp", "cat.PNG.png", "cat.PNG.jpg"]
        );
    }

    #[test]
    fn unrelated_dot_still_extends() {
        let resolver = ExtensionResolver::default();
        assert_eq!(paths(&resolver, "v1.2").len(), 3);
    }

    #[test]
    fn optional_jpeg_candidate() {
        let config = ResolverConfig {
            extensions: vec![".webp".into(), ".png".into(), ".jpg".into(), ".jpeg".into()],
            ..ResolverConfig::default()
        };
        let resolver = ExtensionResolver::new(&config);
        assert_eq!(paths(&resolver, "cat").last().unwrap(), "cat.jpeg");
    }

    #[test]
    fn sequence_is_lazy_and_restartable() {
        let resolver = ExtensionResolver::default();
        let id = Identifier::parse("dog").unwrap();

        let mut first = resolver.resolve(&id);
        assert_eq!(first.len(), 3);
        assert_eq!(first.next().unwrap().as_str(), "dog.webp");
        assert_eq!(first.len(), 2);

        let mut again = resolver.resolve(&id);
        assert_eq!(again.next().unwrap().as_str(), "dog.webp");

        let qualified = Identifier::parse("dog.png").unwrap();
        let mut exact = resolver.resolve(&qualified).collect::<Vec<_>>();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact.pop().unwrap().as_str(), "dog.png");
    }
}
