//! Router - maps source file identifiers to destination streams
//!
//! Lookups are memoized per file identifier for the life of the process.
//! The cache is never invalidated or evicted: it assumes the number of
//! distinct source files is bounded. Patterns added after a file was first
//! routed do not change that file's cached route.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use contracts::{ContractError, FilePattern, StreamId};
use tracing::debug;

/// Pattern-based fan-out table with a memoized route cache
#[derive(Debug, Default)]
pub struct Router {
    patterns: BTreeMap<StreamId, Vec<FilePattern>>,
    cache: HashMap<String, BTreeSet<StreamId>>,
    evaluations: u64,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `patterns` and add them to `stream`'s pattern set.
    ///
    /// Repeated calls accumulate. Nothing is added if any pattern fails to
    /// compile.
    pub fn add_patterns<I, P>(
        &mut self,
        stream: impl Into<StreamId>,
        patterns: I,
    ) -> Result<(), ContractError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let compiled = patterns
            .into_iter()
            .map(|raw| FilePattern::compile(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let stream = stream.into();
        debug!(stream = %stream, added = compiled.len(), "Registered file patterns");
        self.patterns.entry(stream).or_default().extend(compiled);
        Ok(())
    }

    /// Streams whose patterns match `file_id`.
    ///
    /// The first call for a given identifier evaluates every pattern and
    /// caches the union; later calls return the cached set untouched. An
    /// empty set means lines from this file are dropped.
    pub fn route(&mut self, file_id: &str) -> &BTreeSet<StreamId> {
        if !self.cache.contains_key(file_id) {
            let matched = self.evaluate(file_id);
            debug!(file_id, streams = ?matched, "Route resolved");
            self.cache.insert(file_id.to_string(), matched);
        }
        &self.cache[file_id]
    }

    /// Number of file identifiers routed so far
    pub fn cached_routes(&self) -> usize {
        self.cache.len()
    }

    /// Number of full pattern evaluations (cache misses)
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Registered streams
    pub fn streams(&self) -> impl Iterator<Item = &StreamId> {
        self.patterns.keys()
    }

    fn evaluate(&mut self, file_id: &str) -> BTreeSet<StreamId> {
        self.evaluations += 1;
        self.patterns
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|p| p.matches(file_id)))
            .map(|(stream, _)| stream.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &BTreeSet<StreamId>) -> Vec<&str> {
        set.iter().map(StreamId::as_str).collect()
    }

    #[test]
    fn test_fan_out_to_multiple_streams() {
        let mut router = Router::new();
        router.add_patterns("A", ["*.log"]).unwrap();
        router.add_patterns("B", ["app-*.log"]).unwrap();

        assert_eq!(names(router.route("app-1.log")), vec!["A", "B"]);
        assert_eq!(names(router.route("web-1.log")), vec!["A"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let mut router = Router::new();
        router.add_patterns("A", ["*.log"]).unwrap();
        assert!(router.route("notes.txt").is_empty());
        // Unmatched files are cached too
        assert_eq!(router.cached_routes(), 1);
    }

    #[test]
    fn test_route_is_memoized() {
        let mut router = Router::new();
        router.add_patterns("A", ["*.log"]).unwrap();

        let first = router.route("x.log").clone();
        let second = router.route("x.log").clone();
        let third = router.route("x.log").clone();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(router.evaluations(), 1);

        router.route("y.log");
        assert_eq!(router.evaluations(), 2);
    }

    #[test]
    fn test_patterns_accumulate() {
        let mut router = Router::new();
        router.add_patterns("A", ["*.log"]).unwrap();
        router.add_patterns("A", ["*.txt"]).unwrap();

        assert_eq!(names(router.route("a.log")), vec!["A"]);
        assert_eq!(names(router.route("a.txt")), vec!["A"]);
        assert_eq!(router.streams().count(), 1);
    }

    #[test]
    fn test_cache_not_invalidated_by_new_patterns() {
        let mut router = Router::new();
        router.add_patterns("A", ["*.log"]).unwrap();
        assert_eq!(names(router.route("a.log")), vec!["A"]);

        router.add_patterns("B", ["a.*"]).unwrap();
        assert_eq!(names(router.route("a.log")), vec!["A"]);
        assert_eq!(names(router.route("a.txt")), vec!["B"]);
    }

    #[test]
    fn test_invalid_pattern_adds_nothing() {
        let mut router = Router::new();
        let result = router.add_patterns("A", ["*.log", "regex:("]);
        assert!(result.is_err());
        assert!(router.route("x.log").is_empty());
    }

    #[test]
    fn test_regex_patterns() {
        let mut router = Router::new();
        router.add_patterns("json", [r"regex:\.json$"]).unwrap();
        assert_eq!(names(router.route("/var/log/app/events.json")), vec!["json"]);
        assert!(router.route("/var/log/app/events.json.1").is_empty());
    }
}
