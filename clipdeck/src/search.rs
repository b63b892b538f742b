//! Hybrid search orchestration state
//!
//! The fuzzy ranker always runs locally. When the external backend is
//! available and the query is long enough, keyword and then semantic id sets
//! are requested in the background; this module decides which tiers a query
//! needs, tracks which results are valid for which query, and merges them
//! behind the fuzzy hits.

use crate::interface::{ClipboardEntry, EntryKind};
use crate::ranking;
use std::collections::HashSet;

/// Default minimum normalized query length (chars) for keyword search
pub const KEYWORD_MIN_CHARS: usize = 3;
/// Default minimum normalized query length (chars) for semantic search
pub const SEMANTIC_MIN_CHARS: usize = 5;

/// Trim and lowercase a raw query
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Length gates for the two backend tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchThresholds {
    pub keyword_min_chars: usize,
    pub semantic_min_chars: usize,
}

impl Default for SearchThresholds {
    fn default() -> Self {
        Self {
            keyword_min_chars: KEYWORD_MIN_CHARS,
            semantic_min_chars: SEMANTIC_MIN_CHARS,
        }
    }
}

impl SearchThresholds {
    pub fn should_run_keyword(&self, normalized_query: &str) -> bool {
        normalized_query.chars().count() >= self.keyword_min_chars
    }

    pub fn should_run_semantic(&self, normalized_query: &str) -> bool {
        normalized_query.chars().count() >= self.semantic_min_chars
    }
}

/// Backend tier of an asynchronous search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchTier {
    Keyword,
    Semantic,
}

/// Which backend tiers a query schedules. Neither means fuzzy-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchPlan {
    pub keyword: bool,
    pub semantic: bool,
}

impl SearchPlan {
    pub fn for_query(
        normalized_query: &str,
        backend_available: bool,
        thresholds: &SearchThresholds,
    ) -> Self {
        if !backend_available || normalized_query.is_empty() {
            return Self::default();
        }
        let keyword = thresholds.should_run_keyword(normalized_query);
        Self {
            keyword,
            semantic: keyword && thresholds.should_run_semantic(normalized_query),
        }
    }

    pub fn is_fuzzy_only(&self) -> bool {
        !self.keyword && !self.semantic
    }

    pub fn includes(&self, tier: SearchTier) -> bool {
        match tier {
            SearchTier::Keyword => self.keyword,
            SearchTier::Semantic => self.semantic,
        }
    }
}

/// Backend id sets and the normalized query they were computed for.
/// `None` sets are not yet resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub result_query: String,
    pub keyword_ids: Option<HashSet<String>>,
    pub semantic_ids: Option<HashSet<String>>,
}

impl SearchState {
    /// Forget all results and mark the state as belonging to `normalized_query`
    pub fn reset(&mut self, normalized_query: &str) {
        self.result_query = normalized_query.to_string();
        self.keyword_ids = None;
        self.semantic_ids = None;
    }

    /// Record a completed backend search.
    ///
    /// Results for a query other than `live_query` are dropped and `false` is
    /// returned. A result for a new query clears sets left over from the old one.
    pub fn resolve(
        &mut self,
        live_query: &str,
        tier: SearchTier,
        query: &str,
        ids: HashSet<String>,
    ) -> bool {
        if query != live_query {
            return false;
        }
        if self.result_query != query {
            self.reset(query);
        }
        match tier {
            SearchTier::Keyword => self.keyword_ids = Some(ids),
            SearchTier::Semantic => self.semantic_ids = Some(ids),
        }
        true
    }

    fn resolved_for(&self, live_query: &str, tier: SearchTier) -> bool {
        if self.result_query != live_query {
            return false;
        }
        match tier {
            SearchTier::Keyword => self.keyword_ids.is_some(),
            SearchTier::Semantic => self.semantic_ids.is_some(),
        }
    }

    /// True while a scheduled tier for `live_query` has not resolved
    pub fn in_progress(&self, live_query: &str, plan: &SearchPlan) -> bool {
        [SearchTier::Keyword, SearchTier::Semantic]
            .into_iter()
            .any(|tier| plan.includes(tier) && !self.resolved_for(live_query, tier))
    }

    /// Union of both id sets, only when they are valid for `live_query`
    fn backend_ids(&self, live_query: &str) -> HashSet<&str> {
        if self.result_query != live_query {
            return HashSet::new();
        }
        self.keyword_ids
            .iter()
            .chain(self.semantic_ids.iter())
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// Fuzzy-ranked hits first, then backend-only hits in list order.
///
/// Backend ids are only used when `state.result_query` equals the normalized
/// form of `query`, so results for a superseded query never surface.
pub fn merge<'a>(
    entries: &'a [ClipboardEntry],
    query: &str,
    filter: EntryKind,
    state: &SearchState,
) -> Vec<&'a ClipboardEntry> {
    let normalized = normalize_query(query);
    let mut merged = ranking::rank(entries, &normalized, filter);
    if normalized.is_empty() {
        return merged;
    }

    let backend_ids = state.backend_ids(&normalized);
    if backend_ids.is_empty() {
        return merged;
    }

    let mut seen: HashSet<&str> = merged.iter().map(|e| e.id.as_str()).collect();
    for entry in entries.iter().filter(|e| filter.admits(e.kind)) {
        if backend_ids.contains(entry.id.as_str()) && seen.insert(entry.id.as_str()) {
            merged.push(entry);
        }
    }

    merged
}
