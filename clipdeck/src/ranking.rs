//! Fuzzy ranking for clipboard entries.
//!
//! Every whitespace-delimited query token must match the entry's searchable
//! text (logical AND). A token scores high when it occurs as an exact
//! substring, earlier occurrences scoring higher; otherwise it may match as an
//! in-order subsequence with a score that decays with the number of skipped
//! characters. Entries missing any token are excluded.

use crate::interface::{ClipboardEntry, EntryKind};
use crate::search::normalize_query;

/// Floor score for an exact substring match
const EXACT_BASE: i64 = 250;
/// Extra points for an exact match at offset 0, minus one per char of offset
const EXACT_POSITION_BONUS: i64 = 120;
/// Score for a gapless subsequence match
const SUBSEQUENCE_BASE: i64 = 140;
/// Gap count beyond which the subsequence score stops dropping
const MAX_GAP_PENALTY: i64 = 120;
/// Flat boost applied to image entries after token scoring
const IMAGE_BONUS: i64 = 15;

/// How a single query token matched the haystack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenMatch {
    /// Substring found starting at this char offset
    Exact { offset: usize },
    /// Chars found in order with this many skipped haystack chars
    Subsequence { gaps: usize },
}

impl TokenMatch {
    fn score(self) -> i64 {
        match self {
            TokenMatch::Exact { offset } => {
                let offset = i64::try_from(offset).unwrap_or(i64::MAX);
                EXACT_BASE + (EXACT_POSITION_BONUS - offset).max(0)
            }
            TokenMatch::Subsequence { gaps } => {
                let gaps = i64::try_from(gaps).unwrap_or(i64::MAX);
                (SUBSEQUENCE_BASE - gaps.min(MAX_GAP_PENALTY)).max(1)
            }
        }
    }
}

/// Match one lowercase token against a lowercase haystack.
/// Exact substring is tried first; subsequence only as a fallback.
pub(crate) fn match_token(token: &str, haystack: &str) -> Option<TokenMatch> {
    if token.is_empty() {
        return None;
    }
    if let Some(byte_idx) = haystack.find(token) {
        let offset = haystack[..byte_idx].chars().count();
        return Some(TokenMatch::Exact { offset });
    }
    subsequence_gaps(token, haystack).map(|gaps| TokenMatch::Subsequence { gaps })
}

/// Check if all chars of `token` appear in order in `haystack`.
/// Returns the number of haystack chars skipped before each matched char.
fn subsequence_gaps(token: &str, haystack: &str) -> Option<usize> {
    let mut hay = haystack.chars();
    let mut gaps = 0usize;

    for tc in token.chars() {
        loop {
            match hay.next() {
                Some(hc) if hc == tc => break,
                Some(_) => gaps += 1,
                None => return None,
            }
        }
    }

    Some(gaps)
}

/// Score an entry against an already-normalized query.
/// `None` means at least one token did not match (or the query has no tokens).
pub fn score(entry: &ClipboardEntry, normalized_query: &str) -> Option<i64> {
    score_haystack(&entry.searchable_text(), normalized_query, entry.is_image())
}

fn score_haystack(haystack: &str, normalized_query: &str, is_image: bool) -> Option<i64> {
    let mut tokens = normalized_query.split_whitespace().peekable();
    tokens.peek()?;

    let mut total = 0i64;
    for token in tokens {
        total += match_token(token, haystack)?.score();
    }

    if is_image {
        total += IMAGE_BONUS;
    }
    Some(total)
}

/// Filter by kind, then order by descending score with newer captures first
/// on ties. An empty query returns the filtered entries in list order.
pub fn rank<'a>(
    entries: &'a [ClipboardEntry],
    query: &str,
    filter: EntryKind,
) -> Vec<&'a ClipboardEntry> {
    let base = entries.iter().filter(|e| filter.admits(e.kind));
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return base.collect();
    }

    let mut scored: Vec<(&ClipboardEntry, i64)> = base
        .filter_map(|entry| score(entry, &normalized).map(|s| (entry, s)))
        .collect();

    // Stable: remaining ties keep list order
    scored.sort_by(|(a, sa), (b, sb)| {
        sb.cmp(sa)
            .then_with(|| b.captured_at_ms.cmp(&a.captured_at_ms))
    });

    scored.into_iter().map(|(entry, _)| entry).collect()
}
