// src/taxonomy.rs

//! Board taxonomy resolver.
//!
//! Holds a read-only snapshot of the boards index and resolves free-text
//! queries against it. The snapshot is built once, validated atomically,
//! and swapped whole on reload; concurrent readers only ever see a fully
//! loaded index.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{AppError, Result};
use crate::models::{BoardEntry, ResolutionCandidate};

/// Maximal score: normalized query equals the name or an alias.
const EXACT_SCORE: f64 = 1.0;
/// Substring score range: base plus a span scaled by length ratio, so a
/// near-complete containment approaches (but never reaches) exact.
const SUBSTRING_BASE: f64 = 0.5;
const SUBSTRING_SPAN: f64 = 0.4;
/// Token-overlap fallback weight; caps below any substring hit.
const TOKEN_OVERLAP_WEIGHT: f64 = 0.5;
/// Minimum score a candidate must clear to be returned at all.
const SCORE_FLOOR: f64 = 0.2;

/// Lowercase, trim, collapse internal whitespace.
fn normalize(s: &str) -> String {
    s.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Score one candidate string against the normalized query.
///
/// The best-matching rule applies alone; rules are never summed. The
/// constants are tunable heuristics; only the relative order
/// exact > substring > token-overlap is contractual.
fn score_candidate(query: &str, candidate: &str) -> f64 {
    if candidate.is_empty() {
        return 0.0;
    }
    if query == candidate {
        return EXACT_SCORE;
    }

    if query.contains(candidate) || candidate.contains(query) {
        let query_len = query.chars().count() as f64;
        let candidate_len = candidate.chars().count() as f64;
        let ratio = query_len.min(candidate_len) / query_len.max(candidate_len);
        return SUBSTRING_BASE + SUBSTRING_SPAN * ratio;
    }

    let query_tokens: HashSet<&str> = query.split(' ').collect();
    let candidate_tokens: HashSet<&str> = candidate.split(' ').collect();
    let shared = query_tokens.intersection(&candidate_tokens).count();
    if shared == 0 {
        return 0.0;
    }
    let total = query_tokens.union(&candidate_tokens).count();
    TOKEN_OVERLAP_WEIGHT * (shared as f64 / total as f64)
}

/// Immutable, fully validated taxonomy snapshot.
#[derive(Debug)]
pub struct TaxonomyIndex {
    entries: Vec<BoardEntry>,
    // Normalized (candidate, original) strings per entry: display name
    // first, then aliases.
    candidates: Vec<Vec<(String, String)>>,
    categories: Vec<String>,
}

impl TaxonomyIndex {
    /// Build and validate a snapshot. All-or-nothing: any entry missing a
    /// board id or display name rejects the whole load.
    pub fn build(entries: Vec<BoardEntry>) -> Result<Self> {
        for (i, entry) in entries.iter().enumerate() {
            if entry.board_id.trim().is_empty() {
                return Err(AppError::MalformedIndex(format!(
                    "entry {i} has an empty board_id"
                )));
            }
            if entry.display_name.trim().is_empty() {
                return Err(AppError::MalformedIndex(format!(
                    "entry {i} ({}) has an empty display_name",
                    entry.board_id
                )));
            }
        }

        let candidates = entries
            .iter()
            .map(|entry| {
                std::iter::once(&entry.display_name)
                    .chain(entry.aliases.iter())
                    .map(|s| (normalize(s), s.clone()))
                    .filter(|(n, _)| !n.is_empty())
                    .collect()
            })
            .collect();
        let categories = entries.iter().map(|e| normalize(&e.category)).collect();

        Ok(Self {
            entries,
            candidates,
            categories,
        })
    }

    pub fn entries(&self) -> &[BoardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a free-text query to at most `topk` scored candidates.
    ///
    /// An empty result is a normal outcome, not an error.
    pub fn resolve(&self, query: &str, topk: usize) -> Vec<ResolutionCandidate> {
        let needle = normalize(query);
        if needle.is_empty() || topk == 0 {
            return Vec::new();
        }

        let mut hits: Vec<ResolutionCandidate> = self
            .entries
            .iter()
            .zip(self.candidates.iter())
            .filter_map(|(entry, candidates)| {
                let best = candidates
                    .iter()
                    .map(|(normalized, original)| {
                        (score_candidate(&needle, normalized), original)
                    })
                    .max_by(|(a, _), (b, _)| a.total_cmp(b))?;
                let (score, matched) = best;
                if score < SCORE_FLOOR {
                    return None;
                }
                Some(ResolutionCandidate {
                    entry: entry.clone(),
                    score,
                    matched: matched.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| {
                    let a_len = a.entry.display_name.chars().count();
                    let b_len = b.entry.display_name.chars().count();
                    a_len.cmp(&b_len)
                })
                .then_with(|| a.entry.board_id.cmp(&b.entry.board_id))
        });
        hits.truncate(topk);
        hits
    }

    /// All boards whose category contains (or is contained by) the query.
    pub fn resolve_category(&self, query: &str) -> Vec<BoardEntry> {
        let needle = normalize(query);
        if needle.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .zip(self.categories.iter())
            .filter(|(_, category)| {
                !category.is_empty()
                    && (category.contains(&needle) || needle.contains(category.as_str()))
            })
            .map(|(entry, _)| entry.clone())
            .collect()
    }

    /// Group all boards by category for the structure view.
    pub fn structure(&self) -> BTreeMap<String, Vec<BoardEntry>> {
        let mut grouped: BTreeMap<String, Vec<BoardEntry>> = BTreeMap::new();
        for entry in &self.entries {
            let key = if entry.category.is_empty() {
                "(未分组)".to_string()
            } else {
                entry.category.clone()
            };
            grouped.entry(key).or_default().push(entry.clone());
        }
        grouped
    }
}

/// Process-wide resolver handle: a swappable pointer to the current
/// snapshot. `load` replaces the snapshot atomically; it never mutates a
/// snapshot in place.
#[derive(Debug, Default)]
pub struct TaxonomyResolver {
    index: RwLock<Option<Arc<TaxonomyIndex>>>,
}

impl TaxonomyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from `entries` and swap it in. On error the
    /// previous snapshot (if any) stays in service.
    pub fn load(&self, entries: Vec<BoardEntry>) -> Result<()> {
        let built = TaxonomyIndex::build(entries)?;
        log::info!("Taxonomy loaded: {} boards", built.len());
        let mut guard = self.index.write().expect("taxonomy lock poisoned");
        *guard = Some(Arc::new(built));
        Ok(())
    }

    /// Current snapshot, or `IndexNotLoaded` before the first `load`.
    pub fn snapshot(&self) -> Result<Arc<TaxonomyIndex>> {
        self.index
            .read()
            .expect("taxonomy lock poisoned")
            .clone()
            .ok_or(AppError::IndexNotLoaded)
    }

    pub fn resolve(&self, query: &str, topk: usize) -> Result<Vec<ResolutionCandidate>> {
        Ok(self.snapshot()?.resolve(query, topk))
    }

    pub fn resolve_category(&self, query: &str) -> Result<Vec<BoardEntry>> {
        Ok(self.snapshot()?.resolve_category(query))
    }

    pub fn entries(&self) -> Result<Vec<BoardEntry>> {
        Ok(self.snapshot()?.entries().to_vec())
    }
}
