//! Content search over the flattened subject → module → inquiry question → dotpoint tree.
//!
//! The index is a flat list in tree order. A query is a linear scan: at a
//! hundred or so dotpoints an inverted index would only add bookkeeping.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::Subject;

/// Results returned per query.
pub const MAX_RESULTS: usize = 10;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub subject_key: String,
    pub subject_name: String,
    pub module_number: u32,
    pub module_name: String,
    pub dotpoint_id: String,
    pub dotpoint_title: String,
    pub inquiry_question_title: String,
    pub keywords: Vec<String>,
}

/// `all`, or a single subject key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubjectFilter {
    #[default]
    All,
    Subject(String),
}

impl SubjectFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => SubjectFilter::All,
            Some(key) => SubjectFilter::Subject(key.to_string()),
        }
    }

    fn admits(&self, entry: &SearchEntry) -> bool {
        match self {
            SubjectFilter::All => true,
            SubjectFilter::Subject(key) => entry.subject_key == *key,
        }
    }
}

impl<'de> Deserialize<'de> for SubjectFilter {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(SubjectFilter::parse(raw.as_deref()))
    }
}

/// How a query matched an entry. Lower sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Exact,
    Prefix,
    Contains,
}

#[derive(Clone, Debug, Default)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
}

impl SearchIndex {
    /// Flatten `subjects`. Only dotpoints flagged `has_content` are indexed.
    pub fn build(subjects: &[Subject]) -> Self {
        let mut entries = Vec::new();
        for subject in subjects {
            for module in &subject.modules {
                for iq in &module.inquiry_questions {
                    for dp in iq.dotpoints.iter().filter(|d| d.has_content) {
                        let mut keywords: Vec<String> = Vec::with_capacity(5);
                        for k in [&dp.title, &dp.id, &iq.title, &module.name, &subject.name] {
                            let k = k.to_lowercase();
                            if !keywords.contains(&k) {
                                keywords.push(k);
                            }
                        }
                        entries.push(SearchEntry {
                            subject_key: subject.key.clone(),
                            subject_name: subject.name.clone(),
                            module_number: module.number,
                            module_name: module.name.clone(),
                            dotpoint_id: dp.id.clone(),
                            dotpoint_title: dp.title.clone(),
                            inquiry_question_title: iq.title.clone(),
                            keywords,
                        });
                    }
                }
            }
        }
        info!(target: "search", subjects = subjects.len(), entries = entries.len(), "Built content search index");
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    fn rank(entry: &SearchEntry, needle: &str) -> Option<MatchRank> {
        entry
            .keywords
            .iter()
            .filter_map(|k| {
                if k == needle {
                    Some(MatchRank::Exact)
                } else if k.starts_with(needle) {
                    Some(MatchRank::Prefix)
                } else if k.contains(needle) {
                    Some(MatchRank::Contains)
                } else {
                    None
                }
            })
            .min()
    }

    /// Case-insensitive substring search. Exact keyword matches rank above prefix
    /// matches, which rank above interior matches; ties keep tree order.
    pub fn search(&self, query: &str, filter: &SubjectFilter) -> Vec<SearchEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(MatchRank, &SearchEntry)> = self
            .entries
            .iter()
            .filter(|e| filter.admits(e))
            .filter_map(|e| Self::rank(e, &needle).map(|r| (r, e)))
            .collect();
        // sort_by_key is stable
        hits.sort_by_key(|(rank, _)| *rank);

        debug!(target: "search", query = %needle, hits = hits.len(), "Search evaluated");
        hits.into_iter().take(MAX_RESULTS).map(|(_, e)| e.clone()).collect()
    }
}
