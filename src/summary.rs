//! Cluster profiles: what a labeled cluster looks like.
//!
//! A profile gives a cluster's size, resolved group name, and mean nutrient
//! values, plus the keywords that dominate its members' display names. Names
//! are condensed by a [`Summarizer`], so the keyword strategy can be swapped
//! without touching the profile aggregation.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::engine::ClusterId;
use crate::reconciliation::{LabeledRecord, Reconciliation};

/// Trait for summarization strategies.
///
/// Implementors define how a group of items is condensed into a summary.
pub trait Summarizer<T, S = T> {
    /// Summarize a group of items.
    fn summarize(&self, items: &[&T]) -> S;
}

/// A word and how many member names contain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyword {
    /// Token as it appears in the names, punctuation stripped.
    pub word: String,
    /// Occurrences across all member names.
    pub count: usize,
}

/// Most frequent name tokens, stop words removed.
///
/// Tokens are whitespace-separated with surrounding punctuation trimmed.
/// Ranking is by count, then alphabetically.
#[derive(Debug, Clone, Default)]
pub struct KeywordSummarizer {
    top_n: usize,
    stop_words: HashSet<String>,
}

impl KeywordSummarizer {
    /// Keep at most `top_n` keywords.
    pub fn new(top_n: usize) -> Self {
        Self {
            top_n,
            stop_words: HashSet::new(),
        }
    }

    /// Set the words to ignore.
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words = words.into_iter().map(Into::into).collect();
        self
    }
}

impl Summarizer<String, Vec<Keyword>> for KeywordSummarizer {
    fn summarize(&self, items: &[&String]) -> Vec<Keyword> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for item in items {
            for token in item.split_whitespace() {
                let token = token.trim_matches(|c: char| c.is_ascii_punctuation());
                if token.is_empty() || self.stop_words.contains(token) {
                    continue;
                }
                *counts.entry(token).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(self.top_n)
            .map(|(word, count)| Keyword {
                word: word.to_string(),
                count,
            })
            .collect()
    }
}

/// Aggregate view of one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProfile {
    /// Cluster id.
    pub cluster: ClusterId,
    /// Resolved group name.
    pub group_name: String,
    /// Number of member records.
    pub size: usize,
    /// Mean protein.
    pub protein: f64,
    /// Mean total fat.
    pub total_fat: f64,
    /// Mean carbohydrates.
    pub carbohydrates: f64,
    /// Mean alcohol.
    pub alcohol: f64,
    /// Mean food energy over members that report it.
    pub food_energy: Option<f64>,
    /// Dominant name keywords.
    pub keywords: Vec<Keyword>,
}

/// One profile per cluster, ascending by id.
pub fn profile_clusters<S>(reconciliation: &Reconciliation, summarizer: &S) -> Vec<ClusterProfile>
where
    S: Summarizer<String, Vec<Keyword>> + ?Sized,
{
    let mut members: BTreeMap<ClusterId, Vec<&LabeledRecord>> = BTreeMap::new();
    for labeled in reconciliation.records() {
        members.entry(labeled.cluster).or_default().push(labeled);
    }

    members
        .into_iter()
        .map(|(cluster, records)| {
            let size = records.len();
            let mean = |f: fn(&LabeledRecord) -> f64| {
                records.iter().map(|r| f(r)).sum::<f64>() / size as f64
            };
            let energies: Vec<f64> = records.iter().filter_map(|r| r.record.food_energy).collect();
            let names: Vec<&String> = records.iter().map(|r| &r.record.name).collect();

            ClusterProfile {
                cluster,
                group_name: records[0].group_name.clone(),
                size,
                protein: mean(|r| r.record.protein),
                total_fat: mean(|r| r.record.total_fat),
                carbohydrates: mean(|r| r.record.carbohydrates),
                alcohol: mean(|r| r.record.alcohol),
                food_energy: (!energies.is_empty())
                    .then(|| energies.iter().sum::<f64>() / energies.len() as f64),
                keywords: summarizer.summarize(&names),
            }
        })
        .collect()
}
