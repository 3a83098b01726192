// src/process/summary.rs

use std::{cmp::Reverse, collections::HashMap};

use serde::Serialize;

/// One token and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenCount {
    pub token: String,
    pub count: usize,
}

/// Tokens occurring strictly more often than a threshold.
///
/// Entries are held in presentation order: ascending by count, ties in the
/// order the token was first seen in the flat list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    entries: Vec<TokenCount>,
}

impl FrequencyTable {
    pub fn get(&self, token: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.token == token)
            .map(|e| e.count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Presentation order.
    pub fn iter(&self) -> impl Iterator<Item = &TokenCount> {
        self.entries.iter()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.entries.last().map_or(0, |e| e.count)
    }

    /// Highest counts first, for top-N listings. Equal counts stay in first-seen order.
    pub fn descending(&self) -> Vec<&TokenCount> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|e| Reverse(e.count));
        entries
    }

}

/// Count every distinct token and keep those with `count > threshold`.
pub fn summarize(tokens: &[String], threshold: usize) -> FrequencyTable {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for t in tokens.iter().map(String::as_str) {
        match index.get(t) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(t, counts.len());
                counts.push((t, 1));
            }
        }
    }

    let mut entries: Vec<TokenCount> = counts
        .into_iter()
        .filter(|(_, c)| *c > threshold)
        .map(|(token, count)| TokenCount {
            token: token.to_string(),
            count,
        })
        .collect();
    // stable: equal counts keep first-seen order
    entries.sort_by_key(|e| e.count);

    FrequencyTable { entries }
}
