// Group-by / reduce primitives shared by the KPI and breakdown code.
//
// Every grouped result keeps its keys in first-seen input order. Tie-breaks
// for `mode` and `arg_max_by_sum` walk that order, so they never depend on
// hash iteration order.
use crate::error::{Result, SalesError};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::hash::Hash;

/// Key → value table in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult<K: Eq + Hash> {
    entries: Vec<(K, f64)>,
    index: HashMap<K, usize>,
}

impl<K: Eq + Hash> Default for AggregationResult<K> {
    fn default() -> Self {
        AggregationResult {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> AggregationResult<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the slot for `key`, creating it at the end if new.
    pub fn add(&mut self, key: K, value: f64) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 += value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// First key holding the maximum value.
    pub fn arg_max(&self) -> Option<&K> {
        let mut best: Option<&(K, f64)> = None;
        for entry in &self.entries {
            match best {
                Some(b) if entry.1 <= b.1 => {}
                _ => best = Some(entry),
            }
        }
        best.map(|(k, _)| k)
    }

    /// Each value as a percentage of the table total. Empty when the
    /// total is not positive.
    pub fn shares(&self) -> AggregationResult<K> {
        let total = self.total();
        if total <= 0.0 {
            return AggregationResult::new();
        }
        self.map_values(|v| v / total * 100.0)
    }

    pub fn sorted_by_value_desc(&self) -> AggregationResult<K> {
        let mut entries = self.entries.clone();
        // stable: ties keep first-seen order
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self::from_entries(entries)
    }

    fn map_values(&self, f: impl Fn(f64) -> f64) -> AggregationResult<K> {
        Self::from_entries(self.entries.iter().map(|(k, v)| (k.clone(), f(*v))).collect())
    }

    fn from_entries(entries: Vec<(K, f64)>) -> AggregationResult<K> {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (k.clone(), i))
            .collect();
        AggregationResult { entries, index }
    }
}

impl<K: Eq + Hash + Clone + Ord> AggregationResult<K> {
    pub fn sorted_by_key(&self) -> AggregationResult<K> {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self::from_entries(entries)
    }
}

impl<K: Eq + Hash + Serialize> Serialize for AggregationResult<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Ungrouped sum. Zero for an empty input.
pub fn total<T>(items: &[T], value_of: impl Fn(&T) -> f64) -> f64 {
    items.iter().map(value_of).sum()
}

/// Sum of `value_of` per distinct `group_by` key.
pub fn sum<T, K>(
    items: &[T],
    group_by: impl Fn(&T) -> K,
    value_of: impl Fn(&T) -> f64,
) -> AggregationResult<K>
where
    K: Eq + Hash + Clone,
{
    let mut out = AggregationResult::new();
    for item in items {
        out.add(group_by(item), value_of(item));
    }
    out
}

/// Occurrences per distinct key.
pub fn count<T, K>(items: &[T], key_of: impl Fn(&T) -> K) -> AggregationResult<K>
where
    K: Eq + Hash + Clone,
{
    sum(items, key_of, |_| 1.0)
}

pub fn mean<T>(items: &[T], value_of: impl Fn(&T) -> f64) -> Result<f64> {
    if items.is_empty() {
        return Err(SalesError::EmptyInput { operation: "mean" });
    }
    Ok(total(items, value_of) / items.len() as f64)
}

/// Mean of `value_of` per distinct `group_by` key.
pub fn mean_by<T, K>(
    items: &[T],
    group_by: impl Fn(&T) -> K,
    value_of: impl Fn(&T) -> f64,
) -> AggregationResult<K>
where
    K: Eq + Hash + Clone,
{
    let sums = sum(items, &group_by, value_of);
    let counts = count(items, &group_by);
    let entries = sums
        .entries
        .into_iter()
        .map(|(k, s)| {
            let n = counts.get(&k).unwrap_or(1.0);
            (k, s / n)
        })
        .collect();
    AggregationResult::from_entries(entries)
}

/// Most frequent key; ties go to the key seen first in input order.
pub fn mode<T, K>(items: &[T], key_of: impl Fn(&T) -> K) -> Result<K>
where
    K: Eq + Hash + Clone,
{
    count(items, key_of)
        .arg_max()
        .cloned()
        .ok_or(SalesError::EmptyInput { operation: "mode" })
}

/// Key with the largest per-group sum; ties go to the first-seen group.
pub fn arg_max_by_sum<T, K>(
    items: &[T],
    group_by: impl Fn(&T) -> K,
    value_of: impl Fn(&T) -> f64,
) -> Result<K>
where
    K: Eq + Hash + Clone,
{
    sum(items, group_by, value_of)
        .arg_max()
        .cloned()
        .ok_or(SalesError::EmptyInput {
            operation: "arg_max_by_sum",
        })
}
