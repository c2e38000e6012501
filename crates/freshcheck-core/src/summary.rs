use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Freshness contract of one function over global state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub name: String,
    /// Globals the body assumed fresh without re-establishing them first.
    pub preconditions: BTreeSet<String>,
    /// Globals the function leaves fresh on return, including every global written on any path.
    pub postconditions: BTreeSet<String>,
}

impl FunctionSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            preconditions: BTreeSet::new(),
            postconditions: BTreeSet::new(),
        }
    }

    pub fn with_conditions<'a>(
        name: impl Into<String>,
        preconditions: impl IntoIterator<Item = &'a str>,
        postconditions: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            name: name.into(),
            preconditions: preconditions.into_iter().map(str::to_string).collect(),
            postconditions: postconditions.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.preconditions.is_empty() && self.postconditions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLookup<'a> {
    Ready(&'a FunctionSummary),
    /// Defined in the unit but not analyzed yet, which only happens across a call cycle.
    Pending,
    /// Not defined in the unit at all.
    External,
}

/// Append-only table of finished summaries for one translation unit.
#[derive(Debug, Clone, Default)]
pub struct SummaryTable {
    defined: BTreeSet<String>,
    summaries: IndexMap<String, FunctionSummary>,
}

impl SummaryTable {
    pub fn new<'a>(defined: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            defined: defined.into_iter().map(str::to_string).collect(),
            summaries: IndexMap::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> SummaryLookup<'_> {
        match self.summaries.get(name) {
            Some(summary) => SummaryLookup::Ready(summary),
            None if self.defined.contains(name) => SummaryLookup::Pending,
            None => SummaryLookup::External,
        }
    }

    /// Records a finished summary. The first summary for a name wins.
    pub fn insert(&mut self, summary: FunctionSummary) -> bool {
        if self.summaries.contains_key(&summary.name) {
            return false;
        }
        self.defined.insert(summary.name.clone());
        self.summaries.insert(summary.name.clone(), summary);
        true
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSummary> {
        self.summaries.get(name)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn into_summaries(self) -> IndexMap<String, FunctionSummary> {
        self.summaries
    }
}
