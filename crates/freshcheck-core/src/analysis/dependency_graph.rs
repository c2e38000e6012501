use crate::variable::ValidityState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A variable that is currently fresh, with its edges in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityNode {
    pub name: String,
    pub depends_on: BTreeSet<String>,
    pub dependents: BTreeSet<String>,
    /// Rendering of the graph at the moment this node was last established.
    pub snapshot: String,
}

impl ValidityNode {
    fn new(name: &str, snapshot: String) -> Self {
        Self {
            name: name.to_string(),
            depends_on: BTreeSet::new(),
            dependents: BTreeSet::new(),
            snapshot,
        }
    }
}

/// One view of variable freshness. A variable is fresh exactly when it has a node here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: IndexMap<String, ValidityNode>,
    removal_reasons: BTreeMap<String, String>,
    undecided: BTreeSet<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Establishes `var` as fresh, computed from the present names in `rhs`.
    ///
    /// Names that are absent, and `var` itself, contribute no edge. Re-inserting a present
    /// variable replaces what it depends on but keeps its dependents.
    pub fn insert<S: AsRef<str>>(&mut self, var: &str, rhs: impl IntoIterator<Item = S>) {
        let deps: BTreeSet<String> = rhs
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .filter(|dep| dep != var && self.nodes.contains_key(dep))
            .collect();
        let snapshot = self.to_string();

        let old_deps = match self.nodes.get_mut(var) {
            Some(node) => {
                node.snapshot = snapshot;
                std::mem::replace(&mut node.depends_on, deps.clone())
            }
            None => {
                let mut node = ValidityNode::new(var, snapshot);
                node.depends_on = deps.clone();
                self.nodes.insert(var.to_string(), node);
                BTreeSet::new()
            }
        };

        for dep in old_deps.difference(&deps) {
            if let Some(node) = self.nodes.get_mut(dep) {
                node.dependents.remove(var);
            }
        }
        for dep in &deps {
            if let Some(node) = self.nodes.get_mut(dep) {
                node.dependents.insert(var.to_string());
            }
        }

        self.removal_reasons.remove(var);
        self.undecided.remove(var);
    }

    /// Records that `to` was computed from `from`. Both must be present.
    pub fn insert_edge(&mut self, from: &str, to: &str) -> bool {
        if from == to || !self.is_present(from) || !self.is_present(to) {
            return false;
        }
        self.link(from, to);
        true
    }

    /// Invalidates `var`, keeping reachability between its neighbours.
    pub fn remove(&mut self, var: &str, reason: impl Into<String>) {
        if self.detach(var) {
            self.removal_reasons.insert(var.to_string(), reason.into());
        }
    }

    /// Drops variables without recording a reason, shorting each one like `remove` does.
    pub fn ignore<'a>(&mut self, vars: impl IntoIterator<Item = &'a String>) {
        for var in vars {
            self.detach(var);
        }
    }

    /// Every variable transitively computed from `var`, `var` included.
    pub fn reachable(&self, var: &str) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        if !self.is_present(var) {
            return visited;
        }

        let mut stack = vec![var.to_string()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                for next in &node.dependents {
                    if !visited.contains(next) {
                        stack.push(next.clone());
                    }
                }
            }
        }

        visited
    }

    pub fn is_present(&self, var: &str) -> bool {
        self.nodes.contains_key(var)
    }

    pub fn is_absent(&self, var: &str) -> bool {
        !self.is_present(var)
    }

    pub fn state(&self, var: &str) -> ValidityState {
        if !self.is_present(var) {
            ValidityState::Stale
        } else if self.undecided.contains(var) {
            ValidityState::Undecided
        } else {
            ValidityState::Fresh
        }
    }

    /// Flags a present variable as undecided. Absent variables cannot be undecided.
    pub fn mark_undecided(&mut self, var: &str) -> bool {
        self.is_present(var) && self.undecided.insert(var.to_string())
    }

    /// Clears the undecided flag, returning whether it was set.
    pub fn resolve(&mut self, var: &str) -> bool {
        self.undecided.remove(var)
    }

    pub fn is_undecided(&self, var: &str) -> bool {
        self.undecided.contains(var)
    }

    pub fn undecided(&self) -> &BTreeSet<String> {
        &self.undecided
    }

    pub(crate) fn replace_undecided(&mut self, flags: BTreeSet<String>) {
        self.undecided = flags
            .into_iter()
            .filter(|var| self.nodes.contains_key(var))
            .collect();
    }

    pub fn removal_reason(&self, var: &str) -> &str {
        self.removal_reasons
            .get(var)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub(crate) fn removal_reasons(&self) -> &BTreeMap<String, String> {
        &self.removal_reasons
    }

    /// Sets a reason for an absent variable unless one is already recorded.
    pub(crate) fn adopt_reason(&mut self, var: &str, reason: &str) {
        if self.is_absent(var) && !self.removal_reasons.contains_key(var) {
            self.removal_reasons
                .insert(var.to_string(), reason.to_string());
        }
    }

    pub fn node(&self, var: &str) -> Option<&ValidityNode> {
        self.nodes.get(var)
    }

    pub fn snapshot(&self, var: &str) -> Option<&str> {
        self.nodes.get(var).map(|node| node.snapshot.as_str())
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Variables present in `self` but absent from `other`.
    pub fn diff(&self, other: &DependencyGraph) -> BTreeSet<String> {
        self.nodes
            .keys()
            .filter(|var| other.is_absent(var))
            .cloned()
            .collect()
    }

    /// Unions in the edges of `other` between variables present in both graphs.
    pub fn merge_edges(&mut self, other: &DependencyGraph) {
        for (name, node) in &other.nodes {
            if !self.is_present(name) {
                continue;
            }
            for dep in &node.depends_on {
                self.insert_edge(dep, name);
            }
        }
    }

    fn link(&mut self, from: &str, to: &str) {
        if let Some(node) = self.nodes.get_mut(from) {
            node.dependents.insert(to.to_string());
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.depends_on.insert(from.to_string());
        }
    }

    fn detach(&mut self, var: &str) -> bool {
        let Some(node) = self.nodes.shift_remove(var) else {
            return false;
        };

        for pred in &node.depends_on {
            if let Some(p) = self.nodes.get_mut(pred) {
                p.dependents.remove(var);
            }
        }
        for succ in &node.dependents {
            if let Some(s) = self.nodes.get_mut(succ) {
                s.depends_on.remove(var);
            }
        }

        for pred in &node.depends_on {
            for succ in &node.dependents {
                if pred != succ {
                    self.link(pred, succ);
                }
            }
        }

        self.undecided.remove(var);
        true
    }
}

impl fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, node) in &self.nodes {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}", name)?;
            if self.undecided.contains(name) {
                write!(f, "?")?;
            }
            if !node.depends_on.is_empty() {
                let deps: Vec<&str> = node.depends_on.iter().map(String::as_str).collect();
                write!(f, " <- {}", deps.join(", "))?;
            }
        }
        Ok(())
    }
}
