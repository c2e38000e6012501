use super::dependency_graph::DependencyGraph;
use crate::variable::ValidityState;
use crate::{CheckError, Result};
use std::collections::BTreeSet;
use tracing::trace;

#[derive(Debug, Clone)]
enum Frame {
    /// Join point collecting the graphs of every arm taken inside it.
    Scope { arms: Vec<DependencyGraph> },
    /// One arm in progress; `saved` is the graph as it was before the arm.
    Branch { saved: DependencyGraph },
}

/// Dependency graph plus the scope stack used for path-sensitive joins.
#[derive(Debug, Clone, Default)]
pub struct ValidityGraph {
    current: DependencyGraph,
    frames: Vec<Frame>,
}

impl ValidityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: DependencyGraph) -> Self {
        Self {
            current: graph,
            frames: Vec::new(),
        }
    }

    pub fn current(&self) -> &DependencyGraph {
        &self.current
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_balanced(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn entry_scope(&mut self) {
        self.frames.push(Frame::Scope { arms: Vec::new() });
    }

    pub fn entry_branch(&mut self) -> Result<()> {
        if !matches!(self.frames.last(), Some(Frame::Scope { .. })) {
            return Err(CheckError::UnbalancedScope(
                "branch entered outside of a scope".to_string(),
            ));
        }
        self.frames.push(Frame::Branch {
            saved: self.current.clone(),
        });
        Ok(())
    }

    pub fn exit_branch(&mut self) -> Result<()> {
        let saved = match self.frames.pop() {
            Some(Frame::Branch { saved }) => saved,
            Some(other) => {
                self.frames.push(other);
                return Err(CheckError::UnbalancedScope(
                    "branch exited without a matching entry".to_string(),
                ));
            }
            None => {
                return Err(CheckError::UnbalancedScope(
                    "branch exited at top level".to_string(),
                ));
            }
        };

        let arm = std::mem::replace(&mut self.current, saved);
        match self.frames.last_mut() {
            Some(Frame::Scope { arms }) => {
                arms.push(arm);
                Ok(())
            }
            _ => Err(CheckError::UnbalancedScope(
                "branch parked outside of a scope".to_string(),
            )),
        }
    }

    pub fn exit_scope(&mut self) -> Result<()> {
        let arms = match self.frames.pop() {
            Some(Frame::Scope { arms }) => arms,
            Some(other) => {
                self.frames.push(other);
                return Err(CheckError::UnbalancedScope(
                    "scope exited while a branch is still open".to_string(),
                ));
            }
            None => {
                return Err(CheckError::UnbalancedScope(
                    "scope exited at top level".to_string(),
                ));
            }
        };

        self.join(arms);
        Ok(())
    }

    fn join(&mut self, arms: Vec<DependencyGraph>) {
        let mut undecided: BTreeSet<String> = BTreeSet::new();
        if arms.len() < 2 {
            undecided.extend(self.current.undecided().iter().cloned());
        }

        for mut arm in arms {
            undecided.extend(arm.undecided().iter().cloned());

            let arm_only = arm.diff(&self.current);
            arm.ignore(&arm_only);

            self.current.merge_edges(&arm);

            for var in self.current.diff(&arm) {
                if self.current.is_absent(&var) {
                    continue;
                }
                let reachable = self.current.reachable(&var);
                let reason = match arm.removal_reason(&var) {
                    "" => "not updated on every path".to_string(),
                    reason => reason.to_string(),
                };
                trace!(var = %var, reason = %reason, "invalidated at join");

                self.current.remove(&var, reason);
                let downstream = format!("changed because of `{}`", var);
                for dependent in reachable.iter().filter(|dep| *dep != &var) {
                    self.current.remove(dependent, downstream.clone());
                }
            }

            for (var, reason) in arm.removal_reasons() {
                self.current.adopt_reason(var, reason);
            }
        }

        self.current.replace_undecided(undecided);
    }

    pub fn insert<S: AsRef<str>>(&mut self, var: &str, rhs: impl IntoIterator<Item = S>) {
        self.current.insert(var, rhs);
    }

    pub fn insert_edge(&mut self, from: &str, to: &str) -> bool {
        self.current.insert_edge(from, to)
    }

    pub fn remove(&mut self, var: &str, reason: impl Into<String>) {
        self.current.remove(var, reason);
    }

    pub fn ignore<'a>(&mut self, vars: impl IntoIterator<Item = &'a String>) {
        self.current.ignore(vars);
    }

    /// Writes `var`, invalidating everything computed from its old value.
    ///
    /// Compound writes keep the existing dependencies and add `rhs` as extra edges.
    pub fn reassign<S: AsRef<str>>(
        &mut self,
        var: &str,
        rhs: impl IntoIterator<Item = S>,
        keep_existing: bool,
    ) -> BTreeSet<String> {
        let reason = format!("changed because of `{}`", var);
        self.reassign_because(var, rhs, keep_existing, &reason)
    }

    /// Like `reassign`, with a custom reason for the variables it invalidates.
    pub fn reassign_because<S: AsRef<str>>(
        &mut self,
        var: &str,
        rhs: impl IntoIterator<Item = S>,
        keep_existing: bool,
        reason: &str,
    ) -> BTreeSet<String> {
        let rhs: Vec<String> = rhs.into_iter().map(|s| s.as_ref().to_string()).collect();
        let existing: Vec<String> = match self.current.node(var) {
            Some(node) if keep_existing => node.depends_on.iter().cloned().collect(),
            _ => Vec::new(),
        };

        let mut invalidated = self.current.reachable(var);
        invalidated.remove(var);
        for dependent in &invalidated {
            self.current.remove(dependent, reason);
        }

        if keep_existing {
            self.current.insert(var, &existing);
            for dep in &rhs {
                self.current.insert_edge(dep, var);
            }
        } else {
            self.current.insert(var, &rhs);
        }

        trace!(var, invalidated = invalidated.len(), graph = %self.current, "reassign");
        invalidated
    }

    pub fn reachable(&self, var: &str) -> BTreeSet<String> {
        self.current.reachable(var)
    }

    pub fn is_present(&self, var: &str) -> bool {
        self.current.is_present(var)
    }

    pub fn is_absent(&self, var: &str) -> bool {
        self.current.is_absent(var)
    }

    pub fn state(&self, var: &str) -> ValidityState {
        self.current.state(var)
    }

    pub fn mark_undecided(&mut self, var: &str) -> bool {
        self.current.mark_undecided(var)
    }

    pub fn resolve(&mut self, var: &str) -> bool {
        self.current.resolve(var)
    }

    pub fn removal_reason(&self, var: &str) -> &str {
        self.current.removal_reason(var)
    }

    /// Returns the final graph, failing if any branch or scope is still open.
    pub fn finish(self) -> Result<DependencyGraph> {
        if !self.is_balanced() {
            return Err(CheckError::UnbalancedScope(format!(
                "{} frame(s) left open",
                self.frames.len()
            )));
        }
        Ok(self.current)
    }
}
