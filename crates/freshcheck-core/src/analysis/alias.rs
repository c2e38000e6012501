use crate::event::Event;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasMode {
    /// Every constraint is applied once, in order.
    #[default]
    SinglePass,
    /// Constraints are re-applied until no points-to set grows.
    Fixpoint,
}

/// The six inclusion constraints a pointer statement can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PointerConstraint {
    /// `p = &x`
    AddressOf { ptr: String, target: String },
    /// `p = q`
    Copy { dst: String, src: String },
    /// `p = *q`
    Load { dst: String, src: String },
    /// `*p = &x`
    StoreAddress { ptr: String, target: String },
    /// `*p = q`
    StoreCopy { ptr: String, src: String },
    /// `*p = *q`
    StoreLoad { ptr: String, src: String },
}

impl PointerConstraint {
    pub fn from_event(event: &Event) -> Option<Self> {
        let constraint = match event {
            Event::AddressOf { ptr, target } => PointerConstraint::AddressOf {
                ptr: ptr.clone(),
                target: target.clone(),
            },
            Event::PointerCopy { dst, src } => PointerConstraint::Copy {
                dst: dst.clone(),
                src: src.clone(),
            },
            Event::PointerLoad { dst, src } => PointerConstraint::Load {
                dst: dst.clone(),
                src: src.clone(),
            },
            Event::PointerStoreAddr { dst_ptr, target } => PointerConstraint::StoreAddress {
                ptr: dst_ptr.clone(),
                target: target.clone(),
            },
            Event::PointerStoreCopy { dst_ptr, src } => PointerConstraint::StoreCopy {
                ptr: dst_ptr.clone(),
                src: src.clone(),
            },
            Event::PointerStoreLoad { dst_ptr, src_ptr } => PointerConstraint::StoreLoad {
                ptr: dst_ptr.clone(),
                src: src_ptr.clone(),
            },
            _ => return None,
        };
        Some(constraint)
    }

    fn mentions(&self) -> [&str; 2] {
        match self {
            PointerConstraint::AddressOf { ptr, target }
            | PointerConstraint::StoreAddress { ptr, target } => [ptr.as_str(), target.as_str()],
            PointerConstraint::Copy { dst, src } | PointerConstraint::Load { dst, src } => {
                [dst.as_str(), src.as_str()]
            }
            PointerConstraint::StoreCopy { ptr, src } | PointerConstraint::StoreLoad { ptr, src } => {
                [ptr.as_str(), src.as_str()]
            }
        }
    }
}

/// Flow-insensitive points-to sets. Sets only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointsToGraph {
    points_to: IndexMap<String, BTreeSet<String>>,
}

impl PointsToGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn solve<'a>(
        constraints: impl IntoIterator<Item = &'a PointerConstraint>,
        mode: AliasMode,
    ) -> Self {
        let constraints: Vec<&PointerConstraint> = constraints.into_iter().collect();
        let mut graph = PointsToGraph::new();

        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for constraint in &constraints {
                changed |= graph.apply(constraint);
            }
            if mode == AliasMode::SinglePass || !changed {
                break;
            }
        }

        debug!(
            constraints = constraints.len(),
            rounds,
            variables = graph.len(),
            "points-to resolved"
        );
        graph
    }

    /// Applies one constraint, returning whether any set grew.
    pub fn apply(&mut self, constraint: &PointerConstraint) -> bool {
        for name in constraint.mentions() {
            self.declare(name);
        }

        match constraint {
            PointerConstraint::AddressOf { ptr, target } => {
                self.extend(ptr, std::iter::once(target.clone()))
            }
            PointerConstraint::Copy { dst, src } => {
                let from = self.targets(src);
                self.extend(dst, from)
            }
            PointerConstraint::Load { dst, src } => {
                let from: BTreeSet<String> = self
                    .targets(src)
                    .iter()
                    .flat_map(|t| self.targets(t))
                    .collect();
                self.extend(dst, from)
            }
            PointerConstraint::StoreAddress { ptr, target } => {
                let mut changed = false;
                for t in self.targets(ptr) {
                    changed |= self.extend(&t, std::iter::once(target.clone()));
                }
                changed
            }
            PointerConstraint::StoreCopy { ptr, src } => {
                let from = self.targets(src);
                let mut changed = false;
                for t in self.targets(ptr) {
                    changed |= self.extend(&t, from.iter().cloned());
                }
                changed
            }
            PointerConstraint::StoreLoad { ptr, src } => {
                let mut changed = false;
                for t in self.targets(ptr) {
                    for u in self.targets(src) {
                        let from = self.targets(&u);
                        changed |= self.extend(&t, from);
                    }
                }
                changed
            }
        }
    }

    pub fn declare(&mut self, var: &str) {
        if !self.points_to.contains_key(var) {
            self.points_to.insert(var.to_string(), BTreeSet::new());
        }
    }

    pub fn points_to(&self, var: &str) -> Option<&BTreeSet<String>> {
        self.points_to.get(var)
    }

    /// Owned copy of the targets of `var`, empty when unknown.
    pub fn targets(&self, var: &str) -> BTreeSet<String> {
        self.points_to.get(var).cloned().unwrap_or_default()
    }

    pub fn may_point_to(&self, ptr: &str, target: &str) -> bool {
        self.points_to
            .get(ptr)
            .map_or(false, |set| set.contains(target))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.points_to.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.points_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_to.is_empty()
    }

    fn extend(&mut self, var: &str, targets: impl IntoIterator<Item = String>) -> bool {
        let set = self.points_to.entry(var.to_string()).or_default();
        let before = set.len();
        set.extend(targets);
        set.len() != before
    }
}
