use crate::event::TranslationUnit;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    callees: IndexMap<String, Vec<String>>,
}

/// Functions in callee-before-caller order, plus the call edges that close a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOrder {
    pub order: Vec<String>,
    pub back_edges: Vec<(String, String)>,
}

impl CallOrder {
    pub fn is_recursive(&self, function: &str) -> bool {
        self.back_edges.iter().any(|(_, to)| to == function)
    }

    pub fn position(&self, function: &str) -> Option<usize> {
        self.order.iter().position(|f| f == function)
    }
}

impl CallGraph {
    pub fn build(unit: &TranslationUnit) -> Self {
        let mut callees: IndexMap<String, Vec<String>> = IndexMap::new();
        for function in &unit.functions {
            callees.entry(function.name.clone()).or_default();
        }

        for function in &unit.functions {
            let targets: Vec<String> = function
                .callees()
                .filter(|callee| callees.contains_key(*callee))
                .map(str::to_string)
                .collect();
            if let Some(edges) = callees.get_mut(&function.name) {
                for target in targets {
                    if !edges.contains(&target) {
                        edges.push(target);
                    }
                }
            }
        }

        Self { callees }
    }

    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.callees.keys().map(String::as_str)
    }

    pub fn callees(&self, function: &str) -> &[String] {
        self.callees
            .get(function)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, function: &str) -> bool {
        self.callees.contains_key(function)
    }

    pub fn len(&self) -> usize {
        self.callees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callees.is_empty()
    }

    pub fn post_order(&self) -> CallOrder {
        let mut order = Vec::with_capacity(self.callees.len());
        let mut back_edges = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut on_stack: HashSet<&str> = HashSet::new();

        for root in self.callees.keys() {
            let mut stack = vec![(root.as_str(), false)];

            while let Some((function, processed)) = stack.pop() {
                if processed {
                    on_stack.remove(function);
                    order.push(function.to_string());
                    continue;
                }

                if !visited.insert(function) {
                    continue;
                }

                on_stack.insert(function);
                stack.push((function, true));

                for callee in self.callees(function).iter().rev() {
                    if on_stack.contains(callee.as_str()) {
                        warn!(caller = function, callee = %callee, "recursive call edge");
                        back_edges.push((function.to_string(), callee.clone()));
                    } else if !visited.contains(callee.as_str()) {
                        stack.push((callee.as_str(), false));
                    }
                }
            }
        }

        CallOrder { order, back_edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, FunctionTrace};
    use pretty_assertions::assert_eq;

    fn unit(functions: Vec<(&str, Vec<&str>)>) -> TranslationUnit {
        let mut unit = TranslationUnit::new();
        for (name, calls) in functions {
            let body = calls.into_iter().map(|callee| Event::call(callee, &[]));
            unit.add_function(FunctionTrace::with_body(name, vec![], body));
        }
        unit
    }

    #[test]
    fn test_callees_before_callers() {
        let unit = unit(vec![
            ("main", vec!["foo", "bar"]),
            ("bar", vec!["foo"]),
            ("foo", vec![]),
        ]);
        let order = CallGraph::build(&unit).post_order();

        assert_eq!(order.order, vec!["foo", "bar", "main"]);
        assert!(order.back_edges.is_empty());
    }

    #[test]
    fn test_shared_callee_visited_once() {
        let unit = unit(vec![("a", vec!["c"]), ("b", vec!["c", "c"]), ("c", vec![])]);
        let graph = CallGraph::build(&unit);
        assert_eq!(graph.callees("b"), &["c".to_string()]);

        let order = graph.post_order();
        assert_eq!(order.order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_external_callees_are_not_nodes() {
        let unit = unit(vec![("main", vec!["printf"])]);
        let graph = CallGraph::build(&unit);
        assert!(graph.callees("main").is_empty());
        assert!(!graph.contains("printf"));
    }

    #[test]
    fn test_recursion_records_back_edges() {
        let unit = unit(vec![
            ("main", vec!["even"]),
            ("even", vec!["odd"]),
            ("odd", vec!["even"]),
            ("self_loop", vec!["self_loop"]),
        ]);
        let order = CallGraph::build(&unit).post_order();

        assert_eq!(order.order, vec!["odd", "even", "main", "self_loop"]);
        assert_eq!(
            order.back_edges,
            vec![
                ("odd".to_string(), "even".to_string()),
                ("self_loop".to_string(), "self_loop".to_string()),
            ]
        );
        assert!(order.is_recursive("even"));
        assert!(!order.is_recursive("main"));
    }
}
