use crate::analysis::{DependencyGraph, ValidityGraph};
use crate::variable::ValidityState;
use std::collections::BTreeSet;

const NONE: [&str; 0] = [];

fn chain(names: &[&str]) -> ValidityGraph {
    let mut g = ValidityGraph::new();
    let mut prev: Option<&str> = None;
    for name in names {
        match prev {
            Some(p) => g.insert(name, [p]),
            None => g.insert(name, NONE),
        }
        prev = Some(*name);
    }
    g
}

#[test]
fn test_reassign_invalidates_whole_closure() {
    let mut g = chain(&["a", "b", "c", "d"]);
    g.insert("side", ["c"]);

    g.reassign("a", NONE, false);

    for stale in ["b", "c", "d", "side"] {
        assert!(g.is_absent(stale), "{} should be stale", stale);
        assert_eq!(g.state(stale), ValidityState::Stale);
    }
    assert!(g.is_present("a"));
}

#[test]
fn test_rederived_in_same_statement_stays_fresh() {
    let mut g = chain(&["u", "v"]);
    g.reassign("u", NONE, false);
    g.reassign("v", ["u"], false);

    assert!(g.is_present("v"));
    assert!(g.reachable("u").contains("v"));
}

#[test]
fn test_reassign_of_middle_spares_upstream() {
    let mut g = chain(&["a", "b", "c"]);
    g.reassign("b", NONE, false);

    assert!(g.is_present("a"));
    assert!(g.is_present("b"));
    assert!(g.is_absent("c"));
    assert_eq!(g.removal_reason("c"), "changed because of `b`");
}

#[test]
fn test_remove_interior_node_keeps_reachability() {
    let mut g = DependencyGraph::new();
    g.insert("a", NONE);
    g.insert("m", ["a"]);
    g.insert("b", ["m"]);
    g.remove("m", "x");

    assert!(g.reachable("a").contains("b"));
}

#[test]
fn test_reconnected_chain_still_invalidates() {
    let mut g = chain(&["a", "m", "b"]);
    g.remove("m", "x");
    g.reassign("a", NONE, false);

    assert!(g.is_absent("b"));
}

#[test]
fn test_join_requires_freshness_on_every_arm() {
    let mut g = ValidityGraph::new();
    g.insert("z", NONE);
    g.insert("x", ["z"]);
    g.insert("y", NONE);

    g.entry_scope();
    g.entry_branch().unwrap();
    g.exit_branch().unwrap();
    g.entry_branch().unwrap();
    g.reassign("y", ["x"], false);
    g.reassign("x", NONE, false);
    g.exit_branch().unwrap();
    g.exit_scope().unwrap();

    assert!(g.is_absent("y"));
    assert!(g.is_present("x"));
    assert_eq!(g.removal_reason("y"), "changed because of `x`");
}

#[test]
fn test_join_drops_variable_invalidated_in_one_arm() {
    let mut g = ValidityGraph::new();
    g.insert("z", NONE);
    g.insert("x", ["z"]);
    g.insert("w", ["x"]);

    g.entry_scope();
    g.entry_branch().unwrap();
    g.reassign("z", NONE, false);
    g.exit_branch().unwrap();
    g.entry_branch().unwrap();
    g.exit_branch().unwrap();
    g.exit_scope().unwrap();

    assert!(g.is_present("z"));
    assert!(g.is_absent("x"));
    assert!(g.is_absent("w"));
    assert_eq!(g.removal_reason("x"), "changed because of `z`");
}

#[test]
fn test_join_unions_edges_from_both_arms() {
    let mut g = ValidityGraph::new();
    g.insert("a", NONE);
    g.insert("b", NONE);
    g.insert("r", NONE);

    g.entry_scope();
    g.entry_branch().unwrap();
    g.reassign("r", ["a"], false);
    g.exit_branch().unwrap();
    g.entry_branch().unwrap();
    g.reassign("r", ["b"], false);
    g.exit_branch().unwrap();
    g.exit_scope().unwrap();

    g.reassign("b", NONE, false);
    assert!(g.is_absent("r"));
}

#[test]
fn test_nested_scopes_join_inside_out() {
    let mut g = chain(&["a", "b"]);

    g.entry_scope();
    g.entry_branch().unwrap();
    g.entry_scope();
    g.entry_branch().unwrap();
    g.reassign("a", NONE, false);
    g.exit_branch().unwrap();
    g.exit_scope().unwrap();
    assert!(g.is_absent("b"));
    g.exit_branch().unwrap();
    g.exit_scope().unwrap();

    assert!(g.is_absent("b"));
    assert!(g.is_balanced());
}

#[test]
fn test_queries_are_idempotent() {
    let mut g = chain(&["a", "b", "c"]);
    g.remove("b", "because");

    let reach = g.reachable("a");
    let present = g.is_present("c");
    let reason = g.removal_reason("b").to_string();
    let rendered = g.current().to_string();

    for _ in 0..3 {
        assert_eq!(g.reachable("a"), reach);
        assert_eq!(g.is_present("c"), present);
        assert_eq!(g.removal_reason("b"), reason);
        assert_eq!(g.current().to_string(), rendered);
    }
    assert_eq!(reach, ["a", "c"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>());
}
