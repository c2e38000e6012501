use crate::analysis::{AnalysisReport, Analyzer};
use crate::diagnostic::DiagnosticKind;
use crate::event::{Event, FunctionTrace, Param, Step, TranslationUnit};
use crate::source_location::SourceLocation;

fn analyze_main(body: Vec<Event>) -> AnalysisReport {
    let mut unit = TranslationUnit::new();
    unit.add_function(FunctionTrace::with_body("main", vec![], body));
    Analyzer::default().analyze(&unit)
}

fn stale_names(report: &AnalysisReport) -> Vec<String> {
    report
        .warnings()
        .filter_map(|d| d.kind.variable().map(str::to_string))
        .collect()
}

#[test]
fn test_fresh_chain_has_no_warnings() {
    let report = analyze_main(vec![
        Event::declare("a", &[]),
        Event::declare("b", &["a"]),
        Event::use_var("b"),
        Event::assign("a", &[]),
        Event::assign("b", &["a"]),
        Event::use_var("b"),
    ]);
    assert!(!report.has_warnings());
}

#[test]
fn test_swap_through_temporary_reads_stale_value() {
    let report = analyze_main(vec![
        Event::declare("temp", &[]),
        Event::declare("a", &[]),
        Event::declare("b", &[]),
        Event::assign("temp", &["b"]),
        Event::assign("b", &["a"]),
        Event::assign("a", &["temp"]),
    ]);

    assert_eq!(stale_names(&report), vec!["temp"]);
    assert_eq!(
        report.diagnostics[0].kind,
        DiagnosticKind::StaleUse {
            variable: "temp".to_string(),
            reason: "changed because of `b`".to_string(),
        }
    );
}

#[test]
fn test_compound_assignment_keeps_old_dependencies() {
    let report = analyze_main(vec![
        Event::declare("a", &[]),
        Event::declare("b", &[]),
        Event::declare("t", &["a"]),
        Event::compound_assign("t", &["b"]),
        Event::assign("a", &[]),
        Event::use_var("t"),
    ]);
    assert_eq!(stale_names(&report), vec!["t"]);
}

#[test]
fn test_increment_invalidates_dependents() {
    let report = analyze_main(vec![
        Event::declare("i", &[]),
        Event::declare("j", &["i"]),
        Event::inc_dec("i"),
        Event::use_var("i"),
        Event::use_var("j"),
    ]);
    assert_eq!(stale_names(&report), vec!["j"]);
}

#[test]
fn test_if_without_else_invalidates_conservatively() {
    let report = analyze_main(vec![
        Event::declare("a", &[]),
        Event::declare("b", &["a"]),
        Event::use_var("a"),
        Event::EnterIf,
        Event::assign("a", &[]),
        Event::ExitBranch,
        Event::ExitIf,
        Event::use_var("b"),
    ]);
    assert_eq!(stale_names(&report), vec!["b"]);
}

#[test]
fn test_refresh_inside_arms_does_not_revive_stale_variable() {
    let report = analyze_main(vec![
        Event::declare("a", &[]),
        Event::declare("b", &["a"]),
        Event::assign("a", &[]),
        Event::EnterIf,
        Event::assign("b", &["a"]),
        Event::ExitBranch,
        Event::EnterElse,
        Event::assign("b", &[]),
        Event::ExitBranch,
        Event::ExitIf,
        Event::use_var("b"),
    ]);
    assert_eq!(stale_names(&report), vec!["b"]);
}

#[test]
fn test_fresh_variable_rewritten_on_both_arms_survives() {
    let report = analyze_main(vec![
        Event::declare("a", &[]),
        Event::declare("b", &["a"]),
        Event::EnterIf,
        Event::assign("b", &["a"]),
        Event::ExitBranch,
        Event::EnterElse,
        Event::assign("b", &[]),
        Event::ExitBranch,
        Event::ExitIf,
        Event::use_var("b"),
    ]);
    assert!(!report.has_warnings());
}

#[test]
fn test_arm_local_is_gone_after_join() {
    let report = analyze_main(vec![
        Event::declare("a", &[]),
        Event::EnterIf,
        Event::declare("t", &["a"]),
        Event::use_var("t"),
        Event::ExitBranch,
        Event::ExitIf,
        Event::use_var("a"),
    ]);
    assert!(!report.has_warnings());
}

#[test]
fn test_loop_body_analyzed_once() {
    let report = analyze_main(vec![
        Event::declare("n", &[]),
        Event::declare("total", &["n"]),
        Event::use_var("n"),
        Event::EnterLoopBody,
        Event::use_var("total"),
        Event::inc_dec("n"),
        Event::ExitLoop,
        Event::use_var("total"),
    ]);

    let warnings: Vec<_> = report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].kind,
        DiagnosticKind::StaleUse {
            variable: "total".to_string(),
            reason: "changed because of `n`".to_string(),
        }
    );
}

#[test]
fn test_warning_carries_location() {
    let mut function = FunctionTrace::new("main", vec![Param::new("x")]);
    function
        .push(Event::declare("y", &["x"]))
        .push(Event::assign("x", &[]))
        .push(Step::at(Event::use_var("y"), 4, 9));
    let mut unit = TranslationUnit::new();
    unit.add_function(function);

    let report = Analyzer::default().analyze(&unit);
    assert_eq!(report.diagnostics[0].location, Some(SourceLocation::new(4, 9)));
    assert_eq!(report.diagnostics[0].function, "main");
}

#[test]
fn test_unknown_names_are_ignored() {
    let report = analyze_main(vec![
        Event::use_var("errno"),
        Event::declare("a", &["errno"]),
        Event::use_var("a"),
    ]);
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_stale_read_is_reported_once_per_read() {
    let report = analyze_main(vec![
        Event::declare("a", &[]),
        Event::declare("b", &["a"]),
        Event::assign("a", &[]),
        Event::use_var("b"),
        Event::use_var("b"),
    ]);
    assert_eq!(stale_names(&report), vec!["b", "b"]);
}
