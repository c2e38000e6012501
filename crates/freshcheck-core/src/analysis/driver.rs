use super::alias::{PointerConstraint, PointsToGraph};
use super::call_graph::{CallGraph, CallOrder};
use super::walker::{FunctionWalker, GlobalScope};
use crate::config::AnalysisConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity};
use crate::event::{Step, TranslationUnit};
use crate::summary::{FunctionSummary, SummaryTable};
use crate::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub order: CallOrder,
    pub summaries: IndexMap<String, FunctionSummary>,
    pub diagnostics: Vec<Diagnostic>,
    pub points_to: PointsToGraph,
}

impl AnalysisReport {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn summary(&self, function: &str) -> Option<&FunctionSummary> {
        self.summaries.get(function)
    }

    pub fn diagnostics_for<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.function == function)
    }
}

/// Runs the whole-unit pass: alias resolution, then one walk per function in call order.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze_events(&self, steps: impl IntoIterator<Item = Step>) -> Result<AnalysisReport> {
        let unit = TranslationUnit::from_events(steps)?;
        Ok(self.analyze(&unit))
    }

    pub fn analyze(&self, unit: &TranslationUnit) -> AnalysisReport {
        let globals = GlobalScope::from_steps(&unit.globals);
        let points_to = Self::resolve_aliases(unit, &self.config);
        let order = CallGraph::build(unit).post_order();

        let mut summaries = SummaryTable::new(unit.functions.iter().map(|f| f.name.as_str()));
        let mut diagnostics = Vec::new();

        for name in &order.order {
            let Some(function) = unit.function(name) else {
                continue;
            };
            let _span = info_span!("function", name = %name).entered();

            let walker =
                FunctionWalker::new(function, &globals, &points_to, &summaries, &self.config);
            match walker.run() {
                Ok((summary, found)) => {
                    debug!(
                        preconditions = summary.preconditions.len(),
                        postconditions = summary.postconditions.len(),
                        diagnostics = found.len(),
                        "summary ready"
                    );
                    diagnostics.extend(found);
                    summaries.insert(summary);
                }
                Err(e) => {
                    warn!(error = %e, "function skipped");
                    diagnostics.push(Diagnostic::new(
                        name.clone(),
                        DiagnosticKind::MalformedTrace {
                            message: e.to_string(),
                        },
                        None,
                    ));
                    summaries.insert(FunctionSummary::new(name.clone()));
                }
            }
        }

        AnalysisReport {
            order,
            summaries: summaries.into_summaries(),
            diagnostics,
            points_to,
        }
    }

    /// Collects pointer constraints over the whole unit, globals first, and solves them.
    pub fn resolve_aliases(unit: &TranslationUnit, config: &AnalysisConfig) -> PointsToGraph {
        let constraints: Vec<PointerConstraint> = unit
            .globals
            .iter()
            .chain(unit.functions.iter().flat_map(|f| f.body.iter()))
            .filter_map(|step| PointerConstraint::from_event(&step.event))
            .collect();
        PointsToGraph::solve(&constraints, config.alias_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, FunctionTrace};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_callee_summary_checked_at_call_site() {
        let mut unit = TranslationUnit::new();
        unit.add_global(Event::declare("g", &[]));
        unit.add_function(FunctionTrace::with_body(
            "main",
            vec![],
            vec![Event::assign("g", &[]), Event::call("helper", &[])],
        ));
        unit.add_function(FunctionTrace::with_body(
            "helper",
            vec![],
            vec![Event::use_var("g"), Event::assign("g", &[])],
        ));

        let report = Analyzer::default().analyze(&unit);
        assert_eq!(report.order.order, vec!["helper", "main"]);
        assert!(!report.has_warnings());
        assert_eq!(
            report.summary("helper").unwrap(),
            &FunctionSummary::with_conditions("helper", ["g"], ["g"])
        );
        assert!(report.summary("main").unwrap().postconditions.contains("g"));
    }

    #[test]
    fn test_malformed_function_does_not_stop_the_unit() {
        let mut unit = TranslationUnit::new();
        unit.add_function(FunctionTrace::with_body("broken", vec![], vec![Event::ExitBranch]));
        unit.add_function(FunctionTrace::with_body(
            "fine",
            vec![],
            vec![Event::declare("a", &[]), Event::use_var("a")],
        ));

        let report = Analyzer::default().analyze(&unit);
        assert!(report.has_errors());
        assert_eq!(report.summaries.len(), 2);
        assert!(report.summary("broken").unwrap().is_empty());
        assert_eq!(report.diagnostics_for("fine").count(), 0);
    }

    #[test]
    fn test_analyze_events_rejects_bad_stream() {
        let steps = vec![Step::new(Event::ExitFunction)];
        assert!(Analyzer::default().analyze_events(steps).is_err());
    }
}
