/*! Unified interface for stale read detection.
 *
 * Single import for the engine, the trace format and the report emitters. `check_trace` runs the
 * whole pipeline on trace text in one call.
 */

pub use freshcheck_core as core;
pub use freshcheck_emit as emit;
pub use freshcheck_trace as trace;

pub use freshcheck_core::{
    AliasMode, AnalysisConfig, AnalysisReport, Analyzer, CallGraph, Diagnostic, DiagnosticKind,
    Event, FunctionSummary, Severity, SourceLocation, Step, TranslationUnit,
};

pub use freshcheck_emit::{EmitterConfig, OutputFormat, ReportEmitter};

pub use freshcheck_trace::{parse, parse_file, parse_unit};

/// Parses trace text and analyzes it with the default configuration.
pub fn check_trace(text: &str) -> freshcheck_trace::Result<AnalysisReport> {
    check_trace_with(text, AnalysisConfig::default())
}

pub fn check_trace_with(
    text: &str,
    config: AnalysisConfig,
) -> freshcheck_trace::Result<AnalysisReport> {
    let unit = parse_unit(text)?;
    Ok(Analyzer::new(config).analyze(&unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_check_trace() {
        let report = check_trace(
            "fn main() {\n    decl var a\n    decl var b = a\n    inc a\n    use b @5:5\n}\n",
        )
        .unwrap();

        let variables: Vec<_> = report
            .warnings()
            .filter_map(|d| d.kind.variable())
            .collect();
        assert_eq!(variables, vec!["b"]);
        assert_eq!(
            report.warnings().next().unwrap().location,
            Some(SourceLocation::new(5, 5))
        );
    }

    #[test]
    fn test_check_trace_with_fixpoint_aliases() {
        let text = "\
fn main() {
    decl var x
    decl var y = x
    decl ptr p
    decl ptr q
    q = p
    p = &y
    set x = 1
    deref q
}
";
        assert!(!check_trace(text).unwrap().has_warnings());

        let config = AnalysisConfig::default().with_alias_mode(AliasMode::Fixpoint);
        assert!(check_trace_with(text, config).unwrap().has_warnings());
    }

    #[test]
    fn test_check_trace_rejects_bad_syntax() {
        assert!(check_trace("fn main() {").is_err());
    }
}
