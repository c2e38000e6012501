/*! Core engine for source-level freshness checking.
 *
 * A variable read is only trustworthy if nothing it was computed from changed since it was
 * assigned. This crate tracks that property over a stream of syntactic events: a scope-aware
 * dependency graph decides freshness, a points-to resolver tells dereferences which variables
 * they may read, and an interprocedural driver threads per-function summaries about global
 * state from callees to callers.
 */

pub mod analysis;
pub mod config;
pub mod diagnostic;
pub mod event;
pub mod source_location;
pub mod summary;
pub mod variable;

pub use analysis::{
    AliasMode, Analyzer, AnalysisReport, CallGraph, CallOrder, DependencyGraph, FunctionWalker,
    GlobalScope, PointerConstraint, PointsToGraph, ValidityGraph, ValidityNode,
};
pub use config::AnalysisConfig;
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use event::{Event, FunctionTrace, Param, Step, TranslationUnit};
pub use source_location::SourceLocation;
pub use summary::{FunctionSummary, SummaryLookup, SummaryTable};
pub use variable::{StorageClass, ValidityState, Variable};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("Unbalanced scope: {0}")]
    UnbalancedScope(String),
    #[error("Malformed event stream: {0}")]
    MalformedEvents(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests;
