/*! Freshness analysis over event streams.
 *
 * The dependency graph answers whether a variable is fresh, the validity graph layers branch
 * and scope snapshots on top of it, the alias pass resolves what dereferences may read, and the
 * driver sequences function walks so callee summaries exist before their callers need them.
 */

pub mod alias;
pub mod call_graph;
pub mod dependency_graph;
pub mod driver;
pub mod validity;
pub mod walker;

pub use alias::{AliasMode, PointerConstraint, PointsToGraph};
pub use call_graph::{CallGraph, CallOrder};
pub use dependency_graph::{DependencyGraph, ValidityNode};
pub use driver::{AnalysisReport, Analyzer};
pub use validity::ValidityGraph;
pub use walker::{FunctionWalker, GlobalScope};
